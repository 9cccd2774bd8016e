use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{WorkTracker, WIQL_PAGE_SIZE};
use crate::config::Credentials;
use crate::error::DevOpsError;
use crate::model::work_item::{Identity, WorkItemId, WorkItemRecord};

const API_VERSION: &str = "7.0";

/// REST client for one organization and project.
pub struct AzureDevOpsClient {
    base_url: String,
    project: String,
    auth_header: SecretString,
    client: reqwest::Client,
}

impl AzureDevOpsClient {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            base_url: clean_org_url(&credentials.org_url),
            project: credentials.project.clone(),
            auth_header: basic_auth_header(credentials.pat.expose_secret()),
            client: reqwest::Client::new(),
        }
    }

    fn wiql_url(&self) -> String {
        format!(
            "{}/{}/_apis/wit/wiql?api-version={API_VERSION}&$top={WIQL_PAGE_SIZE}",
            self.base_url,
            urlencoding::encode(&self.project)
        )
    }

    fn work_items_url(&self, ids: &[WorkItemId], expand_relations: bool) -> String {
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        let mut url = format!(
            "{}/_apis/wit/workitems?ids={}&api-version={API_VERSION}",
            self.base_url,
            ids.join(",")
        );
        if expand_relations {
            url.push_str("&$expand=relations");
        }
        url
    }

    fn connection_data_url(&self) -> String {
        format!("{}/_apis/connectionData", self.base_url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &'static str,
    ) -> Result<T, DevOpsError> {
        let resp = request
            .header(AUTHORIZATION, self.auth_header.expose_secret())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        // A rejected PAT can come back as a 203 with the HTML sign-in page.
        if matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NON_AUTHORITATIVE_INFORMATION
        ) {
            warn!(endpoint, status = status.as_u16(), "request not authorized");
            return Err(DevOpsError::Auth {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(endpoint, status = status.as_u16(), "request rejected");
            return Err(DevOpsError::rejected(status.as_u16(), &body));
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| DevOpsError::Decode {
            endpoint,
            message: e.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct WiqlResponse {
    #[serde(default, rename = "workItems")]
    work_items: Vec<WiqlReference>,
}

#[derive(Deserialize)]
struct WiqlReference {
    id: WorkItemId,
}

#[derive(Deserialize)]
struct WorkItemsResponse {
    #[serde(default)]
    value: Vec<WorkItemRecord>,
}

#[derive(Deserialize)]
struct ConnectionData {
    #[serde(rename = "authenticatedUser")]
    authenticated_user: AuthenticatedUser,
}

#[derive(Deserialize)]
struct AuthenticatedUser {
    id: String,
    #[serde(rename = "providerDisplayName", default)]
    provider_display_name: String,
    #[serde(default)]
    properties: serde_json::Value,
}

impl From<AuthenticatedUser> for Identity {
    fn from(user: AuthenticatedUser) -> Self {
        let account = user
            .properties
            .get("Account")
            .and_then(|a| a.get("$value"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(String::from);
        Identity {
            id: user.id,
            display_name: user.provider_display_name,
            account,
        }
    }
}

#[async_trait]
impl WorkTracker for AzureDevOpsClient {
    fn page_size(&self) -> Option<usize> {
        Some(WIQL_PAGE_SIZE)
    }

    async fn query_ids(&self, wiql: &str) -> Result<Vec<WorkItemId>, DevOpsError> {
        let body = serde_json::json!({ "query": wiql });
        let request = self.client.post(self.wiql_url()).json(&body);
        let result: WiqlResponse = self.execute(request, "wiql").await?;
        debug!(rows = result.work_items.len(), "wiql page received");
        Ok(result.work_items.into_iter().map(|w| w.id).collect())
    }

    async fn work_items(
        &self,
        ids: &[WorkItemId],
        expand_relations: bool,
    ) -> Result<Vec<WorkItemRecord>, DevOpsError> {
        let request = self.client.get(self.work_items_url(ids, expand_relations));
        let result: WorkItemsResponse = self.execute(request, "workitems").await?;
        Ok(result.value)
    }

    async fn whoami(&self) -> Result<Identity, DevOpsError> {
        let request = self.client.get(self.connection_data_url());
        let data: ConnectionData = self.execute(request, "connectionData").await?;
        Ok(data.authenticated_user.into())
    }
}

/// Organization URL without trailing slashes.
pub fn clean_org_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Link to the work item in the web UI.
pub fn edit_url(base_url: &str, project: &str, id: WorkItemId) -> String {
    format!(
        "{}/{}/_workitems/edit/{id}",
        clean_org_url(base_url),
        urlencoding::encode(project)
    )
}

/// Basic auth with an empty user name and the PAT as password.
fn basic_auth_header(pat: &str) -> SecretString {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!(":{pat}"));
    SecretString::from(format!("Basic {encoded}"))
}
