use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use secrecy::SecretString;

use crate::api::{AzureDevOpsClient, WorkTracker};
use crate::config::{self, CredentialSource, Credentials, ENV_PAT, ENV_SECRETS};
use crate::error::DevOpsError;
use crate::logging::{LogConfig, LogLevel};
use crate::model::query::WorkItemType;
use crate::retrieval;

/// Query open Azure DevOps tasks and epics, paging past the WIQL row limit.
#[derive(Debug, Parser)]
#[command(name = "kevops", version)]
pub struct Args {
    /// Organization URL, e.g. https://dev.azure.com/contoso
    pub organization_url: Option<String>,

    /// Project name
    pub project: Option<String>,

    /// Personal access token
    pub pat: Option<String>,

    /// Only tasks assigned to the token owner
    #[arg(long, conflicts_with = "epics")]
    pub mine: bool,

    /// Print the number of items instead of the JSON documents
    #[arg(long)]
    pub count: bool,

    /// List open epics instead of open tasks
    #[arg(long)]
    pub epics: bool,

    /// Area path to filter by; repeat for several (matched with OR)
    #[arg(long = "area", value_name = "PATH")]
    pub areas: Vec<String>,

    /// Secrets file (TOML) [default: ~/.kevops/secrets.toml]
    #[arg(long, value_name = "FILE", env = ENV_SECRETS)]
    pub secrets: Option<PathBuf>,

    /// Launch the interactive dashboard
    #[arg(long)]
    pub dashboard: bool,

    /// Enable logging at this level
    #[arg(long, value_enum, env = "KEVOPS_LOG")]
    pub log_level: Option<LogLevel>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level,
            file: self.log_file.clone(),
            dashboard: self.dashboard,
        }
    }

    fn overrides(&self) -> CredentialSource {
        CredentialSource {
            org_url: self.organization_url.clone(),
            project: self.project.clone(),
            pat: self.pat.clone().map(SecretString::from),
        }
    }

    pub fn item_type(&self) -> WorkItemType {
        if self.epics {
            WorkItemType::Epic
        } else {
            WorkItemType::Task
        }
    }

    /// Credentials from, in order: these arguments, the secrets file, the environment.
    pub fn credentials(&self) -> Result<Credentials> {
        let secrets = config::load_secrets(self.secrets.as_deref())?;
        config::resolve_credentials(self.overrides(), secrets, CredentialSource::from_env())
    }
}

pub async fn run(args: &Args) -> Result<()> {
    let credentials = args.credentials()?;
    let client = AzureDevOpsClient::new(&credentials);
    let output = execute(&client, args).await.map_err(with_auth_hint)?;
    println!("{output}");
    Ok(())
}

/// Points at where the token came from when the server refused it.
fn with_auth_hint(err: anyhow::Error) -> anyhow::Error {
    let rejected = err
        .downcast_ref::<DevOpsError>()
        .is_some_and(DevOpsError::is_auth);
    if rejected {
        err.context(format!(
            "Azure DevOps refused the personal access token. It needs Work Items (Read) scope; \
             it is taken from the command line, then the secrets file, then {ENV_PAT}"
        ))
    } else {
        err
    }
}

/// Runs the query selected by `args` and renders what should go to stdout.
pub async fn execute(tracker: &dyn WorkTracker, args: &Args) -> Result<String> {
    let records = match (args.item_type(), args.mine) {
        (WorkItemType::Epic, _) => retrieval::get_open_epics(tracker, &args.areas)
            .await
            .context("Failed to list open epics")?,
        (WorkItemType::Task, true) => retrieval::get_my_open_tasks(tracker, &args.areas)
            .await
            .context("Failed to list your open tasks")?,
        (WorkItemType::Task, false) => retrieval::get_open_tasks(tracker, None, &args.areas)
            .await
            .context("Failed to list open tasks")?,
    };

    if args.count {
        Ok(records.len().to_string())
    } else {
        serde_json::to_string_pretty(&records).context("Failed to serialize work items")
    }
}
