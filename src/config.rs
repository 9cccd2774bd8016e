use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

pub const ENV_ORG_URL: &str = "AZURE_DEVOPS_ORG_URL";
pub const ENV_PROJECT: &str = "AZURE_DEVOPS_PROJECT";
pub const ENV_PAT: &str = "AZURE_DEVOPS_PAT";
pub const ENV_SECRETS: &str = "KEVOPS_SECRETS";

/// Connection settings for one organization and project, resolved once.
#[derive(Debug)]
pub struct Credentials {
    pub org_url: String,
    pub project: String,
    pub pat: SecretString,
}

/// Values one source can contribute. Any of them may be missing.
#[derive(Debug, Default)]
pub struct CredentialSource {
    pub org_url: Option<String>,
    pub project: Option<String>,
    pub pat: Option<SecretString>,
}

impl CredentialSource {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            org_url: lookup(ENV_ORG_URL),
            project: lookup(ENV_PROJECT),
            pat: lookup(ENV_PAT).map(SecretString::from),
        }
    }
}

/// Contents of the secrets file: top-level keys plus an `[azure]` section.
#[derive(Debug, Default)]
pub struct Secrets {
    pub top: CredentialSource,
    pub azure: CredentialSource,
}

#[derive(Deserialize, Default)]
struct RawSecrets {
    organization_url: Option<String>,
    project: Option<String>,
    pat: Option<String>,
    #[serde(rename = "ORG_URL")]
    org_url_alias: Option<String>,
    #[serde(rename = "PROJECT_NAME")]
    project_alias: Option<String>,
    #[serde(rename = "AZURE_PAT")]
    pat_alias: Option<String>,
    azure: Option<RawSection>,
}

#[derive(Deserialize, Default)]
struct RawSection {
    organization_url: Option<String>,
    project: Option<String>,
    pat: Option<String>,
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".kevops")
}

fn default_secrets_path() -> PathBuf {
    data_dir().join("secrets.toml")
}

pub fn parse_secrets(contents: &str) -> Result<Secrets> {
    let raw: RawSecrets = toml::from_str(contents).context("Failed to parse secrets file")?;
    let section = raw.azure.unwrap_or_default();
    Ok(Secrets {
        top: CredentialSource {
            org_url: raw.organization_url.or(raw.org_url_alias),
            project: raw.project.or(raw.project_alias),
            pat: raw.pat.or(raw.pat_alias).map(SecretString::from),
        },
        azure: CredentialSource {
            org_url: section.organization_url,
            project: section.project,
            pat: section.pat.map(SecretString::from),
        },
    })
}

/// Loads the secrets file. An explicit path must exist; the default
/// `~/.kevops/secrets.toml` is optional.
pub fn load_secrets(explicit: Option<&Path>) -> Result<Secrets> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (default_secrets_path(), false),
    };
    if !path.exists() {
        if required {
            bail!("Secrets file {} does not exist", path.display());
        }
        return Ok(Secrets::default());
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read secrets from {}", path.display()))?;
    parse_secrets(&contents).with_context(|| format!("Invalid secrets file {}", path.display()))
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn present_secret(value: Option<SecretString>) -> Option<SecretString> {
    value.filter(|v| !v.expose_secret().trim().is_empty())
}

/// Merges credential sources. Explicit arguments win, then the secrets file
/// (top level before `[azure]`), then environment variables. Blank values
/// count as missing.
pub fn resolve_credentials(
    args: CredentialSource,
    secrets: Secrets,
    env: CredentialSource,
) -> Result<Credentials> {
    let Secrets { top, azure } = secrets;
    let mut org_url = None;
    let mut project = None;
    let mut pat = None;

    for source in [args, top, azure, env] {
        org_url = org_url.or_else(|| present(source.org_url));
        project = project.or_else(|| present(source.project));
        pat = pat.or_else(|| present_secret(source.pat));
    }

    let mut missing = Vec::new();
    if org_url.is_none() {
        missing.push("organization_url");
    }
    if project.is_none() {
        missing.push("project");
    }
    if pat.is_none() {
        missing.push("pat");
    }

    match (org_url, project, pat) {
        (Some(org_url), Some(project), Some(pat)) => Ok(Credentials {
            org_url,
            project,
            pat,
        }),
        _ => bail!(
            "Missing {}: provide them as arguments, in the secrets file, or via {ENV_ORG_URL}, {ENV_PROJECT} and {ENV_PAT}",
            missing.join(", ")
        ),
    }
}
