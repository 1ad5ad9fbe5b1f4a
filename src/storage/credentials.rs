use crate::config::{default_token_uri, StorageConfig};
use serde::Deserialize;
use std::{
    fmt,
    path::{Path, PathBuf},
};
use thiserror::Error;

const PRIVATE_KEY_VAR: &str = "FIREBASE_PRIVATE_KEY";
const CLIENT_EMAIL_VAR: &str = "FIREBASE_CLIENT_EMAIL";
const PROJECT_ID_VAR: &str = "FIREBASE_PROJECT_ID";

#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("{0} is set but {1} is missing")]
    IncompleteEnvironment(&'static str, &'static str),
    #[error("Failed to read credentials file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid credentials file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// The subset of a Google service-account key needed to mint access tokens.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    #[serde(default)]
    pub project_id: Option<String>,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    File(PathBuf),
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Environment => write!(f, "environment variables"),
            CredentialSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Environment variables win over the credentials file. `Ok(None)` means no
/// credentials are configured at all.
pub fn load_credentials(
    config: &StorageConfig,
) -> Result<Option<(ServiceAccount, CredentialSource)>, CredentialsError> {
    if let Some(account) = from_lookup(|key| std::env::var(key).ok(), &config.token_uri)? {
        return Ok(Some((account, CredentialSource::Environment)));
    }

    let path = &config.credentials_file;
    if path.exists() {
        let account = from_file(path)?;
        return Ok(Some((account, CredentialSource::File(path.clone()))));
    }

    Ok(None)
}

fn from_lookup<F>(lookup: F, token_uri: &str) -> Result<Option<ServiceAccount>, CredentialsError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(private_key) = lookup(PRIVATE_KEY_VAR).filter(|key| !key.is_empty()) else {
        return Ok(None);
    };
    let client_email = lookup(CLIENT_EMAIL_VAR)
        .ok_or(CredentialsError::IncompleteEnvironment(PRIVATE_KEY_VAR, CLIENT_EMAIL_VAR))?;

    Ok(Some(ServiceAccount {
        project_id: lookup(PROJECT_ID_VAR),
        client_email,
        // Hosting dashboards store the PEM on a single line.
        private_key: private_key.replace("\\n", "\n"),
        token_uri: token_uri.to_string(),
    }))
}

fn from_file(path: &Path) -> Result<ServiceAccount, CredentialsError> {
    let contents = std::fs::read(path).map_err(|source| CredentialsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&contents).map_err(|source| CredentialsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
