mod credentials;
mod firebase;

pub use credentials::{load_credentials, CredentialSource, CredentialsError, ServiceAccount};
pub use firebase::FirebaseStorage;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Storage returned status {status} for {path}")]
    Status { status: u16, path: String },
    #[error("Storage request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Invalid storage URL: {0}")]
    Url(String),
    #[error("Storage authorization failed: {0}")]
    Auth(String),
    #[error("Storage credentials error: {0}")]
    Credentials(#[from] CredentialsError),
}

/// Read access to the bucket holding uploaded radiographs.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    async fn download(&self, path: &str) -> Result<Bytes, StorageError>;
}
