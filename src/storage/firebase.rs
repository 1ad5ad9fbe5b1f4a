use super::{load_credentials, ObjectStore, ServiceAccount, StorageError};
use crate::config::StorageConfig;
use async_trait::async_trait;
use bytes::Bytes;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use url::Url;

const READ_ONLY_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_only";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    /// Falls back to the assertion lifetime when `expires_in` overflows the clock.
    fn expiry(requested_at: Instant, expires_in: u64) -> Instant {
        requested_at
            .checked_add(Duration::from_secs(expires_in))
            .unwrap_or(requested_at + Duration::from_secs(ASSERTION_LIFETIME_SECS))
    }

    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

/// Mints OAuth access tokens for a service account and caches the current
/// one until shortly before it expires.
struct TokenProvider {
    account: ServiceAccount,
    key: EncodingKey,
    current: Mutex<Option<AccessToken>>,
}

impl TokenProvider {
    fn new(account: ServiceAccount) -> Result<Self, StorageError> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| StorageError::Auth(format!("invalid private key: {}", e)))?;
        Ok(Self {
            account,
            key,
            current: Mutex::new(None),
        })
    }

    async fn access_token(&self, http: &reqwest::Client) -> Result<String, StorageError> {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref().filter(|token| token.is_fresh()) {
            return Ok(token.value.clone());
        }

        let token = self.fetch(http).await?;
        let value = token.value.clone();
        *current = Some(token);
        Ok(value)
    }

    async fn fetch(&self, http: &reqwest::Client) -> Result<AccessToken, StorageError> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let claims = Claims {
            iss: &self.account.client_email,
            scope: READ_ONLY_SCOPE,
            aud: &self.account.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| StorageError::Auth(format!("failed to sign assertion: {}", e)))?;

        let requested_at = Instant::now();
        let response = http
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Auth(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        tracing::debug!(expires_in = token.expires_in, "Obtained storage access token");

        Ok(AccessToken {
            value: token.access_token,
            expires_at: AccessToken::expiry(requested_at, token.expires_in),
        })
    }
}

/// Firebase Storage bucket read through the Google Cloud Storage JSON API.
pub struct FirebaseStorage {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    auth: Option<TokenProvider>,
}

impl FirebaseStorage {
    /// Builds a client. `account` may be `None` only when talking to an
    /// emulator.
    pub fn new(config: &StorageConfig, account: Option<ServiceAccount>) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let auth = account.map(TokenProvider::new).transpose()?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            bucket: config.bucket.clone(),
            auth,
        })
    }

    /// Resolves credentials and connects. `Ok(None)` when there is nothing to
    /// authenticate with and no emulator configured.
    pub fn from_config(config: &StorageConfig) -> Result<Option<Self>, StorageError> {
        if let Some(host) = &config.emulator_host {
            tracing::info!("Using storage emulator at {} for bucket {}", host, config.bucket);
            return Self::new(config, None).map(Some);
        }

        match load_credentials(config)? {
            Some((account, source)) => {
                let storage = Self::new(config, Some(account))?;
                tracing::info!(
                    "Storage connected to bucket {} using credentials from {}",
                    config.bucket,
                    source
                );
                Ok(Some(storage))
            }
            None => Ok(None),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn object_url(&self, path: &str) -> Result<Url, StorageError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| StorageError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StorageError::Url(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(["storage", "v1", "b", self.bucket.as_str(), "o", path]);
        url.query_pairs_mut().append_pair("alt", "media");
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for FirebaseStorage {
    async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        let url = self.object_url(path)?;

        let mut request = self.http.get(url);
        if let Some(auth) = &self.auth {
            request = request.bearer_auth(auth.access_token(&self.http).await?);
        }

        let response = request.send().await?;
        match response.status() {
            status if status.is_success() => {
                let bytes = response.bytes().await?;
                tracing::debug!(path, size = bytes.len(), "Downloaded object");
                Ok(bytes)
            }
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(path.to_string())),
            status => Err(StorageError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            }),
        }
    }
}
