use super::store::StoreError;
use crate::config::types::StoreConfig;
use crate::scheduler::{Clock, SystemClock};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Clone)]
pub struct AccessToken {
    pub secret: String,
    /// `None` for tokens that are never refreshed.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + chrono::Duration::seconds(EXPIRY_MARGIN_SECS) < expires_at,
            None => true,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Mints OAuth access tokens for the Drive API.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<AccessToken, StoreError>;
}

/// A token taken from config.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn fetch_token(&self) -> Result<AccessToken, StoreError> {
        Ok(AccessToken {
            secret: self.0.clone(),
            expires_at: None,
        })
    }
}

/// Service account or application default credentials through `gcp_auth`.
pub struct GoogleTokenSource {
    provider: Arc<dyn gcp_auth::TokenProvider>,
}

#[async_trait]
impl TokenSource for GoogleTokenSource {
    async fn fetch_token(&self) -> Result<AccessToken, StoreError> {
        let token = self.provider.token(&[DRIVE_SCOPE]).await?;
        Ok(AccessToken {
            secret: token.as_str().to_string(),
            expires_at: Some(token.expires_at()),
        })
    }
}

/// Pick the token source the store config asks for.
pub async fn token_source(config: &StoreConfig) -> Result<Arc<dyn TokenSource>, StoreError> {
    if let Some(path) = &config.credentials_file {
        info!(path = %path.display(), "Using service account credentials for Google Drive");
        let account = gcp_auth::CustomServiceAccount::from_file(path)?;
        return Ok(Arc::new(GoogleTokenSource {
            provider: Arc::new(account),
        }));
    }

    if let Some(secret) = &config.access_token {
        warn!("Using a fixed Google Drive access token; it will not be refreshed");
        return Ok(Arc::new(StaticToken::new(secret.clone())));
    }

    info!("Using application default credentials for Google Drive");
    let provider = gcp_auth::provider().await?;
    Ok(Arc::new(GoogleTokenSource { provider }))
}

/// Holds the current token and fetches a new one when it is about to expire.
pub struct TokenCache {
    source: Arc<dyn TokenSource>,
    clock: Arc<dyn Clock>,
    current: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self::with_clock(source, Arc::new(SystemClock))
    }

    pub fn with_clock(source: Arc<dyn TokenSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            current: Mutex::new(None),
        }
    }

    /// Secret of a token valid for at least the expiry margin.
    pub async fn bearer(&self) -> Result<String, StoreError> {
        let mut current = self.current.lock().await;
        let now = self.clock.now();

        if let Some(token) = current.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.secret.clone());
        }

        let token = self.source.fetch_token().await?;
        debug!(expires_at = ?token.expires_at, "Fetched Drive access token");
        let secret = token.secret.clone();
        *current = Some(token);
        Ok(secret)
    }

    /// Drop the cached token, e.g. after the API rejected it.
    pub async fn invalidate(&self) {
        self.current.lock().await.take();
    }
}
