use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Identifier the store assigns to an object.
pub type RemoteId = String;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to obtain access token: {0}")]
    Auth(#[from] gcp_auth::Error),

    #[error("store returned error status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("object {0} not found")]
    NotFound(RemoteId),

    #[error("store error: {0}")]
    Other(String),
}

/// Where artifacts live: a folder, optionally inside a shared drive. When a
/// shared drive is set, every operation is scoped to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentContainer {
    pub folder_id: Option<String>,
    pub shared_drive_id: Option<String>,
}

/// Remote file storage holding one object per artifact name, scoped to the
/// store's configured parent container.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Id of an existing object named `name`, if any.
    async fn find_by_name(&self, name: &str) -> Result<Option<RemoteId>, StoreError>;

    async fn create(&self, name: &str, content: &str) -> Result<RemoteId, StoreError>;

    /// Replace the content of `id`. Fails with `NotFound` if it no longer exists.
    async fn replace(&self, id: &str, content: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: ArtifactStore + ?Sized> ArtifactStore for Arc<S> {
    async fn find_by_name(&self, name: &str) -> Result<Option<RemoteId>, StoreError> {
        (**self).find_by_name(name).await
    }

    async fn create(&self, name: &str, content: &str) -> Result<RemoteId, StoreError> {
        (**self).create(name, content).await
    }

    async fn replace(&self, id: &str, content: &str) -> Result<(), StoreError> {
        (**self).replace(id, content).await
    }
}
