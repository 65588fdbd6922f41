use super::store::{ArtifactStore, RemoteId, StoreError};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("lookup of '{filename}' failed: {source}")]
    Lookup {
        filename: String,
        #[source]
        source: StoreError,
    },

    #[error("create of '{filename}' failed: {source}")]
    Create {
        filename: String,
        #[source]
        source: StoreError,
    },

    #[error("replace of '{filename}' (id {id}) failed: {source}")]
    Replace {
        filename: String,
        id: RemoteId,
        #[source]
        source: StoreError,
    },
}

/// Keeps exactly one remote object per filename, creating it on first sync
/// and replacing its content afterwards.
///
/// Lookups are cached for the life of the client, including "not found", so
/// a name is listed at most once unless its object disappears.
pub struct ArtifactSyncClient<S> {
    store: S,
    cache: HashMap<String, Option<RemoteId>>,
}

impl<S: ArtifactStore> ArtifactSyncClient<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: HashMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// `None` if the name was never looked up, `Some(None)` if it is known
    /// not to exist.
    pub fn cached(&self, filename: &str) -> Option<Option<&str>> {
        self.cache.get(filename).map(|id| id.as_deref())
    }

    async fn resolve(&mut self, filename: &str) -> Result<Option<RemoteId>, SyncError> {
        if let Some(cached) = self.cache.get(filename) {
            return Ok(cached.clone());
        }

        let found = self
            .store
            .find_by_name(filename)
            .await
            .map_err(|source| SyncError::Lookup {
                filename: filename.to_string(),
                source,
            })?;

        debug!(filename = %filename, found = ?found, "Looked up remote artifact");
        self.cache.insert(filename.to_string(), found.clone());
        Ok(found)
    }

    /// Upload `content` as `filename`, replacing the existing object if there
    /// is one. Returns the object's id.
    pub async fn sync_artifact(&mut self, content: &str, filename: &str) -> Result<RemoteId, SyncError> {
        let result = self.sync_inner(content, filename).await;
        if let Err(e) = &result {
            error!(filename = %filename, error = %e, "Error syncing artifact");
        }
        result
    }

    async fn sync_inner(&mut self, content: &str, filename: &str) -> Result<RemoteId, SyncError> {
        match self.resolve(filename).await? {
            Some(id) => match self.store.replace(&id, content).await {
                Ok(()) => {
                    info!(filename = %filename, id = %id, bytes = content.len(), "Updated artifact");
                    Ok(id)
                }
                Err(source) => {
                    if matches!(source, StoreError::NotFound(_)) {
                        // Deleted out of band; look the name up again next time.
                        self.cache.remove(filename);
                    }
                    Err(SyncError::Replace {
                        filename: filename.to_string(),
                        id,
                        source,
                    })
                }
            },
            None => {
                let id = self
                    .store
                    .create(filename, content)
                    .await
                    .map_err(|source| SyncError::Create {
                        filename: filename.to_string(),
                        source,
                    })?;
                info!(filename = %filename, id = %id, bytes = content.len(), "Created artifact");
                self.cache.insert(filename.to_string(), Some(id.clone()));
                Ok(id)
            }
        }
    }
}
