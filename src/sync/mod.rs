pub mod auth;
pub mod client;
pub mod drive;
pub mod store;

pub use auth::{token_source, AccessToken, StaticToken, TokenCache, TokenSource};
pub use client::{ArtifactSyncClient, SyncError};
pub use drive::DriveStore;
pub use store::{ArtifactStore, ParentContainer, RemoteId, StoreError};
