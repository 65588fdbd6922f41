use super::auth::TokenCache;
use super::store::{ArtifactStore, ParentContainer, RemoteId, StoreError};
use crate::config::types::StoreConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

const CSV_MIME: &str = "text/csv";

/// Google Drive v3 backed artifact store.
pub struct DriveStore {
    client: reqwest::Client,
    api_base: String,
    upload_base: String,
    tokens: TokenCache,
    parent: ParentContainer,
}

impl DriveStore {
    pub fn new(config: &StoreConfig, tokens: TokenCache) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            upload_base: config.upload_base.trim_end_matches('/').to_string(),
            tokens,
            parent: ParentContainer {
                folder_id: config.folder_id.clone(),
                shared_drive_id: config.shared_drive_id.clone(),
            },
        })
    }

    pub fn parent(&self) -> &ParentContainer {
        &self.parent
    }

    /// Fetch an access token up front so bad credentials fail at startup.
    pub async fn check_credentials(&self) -> Result<(), StoreError> {
        self.tokens.bearer().await.map(|_| ())
    }

    /// Attach a current access token and send. A 401 drops the cached token
    /// so the next request fetches a new one.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let token = self.tokens.bearer().await?;
        let response = request.bearer_auth(token).send().await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            warn!("Drive rejected the access token, refreshing before the next request");
            self.tokens.invalidate().await;
        }

        Ok(response)
    }

    /// Confirm the configured shared drive is reachable. Returns its name, or
    /// `None` when no shared drive is configured.
    pub async fn verify_shared_drive(&self) -> Result<Option<String>, StoreError> {
        let Some(drive_id) = &self.parent.shared_drive_id else {
            return Ok(None);
        };

        let url = format!("{}/drives/{}", self.api_base, drive_id);
        let request = self.client.get(&url).query(&[("fields", "id,name")]);
        let response = self.send(request).await?;

        let drive: SharedDrive = check_status(response).await?.json().await?;
        Ok(Some(drive.name.unwrap_or_else(|| "Unknown".to_string())))
    }

    fn search_params(&self, name: &str) -> Vec<(&'static str, String)> {
        let mut query = format!("name='{}' and trashed=false", escape_query(name));
        if let Some(folder_id) = &self.parent.folder_id {
            query.push_str(&format!(" and '{}' in parents", escape_query(folder_id)));
        }

        let mut params = vec![("q", query), ("fields", "files(id, name)".to_string())];

        if let Some(drive_id) = &self.parent.shared_drive_id {
            params.push(("driveId", drive_id.clone()));
            params.push(("corpora", "drive".to_string()));
            params.push(("includeItemsFromAllDrives", "true".to_string()));
            params.push(("supportsAllDrives", "true".to_string()));
        }

        params
    }

    fn write_params(&self, upload_type: &'static str) -> Vec<(&'static str, &'static str)> {
        let mut params = vec![("uploadType", upload_type), ("fields", "id")];
        if self.parent.shared_drive_id.is_some() {
            params.push(("supportsAllDrives", "true"));
        }
        params
    }

    /// New files go into the folder, or the shared drive's root when only a
    /// shared drive is configured.
    fn create_metadata(&self, name: &str) -> FileMetadata {
        let parent = self
            .parent
            .folder_id
            .as_ref()
            .or(self.parent.shared_drive_id.as_ref());

        FileMetadata {
            name: name.to_string(),
            mime_type: CSV_MIME.to_string(),
            parents: parent.into_iter().cloned().collect(),
        }
    }
}

#[async_trait]
impl ArtifactStore for DriveStore {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn find_by_name(&self, name: &str) -> Result<Option<RemoteId>, StoreError> {
        let url = format!("{}/files", self.api_base);
        let request = self.client.get(&url).query(&self.search_params(name));
        let response = self.send(request).await?;

        let list: FileList = check_status(response).await?.json().await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    #[tracing::instrument(level = "debug", skip(self, content), fields(bytes = content.len()))]
    async fn create(&self, name: &str, content: &str) -> Result<RemoteId, StoreError> {
        let metadata = serde_json::to_string(&self.create_metadata(name))?;
        let boundary = format!("hourly-export-{}", Uuid::new_v4().simple());
        let body = multipart_related_body(&boundary, &metadata, content);

        let url = format!("{}/files", self.upload_base);
        let request = self
            .client
            .post(&url)
            .query(&self.write_params("multipart"))
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body);
        let response = self.send(request).await?;

        let file: DriveFile = check_status(response).await?.json().await?;
        Ok(file.id)
    }

    #[tracing::instrument(level = "debug", skip(self, content), fields(bytes = content.len()))]
    async fn replace(&self, id: &str, content: &str) -> Result<(), StoreError> {
        let url = format!("{}/files/{}", self.upload_base, id);
        let request = self
            .client
            .patch(&url)
            .query(&self.write_params("media"))
            .header(reqwest::header::CONTENT_TYPE, CSV_MIME)
            .body(content.to_string());
        let response = self.send(request).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.to_string()));
        }

        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    if response.status().is_success() {
        return Ok(response);
    }

    Err(StoreError::Status {
        status: response.status().as_u16(),
        message: response.text().await.unwrap_or_default(),
    })
}

/// Escape a value for use inside a single-quoted Drive query string.
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn multipart_related_body(boundary: &str, metadata_json: &str, content: &str) -> String {
    format!(
        "--{b}\r\n\
         Content-Type: application/json; charset=UTF-8\r\n\r\n\
         {metadata}\r\n\
         --{b}\r\n\
         Content-Type: {mime}\r\n\r\n\
         {content}\r\n\
         --{b}--\r\n",
        b = boundary,
        metadata = metadata_json,
        mime = CSV_MIME,
        content = content,
    )
}

// ===== Wire Types =====

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata {
    name: String,
    mime_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parents: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Clone, Deserialize)]
struct SharedDrive {
    name: Option<String>,
}
