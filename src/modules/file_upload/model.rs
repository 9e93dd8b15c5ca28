use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::file_upload::schema::FileEntity;
use crate::storage::ByteStream;

/// New file metadata to insert into database
#[derive(Debug, Clone)]
pub struct NewFile {
    pub original_filename: String,
    pub display_name: String,
    pub content_type: String,
    pub size: i64,
    pub storage_key: String,
    pub owner_id: Option<Uuid>,
}

/// File upload configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_file_size: u64,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    pub max_list_limit: u32,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024, // 10MB
            allowed_extensions: ["jpg", "jpeg", "png", "gif", "webp", "pdf", "txt"]
                .into_iter()
                .map(String::from)
                .collect(),
            allowed_content_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
                "application/pdf".to_string(),
                "text/plain".to_string(),
            ],
            max_list_limit: 1000,
        }
    }
}

/// Content handed back by a download.
pub struct FileDownload {
    pub content: ByteStream,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
}

#[derive(Deserialize, Validate)]
pub struct ChunkedUploadQuery {
    /// Size the client claims to send, reconciled against what arrives.
    pub size: Option<u64>,
}

#[derive(Deserialize, Validate)]
pub struct SignedUrlQuery {
    #[validate(range(min = 60, max = 86400, message = "expires_in must be between 60 and 86400"))]
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Deserialize, Validate)]
pub struct ListFilesQuery {
    #[serde(default)]
    pub skip: u64,
    #[validate(range(min = 1, max = 1000, message = "limit must be between 1 and 1000"))]
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileUploadResponse {
    pub file_id: Uuid,
    pub filename: String,
    pub size: i64,
    pub content_type: String,
}

impl From<FileEntity> for FileUploadResponse {
    fn from(entity: FileEntity) -> Self {
        FileUploadResponse {
            file_id: entity.id,
            filename: entity.display_name,
            size: entity.size,
            content_type: entity.content_type,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileResponse {
    pub file_id: Uuid,
    pub filename: String,
    pub size: i64,
    pub content_type: String,
    pub owner_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<FileEntity> for FileResponse {
    fn from(entity: FileEntity) -> Self {
        FileResponse {
            file_id: entity.id,
            filename: entity.display_name,
            size: entity.size,
            content_type: entity.content_type,
            owner_id: entity.owner_id,
            created_at: entity.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignedUrlResponse {
    pub file_id: Uuid,
    pub url: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteFileResponse {
    pub file_id: Uuid,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileListResponse {
    pub files: Vec<FileResponse>,
    pub total: i64,
}
