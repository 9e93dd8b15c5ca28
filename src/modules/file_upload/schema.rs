use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// File metadata entity from database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FileEntity {
    pub id: Uuid,
    pub original_filename: String,
    pub display_name: String,
    pub size: i64,
    pub content_type: String,
    pub storage_key: String,
    pub owner_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
