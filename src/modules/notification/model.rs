use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::notification::schema::NotificationEntity;

/// What a notification points at, e.g. `("file", <file id>)`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate)]
pub struct NotificationReference {
    #[validate(length(min = 1, max = 50, message = "Reference type must be 1-50 characters"))]
    pub reference_type: String,
    pub reference_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNotificationModel {
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50, message = "Type must be 1-50 characters"))]
    pub _type: String,
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    #[validate(length(max = 2000, message = "Message cannot exceed 2000 characters"))]
    pub message: Option<String>,
    #[validate(length(max = 100, message = "Icon cannot exceed 100 characters"))]
    pub icon: Option<String>,
    #[validate(length(max = 500, message = "Link cannot exceed 500 characters"))]
    pub link: Option<String>,
    #[validate(nested)]
    pub reference: Option<NotificationReference>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NotificationQuery {
    #[serde(default)]
    pub skip: u64,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub unread_only: bool,
}

fn default_limit() -> u32 {
    20
}

pub struct InsertNotification {
    pub user_id: Uuid,
    pub _type: String,
    pub title: String,
    pub message: Option<String>,
    pub icon: Option<String>,
    pub link: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
}

#[derive(Serialize, Deserialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationEntity>,
    pub total: i64,
    pub unread: i64,
}

#[derive(Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub unread: i64,
}

#[derive(Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}
