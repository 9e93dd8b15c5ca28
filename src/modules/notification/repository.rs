use uuid::Uuid;

use crate::{
    api::error,
    modules::notification::{model::InsertNotification, schema::NotificationEntity},
};

/// Every lookup is keyed by owner, so rows of other users are never reachable.
#[async_trait::async_trait]
pub trait NotificationRepository {
    async fn create(
        &self,
        notification: &InsertNotification,
    ) -> Result<NotificationEntity, error::SystemError>;

    async fn find_by_owner(
        &self,
        owner: &Uuid,
        unread_only: bool,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<NotificationEntity>, error::SystemError>;

    async fn count(&self, owner: &Uuid, unread_only: bool) -> Result<i64, error::SystemError>;

    async fn mark_read(
        &self,
        id: &Uuid,
        owner: &Uuid,
    ) -> Result<Option<NotificationEntity>, error::SystemError>;

    async fn mark_all_read(&self, owner: &Uuid) -> Result<u64, error::SystemError>;

    async fn delete(&self, id: &Uuid, owner: &Uuid) -> Result<bool, error::SystemError>;
}
