use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::notification::model::{InsertNotification, NotificationReference};
use crate::modules::notification::repository::NotificationRepository;
use crate::modules::notification::schema::NotificationEntity;

#[derive(Clone)]
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository + Send + Sync>,
}

impl NotificationService {
    pub fn with_dependencies(repo: Arc<dyn NotificationRepository + Send + Sync>) -> Self {
        info!("NotificationService initialized with dependencies");
        NotificationService { repo }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_notification(
        &self,
        owner: Uuid,
        _type: String,
        title: String,
        message: Option<String>,
        icon: Option<String>,
        link: Option<String>,
        reference: Option<NotificationReference>,
    ) -> Result<NotificationEntity, error::SystemError> {
        let (reference_type, reference_id) = match reference {
            Some(r) => (Some(r.reference_type), Some(r.reference_id)),
            None => (None, None),
        };

        let notification = self
            .repo
            .create(&InsertNotification {
                user_id: owner,
                _type,
                title,
                message,
                icon,
                link,
                reference_type,
                reference_id,
            })
            .await?;

        info!("Notification {} created for user {}", notification.id, owner);
        Ok(notification)
    }

    pub async fn list(
        &self,
        owner: Uuid,
        unread_only: bool,
        skip: u64,
        limit: u32,
    ) -> Result<(Vec<NotificationEntity>, i64), error::SystemError> {
        let skip = i64::try_from(skip).unwrap_or(i64::MAX);
        let rows = self.repo.find_by_owner(&owner, unread_only, skip, limit as i64).await?;
        let total = self.repo.count(&owner, unread_only).await?;
        Ok((rows, total))
    }

    pub async fn count_unread(&self, owner: Uuid) -> Result<i64, error::SystemError> {
        self.repo.count(&owner, true).await
    }

    pub async fn mark_read(
        &self,
        id: Uuid,
        owner: Uuid,
    ) -> Result<NotificationEntity, error::SystemError> {
        self.repo
            .mark_read(&id, &owner)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Notification not found"))
    }

    pub async fn mark_all_read(&self, owner: Uuid) -> Result<u64, error::SystemError> {
        let updated = self.repo.mark_all_read(&owner).await?;
        info!("Marked {} notifications read for user {}", updated, owner);
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid, owner: Uuid) -> Result<(), error::SystemError> {
        if !self.repo.delete(&id, &owner).await? {
            return Err(error::SystemError::not_found("Notification not found"));
        }
        Ok(())
    }
}
