use uuid::Uuid;

use crate::{
    api::error,
    modules::notification::{
        model::InsertNotification, repository::NotificationRepository,
        schema::NotificationEntity,
    },
};

#[derive(Clone)]
pub struct NotificationRepositoryPg {
    pool: sqlx::PgPool,
}

impl NotificationRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl NotificationRepository for NotificationRepositoryPg {
    async fn create(
        &self,
        notification: &InsertNotification,
    ) -> Result<NotificationEntity, error::SystemError> {
        let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let entity = sqlx::query_as::<_, NotificationEntity>(
            r#"
            INSERT INTO user_notifications
                (id, user_id, type, title, message, icon, link, reference_type, reference_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(notification.user_id)
        .bind(&notification._type)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.icon)
        .bind(&notification.link)
        .bind(&notification.reference_type)
        .bind(notification.reference_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(entity)
    }

    async fn find_by_owner(
        &self,
        owner: &Uuid,
        unread_only: bool,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<NotificationEntity>, error::SystemError> {
        let rows = sqlx::query_as::<_, NotificationEntity>(
            r#"
            SELECT * FROM user_notifications
            WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
            ORDER BY created_at DESC
            OFFSET $3
            LIMIT $4
            "#,
        )
        .bind(owner)
        .bind(unread_only)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self, owner: &Uuid, unread_only: bool) -> Result<i64, error::SystemError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_notifications WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)",
        )
        .bind(owner)
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn mark_read(
        &self,
        id: &Uuid,
        owner: &Uuid,
    ) -> Result<Option<NotificationEntity>, error::SystemError> {
        let row = sqlx::query_as::<_, NotificationEntity>(
            r#"
            UPDATE user_notifications
            SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn mark_all_read(&self, owner: &Uuid) -> Result<u64, error::SystemError> {
        let rows = sqlx::query(
            "UPDATE user_notifications SET is_read = TRUE, read_at = NOW() WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(owner)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows)
    }

    async fn delete(&self, id: &Uuid, owner: &Uuid) -> Result<bool, error::SystemError> {
        let rows = sqlx::query("DELETE FROM user_notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows > 0)
    }
}
