use uuid::Uuid;

use crate::{
    api::error,
    modules::file_upload::{model::NewFile, repository::FileRepository, schema::FileEntity},
};

#[derive(Clone)]
pub struct FilePgRepository {
    pool: sqlx::PgPool,
}

impl FilePgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FileRepository for FilePgRepository {
    async fn create(&self, file: &NewFile) -> Result<FileEntity, error::SystemError> {
        let id = Uuid::now_v7();
        // Dropping the transaction on an early return rolls it back.
        let mut tx = self.pool.begin().await?;

        let entity = sqlx::query_as::<_, FileEntity>(
            r#"
            INSERT INTO files (id, original_filename, display_name, size, content_type, storage_key, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&file.original_filename)
        .bind(&file.display_name)
        .bind(file.size)
        .bind(&file.content_type)
        .bind(&file.storage_key)
        .bind(file.owner_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(entity)
    }

    async fn find_by_id(&self, file_id: &Uuid) -> Result<Option<FileEntity>, error::SystemError> {
        let file = sqlx::query_as::<_, FileEntity>(
            r#"
            SELECT * FROM files WHERE id = $1
            "#,
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(file)
    }

    async fn find_by_owner(
        &self,
        owner: Option<Uuid>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<FileEntity>, error::SystemError> {
        // has index on (owner_id, created_at DESC)
        let files = sqlx::query_as::<_, FileEntity>(
            r#"
            SELECT * FROM files
            WHERE owner_id IS NOT DISTINCT FROM $1
            ORDER BY created_at DESC, id DESC
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(owner)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(files)
    }

    async fn count_by_owner(&self, owner: Option<Uuid>) -> Result<i64, error::SystemError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE owner_id IS NOT DISTINCT FROM $1")
                .bind(owner)
                .fetch_one(&self.pool)
                .await?;

        Ok(total)
    }

    async fn delete(&self, file_id: &Uuid) -> Result<bool, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            r#"
            DELETE FROM files WHERE id = $1
            "#,
        )
        .bind(file_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok(rows > 0)
    }
}
