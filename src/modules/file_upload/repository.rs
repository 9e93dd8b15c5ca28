use uuid::Uuid;

use crate::{
    api::error,
    modules::file_upload::{model::NewFile, schema::FileEntity},
};

#[async_trait::async_trait]
pub trait FileRepository {
    async fn create(&self, file: &NewFile) -> Result<FileEntity, error::SystemError>;

    async fn find_by_id(&self, file_id: &Uuid) -> Result<Option<FileEntity>, error::SystemError>;

    /// Newest first. `owner` matches by equality, `None` selecting anonymous files.
    async fn find_by_owner(
        &self,
        owner: Option<Uuid>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<FileEntity>, error::SystemError>;

    async fn count_by_owner(&self, owner: Option<Uuid>) -> Result<i64, error::SystemError>;

    /// Returns whether a row was removed.
    async fn delete(&self, file_id: &Uuid) -> Result<bool, error::SystemError>;
}
