use bytes::{Bytes, BytesMut};
use futures_util::{future, stream, StreamExt};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::api::error;
use crate::modules::file_upload::{
    model::{FileDownload, NewFile, UploadConfig},
    repository::FileRepository,
    sanitizer::sanitize,
    schema::FileEntity,
    validator::{extension_of, normalize_content_type, FileValidator, ValidationError},
};
use crate::storage::{ByteStream, Storage, StorageError, StorageKey};

/// Bytes read up front for validation before anything is written.
pub const VALIDATION_SAMPLE_LEN: usize = 8 * 1024;
/// Allowed gap between declared and received size.
pub const SIZE_TOLERANCE: u64 = 512;

/// Progress of a single upload; failures are logged with the last stage reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Received,
    Validated,
    Stored,
    Recorded,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadStage::Received => "received",
            UploadStage::Validated => "validated",
            UploadStage::Stored => "stored",
            UploadStage::Recorded => "recorded",
        };
        f.write_str(name)
    }
}

pub struct FileUploadService<R>
where
    R: FileRepository + Send + Sync,
{
    file_repo: Arc<R>,
    storage: Arc<dyn Storage>,
    validator: FileValidator,
    config: UploadConfig,
}

impl<R> FileUploadService<R>
where
    R: FileRepository + Send + Sync,
{
    pub fn new(file_repo: Arc<R>, storage: Arc<dyn Storage>, config: UploadConfig) -> Self {
        log::info!(
            "FileUploadService initialized with {} storage, max size {} bytes",
            storage.backend(),
            config.max_file_size
        );
        Self { file_repo, storage, validator: FileValidator::from_config(&config), config }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Validates, stores and records one upload.
    ///
    /// Flow:
    /// 1. Read a bounded prefix and validate name, type and size
    /// 2. Stream prefix + remainder to storage, aborting past the size limit
    /// 3. Reconcile declared and received size
    /// 4. Insert the metadata record
    ///
    /// Stored bytes are deleted again if a later step fails.
    pub async fn upload(
        &self,
        mut content: ByteStream,
        declared_name: &str,
        declared_content_type: &str,
        declared_size: Option<u64>,
        owner: Option<Uuid>,
    ) -> Result<FileEntity, error::SystemError> {
        let content_type = normalize_content_type(declared_content_type);

        let stage = UploadStage::Received;
        let prefix = read_prefix(&mut content, VALIDATION_SAMPLE_LEN).await?;
        let size_hint = declared_size.unwrap_or(prefix.len() as u64);
        if let Err(err) = self.validator.validate(declared_name, &content_type, size_hint, &prefix)
        {
            log::info!(
                "Upload of '{}' rejected at stage {} ({}): {}",
                declared_name,
                stage,
                err.rule(),
                err
            );
            return Err(err.into());
        }
        let stage = UploadStage::Validated;

        let extension = extension_of(declared_name).unwrap_or_default();
        let received = Rc::new(Cell::new(0u64));
        let body = count_bytes(
            stream::once(future::ready(Ok(prefix))).chain(content).boxed_local(),
            self.config.max_file_size,
            received.clone(),
        );

        let key = match self.storage.save(&extension, body).await {
            Ok(key) => key,
            Err(StorageError::LimitExceeded { limit }) => {
                log::info!("Upload of '{}' exceeded {} bytes while streaming", declared_name, limit);
                return Err(ValidationError::TooLarge { size: received.get(), max: limit }.into());
            }
            Err(err @ StorageError::Payload(_)) => {
                log::info!("Upload of '{}' aborted by the client: {}", declared_name, err);
                return Err(err.into());
            }
            Err(err) => {
                log::error!("Upload of '{}' failed after stage {}: {}", declared_name, stage, err);
                return Err(err.into());
            }
        };
        let stage = UploadStage::Stored;
        let actual = received.get();

        if let Some(declared) = declared_size {
            if declared.abs_diff(actual) > SIZE_TOLERANCE {
                self.discard(&key, stage).await?;
                return Err(ValidationError::SizeMismatch { declared, actual }.into());
            }
        }

        let new_file = NewFile {
            original_filename: declared_name.to_string(),
            display_name: sanitize(declared_name),
            content_type,
            size: actual as i64,
            storage_key: key.as_str().to_string(),
            owner_id: owner,
        };

        match self.file_repo.create(&new_file).await {
            Ok(entity) => {
                log::info!(
                    "File {} stored as {} ({} bytes, stage {})",
                    entity.id,
                    key,
                    actual,
                    UploadStage::Recorded
                );
                Ok(entity)
            }
            Err(err) => {
                log::error!("Recording upload {} failed after stage {}: {}", key, stage, err);
                self.discard(&key, stage).await?;
                Err(err)
            }
        }
    }

    /// Get file metadata by ID
    pub async fn get_file(
        &self,
        file_id: &Uuid,
        requester: Option<Uuid>,
    ) -> Result<FileEntity, error::SystemError> {
        let file = self.file_repo.find_by_id(file_id).await?;
        visible_to(file, requester)
    }

    pub async fn download(
        &self,
        file_id: &Uuid,
        requester: Option<Uuid>,
    ) -> Result<FileDownload, error::SystemError> {
        let file = self.get_file(file_id, requester).await?;
        let key = StorageKey::from(file.storage_key);

        let content = self.storage.load(&key).await.map_err(|err| {
            if matches!(err, StorageError::NotFound(_)) {
                log::warn!("File {} has a record but no stored object {}", file.id, key);
            }
            err
        })?;

        Ok(FileDownload {
            content,
            filename: file.display_name,
            content_type: file.content_type,
            size: file.size,
        })
    }

    pub async fn issue_url(
        &self,
        file_id: &Uuid,
        ttl: Duration,
        requester: Option<Uuid>,
    ) -> Result<String, error::SystemError> {
        let file = self.get_file(file_id, requester).await?;
        let url = self.storage.issue_url(&StorageKey::from(file.storage_key), ttl).await?;
        Ok(url)
    }

    /// Removes the stored object, then the record. A storage failure leaves the
    /// record in place.
    pub async fn delete(
        &self,
        file_id: &Uuid,
        requester: Option<Uuid>,
    ) -> Result<(), error::SystemError> {
        let file = self.get_file(file_id, requester).await?;
        let key = StorageKey::from(file.storage_key);

        self.storage.delete(&key).await?;

        match self.file_repo.delete(file_id).await {
            Ok(true) => {
                log::info!("File {} deleted", file_id);
                Ok(())
            }
            // Raced with another delete of the same id.
            Ok(false) => Err(error::SystemError::not_found("File not found")),
            Err(err) => {
                log::error!(
                    "Stored object {} of file {} was deleted but its record remains: {}",
                    key,
                    file_id,
                    err
                );
                Err(error::SystemError::consistency(format!(
                    "record {file_id} references deleted object {key}"
                )))
            }
        }
    }

    /// Newest first, with `limit` clamped to the configured maximum.
    pub async fn list(
        &self,
        owner: Option<Uuid>,
        skip: u64,
        limit: u32,
    ) -> Result<(Vec<FileEntity>, i64), error::SystemError> {
        let limit = self.effective_limit(limit);
        let skip = i64::try_from(skip).unwrap_or(i64::MAX);
        let files = self.file_repo.find_by_owner(owner, skip, limit as i64).await?;
        let total = self.file_repo.count_by_owner(owner).await?;
        Ok((files, total))
    }

    pub fn effective_limit(&self, requested: u32) -> u32 {
        requested.clamp(1, self.config.max_list_limit.max(1))
    }

    /// Compensating delete for bytes that will never get a record.
    async fn discard(&self, key: &StorageKey, stage: UploadStage) -> Result<(), error::SystemError> {
        match self.storage.delete(key).await {
            Ok(()) => {
                log::info!("Rolled back stored object {} (stage {})", key, stage);
                Ok(())
            }
            Err(err) => {
                log::error!("ORPHANED storage object {} after failed rollback: {}", key, err);
                Err(error::SystemError::consistency(format!(
                    "orphaned storage object {key}: {err}"
                )))
            }
        }
    }
}

/// Hides files owned by someone else behind the same answer as a missing id.
fn visible_to(
    file: Option<FileEntity>,
    requester: Option<Uuid>,
) -> Result<FileEntity, error::SystemError> {
    match file {
        Some(file) if file.owner_id.is_none() || file.owner_id == requester => Ok(file),
        _ => Err(error::SystemError::not_found("File not found")),
    }
}

async fn read_prefix(content: &mut ByteStream, want: usize) -> Result<Bytes, StorageError> {
    let mut buf = BytesMut::new();
    while buf.len() < want {
        match content.next().await {
            Some(chunk) => buf.extend_from_slice(&chunk?),
            None => break,
        }
    }
    Ok(buf.freeze())
}

/// Tallies bytes into `received` and fails the stream once `limit` is passed.
fn count_bytes(content: ByteStream, limit: u64, received: Rc<Cell<u64>>) -> ByteStream {
    content
        .map(move |chunk| {
            let chunk = chunk?;
            let total = received.get() + chunk.len() as u64;
            received.set(total);
            if total > limit {
                return Err(StorageError::LimitExceeded { limit });
            }
            Ok(chunk)
        })
        .boxed_local()
}
