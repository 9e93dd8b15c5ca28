//! In-memory doubles and helpers shared by unit tests.

use bytes::Bytes;
use chrono::Utc;
use futures_util::{stream, StreamExt, TryStreamExt};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::api::error;
use crate::modules::file_upload::{model::NewFile, repository::FileRepository, schema::FileEntity};
use crate::modules::notification::{
    model::InsertNotification, repository::NotificationRepository, schema::NotificationEntity,
};
use crate::storage::{
    ByteStream, LocalStorage, Storage, StorageBackend, StorageError, StorageKey, StorageResult,
};

pub fn body_stream(content: &'static [u8]) -> ByteStream {
    stream::once(async move { Ok(Bytes::from_static(content)) }).boxed_local()
}

pub fn chunked_stream(content: &[u8], chunk_size: usize) -> ByteStream {
    let chunks: Vec<Result<Bytes, StorageError>> =
        content.chunks(chunk_size).map(|c| Ok(Bytes::copy_from_slice(c))).collect();
    stream::iter(chunks).boxed_local()
}

pub async fn collect(content: ByteStream) -> Vec<u8> {
    content
        .try_fold(Vec::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(&chunk);
            Ok(acc)
        })
        .await
        .expect("stream failed")
}

/// Entries in a storage root, temp files included.
pub fn stored_objects(root: &Path) -> usize {
    std::fs::read_dir(root).map(|entries| entries.count()).unwrap_or(0)
}

#[derive(Default)]
pub struct MockFileRepository {
    files: Mutex<Vec<FileEntity>>,
    fail_create: AtomicBool,
    fail_delete: AtomicBool,
    last_limit: Mutex<Option<i64>>,
}

impl MockFileRepository {
    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn last_limit(&self) -> Option<i64> {
        *self.last_limit.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl FileRepository for MockFileRepository {
    async fn create(&self, file: &NewFile) -> Result<FileEntity, error::SystemError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(error::SystemError::DatabaseError("insert failed".into()));
        }
        let entity = FileEntity {
            id: Uuid::now_v7(),
            original_filename: file.original_filename.clone(),
            display_name: file.display_name.clone(),
            size: file.size,
            content_type: file.content_type.clone(),
            storage_key: file.storage_key.clone(),
            owner_id: file.owner_id,
            created_at: Utc::now(),
        };
        self.files.lock().unwrap().push(entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, file_id: &Uuid) -> Result<Option<FileEntity>, error::SystemError> {
        Ok(self.files.lock().unwrap().iter().find(|f| f.id == *file_id).cloned())
    }

    async fn find_by_owner(
        &self,
        owner: Option<Uuid>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<FileEntity>, error::SystemError> {
        *self.last_limit.lock().unwrap() = Some(limit);
        let mut files: Vec<FileEntity> =
            self.files.lock().unwrap().iter().rev().filter(|f| f.owner_id == owner).cloned().collect();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files.into_iter().skip(skip as usize).take(limit as usize).collect())
    }

    async fn count_by_owner(&self, owner: Option<Uuid>) -> Result<i64, error::SystemError> {
        Ok(self.files.lock().unwrap().iter().filter(|f| f.owner_id == owner).count() as i64)
    }

    async fn delete(&self, file_id: &Uuid) -> Result<bool, error::SystemError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(error::SystemError::DatabaseError("delete failed".into()));
        }
        let mut files = self.files.lock().unwrap();
        let before = files.len();
        files.retain(|f| f.id != *file_id);
        Ok(files.len() < before)
    }
}

/// Local storage that counts saves and can be told to fail deletes.
pub struct FlakyStorage {
    inner: LocalStorage,
    saves: AtomicUsize,
    fail_delete: AtomicBool,
}

impl FlakyStorage {
    pub fn new(inner: LocalStorage) -> Self {
        Self { inner, saves: AtomicUsize::new(0), fail_delete: AtomicBool::new(false) }
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait(?Send)]
impl Storage for FlakyStorage {
    async fn save(&self, key_hint: &str, content: ByteStream) -> StorageResult<StorageKey> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(key_hint, content).await
    }

    async fn load(&self, key: &StorageKey) -> StorageResult<ByteStream> {
        self.inner.load(key).await
    }

    async fn delete(&self, key: &StorageKey) -> StorageResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::backend("delete refused", false));
        }
        self.inner.delete(key).await
    }

    async fn issue_url(&self, key: &StorageKey, ttl: Duration) -> StorageResult<String> {
        self.inner.issue_url(key, ttl).await
    }

    fn backend(&self) -> StorageBackend {
        self.inner.backend()
    }
}

#[derive(Default)]
pub struct MockNotificationRepository {
    rows: Mutex<Vec<NotificationEntity>>,
}

impl MockNotificationRepository {
    fn visible(row: &NotificationEntity, owner: &Uuid, unread_only: bool) -> bool {
        row.user_id == *owner && (!unread_only || !row.is_read)
    }
}

#[async_trait::async_trait]
impl NotificationRepository for MockNotificationRepository {
    async fn create(
        &self,
        notification: &InsertNotification,
    ) -> Result<NotificationEntity, error::SystemError> {
        let entity = NotificationEntity {
            id: Uuid::now_v7(),
            user_id: notification.user_id,
            _type: notification._type.clone(),
            title: notification.title.clone(),
            message: notification.message.clone(),
            icon: notification.icon.clone(),
            link: notification.link.clone(),
            reference_type: notification.reference_type.clone(),
            reference_id: notification.reference_id,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(entity.clone());
        Ok(entity)
    }

    async fn find_by_owner(
        &self,
        owner: &Uuid,
        unread_only: bool,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<NotificationEntity>, error::SystemError> {
        let mut rows: Vec<NotificationEntity> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| Self::visible(r, owner, unread_only))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows.into_iter().skip(skip as usize).take(limit as usize).collect())
    }

    async fn count(&self, owner: &Uuid, unread_only: bool) -> Result<i64, error::SystemError> {
        Ok(self.rows.lock().unwrap().iter().filter(|r| Self::visible(r, owner, unread_only)).count()
            as i64)
    }

    async fn mark_read(
        &self,
        id: &Uuid,
        owner: &Uuid,
    ) -> Result<Option<NotificationEntity>, error::SystemError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|r| r.id == *id && r.user_id == *owner) else {
            return Ok(None);
        };
        if !row.is_read {
            row.is_read = true;
            row.read_at = Some(Utc::now());
        }
        Ok(Some(row.clone()))
    }

    async fn mark_all_read(&self, owner: &Uuid) -> Result<u64, error::SystemError> {
        let mut rows = self.rows.lock().unwrap();
        let mut updated = 0;
        for row in rows.iter_mut().filter(|r| r.user_id == *owner && !r.is_read) {
            row.is_read = true;
            row.read_at = Some(Utc::now());
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete(&self, id: &Uuid, owner: &Uuid) -> Result<bool, error::SystemError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| !(r.id == *id && r.user_id == *owner));
        Ok(rows.len() < before)
    }
}

/// Single-part `multipart/form-data` body and its content type header value.
pub fn multipart_body(filename: &str, content_type: &str, content: &[u8]) -> (Vec<u8>, String) {
    let boundary = "----test-boundary-7MA4YWxkTrZu0gW";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (body, format!("multipart/form-data; boundary={boundary}"))
}
