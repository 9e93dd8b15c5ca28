use futures_util::{StreamExt, TryStreamExt};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use super::{ByteStream, Storage, StorageBackend, StorageError, StorageKey, StorageResult};

/// Objects stored as plain files directly under `root`, one per storage key.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::Config(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;
        tracing::info!(root = %root.display(), "Local storage ready");
        Ok(Self { root })
    }

    fn key_to_path(&self, key: &StorageKey) -> StorageResult<PathBuf> {
        let key = key.as_str();
        if key.is_empty()
            || key.contains("..")
            || key.contains('/')
            || key.contains('\\')
            || key.starts_with('.')
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    async fn write_all(file: &mut File, mut content: ByteStream) -> StorageResult<u64> {
        let mut written = 0u64;
        while let Some(chunk) = content.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

#[async_trait::async_trait(?Send)]
impl Storage for LocalStorage {
    async fn save(&self, key_hint: &str, content: ByteStream) -> StorageResult<StorageKey> {
        let key = StorageKey::generate(key_hint);
        let target = self.key_to_path(&key)?;
        let temp_path = self.root.join(format!(".{}.tmp.{}", key, Uuid::new_v4()));
        let start = std::time::Instant::now();

        let mut file = File::create(&temp_path).await?;
        let written = match Self::write_all(&mut file, content).await {
            Ok(written) => written,
            Err(err) => {
                drop(file);
                let _ = fs::remove_file(&temp_path).await;
                tracing::warn!(key = %key, error = %err, "Local save aborted");
                return Err(err);
            }
        };
        drop(file);

        if let Err(err) = fs::rename(&temp_path, &target).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(err.into());
        }
        if let Err(err) = sync_dir(&self.root).await {
            tracing::warn!(key = %key, error = %err, "Local directory sync failed");
        }

        tracing::info!(
            key = %key,
            size_bytes = written,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local save successful"
        );
        Ok(key)
    }

    async fn load(&self, key: &StorageKey) -> StorageResult<ByteStream> {
        let path = self.key_to_path(key)?;
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(ReaderStream::new(file).map_err(StorageError::from).boxed_local())
    }

    async fn delete(&self, key: &StorageKey) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(key = %key, "Local delete successful");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn issue_url(&self, _key: &StorageKey, _ttl: Duration) -> StorageResult<String> {
        Err(StorageError::Unsupported(StorageBackend::Local))
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

async fn sync_dir(path: &Path) -> io::Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let dir = std::fs::File::open(path)?;
        dir.sync_all()
    })
    .await
    .map_err(|err| io::Error::other(err.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures_util::stream;

    fn chunks(parts: &[&'static [u8]]) -> ByteStream {
        let items: Vec<Result<Bytes, StorageError>> =
            parts.iter().map(|p| Ok(Bytes::from_static(p))).collect();
        stream::iter(items).boxed_local()
    }

    async fn collect(content: ByteStream) -> Vec<u8> {
        content
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .unwrap()
    }

    fn entries(root: &Path) -> usize {
        std::fs::read_dir(root).unwrap().count()
    }

    #[actix_web::test]
    async fn save_then_load_returns_same_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let key = storage.save("txt", chunks(&[b"hello ", b"world"])).await.unwrap();
        assert!(key.as_str().ends_with(".txt"));
        assert!(dir.path().join(key.as_str()).exists());

        let loaded = collect(storage.load(&key).await.unwrap()).await;
        assert_eq!(loaded, b"hello world");
        assert_eq!(entries(dir.path()), 1);
    }

    #[actix_web::test]
    async fn failed_stream_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let items: Vec<Result<Bytes, StorageError>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(StorageError::LimitExceeded { limit: 7 }),
        ];
        let result = storage.save("bin", stream::iter(items).boxed_local()).await;

        assert!(matches!(result, Err(StorageError::LimitExceeded { limit: 7 })));
        assert_eq!(entries(dir.path()), 0);
    }

    #[actix_web::test]
    async fn load_missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.load(&StorageKey::generate("pdf")).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[actix_web::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let key = storage.save("txt", chunks(&[b"x"])).await.unwrap();
        storage.delete(&key).await.unwrap();
        storage.delete(&key).await.unwrap();
        assert_eq!(entries(dir.path()), 0);
    }

    #[actix_web::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        for raw in ["../outside.txt", "nested/file.txt", "", ".hidden"] {
            let key = StorageKey::from(raw.to_string());
            assert!(matches!(storage.load(&key).await, Err(StorageError::InvalidKey(_))));
            assert!(matches!(storage.delete(&key).await, Err(StorageError::InvalidKey(_))));
        }
    }

    #[actix_web::test]
    async fn signed_urls_are_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.issue_url(&StorageKey::generate("txt"), Duration::from_secs(60)).await;
        assert!(matches!(result, Err(StorageError::Unsupported(StorageBackend::Local))));
    }
}
