use futures_util::{StreamExt, TryStreamExt};
use http::Method;
use object_store::aws::AmazonS3Builder;
use object_store::buffered::BufWriter;
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStore, ObjectStoreExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use super::{ByteStream, Storage, StorageBackend, StorageError, StorageKey, StorageResult};

/// Connection settings for the blob store.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers (e.g. MinIO).
    pub endpoint: Option<String>,
    /// Opaque `access_key_id:secret_access_key`. When absent the usual AWS
    /// environment variables apply.
    pub credentials: Option<String>,
}

/// S3-compatible blob storage.
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<dyn ObjectStore>,
    /// Absent for stores that cannot presign, in which case `issue_url` is unsupported.
    signer: Option<Arc<dyn Signer>>,
    bucket: String,
}

impl S3Storage {
    pub fn new(config: CloudConfig) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(config.region.clone())
            .with_bucket_name(config.bucket.clone());

        if let Some(ref endpoint) = config.endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder.with_endpoint(endpoint.clone()).with_allow_http(allow_http);
        }

        if let Some(ref credentials) = config.credentials {
            let (key_id, secret) = credentials.split_once(':').ok_or_else(|| {
                StorageError::Config(
                    "cloud credentials must look like access_key_id:secret_access_key".to_string(),
                )
            })?;
            builder = builder.with_access_key_id(key_id).with_secret_access_key(secret);
        }

        let store = Arc::new(builder.build().map_err(|e| StorageError::Config(e.to_string()))?);

        tracing::info!(bucket = %config.bucket, region = %config.region, "S3 storage ready");
        Ok(Self { store: store.clone(), signer: Some(store), bucket: config.bucket })
    }

    #[cfg(test)]
    fn with_store(store: Arc<dyn ObjectStore>, bucket: &str) -> Self {
        Self { store, signer: None, bucket: bucket.to_string() }
    }

    fn location(key: &StorageKey) -> Path {
        Path::from(key.as_str())
    }

    async fn write_all(writer: &mut BufWriter, mut content: ByteStream) -> StorageResult<u64> {
        let mut written = 0u64;
        while let Some(chunk) = content.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.shutdown().await?;
        Ok(written)
    }
}

/// Maps provider errors, keeping auth/precondition failures permanent and
/// treating everything unclassified as worth a retry.
fn map_error(key: &StorageKey, err: ObjectStoreError) -> StorageError {
    match err {
        ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
        ObjectStoreError::InvalidPath { .. } => StorageError::InvalidKey(key.to_string()),
        err @ (ObjectStoreError::PermissionDenied { .. }
        | ObjectStoreError::Unauthenticated { .. }
        | ObjectStoreError::Precondition { .. }
        | ObjectStoreError::AlreadyExists { .. }
        | ObjectStoreError::NotSupported { .. }
        | ObjectStoreError::NotImplemented { .. }) => StorageError::backend(err.to_string(), false),
        other => StorageError::backend(other.to_string(), true),
    }
}

#[async_trait::async_trait(?Send)]
impl Storage for S3Storage {
    async fn save(&self, key_hint: &str, content: ByteStream) -> StorageResult<StorageKey> {
        let key = StorageKey::generate(key_hint);
        let start = std::time::Instant::now();

        // Multipart uploads only become visible once completed.
        let mut writer = BufWriter::new(self.store.clone(), Self::location(&key));
        match Self::write_all(&mut writer, content).await {
            Ok(size) => {
                tracing::info!(
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload successful"
                );
                Ok(key)
            }
            Err(err) => {
                if let Err(abort_err) = writer.abort().await {
                    tracing::warn!(key = %key, error = %abort_err, "S3 multipart abort failed");
                }
                tracing::error!(
                    error = %err,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                Err(err)
            }
        }
    }

    async fn load(&self, key: &StorageKey) -> StorageResult<ByteStream> {
        let result = self.store.get(&Self::location(key)).await.map_err(|e| map_error(key, e))?;
        let owned = key.clone();
        Ok(result.into_stream().map_err(move |e| map_error(&owned, e)).boxed_local())
    }

    async fn delete(&self, key: &StorageKey) -> StorageResult<()> {
        match self.store.delete(&Self::location(key)).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {
                tracing::info!(bucket = %self.bucket, key = %key, "S3 delete successful");
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, bucket = %self.bucket, key = %key, "S3 delete failed");
                Err(map_error(key, err))
            }
        }
    }

    async fn issue_url(&self, key: &StorageKey, ttl: Duration) -> StorageResult<String> {
        let Some(signer) = &self.signer else {
            return Err(StorageError::Unsupported(StorageBackend::Cloud));
        };
        let url = signer
            .signed_url(Method::GET, &Self::location(key), ttl)
            .await
            .map_err(|e| map_error(key, e))?;
        Ok(url.to_string())
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Cloud
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures_util::stream;
    use object_store::memory::InMemory;

    fn config(credentials: Option<&str>) -> CloudConfig {
        CloudConfig {
            bucket: "uploads".to_string(),
            region: "us-east-1".to_string(),
            endpoint: Some("http://localhost:9000".to_string()),
            credentials: credentials.map(str::to_string),
        }
    }

    #[test]
    fn malformed_credentials_are_a_config_error() {
        let result = S3Storage::new(config(Some("no-separator")));
        assert!(matches!(result, Err(StorageError::Config(_))));
    }

    fn in_memory() -> (Arc<InMemory>, S3Storage) {
        let store = Arc::new(InMemory::new());
        (store.clone(), S3Storage::with_store(store, "uploads"))
    }

    async fn object_count(store: &InMemory) -> usize {
        store.list(None).try_collect::<Vec<_>>().await.unwrap().len()
    }

    fn source(msg: &str) -> Box<dyn std::error::Error + Send + Sync> {
        Box::new(std::io::Error::other(msg.to_string()))
    }

    #[actix_web::test]
    async fn save_then_load_returns_same_bytes() {
        let (store, storage) = in_memory();
        let items: Vec<Result<Bytes, StorageError>> =
            vec![Ok(Bytes::from_static(b"%PDF-1.7 ")), Ok(Bytes::from_static(b"body"))];

        let key = storage.save("pdf", stream::iter(items).boxed_local()).await.unwrap();
        assert!(key.as_str().ends_with(".pdf"));
        assert_eq!(object_count(&store).await, 1);

        let loaded: Vec<Bytes> = storage.load(&key).await.unwrap().try_collect().await.unwrap();
        assert_eq!(loaded.concat(), b"%PDF-1.7 body");
    }

    #[actix_web::test]
    async fn failed_stream_leaves_no_object_behind() {
        let (store, storage) = in_memory();
        let items: Vec<Result<Bytes, StorageError>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(StorageError::Payload("connection reset".into())),
        ];

        let result = storage.save("txt", stream::iter(items).boxed_local()).await;
        assert!(matches!(result, Err(StorageError::Payload(_))));
        assert_eq!(object_count(&store).await, 0);
    }

    #[actix_web::test]
    async fn load_missing_key_is_not_found() {
        let (_store, storage) = in_memory();
        let result = storage.load(&StorageKey::generate("txt")).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[actix_web::test]
    async fn delete_is_idempotent() {
        let (store, storage) = in_memory();
        let items: Vec<Result<Bytes, StorageError>> = vec![Ok(Bytes::from_static(b"x"))];
        let key = storage.save("txt", stream::iter(items).boxed_local()).await.unwrap();

        storage.delete(&key).await.unwrap();
        storage.delete(&key).await.unwrap();
        storage.delete(&StorageKey::generate("txt")).await.unwrap();
        assert_eq!(object_count(&store).await, 0);
    }

    #[actix_web::test]
    async fn stores_without_signer_cannot_issue_urls() {
        let (_store, storage) = in_memory();
        let result = storage.issue_url(&StorageKey::generate("txt"), Duration::from_secs(60)).await;
        assert!(matches!(result, Err(StorageError::Unsupported(StorageBackend::Cloud))));
    }

    #[test]
    fn provider_errors_are_classified() {
        let key = StorageKey::generate("txt");

        let err = map_error(
            &key,
            ObjectStoreError::NotFound { path: key.to_string(), source: source("missing") },
        );
        assert!(matches!(err, StorageError::NotFound(_)));

        let err = map_error(
            &key,
            ObjectStoreError::PermissionDenied { path: key.to_string(), source: source("denied") },
        );
        assert!(matches!(err, StorageError::Backend { transient: false, .. }));

        let err = map_error(&key, ObjectStoreError::Generic { store: "S3", source: source("503") });
        assert!(err.is_transient());
    }

    #[actix_web::test]
    async fn presigned_urls_carry_expiry() {
        let storage = S3Storage::new(config(Some("minio:minio-secret"))).unwrap();
        let key = StorageKey::from("0191e4a2-7c1d-7000-8000-000000000000.pdf".to_string());

        let url = storage.issue_url(&key, Duration::from_secs(300)).await.unwrap();
        assert!(url.starts_with("http://localhost:9000/uploads/"));
        assert!(url.contains(key.as_str()));
        assert!(url.contains("X-Amz-Expires=300"));
        assert_eq!(storage.backend(), StorageBackend::Cloud);
    }
}
