//! Byte storage behind a single capability trait.
//!
//! The active backend is chosen once at startup (see `configs::create_storage`)
//! and handed to services as `Arc<dyn Storage>`. Callers never branch on the
//! concrete variant.

use bytes::Bytes;
use futures_util::stream::LocalBoxStream;
use std::{fmt, str::FromStr, time::Duration};
use uuid::Uuid;

pub mod local;
pub mod s3;

pub use local::LocalStorage;
pub use s3::{CloudConfig, S3Storage};

/// Lazy, single-pass sequence of content chunks.
pub type ByteStream = LocalBoxStream<'static, Result<Bytes, StorageError>>;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Operation not supported by the {0} backend")]
    Unsupported(StorageBackend),

    #[error("Content exceeds the limit of {limit} bytes")]
    LimitExceeded { limit: u64 },

    /// The incoming request body broke off or was malformed.
    #[error("Request body error: {0}")]
    Payload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend error: {message}")]
    Backend { message: String, transient: bool },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StorageError {
    pub fn backend(message: impl Into<String>, transient: bool) -> Self {
        Self::Backend { message: message.into(), transient }
    }

    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Backend { transient, .. } => *transient,
            StorageError::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    Cloud,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Local => f.write_str("local"),
            StorageBackend::Cloud => f.write_str("cloud"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "cloud" | "s3" => Ok(StorageBackend::Cloud),
            other => Err(StorageError::Config(format!("unknown storage backend '{other}'"))),
        }
    }
}

/// Opaque handle to stored bytes, `<uuid>` or `<uuid>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Builds a fresh key. Only ASCII alphanumerics of the hint survive, so the
    /// result never carries separators regardless of what the hint contains.
    pub fn generate(extension_hint: &str) -> Self {
        let extension: String = extension_hint
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(16)
            .collect::<String>()
            .to_ascii_lowercase();
        let id = Uuid::now_v7();
        if extension.is_empty() {
            Self(id.to_string())
        } else {
            Self(format!("{id}.{extension}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for StorageKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait::async_trait(?Send)]
pub trait Storage: Send + Sync {
    /// Persists `content` under a freshly generated key. Nothing is visible under
    /// that key until the whole stream has been written.
    async fn save(&self, key_hint: &str, content: ByteStream) -> StorageResult<StorageKey>;

    async fn load(&self, key: &StorageKey) -> StorageResult<ByteStream>;

    /// Deleting a key that does not exist succeeds.
    async fn delete(&self, key: &StorageKey) -> StorageResult<()>;

    /// Time-limited direct link to the object.
    async fn issue_url(&self, key: &StorageKey, ttl: Duration) -> StorageResult<String>;

    fn backend(&self) -> StorageBackend;
}
