use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;

use crate::{
    api::error,
    constants::Env,
    modules::file_upload::model::UploadConfig,
    storage::{CloudConfig, LocalStorage, S3Storage, Storage, StorageBackend, StorageError},
};

pub async fn connect_database(env: &Env) -> Result<PgPool, error::SystemError> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_slow_threshold(std::time::Duration::from_secs(3))
        .connect(&env.database_url)
        .await?;
    Ok(pool)
}

/// Builds the one storage backend this process will use.
pub async fn create_storage(env: &Env) -> Result<Arc<dyn Storage>, StorageError> {
    match env.storage_backend {
        StorageBackend::Local => {
            let storage = LocalStorage::new(&env.upload_dir).await?;
            Ok(Arc::new(storage))
        }
        StorageBackend::Cloud => {
            let bucket = env.cloud_bucket.clone().ok_or_else(|| {
                StorageError::Config("CLOUD_BUCKET not configured".to_string())
            })?;
            let storage = S3Storage::new(CloudConfig {
                bucket,
                region: env.cloud_region.clone(),
                endpoint: env.cloud_endpoint.clone(),
                credentials: env.cloud_credentials.clone(),
            })?;
            Ok(Arc::new(storage))
        }
    }
}

pub fn upload_config(env: &Env) -> UploadConfig {
    UploadConfig {
        max_file_size: env.max_upload_size,
        allowed_extensions: env.allowed_extensions.clone(),
        allowed_content_types: env.allowed_content_types.clone(),
        max_list_limit: env.max_list_limit,
    }
}
