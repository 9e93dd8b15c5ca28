use crate::storage::StorageBackend;

pub struct Env {
    pub jwt_secret: String,
    pub database_url: String,
    pub frontend_url: String,
    pub ip: String,
    pub port: u16,
    pub storage_backend: StorageBackend,
    pub upload_dir: String,
    pub max_upload_size: u64,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    pub max_list_limit: u32,
    pub cloud_bucket: Option<String>,
    pub cloud_region: String,
    pub cloud_endpoint: Option<String>,
    pub cloud_credentials: Option<String>,
}

fn list_var(name: &str, default: &str) -> Vec<String> {
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

impl Env {
    fn new() -> Self {
        let jwt_secret = std::env::var("SECRET_KEY")
            .expect("SECRET_KEY must be set in .env file or environment variable");

        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set in .env file or environment variable");

        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let ip = std::env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .expect("PORT must be a valid u16 integer");

        let storage_backend = std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .parse::<StorageBackend>()
            .expect("STORAGE_BACKEND must be 'local' or 'cloud'");
        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string());
        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .unwrap_or_else(|_| (10 * 1024 * 1024).to_string())
            .parse::<u64>()
            .expect("MAX_UPLOAD_SIZE must be a valid u64 integer");
        let allowed_extensions =
            list_var("ALLOWED_EXTENSIONS", "jpg,jpeg,png,gif,webp,pdf,txt");
        let allowed_content_types = list_var(
            "ALLOWED_CONTENT_TYPES",
            "image/jpeg,image/png,image/gif,image/webp,application/pdf,text/plain",
        );
        let max_list_limit = std::env::var("MAX_LIST_LIMIT")
            .unwrap_or_else(|_| "1000".to_string())
            .parse::<u32>()
            .expect("MAX_LIST_LIMIT must be a valid u32 integer");

        let cloud_bucket = std::env::var("CLOUD_BUCKET").ok();
        let cloud_region = std::env::var("CLOUD_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let cloud_endpoint = std::env::var("CLOUD_ENDPOINT").ok();
        let cloud_credentials = std::env::var("CLOUD_CREDENTIALS").ok();

        Env {
            jwt_secret,
            database_url,
            frontend_url,
            ip,
            port,
            storage_backend,
            upload_dir,
            max_upload_size,
            allowed_extensions,
            allowed_content_types,
            max_list_limit,
            cloud_bucket,
            cloud_region,
            cloud_endpoint,
            cloud_credentials,
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
