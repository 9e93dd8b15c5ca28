use actix_cors::Cors;
use actix_web::{
    self, App, HttpServer,
    middleware::{Logger, from_fn},
    web,
};
use std::sync::{Arc, LazyLock};

use crate::{
    configs::{connect_database, create_storage, upload_config},
    middlewares::{authentication, identify},
    modules::{
        file_upload::{FilePgRepository, FileUploadService},
        notification::{repository_pg::NotificationRepositoryPg, service::NotificationService},
    },
    utils::JwtSecret,
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
mod storage;
#[cfg(test)]
mod test;
mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    env_logger::init();
    if tracing::subscriber::set_global_default(tracing_subscriber::fmt().finish()).is_err() {
        log::warn!("Tracing subscriber already installed");
    }
    log::info!("Environment variables loaded from .env file");
    constants::Env::default()
});

#[actix_web::get("/")]
async fn health_check(db_pool: web::Data<sqlx::PgPool>) -> &'static str {
    match sqlx::query("SELECT 1").execute(db_pool.get_ref()).await {
        Ok(_) => "Server is running",
        Err(err) => {
            log::warn!("Health check database ping failed: {}", err);
            "Server is running, database unavailable"
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let db_pool = connect_database(&ENV)
        .await
        .map_err(|_| std::io::Error::other("Database connection error"))?;

    let storage = create_storage(&ENV)
        .await
        .map_err(|e| std::io::Error::other(format!("Storage initialization error: {e}")))?;

    let file_service = web::Data::new(FileUploadService::new(
        Arc::new(FilePgRepository::new(db_pool.clone())),
        storage,
        upload_config(&ENV),
    ));
    let notification_service = web::Data::new(NotificationService::with_dependencies(Arc::new(
        NotificationRepositoryPg::new(db_pool.clone()),
    )));
    let jwt_secret = web::Data::new(JwtSecret::new(ENV.jwt_secret.clone()));

    println!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(ENV.frontend_url.as_str())
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(file_service.clone())
            .app_data(notification_service.clone())
            .app_data(jwt_secret.clone())
            .app_data(web::Data::new(db_pool.clone()))
            .service(health_check)
            .service(
                web::scope("/api")
                    .service(
                        web::scope("/files")
                            .wrap(from_fn(identify))
                            .configure(modules::file_upload::route::configure::<FilePgRepository>),
                    )
                    .service(
                        web::scope("/notifications")
                            .wrap(from_fn(authentication))
                            .configure(modules::notification::route::configure),
                    ),
            )
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .workers(2)
    .run()
    .await
}
