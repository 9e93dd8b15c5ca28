use actix_web::web;

use crate::modules::file_upload::handle::*;
use crate::modules::file_upload::repository::FileRepository;

pub fn configure<R>(cfg: &mut web::ServiceConfig)
where
    R: FileRepository + Send + Sync + 'static,
{
    cfg.service(web::resource("/upload").route(web::post().to(upload_file::<R>)))
        .service(web::resource("/upload/chunked").route(web::post().to(upload_file_chunked::<R>)))
        .service(web::resource("/list").route(web::get().to(list_files::<R>)))
        .service(
            web::resource("/download/{file_id:[0-9a-fA-F-]{36}}")
                .route(web::get().to(download_file::<R>)),
        )
        .service(
            web::resource("/{file_id:[0-9a-fA-F-]{36}}/url").route(web::get().to(get_file_url::<R>)),
        )
        .service(
            web::resource("/{file_id:[0-9a-fA-F-]{36}}")
                .route(web::get().to(get_file::<R>))
                .route(web::delete().to(delete_file::<R>)),
        );
}
