use actix_multipart::{Field, Multipart};
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse};
use bytes::BytesMut;
use futures_util::{stream, StreamExt, TryStreamExt};
use std::time::Duration;
use uuid::Uuid;

use crate::api::success::Success;
use crate::api::{error, success};
use crate::middlewares::get_owner;
use crate::modules::file_upload::model::{
    ChunkedUploadQuery, DeleteFileResponse, FileListResponse, FileResponse, FileUploadResponse,
    ListFilesQuery, SignedUrlQuery, SignedUrlResponse,
};
use crate::modules::file_upload::repository::FileRepository;
use crate::modules::file_upload::service::FileUploadService;
use crate::storage::StorageError;
use crate::utils::ValidatedQuery;

/// First multipart field carrying a filename, with its declared content type.
async fn next_file_field(payload: &mut Multipart) -> Result<(Field, String, String), error::Error> {
    while let Some(field) = payload.try_next().await.map_err(|e| error::Error::bad_request(e.to_string()))? {
        let Some(filename) = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(|name| name.to_string())
        else {
            continue;
        };

        // Detect MIME type
        let content_type = field
            .content_type()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        return Ok((field, filename, content_type));
    }

    Err(error::Error::bad_request("No file found in request"))
}

/// Upload file handler, buffering the file before handing it over.
pub async fn upload_file<R>(
    mut payload: Multipart,
    req: HttpRequest,
    service: web::Data<FileUploadService<R>>,
) -> Result<success::Success<FileUploadResponse>, error::Error>
where
    R: FileRepository + Send + Sync + 'static,
{
    let owner = get_owner(&req);
    let (mut field, filename, content_type) = next_file_field(&mut payload).await?;

    // Stop buffering one byte past the limit; the service rejects the rest.
    let cap = service.config().max_file_size as usize + 1;
    let mut bytes = BytesMut::new();
    while let Some(chunk) = field.try_next().await.map_err(|e| error::Error::bad_request(e.to_string()))? {
        let room = cap.saturating_sub(bytes.len());
        bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if bytes.len() >= cap {
            break;
        }
    }

    let size = bytes.len() as u64;
    let content = stream::once(async move { Ok(bytes.freeze()) }).boxed_local();
    let record = service.upload(content, &filename, &content_type, Some(size), owner).await?;

    Ok(Success::created(Some(record.into())).message("File uploaded successfully"))
}

/// Upload file handler streaming the multipart body straight into storage.
pub async fn upload_file_chunked<R>(
    mut payload: Multipart,
    query: ValidatedQuery<ChunkedUploadQuery>,
    req: HttpRequest,
    service: web::Data<FileUploadService<R>>,
) -> Result<success::Success<FileUploadResponse>, error::Error>
where
    R: FileRepository + Send + Sync + 'static,
{
    let owner = get_owner(&req);
    let (field, filename, content_type) = next_file_field(&mut payload).await?;

    let content = field.map_err(|e| StorageError::Payload(e.to_string())).boxed_local();
    let record = service.upload(content, &filename, &content_type, query.0.size, owner).await?;

    Ok(Success::created(Some(record.into())).message("File uploaded successfully"))
}

/// Download handler, streaming the stored bytes as an attachment.
pub async fn download_file<R>(
    file_id: web::Path<Uuid>,
    req: HttpRequest,
    service: web::Data<FileUploadService<R>>,
) -> Result<HttpResponse, error::Error>
where
    R: FileRepository + Send + Sync + 'static,
{
    let download = service.download(&file_id.into_inner(), get_owner(&req)).await?;

    Ok(HttpResponse::Ok()
        .content_type(download.content_type)
        .no_chunking(download.size.max(0) as u64)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(download.filename)],
        })
        .streaming(download.content))
}

/// Get file metadata handler
pub async fn get_file<R>(
    file_id: web::Path<Uuid>,
    req: HttpRequest,
    service: web::Data<FileUploadService<R>>,
) -> Result<success::Success<FileResponse>, error::Error>
where
    R: FileRepository + Send + Sync + 'static,
{
    let file = service.get_file(&file_id.into_inner(), get_owner(&req)).await?;
    Ok(Success::ok(Some(file.into())))
}

pub async fn get_file_url<R>(
    file_id: web::Path<Uuid>,
    query: ValidatedQuery<SignedUrlQuery>,
    req: HttpRequest,
    service: web::Data<FileUploadService<R>>,
) -> Result<success::Success<SignedUrlResponse>, error::Error>
where
    R: FileRepository + Send + Sync + 'static,
{
    let file_id = file_id.into_inner();
    let expires_in = query.0.expires_in;
    let url = service.issue_url(&file_id, Duration::from_secs(expires_in), get_owner(&req)).await?;

    Ok(Success::ok(Some(SignedUrlResponse { file_id, url, expires_in })))
}

/// Delete file handler
pub async fn delete_file<R>(
    file_id: web::Path<Uuid>,
    req: HttpRequest,
    service: web::Data<FileUploadService<R>>,
) -> Result<success::Success<DeleteFileResponse>, error::Error>
where
    R: FileRepository + Send + Sync + 'static,
{
    let file_id = file_id.into_inner();
    service.delete(&file_id, get_owner(&req)).await?;

    Ok(Success::ok(Some(DeleteFileResponse {
        file_id,
        message: "File deleted successfully".to_string(),
    }))
    .message("File deleted successfully"))
}

pub async fn list_files<R>(
    query: ValidatedQuery<ListFilesQuery>,
    req: HttpRequest,
    service: web::Data<FileUploadService<R>>,
) -> Result<success::Success<FileListResponse>, error::Error>
where
    R: FileRepository + Send + Sync + 'static,
{
    let query = query.0;
    let (files, total) = service.list(get_owner(&req), query.skip, query.limit).await?;

    Ok(Success::ok(Some(FileListResponse {
        files: files.into_iter().map(FileResponse::from).collect(),
        total,
    })))
}
