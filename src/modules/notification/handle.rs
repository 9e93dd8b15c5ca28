use actix_web::{delete, get, patch, post, web, HttpRequest};
use uuid::Uuid;

use crate::api::{error, success};
use crate::middlewares::get_claims;
use crate::modules::notification::{
    model::{
        CreateNotificationModel, MarkAllReadResponse, NotificationListResponse,
        NotificationQuery, UnreadCountResponse,
    },
    schema::NotificationEntity,
    service::NotificationService,
};
use crate::utils::{ValidatedJson, ValidatedQuery};

#[post("")]
pub async fn create_notification(
    notification_service: web::Data<NotificationService>,
    body: ValidatedJson<CreateNotificationModel>,
    req: HttpRequest,
) -> Result<success::Success<NotificationEntity>, error::Error> {
    let owner = get_claims(&req)?.sub;
    let body = body.0;
    let notification = notification_service
        .create_notification(
            owner,
            body._type,
            body.title,
            body.message,
            body.icon,
            body.link,
            body.reference,
        )
        .await?;
    Ok(success::Success::created(Some(notification)).message("Notification created"))
}

#[get("")]
pub async fn list_notifications(
    notification_service: web::Data<NotificationService>,
    query: ValidatedQuery<NotificationQuery>,
    req: HttpRequest,
) -> Result<success::Success<NotificationListResponse>, error::Error> {
    let owner = get_claims(&req)?.sub;
    let query = query.0;
    let (notifications, total) =
        notification_service.list(owner, query.unread_only, query.skip, query.limit).await?;
    let unread = notification_service.count_unread(owner).await?;
    Ok(success::Success::ok(Some(NotificationListResponse { notifications, total, unread })))
}

#[get("/unread-count")]
pub async fn unread_count(
    notification_service: web::Data<NotificationService>,
    req: HttpRequest,
) -> Result<success::Success<UnreadCountResponse>, error::Error> {
    let owner = get_claims(&req)?.sub;
    let unread = notification_service.count_unread(owner).await?;
    Ok(success::Success::ok(Some(UnreadCountResponse { unread })))
}

#[patch("/read-all")]
pub async fn mark_all_read(
    notification_service: web::Data<NotificationService>,
    req: HttpRequest,
) -> Result<success::Success<MarkAllReadResponse>, error::Error> {
    let owner = get_claims(&req)?.sub;
    let updated = notification_service.mark_all_read(owner).await?;
    Ok(success::Success::ok(Some(MarkAllReadResponse { updated }))
        .message("All notifications marked as read"))
}

#[patch("/{id:[0-9a-fA-F-]{36}}/read")]
pub async fn mark_read(
    notification_service: web::Data<NotificationService>,
    id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<NotificationEntity>, error::Error> {
    let owner = get_claims(&req)?.sub;
    let notification = notification_service.mark_read(id.into_inner(), owner).await?;
    Ok(success::Success::ok(Some(notification)).message("Notification marked as read"))
}

#[delete("/{id:[0-9a-fA-F-]{36}}")]
pub async fn delete_notification(
    notification_service: web::Data<NotificationService>,
    id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let owner = get_claims(&req)?.sub;
    notification_service.delete(id.into_inner(), owner).await?;
    Ok(success::Success::no_content())
}
