use actix_web::web::ServiceConfig;

use crate::modules::notification::handle::*;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(create_notification)
        .service(list_notifications)
        .service(unread_count)
        .service(mark_all_read)
        .service(mark_read)
        .service(delete_notification);
}
