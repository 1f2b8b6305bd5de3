use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::auth::AuthContext;
use crate::models::notifications::{entities::NotificationBox, requests::NotificationListQuery};
use crate::services::NotificationService;
use crate::utils::SafeIDI64;

// 懒加载的全局 NotificationService 实例
static NOTIFICATION_SERVICE: Lazy<NotificationService> =
    Lazy::new(NotificationService::new_lazy);

pub async fn list_notifications(
    req: HttpRequest,
    auth: AuthContext,
    query: web::Query<NotificationListQuery>,
) -> ActixResult<HttpResponse> {
    NOTIFICATION_SERVICE
        .list_notifications(&req, auth, NotificationBox::All, query.into_inner())
        .await
}

pub async fn inbox(
    req: HttpRequest,
    auth: AuthContext,
    query: web::Query<NotificationListQuery>,
) -> ActixResult<HttpResponse> {
    NOTIFICATION_SERVICE
        .list_notifications(&req, auth, NotificationBox::Inbox, query.into_inner())
        .await
}

pub async fn outbox(
    req: HttpRequest,
    auth: AuthContext,
    query: web::Query<NotificationListQuery>,
) -> ActixResult<HttpResponse> {
    NOTIFICATION_SERVICE
        .list_notifications(&req, auth, NotificationBox::Outbox, query.into_inner())
        .await
}

pub async fn unread_count(req: HttpRequest, auth: AuthContext) -> ActixResult<HttpResponse> {
    NOTIFICATION_SERVICE.unread_count(&req, auth).await
}

pub async fn get_notification(
    req: HttpRequest,
    auth: AuthContext,
    notification_id: SafeIDI64,
) -> ActixResult<HttpResponse> {
    NOTIFICATION_SERVICE
        .get_notification(&req, auth, notification_id.0)
        .await
}

pub async fn mark_read(
    req: HttpRequest,
    auth: AuthContext,
    notification_id: SafeIDI64,
) -> ActixResult<HttpResponse> {
    NOTIFICATION_SERVICE
        .mark_read(&req, auth, notification_id.0)
        .await
}

pub async fn mark_all_read(req: HttpRequest, auth: AuthContext) -> ActixResult<HttpResponse> {
    NOTIFICATION_SERVICE.mark_all_read(&req, auth).await
}

// 配置路由
pub fn configure_notifications_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/notifications")
            .wrap(middlewares::RequireJWT)
            .route("", web::get().to(list_notifications))
            .route("/inbox", web::get().to(inbox))
            .route("/outbox", web::get().to(outbox))
            .route("/unread-count", web::get().to(unread_count))
            .route("/read-all", web::post().to(mark_all_read))
            .route("/{id}", web::get().to(get_notification))
            .route("/{id}/read", web::post().to(mark_read)),
    );
}
