use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::NotificationService;
use crate::models::auth::AuthContext;
use crate::models::notifications::responses::MarkAllReadResponse;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{error_response, forbidden, not_found};

pub async fn get_notification(
    service: &NotificationService,
    request: &HttpRequest,
    auth: AuthContext,
    notification_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage.get_notification_by_id(notification_id).await {
        Ok(Some(notification)) => {
            let user_id = auth.user_id();
            if notification.receiver_id != user_id && notification.sender_id != Some(user_id) {
                return Ok(forbidden(
                    ErrorCode::Forbidden,
                    "You do not have permission to view this notification",
                ));
            }
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                notification,
                "Notification retrieved",
            )))
        }
        Ok(None) => Ok(not_found(
            ErrorCode::NotificationNotFound,
            "Notification not found",
        )),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn mark_read(
    service: &NotificationService,
    request: &HttpRequest,
    auth: AuthContext,
    notification_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage.get_notification_by_id(notification_id).await {
        Ok(Some(notification)) if notification.receiver_id != auth.user_id() => {
            return Ok(forbidden(
                ErrorCode::Forbidden,
                "Only the receiver can mark a notification as read",
            ));
        }
        Ok(Some(_)) => {}
        Ok(None) => {
            return Ok(not_found(
                ErrorCode::NotificationNotFound,
                "Notification not found",
            ));
        }
        Err(e) => return Ok(error_response(&e)),
    }

    match storage
        .mark_notification_read(notification_id, auth.user_id())
        .await
    {
        Ok(Some(notification)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            notification,
            "Notification marked as read",
        ))),
        Ok(None) => Ok(not_found(
            ErrorCode::NotificationNotFound,
            "Notification not found",
        )),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn mark_all_read(
    service: &NotificationService,
    request: &HttpRequest,
    auth: AuthContext,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage.mark_all_notifications_read(auth.user_id()).await {
        Ok(marked) => {
            info!(
                event = "notifications.read-all",
                actor_id = auth.user_id(),
                marked,
                "Notifications marked as read"
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                MarkAllReadResponse {
                    marked_count: marked as i64,
                },
                "All notifications marked as read",
            )))
        }
        Err(e) => Ok(error_response(&e)),
    }
}
