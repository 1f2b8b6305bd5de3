use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::NotificationService;
use crate::models::ApiResponse;
use crate::models::auth::AuthContext;
use crate::models::notifications::{
    entities::NotificationBox, requests::NotificationListQuery, responses::UnreadCountResponse,
};
use crate::services::error_response;

pub async fn list_notifications(
    service: &NotificationService,
    request: &HttpRequest,
    auth: AuthContext,
    mailbox: NotificationBox,
    query: NotificationListQuery,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage
        .list_notifications(auth.user_id(), mailbox, query)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            response,
            "Notifications retrieved",
        ))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn unread_count(
    service: &NotificationService,
    request: &HttpRequest,
    auth: AuthContext,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage.count_unread_notifications(auth.user_id()).await {
        Ok(count) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            UnreadCountResponse {
                unread_count: count as i64,
            },
            "Unread count retrieved",
        ))),
        Err(e) => Ok(error_response(&e)),
    }
}
