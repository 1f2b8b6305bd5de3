//! WebSocket 入口
//!
//! 浏览器握手无法携带 `Authorization` 头，access token 放在查询参数 `token` 中。
//! 认证或房间权限失败时直接以 401/403 拒绝升级。

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, http::StatusCode, web};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::cache::ObjectCache;
use crate::middlewares::create_error_response;
use crate::middlewares::require_jwt::authenticate_token;
use crate::models::ErrorCode;
use crate::models::auth::AuthContext;
use crate::services::websocket::{ChatConsumer, NotificationConsumer};
use crate::services::{error_response, storage_from_request};
use crate::storage::Storage;
use crate::utils::SafeRoomIdI64;

#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: Option<String>,
}

fn unauthorized(message: &str) -> HttpResponse {
    create_error_response(StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, message)
}

async fn authenticate(
    req: &HttpRequest,
    storage: &Arc<dyn Storage>,
    query: &WsAuthQuery,
) -> Result<AuthContext, HttpResponse> {
    let Some(token) = query.token.as_deref().filter(|t| !t.is_empty()) else {
        return Err(unauthorized("Unauthorized: missing token"));
    };
    let cache = req
        .app_data::<web::Data<Arc<dyn ObjectCache>>>()
        .map(|data| data.get_ref().clone());

    authenticate_token(token, storage, cache.as_ref())
        .await
        .map_err(|err| {
            info!("WebSocket authentication failed for {}: {}", req.path(), err);
            unauthorized(&format!("Unauthorized: {err}"))
        })
}

pub async fn chat_socket(
    req: HttpRequest,
    body: web::Payload,
    room_id: SafeRoomIdI64,
    query: web::Query<WsAuthQuery>,
) -> ActixResult<HttpResponse> {
    let storage = storage_from_request(&req)?;
    let auth = match authenticate(&req, &storage, &query).await {
        Ok(auth) => auth,
        Err(resp) => return Ok(resp),
    };

    let room = match storage.get_chat_room(room_id.0).await {
        Ok(Some(room)) if room.is_active => room,
        Ok(_) => {
            return Ok(create_error_response(
                StatusCode::NOT_FOUND,
                ErrorCode::ChatRoomNotFound,
                "Chat room not found",
            ));
        }
        Err(e) => return Ok(error_response(&e)),
    };
    if !room.is_participant(auth.user_id()) {
        return Ok(create_error_response(
            StatusCode::FORBIDDEN,
            ErrorCode::ChatPermissionDenied,
            "You are not a participant of this chat room",
        ));
    }

    let (response, session, stream) = actix_ws::handle(&req, body).map_err(|e| {
        error!("WebSocket handshake failed: {}", e);
        e
    })?;
    let consumer = ChatConsumer::new(storage, auth.user, room);
    actix_web::rt::spawn(consumer.run(session, stream));

    Ok(response)
}

pub async fn notifications_socket(
    req: HttpRequest,
    body: web::Payload,
    query: web::Query<WsAuthQuery>,
) -> ActixResult<HttpResponse> {
    let storage = storage_from_request(&req)?;
    let auth = match authenticate(&req, &storage, &query).await {
        Ok(auth) => auth,
        Err(resp) => return Ok(resp),
    };

    let (response, session, stream) = actix_ws::handle(&req, body).map_err(|e| {
        error!("WebSocket handshake failed: {}", e);
        e
    })?;
    actix_web::rt::spawn(NotificationConsumer::run(auth.user_id(), session, stream));

    Ok(response)
}

// 配置路由
pub fn configure_ws_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/ws")
            .route("/chat/{room_id}", web::get().to(chat_socket))
            .route("/notifications", web::get().to(notifications_socket)),
    );
}
