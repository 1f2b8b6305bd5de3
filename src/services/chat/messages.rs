use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::HashMap;

use super::ChatService;
use crate::models::PaginationQuery;
use crate::models::auth::AuthContext;
use crate::models::chat::responses::{ChatMessageListResponse, ChatMessageView};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::websocket::chat::display_name;
use crate::services::{error_response, forbidden, not_found};

pub async fn list_messages(
    service: &ChatService,
    request: &HttpRequest,
    auth: AuthContext,
    room_id: i64,
    query: PaginationQuery,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    let room = match storage.get_chat_room(room_id).await {
        Ok(Some(room)) => room,
        Ok(None) => return Ok(not_found(ErrorCode::ChatRoomNotFound, "Chat room not found")),
        Err(e) => return Ok(error_response(&e)),
    };
    if !room.is_participant(auth.user_id()) {
        return Ok(forbidden(
            ErrorCode::ChatPermissionDenied,
            "You are not a participant of this chat room",
        ));
    }

    let (messages, pagination) = match storage.list_chat_messages(room.id, query).await {
        Ok(result) => result,
        Err(e) => return Ok(error_response(&e)),
    };

    let names: HashMap<i64, String> = match storage
        .get_users_by_ids(&[room.teacher_id, room.student_id])
        .await
    {
        Ok(users) => users.iter().map(|u| (u.id, display_name(u))).collect(),
        Err(e) => return Ok(error_response(&e)),
    };

    let viewer_id = auth.user_id();
    let items = messages
        .iter()
        .map(|message| {
            let name = names
                .get(&message.sender_id)
                .map(String::as_str)
                .unwrap_or_default();
            ChatMessageView::new(message, name, viewer_id)
        })
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        ChatMessageListResponse { items, pagination },
        "Messages retrieved",
    )))
}
