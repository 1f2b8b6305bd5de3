use serde::Serialize;
use ts_rs::TS;

use super::entities::{ChatMessage, ChatRoom};
use crate::models::common::pagination::PaginationInfo;

// 面向某个查看者的消息视图
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "api/chat.ts")]
pub struct ChatMessageView {
    pub id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub sender_name: String,
    pub content: String,
    pub is_read: bool,
    pub is_mine: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ChatMessageView {
    pub fn new(message: &ChatMessage, sender_name: &str, viewer_id: i64) -> Self {
        Self {
            id: message.id,
            room_id: message.room_id,
            sender_id: message.sender_id,
            sender_name: sender_name.to_string(),
            content: message.content.clone(),
            is_read: message.is_read,
            is_mine: message.sender_id == viewer_id,
            created_at: message.created_at,
        }
    }
}

// 聊天室列表响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "api/chat.ts")]
pub struct ChatRoomListResponse {
    pub items: Vec<ChatRoom>,
}

// 消息列表响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "api/chat.ts")]
pub struct ChatMessageListResponse {
    pub items: Vec<ChatMessageView>,
    pub pagination: PaginationInfo,
}
