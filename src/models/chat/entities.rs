use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 教师与学生之间的聊天室
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "api/chat.ts")]
pub struct ChatRoom {
    pub id: i64,
    pub teacher_id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ChatRoom {
    pub fn is_participant(&self, user_id: i64) -> bool {
        self.teacher_id == user_id || self.student_id == user_id
    }
}

// 聊天消息
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "api/chat.ts")]
pub struct ChatMessage {
    pub id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub is_read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
