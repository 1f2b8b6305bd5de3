use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 站内通知
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "api/notification.ts")]
pub struct Notification {
    pub id: i64,
    pub receiver_id: i64,
    pub sender_id: Option<i64>,
    pub answer_id: Option<i64>,
    pub title: String,
    pub content: String,
    pub feedback: Option<String>,
    pub is_read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// 列表范围：收到的、发出的或两者
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationBox {
    All,
    Inbox,
    Outbox,
}
