use serde::Deserialize;
use ts_rs::TS;

// 创建聊天室请求，当前用户与 participant_id 中一方为教师、一方为学生
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "api/chat.ts")]
pub struct CreateChatRoomRequest {
    pub participant_id: i64,
    pub course_id: i64,
}
