use super::entities::{User, UserRole};
use serde::Serialize;
use ts_rs::TS;

/// 列表、成员和聊天中展示的用户简要信息
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "api/user.ts")]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role.clone(),
        }
    }
}
