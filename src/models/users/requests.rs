use super::entities::UserRole;
use serde::Deserialize;

// 用户创建请求（存储层使用，password 为已哈希的密码）
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}
