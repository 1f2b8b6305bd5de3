use serde::{Deserialize, Serialize};

use crate::models::users::entities::{User, UserRole};

/// 已认证请求的身份上下文，由 `RequireJWT` 写入请求扩展并按 token 缓存
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user: User,
}

impl AuthContext {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    pub fn role(&self) -> &UserRole {
        &self.user.role
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }

    pub fn is_teacher(&self) -> bool {
        self.user.role == UserRole::Teacher
    }

    /// 教师或管理员
    pub fn is_staff(&self) -> bool {
        self.user.is_staff()
    }
}
