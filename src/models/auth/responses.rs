use crate::models::users::entities::User;
use serde::Serialize;
use ts_rs::TS;

// 登录响应，refresh token 通过 HttpOnly Cookie 下发
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "api/auth.ts")]
pub struct LoginResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub user: User,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "api/auth.ts")]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "api/auth.ts")]
pub struct UserInfoResponse {
    pub user: User,
}
