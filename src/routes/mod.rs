pub mod answers;

pub mod auth;

pub mod chat;

pub mod courses;

pub mod groups;

pub mod notifications;

pub mod ws;

pub use answers::configure_answers_routes;
pub use auth::configure_auth_routes;
pub use chat::configure_chat_routes;
pub use courses::configure_courses_routes;
pub use groups::configure_groups_routes;
pub use notifications::configure_notifications_routes;
pub use ws::configure_ws_routes;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::users::entities::User;
    use crate::utils::jwt::JwtUtils;

    /// 为测试用户签发 access token 请求头
    pub fn bearer(user: &User) -> (&'static str, String) {
        let token = JwtUtils::generate_access_token(user.id, &user.role.to_string()).unwrap();
        ("Authorization", format!("Bearer {token}"))
    }
}
