pub mod answers;
pub mod auth;
pub mod chat;
pub mod courses;
pub mod groups;
pub mod mail;
pub mod notifications;
pub mod websocket;

pub use answers::AnswerService;
pub use auth::AuthService;
pub use chat::ChatService;
pub use courses::CourseService;
pub use groups::GroupService;
pub use notifications::{NotificationDispatcher, NotificationService};

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use std::sync::Arc;
use tracing::error;

use crate::errors::CourseHubError;
use crate::models::{ApiResponse, ErrorCode};
use crate::storage::Storage;

/// 从 app data 中取出存储实例，未注册时返回 500
pub(crate) fn storage_from_request(request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
    request
        .app_data::<web::Data<Arc<dyn Storage>>>()
        .map(|data| data.get_ref().clone())
        .ok_or_else(|| {
            error!("Storage not found in app data");
            actix_web::error::ErrorInternalServerError("storage unavailable")
        })
}

/// 业务错误映射为响应，未预期的错误只记录日志并返回通用信息
pub(crate) fn error_response(err: &CourseHubError) -> HttpResponse {
    match err {
        CourseHubError::Validation(msg) => {
            HttpResponse::BadRequest().json(ApiResponse::error_empty(ErrorCode::BadRequest, msg))
        }
        CourseHubError::NotFound(msg) => {
            HttpResponse::NotFound().json(ApiResponse::error_empty(ErrorCode::NotFound, msg))
        }
        CourseHubError::Conflict(msg) => {
            HttpResponse::Conflict().json(ApiResponse::error_empty(ErrorCode::Conflict, msg))
        }
        CourseHubError::Authentication(msg) => HttpResponse::Unauthorized()
            .json(ApiResponse::error_empty(ErrorCode::Unauthorized, msg)),
        CourseHubError::Authorization(msg) => {
            HttpResponse::Forbidden().json(ApiResponse::error_empty(ErrorCode::Forbidden, msg))
        }
        other => {
            error!("Unhandled service error: {}", other);
            HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::InternalServerError,
                "Internal server error",
            ))
        }
    }
}

/// 403 响应
pub(crate) fn forbidden(code: ErrorCode, message: &str) -> HttpResponse {
    HttpResponse::Forbidden().json(ApiResponse::error_empty(code, message))
}

/// 404 响应
pub(crate) fn not_found(code: ErrorCode, message: &str) -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::error_empty(code, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_error_response_status_mapping() {
        let cases = [
            (CourseHubError::validation("bad"), StatusCode::BAD_REQUEST),
            (CourseHubError::not_found("gone"), StatusCode::NOT_FOUND),
            (CourseHubError::conflict("dup"), StatusCode::CONFLICT),
            (CourseHubError::authorization("no"), StatusCode::FORBIDDEN),
            (
                CourseHubError::database_operation("boom"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(error_response(&err).status(), status);
        }
    }

    #[test]
    fn test_missing_storage_is_internal_error() {
        let req = actix_web::test::TestRequest::default().to_http_request();
        let err = storage_from_request(&req).err().unwrap();
        assert_eq!(
            err.as_response_error().status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
