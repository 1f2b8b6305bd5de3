use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::GroupService;
use crate::models::auth::AuthContext;
use crate::models::groups::responses::EnrollByTokenResponse;
use crate::models::ApiResponse;
use crate::services::error_response;

/// 通过注册令牌以学生身份加入分组
pub async fn enroll_by_token(
    service: &GroupService,
    request: &HttpRequest,
    auth: AuthContext,
    token: String,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    let result = match storage.enroll_by_token(auth.user_id(), token.trim()).await {
        Ok(result) => result,
        Err(e) => return Ok(error_response(&e)),
    };

    match result {
        Ok((group, enrollment)) => {
            info!(
                event = "courses.group.enroll-by-token",
                actor_id = auth.user_id(),
                group_id = group.id,
                course_id = group.course_id,
                "User enrolled by token"
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                EnrollByTokenResponse {
                    message: format!("You have been enrolled in {}.", group.name),
                    group_id: group.id,
                    enrollment,
                },
                "Enrolled",
            )))
        }
        Err(rejection) => {
            info!(
                event = "courses.group.enroll-by-token",
                actor_id = auth.user_id(),
                rejected = %rejection,
                "Enrollment by token rejected"
            );
            let body = ApiResponse::error_empty(rejection.error_code(), rejection.message());
            if rejection.is_forbidden() {
                Ok(HttpResponse::Forbidden().json(body))
            } else {
                Ok(HttpResponse::BadRequest().json(body))
            }
        }
    }
}
