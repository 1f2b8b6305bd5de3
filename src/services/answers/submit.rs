use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::AnswerService;
use crate::errors::CourseHubError;
use crate::models::answers::{requests::CreateAnswerRequest, responses::AnswerRead};
use crate::models::auth::AuthContext;
use crate::models::enrollments::entities::EnrollmentRole;
use crate::models::users::responses::UserSummary;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{error_response, forbidden, not_found};

pub async fn create_answer(
    service: &AnswerService,
    request: &HttpRequest,
    auth: AuthContext,
    data: CreateAnswerRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    let task = match storage.get_task_by_id(data.task_id).await {
        Ok(Some(task)) => task,
        Ok(None) => return Ok(not_found(ErrorCode::TaskNotFound, "Task not found")),
        Err(e) => return Ok(error_response(&e)),
    };

    match storage
        .is_enrolled_in_course(auth.user_id(), task.course_id, EnrollmentRole::Student)
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            return Ok(forbidden(
                ErrorCode::AnswerPermissionDenied,
                "You are not enrolled in this course",
            ));
        }
        Err(e) => return Ok(error_response(&e)),
    }

    match storage.create_answer(auth.user_id(), data).await {
        Ok(answer) => {
            info!(
                event = "answers.create",
                actor_id = auth.user_id(),
                answer_id = answer.id,
                task_id = task.id,
                "Answer submitted"
            );
            let read = AnswerRead::new(answer, task, UserSummary::from(&auth.user), None, None);
            Ok(HttpResponse::Created().json(ApiResponse::success(read, "Answer submitted")))
        }
        Err(CourseHubError::Conflict(msg)) => Ok(HttpResponse::Conflict()
            .json(ApiResponse::error_empty(ErrorCode::AnswerAlreadyExists, msg))),
        Err(e) => Ok(error_response(&e)),
    }
}
