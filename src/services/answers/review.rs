use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::{AnswerService, can_review, read_models};
use crate::models::answers::{entities::AnswerRecord, requests::AnswerReviewRequest};
use crate::models::auth::AuthContext;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{NotificationDispatcher, error_response, forbidden, not_found};

pub async fn check_answer(
    service: &AnswerService,
    request: &HttpRequest,
    auth: AuthContext,
    answer_id: i64,
    data: AnswerReviewRequest,
    created: bool,
) -> ActixResult<HttpResponse> {
    // 字段校验先于加锁
    let payload = match data.validate() {
        Ok(payload) => payload,
        Err(invalid) => {
            return Ok(
                HttpResponse::BadRequest().json(ApiResponse::validation_failed(invalid.errors))
            );
        }
    };
    let storage = service.get_storage(request)?;

    let record = match storage.get_answer_record(answer_id).await {
        Ok(Some(record)) => record,
        Ok(None) => return Ok(not_found(ErrorCode::AnswerNotFound, "Answer not found")),
        Err(e) => return Ok(error_response(&e)),
    };

    match can_review(&storage, &auth, &record).await {
        Ok(true) => {}
        Ok(false) => {
            return Ok(forbidden(
                ErrorCode::AnswerPermissionDenied,
                "You do not have permission to review this answer",
            ));
        }
        Err(e) => return Ok(error_response(&e)),
    }

    let outcome = match storage
        .review_answer(answer_id, auth.user_id(), payload)
        .await
    {
        Ok(Some(outcome)) => outcome,
        Ok(None) => return Ok(not_found(ErrorCode::AnswerNotFound, "Answer not found")),
        Err(e) => return Ok(error_response(&e)),
    };

    info!(
        event = "answers.review",
        actor_id = auth.user_id(),
        answer_id,
        previous_status = %outcome.plan.previous_status,
        status = %outcome.plan.new_status,
        status_changed = outcome.plan.status_changed,
        grade_action = outcome.plan.grade_action.map(|a| a.as_str()),
        "Answer reviewed"
    );

    // 事务已提交，推送与邮件不影响响应
    if let Some(notification) = outcome.notification {
        NotificationDispatcher::global()
            .dispatch(&storage, notification)
            .await;
    }

    let reviewed = AnswerRecord {
        answer: outcome.answer,
        task: record.task,
        student: record.student,
        grade: outcome.grade,
    };
    match read_models(&storage, vec![reviewed], true).await {
        Ok(mut items) => match items.pop() {
            Some(read) if created => {
                Ok(HttpResponse::Created().json(ApiResponse::success(read, "Answer reviewed")))
            }
            Some(read) => Ok(HttpResponse::Ok().json(ApiResponse::success(read, "Answer reviewed"))),
            None => Ok(not_found(ErrorCode::AnswerNotFound, "Answer not found")),
        },
        Err(e) => Ok(error_response(&e)),
    }
}
