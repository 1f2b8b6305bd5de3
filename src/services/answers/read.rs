use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::{AnswerService, can_review, read_models};
use crate::models::answers::{
    requests::{AnswerListQuery, AnswerScope},
    responses::AnswerListResponse,
};
use crate::models::auth::AuthContext;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{error_response, forbidden, not_found};

fn scope_for(auth: &AuthContext) -> AnswerScope {
    if auth.is_admin() {
        AnswerScope::All
    } else if auth.is_teacher() {
        AnswerScope::Teacher(auth.user_id())
    } else {
        AnswerScope::Owner(auth.user_id())
    }
}

pub async fn list_answers(
    service: &AnswerService,
    request: &HttpRequest,
    auth: AuthContext,
    query: AnswerListQuery,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    let (records, pagination) = match storage
        .list_answers_with_pagination(scope_for(&auth), query)
        .await
    {
        Ok(result) => result,
        Err(e) => return Ok(error_response(&e)),
    };

    match read_models(&storage, records, auth.is_staff()).await {
        Ok(items) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            AnswerListResponse { items, pagination },
            "Answers retrieved",
        ))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn get_answer(
    service: &AnswerService,
    request: &HttpRequest,
    auth: AuthContext,
    answer_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    let record = match storage.get_answer_record(answer_id).await {
        Ok(Some(record)) => record,
        Ok(None) => return Ok(not_found(ErrorCode::AnswerNotFound, "Answer not found")),
        Err(e) => return Ok(error_response(&e)),
    };

    if record.answer.user_id != auth.user_id() {
        match can_review(&storage, &auth, &record).await {
            Ok(true) => {}
            Ok(false) => {
                return Ok(forbidden(
                    ErrorCode::AnswerPermissionDenied,
                    "You do not have permission to view this answer",
                ));
            }
            Err(e) => return Ok(error_response(&e)),
        }
    }

    match read_models(&storage, vec![record], auth.is_staff()).await {
        Ok(mut items) => match items.pop() {
            Some(read) => Ok(HttpResponse::Ok().json(ApiResponse::success(read, "Answer retrieved"))),
            None => Ok(not_found(ErrorCode::AnswerNotFound, "Answer not found")),
        },
        Err(e) => Ok(error_response(&e)),
    }
}
