use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::ChatService;
use crate::models::auth::AuthContext;
use crate::models::chat::{requests::CreateChatRoomRequest, responses::ChatRoomListResponse};
use crate::models::enrollments::entities::EnrollmentRole;
use crate::models::users::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{error_response, forbidden, not_found};

fn invalid_pair() -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse::error_empty(
        ErrorCode::ChatRoomInvalid,
        "A chat room connects one teacher and one student",
    ))
}

pub async fn create_room(
    service: &ChatService,
    request: &HttpRequest,
    auth: AuthContext,
    data: CreateChatRoomRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    let participant = match storage.get_user_by_id(data.participant_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return Ok(not_found(ErrorCode::UserNotFound, "User not found")),
        Err(e) => return Ok(error_response(&e)),
    };

    let (teacher_id, student_id) = match (auth.role(), &participant.role) {
        (UserRole::Teacher, UserRole::Student) => (auth.user_id(), participant.id),
        (UserRole::Student, UserRole::Teacher) => (participant.id, auth.user_id()),
        _ => return Ok(invalid_pair()),
    };

    match storage.get_course_by_id(data.course_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Ok(not_found(ErrorCode::CourseNotFound, "Course not found")),
        Err(e) => return Ok(error_response(&e)),
    }

    let teacher_enrolled = storage
        .is_enrolled_in_course(teacher_id, data.course_id, EnrollmentRole::Teacher)
        .await;
    let student_enrolled = storage
        .is_enrolled_in_course(student_id, data.course_id, EnrollmentRole::Student)
        .await;
    match (teacher_enrolled, student_enrolled) {
        (Ok(true), Ok(true)) => {}
        (Err(e), _) | (_, Err(e)) => return Ok(error_response(&e)),
        _ => {
            return Ok(forbidden(
                ErrorCode::ChatPermissionDenied,
                "Both participants must be enrolled in this course",
            ));
        }
    }

    match storage
        .get_or_create_chat_room(teacher_id, student_id, data.course_id)
        .await
    {
        Ok((room, true)) => {
            info!(
                event = "chat.room.create",
                actor_id = auth.user_id(),
                room_id = room.id,
                teacher_id,
                student_id,
                "Chat room created"
            );
            Ok(HttpResponse::Created().json(ApiResponse::success(room, "Chat room created")))
        }
        Ok((room, false)) => {
            Ok(HttpResponse::Ok().json(ApiResponse::success(room, "Chat room already exists")))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn list_rooms(
    service: &ChatService,
    request: &HttpRequest,
    auth: AuthContext,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage.list_user_chat_rooms(auth.user_id()).await {
        Ok(items) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            ChatRoomListResponse { items },
            "Chat rooms retrieved",
        ))),
        Err(e) => Ok(error_response(&e)),
    }
}
