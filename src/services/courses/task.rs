use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::CourseService;
use crate::models::auth::AuthContext;
use crate::models::tasks::requests::CreateTaskRequest;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{error_response, forbidden, not_found};

pub async fn create_task(
    service: &CourseService,
    request: &HttpRequest,
    auth: AuthContext,
    course_id: i64,
    data: CreateTaskRequest,
) -> ActixResult<HttpResponse> {
    if let Err(errors) = data.validate() {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::validation_failed(errors)));
    }
    let storage = service.get_storage(request)?;

    match storage.get_course_by_id(course_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Ok(not_found(ErrorCode::CourseNotFound, "Course not found")),
        Err(e) => return Ok(error_response(&e)),
    }

    if !auth.is_admin() {
        match storage.is_course_teacher(auth.user_id(), course_id).await {
            Ok(true) => {}
            Ok(false) => {
                return Ok(forbidden(
                    ErrorCode::Forbidden,
                    "Only teachers of this course can create tasks",
                ));
            }
            Err(e) => return Ok(error_response(&e)),
        }
    }

    match storage.create_task(course_id, auth.user_id(), data).await {
        Ok(task) => {
            info!(
                event = "courses.task.create",
                actor_id = auth.user_id(),
                course_id,
                task_id = task.id,
                "Task {} created",
                task.display_title()
            );
            Ok(HttpResponse::Created().json(ApiResponse::success(task, "Task created")))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn list_tasks(
    service: &CourseService,
    request: &HttpRequest,
    course_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    match storage.get_course_by_id(course_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Ok(not_found(ErrorCode::CourseNotFound, "Course not found")),
        Err(e) => return Ok(error_response(&e)),
    }
    match storage.list_tasks_by_course(course_id).await {
        Ok(tasks) => Ok(HttpResponse::Ok().json(ApiResponse::success(tasks, "Tasks retrieved"))),
        Err(e) => Ok(error_response(&e)),
    }
}
