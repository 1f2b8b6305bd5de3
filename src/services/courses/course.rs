use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::CourseService;
use crate::models::auth::AuthContext;
use crate::models::courses::requests::{CourseListQuery, CreateCourseRequest};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{error_response, not_found};

pub async fn create_course(
    service: &CourseService,
    request: &HttpRequest,
    auth: AuthContext,
    data: CreateCourseRequest,
) -> ActixResult<HttpResponse> {
    if let Err(errors) = data.validate() {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::validation_failed(errors)));
    }
    let storage = service.get_storage(request)?;

    match storage.create_course(data).await {
        Ok(course) => {
            info!(
                event = "courses.course.create",
                actor_id = auth.user_id(),
                course_id = course.id,
                "Course {} created",
                course.name
            );
            Ok(HttpResponse::Created().json(ApiResponse::success(course, "Course created")))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn list_courses(
    service: &CourseService,
    request: &HttpRequest,
    query: CourseListQuery,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    match storage.list_courses_with_pagination(query).await {
        Ok(list) => Ok(HttpResponse::Ok().json(ApiResponse::success(list, "Courses retrieved"))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn get_course(
    service: &CourseService,
    request: &HttpRequest,
    course_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    match storage.get_course_by_id(course_id).await {
        Ok(Some(course)) => {
            Ok(HttpResponse::Ok().json(ApiResponse::success(course, "Course retrieved")))
        }
        Ok(None) => Ok(not_found(ErrorCode::CourseNotFound, "Course not found")),
        Err(e) => Ok(error_response(&e)),
    }
}
