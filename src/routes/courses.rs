use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::auth::AuthContext;
use crate::models::courses::requests::{CourseExportQuery, CourseListQuery, CreateCourseRequest};
use crate::models::tasks::requests::CreateTaskRequest;
use crate::models::users::entities::UserRole;
use crate::services::CourseService;
use crate::utils::SafeIDI64;

static COURSE_SERVICE: Lazy<CourseService> = Lazy::new(CourseService::new_lazy);

pub async fn list_courses(
    req: HttpRequest,
    query: web::Query<CourseListQuery>,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE.list_courses(&req, query.into_inner()).await
}

pub async fn create_course(
    req: HttpRequest,
    auth: AuthContext,
    data: web::Json<CreateCourseRequest>,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE
        .create_course(&req, auth, data.into_inner())
        .await
}

pub async fn export_courses(
    req: HttpRequest,
    auth: AuthContext,
    query: web::Query<CourseExportQuery>,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE
        .export_courses(&req, auth, query.into_inner())
        .await
}

pub async fn get_course(req: HttpRequest, course_id: SafeIDI64) -> ActixResult<HttpResponse> {
    COURSE_SERVICE.get_course(&req, course_id.0).await
}

pub async fn list_tasks(req: HttpRequest, course_id: SafeIDI64) -> ActixResult<HttpResponse> {
    COURSE_SERVICE.list_tasks(&req, course_id.0).await
}

pub async fn create_task(
    req: HttpRequest,
    auth: AuthContext,
    course_id: SafeIDI64,
    data: web::Json<CreateTaskRequest>,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE
        .create_task(&req, auth, course_id.0, data.into_inner())
        .await
}

// 配置路由
pub fn configure_courses_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/courses")
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("").route(web::get().to(list_courses)).route(
                    web::post()
                        .to(create_course)
                        .wrap(middlewares::RequireRole::new(&UserRole::Admin)),
                ),
            )
            // 需在 /{id} 之前注册
            .service(
                web::resource("/export-courses")
                    .wrap(middlewares::RateLimit::export())
                    .route(
                        web::get()
                            .to(export_courses)
                            .wrap(middlewares::RequireRole::new(&UserRole::Admin)),
                    ),
            )
            .service(web::resource("/{id}").route(web::get().to(get_course)))
            .service(
                web::resource("/{id}/tasks")
                    .route(web::get().to(list_tasks))
                    .route(
                        web::post()
                            .to(create_task)
                            // 教师是否属于该课程在服务中判断
                            .wrap(middlewares::RequireRole::new_any(UserRole::teacher_roles())),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enrollments::entities::EnrollmentRole;
    use crate::routes::test_support::bearer;
    use crate::storage::Storage;
    use crate::storage::sea_orm_storage::{SeaOrmStorage, fixtures};
    use actix_web::{App, http::StatusCode, test};
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_task_creation_requires_course_teacher() {
        let storage = SeaOrmStorage::in_memory().await;
        let course = fixtures::course(&storage, "Compilers").await;
        let group = fixtures::group(&storage, course.id, "A").await;
        let teacher = fixtures::user(&storage, "teach", UserRole::Teacher).await;
        let outsider = fixtures::user(&storage, "other", UserRole::Teacher).await;
        let student = fixtures::user(&storage, "stud", UserRole::Student).await;
        fixtures::enroll(&storage, group.id, teacher.id, EnrollmentRole::Teacher).await;
        let storage: Arc<dyn Storage> = Arc::new(storage);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(storage.clone()))
                .configure(configure_courses_routes),
        )
        .await;
        let body = serde_json::json!({"number": 1, "name": "Parsing"});
        let uri = format!("/api/v1/courses/{}/tasks", course.id);

        for (user, status) in [
            (&student, StatusCode::FORBIDDEN),
            (&outsider, StatusCode::FORBIDDEN),
            (&teacher, StatusCode::CREATED),
        ] {
            let resp = test::call_service(
                &app,
                test::TestRequest::post()
                    .uri(&uri)
                    .insert_header(bearer(user))
                    .set_json(&body)
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), status, "user {}", user.username);
        }

        let tasks = storage.list_tasks_by_course(course.id).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].created_by, teacher.id);
    }

    #[actix_web::test]
    async fn test_only_admin_creates_courses() {
        let storage = SeaOrmStorage::in_memory().await;
        let admin = fixtures::user(&storage, "root", UserRole::Admin).await;
        let teacher = fixtures::user(&storage, "teach", UserRole::Teacher).await;
        let storage: Arc<dyn Storage> = Arc::new(storage);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(storage))
                .configure(configure_courses_routes),
        )
        .await;

        let create = |user| {
            test::TestRequest::post()
                .uri("/api/v1/courses")
                .insert_header(bearer(user))
                .set_json(serde_json::json!({"name": "Networks"}))
                .to_request()
        };
        let resp = test::call_service(&app, create(&teacher)).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let resp = test::call_service(&app, create(&admin)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/courses/999")
                .insert_header(bearer(&teacher))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_course_export_formats_and_access() {
        let storage = SeaOrmStorage::in_memory().await;
        let admin = fixtures::user(&storage, "root", UserRole::Admin).await;
        let teacher = fixtures::user(&storage, "teach", UserRole::Teacher).await;
        let course = fixtures::course(&storage, "Compilers").await;
        fixtures::course(&storage, "Networks").await;
        let group = fixtures::group(&storage, course.id, "A").await;
        fixtures::enroll(&storage, group.id, teacher.id, EnrollmentRole::Teacher).await;
        let storage: Arc<dyn Storage> = Arc::new(storage);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(storage))
                .configure(configure_courses_routes),
        )
        .await;

        let export = |user, file_type: &str| {
            test::TestRequest::get()
                .uri(&format!("/api/v1/courses/export-courses?file_type={file_type}"))
                .insert_header(bearer(user))
                .to_request()
        };

        let resp = test::call_service(&app, export(&teacher, "csv")).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = test::call_service(&app, export(&admin, "pdf")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid file format");

        let resp = test::call_service(&app, export(&admin, "csv")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "text/csv; charset=utf-8"
        );
        let body = test::read_body(resp).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,name,description,is_active,students_count"));
        assert!(lines[1].starts_with(&format!("{},Compilers,,true,0,1,1,0,", course.id)));

        let resp = test::call_service(&app, export(&admin, "xlsx")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        let body = test::read_body(resp).await;
        assert!(body.starts_with(b"PK"));
    }
}
