use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::answers::requests::{AnswerListQuery, AnswerReviewRequest, CreateAnswerRequest};
use crate::models::auth::AuthContext;
use crate::models::users::entities::UserRole;
use crate::services::AnswerService;
use crate::utils::SafeIDI64;

// 懒加载的全局 AnswerService 实例
static ANSWER_SERVICE: Lazy<AnswerService> = Lazy::new(AnswerService::new_lazy);

pub async fn list_answers(
    req: HttpRequest,
    auth: AuthContext,
    query: web::Query<AnswerListQuery>,
) -> ActixResult<HttpResponse> {
    ANSWER_SERVICE
        .list_answers(&req, auth, query.into_inner())
        .await
}

pub async fn create_answer(
    req: HttpRequest,
    auth: AuthContext,
    data: web::Json<CreateAnswerRequest>,
) -> ActixResult<HttpResponse> {
    ANSWER_SERVICE
        .create_answer(&req, auth, data.into_inner())
        .await
}

pub async fn get_answer(
    req: HttpRequest,
    auth: AuthContext,
    answer_id: SafeIDI64,
) -> ActixResult<HttpResponse> {
    ANSWER_SERVICE.get_answer(&req, auth, answer_id.0).await
}

pub async fn create_review(
    req: HttpRequest,
    auth: AuthContext,
    answer_id: SafeIDI64,
    data: web::Json<AnswerReviewRequest>,
) -> ActixResult<HttpResponse> {
    ANSWER_SERVICE
        .check_answer(&req, auth, answer_id.0, data.into_inner(), true)
        .await
}

pub async fn update_review(
    req: HttpRequest,
    auth: AuthContext,
    answer_id: SafeIDI64,
    data: web::Json<AnswerReviewRequest>,
) -> ActixResult<HttpResponse> {
    ANSWER_SERVICE
        .check_answer(&req, auth, answer_id.0, data.into_inner(), false)
        .await
}

// 配置路由
pub fn configure_answers_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/answers")
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("")
                    .route(web::get().to(list_answers))
                    .route(
                        web::post()
                            .to(create_answer)
                            .wrap(middlewares::RequireRole::new(&UserRole::Student)),
                    ),
            )
            .route("/{id}", web::get().to(get_answer))
            .service(
                web::resource("/{id}/check")
                    .wrap(middlewares::RequireRole::new_any(UserRole::teacher_roles()))
                    .route(web::post().to(create_review))
                    .route(web::patch().to(update_review)),
            ),
    );
}
