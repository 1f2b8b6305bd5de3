use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::auth::AuthContext;
use crate::models::enrollments::{entities::EnrollmentRole, requests::GroupMembersRequest};
use crate::models::groups::requests::{CreateGroupRequest, GroupListQuery, UpdateGroupRequest};
use crate::models::users::entities::UserRole;
use crate::services::GroupService;
use crate::utils::SafeIDI64;

// 懒加载的全局 GroupService 实例
static GROUP_SERVICE: Lazy<GroupService> = Lazy::new(GroupService::new_lazy);

pub async fn list_groups(
    req: HttpRequest,
    query: web::Query<GroupListQuery>,
) -> ActixResult<HttpResponse> {
    GROUP_SERVICE.list_groups(&req, query.into_inner()).await
}

pub async fn create_group(
    req: HttpRequest,
    auth: AuthContext,
    data: web::Json<CreateGroupRequest>,
) -> ActixResult<HttpResponse> {
    GROUP_SERVICE
        .create_group(&req, auth, data.into_inner())
        .await
}

pub async fn my_groups(req: HttpRequest, auth: AuthContext) -> ActixResult<HttpResponse> {
    GROUP_SERVICE.my_groups(&req, auth).await
}

pub async fn enroll_by_token(
    req: HttpRequest,
    auth: AuthContext,
    token: web::Path<String>,
) -> ActixResult<HttpResponse> {
    GROUP_SERVICE
        .enroll_by_token(&req, auth, token.into_inner())
        .await
}

pub async fn get_group(
    req: HttpRequest,
    auth: AuthContext,
    group_id: SafeIDI64,
) -> ActixResult<HttpResponse> {
    GROUP_SERVICE.get_group(&req, auth, group_id.0).await
}

pub async fn update_group(
    req: HttpRequest,
    auth: AuthContext,
    group_id: SafeIDI64,
    data: web::Json<UpdateGroupRequest>,
) -> ActixResult<HttpResponse> {
    GROUP_SERVICE
        .update_group(&req, auth, group_id.0, data.into_inner())
        .await
}

pub async fn delete_group(
    req: HttpRequest,
    auth: AuthContext,
    group_id: SafeIDI64,
) -> ActixResult<HttpResponse> {
    GROUP_SERVICE.delete_group(&req, auth, group_id.0).await
}

pub async fn deactivate_group(
    req: HttpRequest,
    auth: AuthContext,
    group_id: SafeIDI64,
) -> ActixResult<HttpResponse> {
    GROUP_SERVICE.deactivate_group(&req, auth, group_id.0).await
}

pub async fn refresh_token(
    req: HttpRequest,
    auth: AuthContext,
    group_id: SafeIDI64,
) -> ActixResult<HttpResponse> {
    GROUP_SERVICE.refresh_token(&req, auth, group_id.0).await
}

pub async fn add_students(
    req: HttpRequest,
    auth: AuthContext,
    group_id: SafeIDI64,
    data: web::Json<GroupMembersRequest>,
) -> ActixResult<HttpResponse> {
    GROUP_SERVICE
        .add_members(
            &req,
            auth,
            group_id.0,
            EnrollmentRole::Student,
            data.into_inner(),
        )
        .await
}

pub async fn add_teachers(
    req: HttpRequest,
    auth: AuthContext,
    group_id: SafeIDI64,
    data: web::Json<GroupMembersRequest>,
) -> ActixResult<HttpResponse> {
    GROUP_SERVICE
        .add_members(
            &req,
            auth,
            group_id.0,
            EnrollmentRole::Teacher,
            data.into_inner(),
        )
        .await
}

pub async fn remove_members(
    req: HttpRequest,
    auth: AuthContext,
    group_id: SafeIDI64,
    data: web::Json<GroupMembersRequest>,
) -> ActixResult<HttpResponse> {
    GROUP_SERVICE
        .remove_members(&req, auth, group_id.0, data.into_inner())
        .await
}

pub async fn list_members(
    req: HttpRequest,
    auth: AuthContext,
    group_id: SafeIDI64,
) -> ActixResult<HttpResponse> {
    GROUP_SERVICE.list_members(&req, auth, group_id.0).await
}

pub async fn export_gradebook(
    req: HttpRequest,
    auth: AuthContext,
    group_id: SafeIDI64,
) -> ActixResult<HttpResponse> {
    GROUP_SERVICE.export_gradebook(&req, auth, group_id.0).await
}

fn admin_only() -> middlewares::RequireRole {
    middlewares::RequireRole::new(&UserRole::Admin)
}

// 配置路由
pub fn configure_groups_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/groups")
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("")
                    .route(web::get().to(list_groups))
                    .route(web::post().to(create_group).wrap(admin_only())),
            )
            // 固定路径需先于 /{id} 注册
            .service(web::resource("/my").route(web::get().to(my_groups)))
            .service(
                web::resource("/enroll/{token}")
                    .wrap(middlewares::RateLimit::enroll())
                    .route(web::get().to(enroll_by_token)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_group))
                    .route(web::put().to(update_group).wrap(admin_only()))
                    .route(web::delete().to(delete_group).wrap(admin_only())),
            )
            .service(
                web::resource("/{id}/deactivate")
                    .route(web::post().to(deactivate_group).wrap(admin_only())),
            )
            .service(
                web::resource("/{id}/refresh-token")
                    .route(web::post().to(refresh_token).wrap(admin_only())),
            )
            .service(
                web::resource("/{id}/add-students")
                    .route(web::post().to(add_students).wrap(admin_only())),
            )
            .service(
                web::resource("/{id}/add-teachers")
                    .route(web::post().to(add_teachers).wrap(admin_only())),
            )
            .service(
                web::resource("/{id}/remove-members")
                    .route(web::post().to(remove_members).wrap(admin_only())),
            )
            // 管理员或该分组教师，在服务中判断
            .service(web::resource("/{id}/members").route(web::get().to(list_members)))
            .service(
                web::resource("/{id}/export")
                    .wrap(middlewares::RateLimit::export())
                    .route(web::get().to(export_gradebook)),
            ),
    );
}
