use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::PaginationQuery;
use crate::models::auth::AuthContext;
use crate::models::chat::requests::CreateChatRoomRequest;
use crate::services::ChatService;
use crate::utils::SafeIDI64;

// 懒加载的全局 ChatService 实例
static CHAT_SERVICE: Lazy<ChatService> = Lazy::new(ChatService::new_lazy);

pub async fn create_room(
    req: HttpRequest,
    auth: AuthContext,
    data: web::Json<CreateChatRoomRequest>,
) -> ActixResult<HttpResponse> {
    CHAT_SERVICE.create_room(&req, auth, data.into_inner()).await
}

pub async fn list_rooms(req: HttpRequest, auth: AuthContext) -> ActixResult<HttpResponse> {
    CHAT_SERVICE.list_rooms(&req, auth).await
}

pub async fn list_messages(
    req: HttpRequest,
    auth: AuthContext,
    room_id: SafeIDI64,
    query: web::Query<PaginationQuery>,
) -> ActixResult<HttpResponse> {
    CHAT_SERVICE
        .list_messages(&req, auth, room_id.0, query.into_inner())
        .await
}

// 配置路由
pub fn configure_chat_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/chat")
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("/rooms")
                    .route(web::get().to(list_rooms))
                    .route(web::post().to(create_room)),
            )
            .route("/rooms/{id}/messages", web::get().to(list_messages)),
    );
}
