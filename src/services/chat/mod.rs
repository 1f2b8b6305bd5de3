pub mod messages;
pub mod rooms;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::PaginationQuery;
use crate::models::auth::AuthContext;
use crate::models::chat::requests::CreateChatRoomRequest;
use crate::storage::Storage;

pub struct ChatService {
    storage: Option<Arc<dyn Storage>>,
}

impl ChatService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => super::storage_from_request(request),
        }
    }

    // 教师与学生之间创建聊天室，已存在时直接返回
    pub async fn create_room(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        data: CreateChatRoomRequest,
    ) -> ActixResult<HttpResponse> {
        rooms::create_room(self, request, auth, data).await
    }

    pub async fn list_rooms(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
    ) -> ActixResult<HttpResponse> {
        rooms::list_rooms(self, request, auth).await
    }

    // 仅聊天双方可见
    pub async fn list_messages(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        room_id: i64,
        query: PaginationQuery,
    ) -> ActixResult<HttpResponse> {
        messages::list_messages(self, request, auth, room_id, query).await
    }
}
