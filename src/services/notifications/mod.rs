pub mod dispatch;
pub mod list;
pub mod read;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::auth::AuthContext;
use crate::models::notifications::{entities::NotificationBox, requests::NotificationListQuery};
use crate::storage::Storage;

pub use dispatch::{DispatchReport, NotificationDispatcher};

pub struct NotificationService {
    storage: Option<Arc<dyn Storage>>,
}

impl NotificationService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => super::storage_from_request(request),
        }
    }

    // 收件箱、发件箱或两者
    pub async fn list_notifications(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        mailbox: NotificationBox,
        query: NotificationListQuery,
    ) -> ActixResult<HttpResponse> {
        list::list_notifications(self, request, auth, mailbox, query).await
    }

    pub async fn unread_count(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
    ) -> ActixResult<HttpResponse> {
        list::unread_count(self, request, auth).await
    }

    // 接收者或发送者可见
    pub async fn get_notification(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        notification_id: i64,
    ) -> ActixResult<HttpResponse> {
        read::get_notification(self, request, auth, notification_id).await
    }

    pub async fn mark_read(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        notification_id: i64,
    ) -> ActixResult<HttpResponse> {
        read::mark_read(self, request, auth, notification_id).await
    }

    pub async fn mark_all_read(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
    ) -> ActixResult<HttpResponse> {
        read::mark_all_read(self, request, auth).await
    }
}
