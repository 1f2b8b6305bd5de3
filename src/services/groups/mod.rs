//! 课程分组
//!
//! 分组的增删改、注册令牌生命周期、令牌选课、成员管理与成绩单导出。

pub mod enroll;
pub mod export;
pub mod manage;
pub mod members;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::errors::Result;
use crate::models::auth::AuthContext;
use crate::models::enrollments::{entities::EnrollmentRole, requests::GroupMembersRequest};
use crate::models::groups::entities::CourseGroup;
use crate::models::groups::requests::{CreateGroupRequest, GroupListQuery, UpdateGroupRequest};
use crate::storage::Storage;

pub struct GroupService {
    storage: Option<Arc<dyn Storage>>,
}

impl GroupService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => super::storage_from_request(request),
        }
    }

    pub async fn create_group(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        data: CreateGroupRequest,
    ) -> ActixResult<HttpResponse> {
        manage::create_group(self, request, auth, data).await
    }

    pub async fn list_groups(
        &self,
        request: &HttpRequest,
        query: GroupListQuery,
    ) -> ActixResult<HttpResponse> {
        manage::list_groups(self, request, query).await
    }

    pub async fn my_groups(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
    ) -> ActixResult<HttpResponse> {
        manage::my_groups(self, request, auth).await
    }

    pub async fn get_group(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        group_id: i64,
    ) -> ActixResult<HttpResponse> {
        manage::get_group(self, request, auth, group_id).await
    }

    pub async fn update_group(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        group_id: i64,
        data: UpdateGroupRequest,
    ) -> ActixResult<HttpResponse> {
        manage::update_group(self, request, auth, group_id, data).await
    }

    pub async fn delete_group(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        group_id: i64,
    ) -> ActixResult<HttpResponse> {
        manage::delete_group(self, request, auth, group_id).await
    }

    pub async fn deactivate_group(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        group_id: i64,
    ) -> ActixResult<HttpResponse> {
        manage::deactivate_group(self, request, auth, group_id).await
    }

    pub async fn refresh_token(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        group_id: i64,
    ) -> ActixResult<HttpResponse> {
        manage::refresh_token(self, request, auth, group_id).await
    }

    pub async fn enroll_by_token(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        token: String,
    ) -> ActixResult<HttpResponse> {
        enroll::enroll_by_token(self, request, auth, token).await
    }

    pub async fn add_members(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        group_id: i64,
        role: EnrollmentRole,
        data: GroupMembersRequest,
    ) -> ActixResult<HttpResponse> {
        members::add_members(self, request, auth, group_id, role, data).await
    }

    pub async fn remove_members(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        group_id: i64,
        data: GroupMembersRequest,
    ) -> ActixResult<HttpResponse> {
        members::remove_members(self, request, auth, group_id, data).await
    }

    pub async fn list_members(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        group_id: i64,
    ) -> ActixResult<HttpResponse> {
        members::list_members(self, request, auth, group_id).await
    }

    pub async fn export_gradebook(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        group_id: i64,
    ) -> ActixResult<HttpResponse> {
        export::export_gradebook(self, request, auth, group_id).await
    }
}

/// 分组管理者：管理员或该分组的教师
pub(crate) async fn can_manage_group(
    storage: &Arc<dyn Storage>,
    auth: &AuthContext,
    group: &CourseGroup,
) -> Result<bool> {
    if auth.is_admin() {
        return Ok(true);
    }
    if !auth.is_teacher() {
        return Ok(false);
    }
    storage.is_group_teacher(auth.user_id(), group.id).await
}
