use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::info;

use super::{GroupService, can_manage_group};
use crate::config::AppConfig;
use crate::errors::Result;
use crate::models::auth::AuthContext;
use crate::models::groups::{
    entities::CourseGroup,
    requests::{CreateGroupRequest, GroupListQuery, UpdateGroupRequest},
    responses::{GroupDetail, GroupTokenResponse},
};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{error_response, not_found};
use crate::storage::Storage;

fn link_for(group: &CourseGroup) -> String {
    group.registration_link(&AppConfig::get().enrollment.link_base_url)
}

/// 组装分组详情；`show_link` 为假时不暴露注册链接
async fn group_detail(
    storage: &Arc<dyn Storage>,
    group: CourseGroup,
    show_link: bool,
) -> Result<GroupDetail> {
    let course_name = storage
        .get_course_by_id(group.course_id)
        .await?
        .map(|course| course.name)
        .unwrap_or_default();
    let (students, teachers) = storage.count_group_members(group.id).await?;
    let registration_link = if show_link {
        link_for(&group)
    } else {
        String::new()
    };

    Ok(GroupDetail {
        group,
        course_name,
        registration_link,
        student_count: students as i64,
        teacher_count: teachers as i64,
    })
}

pub async fn create_group(
    service: &GroupService,
    request: &HttpRequest,
    auth: AuthContext,
    data: CreateGroupRequest,
) -> ActixResult<HttpResponse> {
    if let Err(errors) = data.validate() {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::validation_failed(errors)));
    }
    let storage = service.get_storage(request)?;

    match storage.get_course_by_id(data.course_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Ok(not_found(ErrorCode::CourseNotFound, "Course not found")),
        Err(e) => return Ok(error_response(&e)),
    }

    let group = match storage.create_group(data).await {
        Ok(group) => group,
        Err(e) => return Ok(error_response(&e)),
    };
    info!(
        event = "courses.group.create",
        actor_id = auth.user_id(),
        group_id = group.id,
        self_registration = group.self_registration,
        "Group {} created",
        group.name
    );

    match group_detail(&storage, group, true).await {
        Ok(detail) => Ok(HttpResponse::Created().json(ApiResponse::success(detail, "Group created"))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn list_groups(
    service: &GroupService,
    request: &HttpRequest,
    query: GroupListQuery,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    match storage.list_groups_with_pagination(query).await {
        Ok(list) => Ok(HttpResponse::Ok().json(ApiResponse::success(list, "Groups retrieved"))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn my_groups(
    service: &GroupService,
    request: &HttpRequest,
    auth: AuthContext,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    match storage.list_user_groups(auth.user_id()).await {
        Ok(groups) => Ok(HttpResponse::Ok().json(ApiResponse::success(groups, "Groups retrieved"))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn get_group(
    service: &GroupService,
    request: &HttpRequest,
    auth: AuthContext,
    group_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    let group = match storage.get_group_by_id(group_id).await {
        Ok(Some(group)) => group,
        Ok(None) => return Ok(not_found(ErrorCode::GroupNotFound, "Group not found")),
        Err(e) => return Ok(error_response(&e)),
    };

    let show_link = match can_manage_group(&storage, &auth, &group).await {
        Ok(allowed) => allowed,
        Err(e) => return Ok(error_response(&e)),
    };

    match group_detail(&storage, group, show_link).await {
        Ok(detail) => Ok(HttpResponse::Ok().json(ApiResponse::success(detail, "Group retrieved"))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn update_group(
    service: &GroupService,
    request: &HttpRequest,
    auth: AuthContext,
    group_id: i64,
    data: UpdateGroupRequest,
) -> ActixResult<HttpResponse> {
    if let Err(errors) = data.validate() {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::validation_failed(errors)));
    }
    let storage = service.get_storage(request)?;

    let group = match storage.update_group(group_id, data).await {
        Ok(Some(group)) => group,
        Ok(None) => return Ok(not_found(ErrorCode::GroupNotFound, "Group not found")),
        Err(e) => return Ok(error_response(&e)),
    };
    info!(
        event = "courses.group.update",
        actor_id = auth.user_id(),
        group_id,
        has_token = group.registration_token.is_some(),
        "Group {} updated",
        group.name
    );

    match group_detail(&storage, group, true).await {
        Ok(detail) => Ok(HttpResponse::Ok().json(ApiResponse::success(detail, "Group updated"))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn delete_group(
    service: &GroupService,
    request: &HttpRequest,
    auth: AuthContext,
    group_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    match storage.soft_delete_group(group_id).await {
        Ok(true) => {
            info!(
                event = "courses.group.delete",
                actor_id = auth.user_id(),
                group_id,
                "Group soft deleted"
            );
            Ok(HttpResponse::Ok().json(ApiResponse::<()>::success_empty("Group deleted")))
        }
        Ok(false) => Ok(not_found(ErrorCode::GroupNotFound, "Group not found")),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn deactivate_group(
    service: &GroupService,
    request: &HttpRequest,
    auth: AuthContext,
    group_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    match storage.deactivate_group(group_id).await {
        Ok(Some(group)) => {
            info!(
                event = "courses.group.deactivate",
                actor_id = auth.user_id(),
                group_id,
                "Group deactivated"
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(group, "Group deactivated")))
        }
        Ok(None) => Ok(not_found(ErrorCode::GroupNotFound, "Group not found")),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn refresh_token(
    service: &GroupService,
    request: &HttpRequest,
    auth: AuthContext,
    group_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    let group = match storage.get_group_by_id(group_id).await {
        Ok(Some(group)) => group,
        Ok(None) => return Ok(not_found(ErrorCode::GroupNotFound, "Group not found")),
        Err(e) => return Ok(error_response(&e)),
    };

    if !group.self_registration {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::SelfRegistrationDisabled,
            "Self registration is disabled for this group",
        )));
    }

    match storage.refresh_group_token(group.id).await {
        Ok(Some(group)) => {
            info!(
                event = "courses.group.refresh-token",
                actor_id = auth.user_id(),
                group_id,
                "Registration token regenerated"
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                GroupTokenResponse {
                    registration_link: link_for(&group),
                    token_expires_at: group.token_expires_at,
                },
                "Registration token refreshed",
            )))
        }
        Ok(None) => Ok(not_found(ErrorCode::GroupNotFound, "Group not found")),
        Err(e) => Ok(error_response(&e)),
    }
}
