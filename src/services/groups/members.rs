use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::{GroupService, can_manage_group};
use crate::models::auth::AuthContext;
use crate::models::enrollments::{
    entities::EnrollmentRole, requests::GroupMembersRequest, responses::RemoveMembersResponse,
};
use crate::models::{ApiResponse, ErrorCode, FieldErrors};
use crate::services::{error_response, forbidden, not_found};

fn empty_ids_response() -> HttpResponse {
    let mut errors = FieldErrors::new();
    errors.insert("user_ids".into(), vec!["This list may not be empty.".into()]);
    HttpResponse::BadRequest().json(ApiResponse::validation_failed(errors))
}

pub async fn add_members(
    service: &GroupService,
    request: &HttpRequest,
    auth: AuthContext,
    group_id: i64,
    role: EnrollmentRole,
    data: GroupMembersRequest,
) -> ActixResult<HttpResponse> {
    let user_ids = data.unique_ids();
    if user_ids.is_empty() {
        return Ok(empty_ids_response());
    }
    let storage = service.get_storage(request)?;

    match storage.add_group_members(group_id, &user_ids, role).await {
        Ok(result) => {
            info!(
                event = "courses.group.add-members",
                actor_id = auth.user_id(),
                group_id,
                role = %role,
                enrolled = result.enrolled.len(),
                failed = result.errors.len(),
                "Group members added"
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(result, "Members processed")))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn remove_members(
    service: &GroupService,
    request: &HttpRequest,
    auth: AuthContext,
    group_id: i64,
    data: GroupMembersRequest,
) -> ActixResult<HttpResponse> {
    let user_ids = data.unique_ids();
    if user_ids.is_empty() {
        return Ok(empty_ids_response());
    }
    let storage = service.get_storage(request)?;

    match storage.get_group_by_id(group_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Ok(not_found(ErrorCode::GroupNotFound, "Group not found")),
        Err(e) => return Ok(error_response(&e)),
    }

    match storage.remove_group_members(group_id, &user_ids).await {
        Ok(removed) => {
            info!(
                event = "courses.group.remove-members",
                actor_id = auth.user_id(),
                group_id,
                removed,
                "Group members removed"
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                RemoveMembersResponse {
                    removed: removed as i64,
                },
                "Members removed",
            )))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn list_members(
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

    match can_manage_group(&storage, &auth, &group).await {
        Ok(true) => {}
        Ok(false) => {
            return Ok(forbidden(
                ErrorCode::GroupPermissionDenied,
                "Only teachers of this group can view its members",
            ));
        }
        Err(e) => return Ok(error_response(&e)),
    }

    match storage.list_group_members(group_id).await {
        Ok(members) => Ok(HttpResponse::Ok().json(ApiResponse::success(members, "Members retrieved"))),
        Err(e) => Ok(error_response(&e)),
    }
}
