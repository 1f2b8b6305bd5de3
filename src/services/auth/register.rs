use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::{error, info};

use crate::errors::CourseHubError;
use crate::models::{
    ApiResponse, ErrorCode, FieldErrors,
    auth::RegisterRequest,
    users::{entities::UserRole, requests::CreateUserRequest},
};
use crate::storage::Storage;
use crate::utils::password::hash_password;
use crate::utils::validate::validate_registration;

use super::AuthService;

pub async fn handle_register(
    service: &AuthService,
    register_request: RegisterRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    if let Err(errors) = validate_registration(&register_request) {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::validation_failed(errors)));
    }

    let username = register_request.username.trim().to_string();
    let email = register_request.email.trim().to_lowercase();

    match check_identity_taken(&storage, &username, &email).await {
        Ok(errors) if !errors.is_empty() => {
            return Ok(HttpResponse::Conflict().json(ApiResponse::error(
                ErrorCode::UserAlreadyExists,
                errors,
                "User already exists",
            )));
        }
        Ok(_) => {}
        Err(e) => {
            error!("Register lookup failed: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::RegisterFailed,
                    "Register failed",
                )),
            );
        }
    }

    let password_hash = match hash_password(&register_request.password) {
        Ok(hash) => hash,
        Err(e) => {
            error!("Password hashing failed: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::RegisterFailed,
                    "Register failed",
                )),
            );
        }
    };

    let create_request = CreateUserRequest {
        username,
        email,
        password: password_hash,
        first_name: register_request.first_name.trim().to_string(),
        last_name: register_request.last_name.trim().to_string(),
        role: UserRole::Student,
    };

    match storage.create_user(create_request).await {
        Ok(user) => {
            info!(event = "auth.register", user_id = user.id, "User {} registered", user.username);
            Ok(HttpResponse::Created().json(ApiResponse::success(user, "Registration successful")))
        }
        // 并发注册撞上唯一约束
        Err(CourseHubError::Conflict(_)) => Ok(HttpResponse::Conflict().json(
            ApiResponse::error_empty(ErrorCode::UserAlreadyExists, "User already exists"),
        )),
        Err(e) => {
            error!("Register failed: {}", e);
            Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::RegisterFailed,
                    "Register failed",
                )),
            )
        }
    }
}

/// 用户名和邮箱的占用情况，按字段返回
async fn check_identity_taken(
    storage: &Arc<dyn Storage>,
    username: &str,
    email: &str,
) -> crate::errors::Result<FieldErrors> {
    let mut errors = FieldErrors::new();
    if storage.get_user_by_username(username).await?.is_some() {
        errors.insert(
            "username".into(),
            vec!["A user with that username already exists.".into()],
        );
    }
    if storage.get_user_by_email(email).await?.is_some() {
        errors.insert(
            "email".into(),
            vec!["A user with that email already exists.".into()],
        );
    }
    Ok(errors)
}
