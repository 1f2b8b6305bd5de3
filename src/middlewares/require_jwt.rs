/*!
 * JWT 认证中间件
 *
 * 校验 `Authorization: Bearer <access_token>`，成功后把 [`AuthContext`] 写入请求扩展，
 * 处理函数直接以 `AuthContext` 作为参数提取。
 *
 * ```rust,ignore
 * web::scope("/api/v1/groups")
 *     .wrap(RequireJWT)
 *     .route("/my", web::get().to(my_groups));
 *
 * async fn my_groups(auth: AuthContext, req: HttpRequest) -> ActixResult<HttpResponse> { ... }
 * ```
 *
 * 身份上下文按 `auth:{token}` 缓存 `cache.default_ttl` 秒，命中时不再查询用户表。
 * WebSocket 握手无法携带请求头，改用 [`authenticate_token`] 校验查询参数中的 token。
 */

use crate::cache::{CacheResult, ObjectCache};
use crate::config::AppConfig;
use crate::models::ErrorCode;
use crate::models::auth::AuthContext;
use crate::models::users::entities::UserStatus;
use crate::storage::Storage;
use actix_service::{Service, Transform};
use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest,
    body::EitherBody,
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::StatusCode,
    web,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::{rc::Rc, sync::Arc};
use tracing::{debug, info};

use super::create_error_response;

const BEARER_PREFIX: &str = "Bearer ";
const AUTHORIZATION_HEADER: &str = "Authorization";

#[derive(Clone)]
pub struct RequireJWT;

pub(crate) fn auth_cache_key(token: &str) -> String {
    format!("auth:{token}")
}

/// 校验 access token 并加载身份上下文
pub async fn authenticate_token(
    token: &str,
    storage: &Arc<dyn Storage>,
    cache: Option<&Arc<dyn ObjectCache>>,
) -> Result<AuthContext, String> {
    let claims = crate::utils::jwt::JwtUtils::verify_access_token(token).map_err(|err| {
        info!("JWT token validation failed: {}", err);
        "Invalid JWT token".to_string()
    })?;

    if let Some(cache) = cache {
        match cache.get_json::<AuthContext>(&auth_cache_key(token)).await {
            CacheResult::Found(context) => return Ok(context),
            _ => debug!("Auth context not cached for user {}", claims.sub),
        }
    }

    let user_id = claims
        .user_id()
        .ok_or_else(|| "Invalid user ID in JWT".to_string())?;

    let user = storage
        .get_user_by_id(user_id)
        .await
        .map_err(|_| "Failed to retrieve user from storage".to_string())?
        .ok_or_else(|| "User not found".to_string())?;

    if user.status != UserStatus::Active {
        return Err("User is not active".to_string());
    }

    let context = AuthContext::new(user);
    if let Some(cache) = cache {
        cache
            .insert_json(
                auth_cache_key(token),
                &context,
                AppConfig::get().cache.default_ttl,
            )
            .await;
    }

    Ok(context)
}

async fn extract_and_validate_jwt(req: &ServiceRequest) -> Result<AuthContext, String> {
    let token = req
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix(BEARER_PREFIX))
        .ok_or_else(|| "Missing or invalid Authorization header".to_string())?;

    let storage = req
        .app_data::<web::Data<Arc<dyn Storage>>>()
        .map(|data| data.get_ref().clone())
        .ok_or_else(|| "Storage not configured".to_string())?;
    let cache = req
        .app_data::<web::Data<Arc<dyn ObjectCache>>>()
        .map(|data| data.get_ref().clone());

    authenticate_token(token, &storage, cache.as_ref()).await
}

impl<S, B> Transform<S, ServiceRequest> for RequireJWT
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireJWTMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireJWTMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RequireJWTMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequireJWTMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        Box::pin(async move {
            // 预检请求直接放行
            if req.method() == actix_web::http::Method::OPTIONS {
                return Ok(req.into_response(
                    create_error_response(StatusCode::NO_CONTENT, ErrorCode::Success, "")
                        .map_into_right_body(),
                ));
            }

            match extract_and_validate_jwt(&req).await {
                Ok(context) => {
                    debug!("JWT authentication successful for ID: {}", context.user_id());
                    req.extensions_mut().insert(context);
                    let res = srv.call(req).await?.map_into_left_body();
                    Ok(res)
                }
                Err(err) => {
                    info!(
                        "JWT authentication failed for request to {}: {}",
                        req.path(),
                        err
                    );
                    Ok(req.into_response(
                        create_error_response(
                            StatusCode::UNAUTHORIZED,
                            ErrorCode::Unauthorized,
                            &format!("Unauthorized: {err}"),
                        )
                        .map_into_right_body(),
                    ))
                }
            }
        })
    }
}

impl RequireJWT {
    /// 从请求扩展中取出身份上下文，须在应用了 `RequireJWT` 的路由中使用
    pub fn extract_auth_context(req: &HttpRequest) -> Option<AuthContext> {
        req.extensions().get::<AuthContext>().cloned()
    }
}

impl FromRequest for AuthContext {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(RequireJWT::extract_auth_context(req).ok_or_else(|| {
            actix_web::error::InternalError::from_response(
                "missing auth context",
                create_error_response(
                    StatusCode::UNAUTHORIZED,
                    ErrorCode::Unauthorized,
                    "Authentication required",
                ),
            )
            .into()
        }))
    }
}
