//! 路径参数提取器
//!
//! 路径中的 ID 解析失败时直接返回 400 和统一的 `ApiResponse`，
//! 而不是 actix 默认的纯文本 404。

/// 定义一个从路径参数中解析 `i64` 的提取器
#[macro_export]
macro_rules! define_safe_i64_extractor {
    ($name:ident, $param:literal) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name(pub i64);

        impl actix_web::FromRequest for $name {
            type Error = actix_web::Error;
            type Future = std::future::Ready<Result<Self, Self::Error>>;

            fn from_request(
                req: &actix_web::HttpRequest,
                _payload: &mut actix_web::dev::Payload,
            ) -> Self::Future {
                let parsed = req
                    .match_info()
                    .get($param)
                    .and_then(|raw| raw.parse::<i64>().ok())
                    .filter(|id| *id > 0);

                std::future::ready(match parsed {
                    Some(id) => Ok($name(id)),
                    None => {
                        let body = $crate::models::ApiResponse::<()>::error_empty(
                            $crate::models::ErrorCode::BadRequest,
                            format!("Invalid path parameter: {}", $param),
                        );
                        Err(actix_web::error::InternalError::from_response(
                            "invalid path parameter",
                            actix_web::HttpResponse::BadRequest().json(body),
                        )
                        .into())
                    }
                })
            }
        }
    };
}

define_safe_i64_extractor!(SafeIDI64, "id");
define_safe_i64_extractor!(SafeRoomIdI64, "room_id");
