use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::models::ErrorCode;

// 统一的API响应结构
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "api/response.ts")]
pub struct ApiResponse<T: TS> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T: TS> ApiResponse<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Success as i32,
            message: message.into(),
            data: Some(data),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error(code: ErrorCode, data: T, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: Some(data),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// 字段级校验错误：字段名 -> 错误信息列表
pub type FieldErrors = BTreeMap<String, Vec<String>>;

impl ApiResponse<FieldErrors> {
    pub fn validation_failed(errors: FieldErrors) -> Self {
        Self::error(ErrorCode::ValidationFailed, errors, "Validation failed")
    }
}

impl ApiResponse<()> {
    pub fn success_empty(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Success as i32,
            message: message.into(),
            data: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error_empty(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: None,
            timestamp: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_empty_omits_data() {
        let resp = ApiResponse::error_empty(ErrorCode::GroupFull, "Too many students");
        let json = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(json["code"], 4013);
        assert_eq!(json["message"], "Too many students");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_validation_failed_carries_field_errors() {
        let mut errors = FieldErrors::new();
        errors.insert("status".into(), vec!["Invalid status value".into()]);
        let json = serde_json::to_value(ApiResponse::validation_failed(errors)).expect("serialize");
        assert_eq!(json["code"], ErrorCode::ValidationFailed as i32);
        assert_eq!(json["data"]["status"][0], "Invalid status value");
    }
}
