use serde::Deserialize;
use ts_rs::TS;

use crate::models::FieldErrors;
use crate::models::common::pagination::{default_page, default_size, deserialize_string_to_i64};

// 创建分组请求
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "api/group.ts")]
pub struct CreateGroupRequest {
    pub course_id: i64,
    pub name: String,
    pub students_limit: Option<i32>,
    pub days_of_week: Option<String>,
    #[serde(default)]
    pub self_registration: bool,
    #[serde(default)]
    pub token_validity_hours: i32,
    #[serde(default)]
    pub token_validity_days: i32,
}

impl CreateGroupRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors
                .entry("name".into())
                .or_default()
                .push("This field may not be blank.".into());
        }
        check_non_negative(&mut errors, "students_limit", self.students_limit);
        check_non_negative(&mut errors, "token_validity_hours", Some(self.token_validity_hours));
        check_non_negative(&mut errors, "token_validity_days", Some(self.token_validity_days));
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// 更新分组请求，未提供的字段保持不变
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = "api/group.ts")]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub students_limit: Option<i32>,
    pub days_of_week: Option<String>,
    pub self_registration: Option<bool>,
    pub token_validity_hours: Option<i32>,
    pub token_validity_days: Option<i32>,
    pub is_active: Option<bool>,
}

impl UpdateGroupRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            errors
                .entry("name".into())
                .or_default()
                .push("This field may not be blank.".into());
        }
        check_non_negative(&mut errors, "students_limit", self.students_limit);
        check_non_negative(&mut errors, "token_validity_hours", self.token_validity_hours);
        check_non_negative(&mut errors, "token_validity_days", self.token_validity_days);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn check_non_negative(errors: &mut FieldErrors, field: &str, value: Option<i32>) {
    if let Some(v) = value
        && v < 0
    {
        errors
            .entry(field.to_string())
            .or_default()
            .push("Ensure this value is greater than or equal to 0.".into());
    }
}

// 分组列表查询参数
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "api/group.ts")]
pub struct GroupListQuery {
    #[serde(
        default = "default_page",
        deserialize_with = "deserialize_string_to_i64"
    )]
    pub page: i64,
    #[serde(
        default = "default_size",
        deserialize_with = "deserialize_string_to_i64"
    )]
    pub size: i64,
    pub search: Option<String>,
    pub course_id: Option<i64>,
    /// `true`（默认）、`false` 或 `all`
    pub is_active: Option<String>,
}

impl GroupListQuery {
    /// `None` 表示不按激活状态过滤
    pub fn active_filter(&self) -> Result<Option<bool>, String> {
        match self.is_active.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("true") => Ok(Some(true)),
            Some("false") => Ok(Some(false)),
            Some("all") => Ok(None),
            Some(other) => Err(format!("Invalid is_active value: {other}")),
        }
    }
}
