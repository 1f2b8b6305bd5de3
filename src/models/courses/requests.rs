use serde::Deserialize;
use ts_rs::TS;

use crate::models::FieldErrors;
use crate::models::common::pagination::{default_page, default_size, deserialize_string_to_i64};

// 创建课程请求
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "api/course.ts")]
pub struct CreateCourseRequest {
    pub name: String,
    pub description: Option<String>,
}

impl CreateCourseRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = self.name.trim();
        if name.is_empty() {
            errors.insert("name".into(), vec!["This field may not be blank.".into()]);
        } else if name.chars().count() > 200 {
            errors.insert(
                "name".into(),
                vec!["Ensure this field has no more than 200 characters.".into()],
            );
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// 课程列表查询参数
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "api/course.ts")]
pub struct CourseListQuery {
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
}

// 课程导出参数，file_type 取 csv 或 xlsx
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "api/course.ts")]
pub struct CourseExportQuery {
    pub file_type: Option<String>,
}
