use serde::Serialize;
use ts_rs::TS;

use super::entities::CourseGroup;
use crate::models::common::pagination::PaginationInfo;
use crate::models::enrollments::entities::CourseEnrollment;

// 分组详情
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "api/group.ts")]
pub struct GroupDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    pub group: CourseGroup,
    pub course_name: String,
    /// 仅管理者可见，其余情况为空串
    pub registration_link: String,
    pub student_count: i64,
    pub teacher_count: i64,
}

// 分组列表响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "api/group.ts")]
pub struct GroupListResponse {
    pub items: Vec<CourseGroup>,
    pub pagination: PaginationInfo,
}

// 刷新令牌响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "api/group.ts")]
pub struct GroupTokenResponse {
    pub registration_link: String,
    pub token_expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

// 令牌加入分组响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "api/group.ts")]
pub struct EnrollByTokenResponse {
    pub message: String,
    pub group_id: i64,
    pub enrollment: CourseEnrollment,
}
