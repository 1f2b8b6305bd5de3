use serde::Serialize;
use ts_rs::TS;

use super::entities::{CourseEnrollment, EnrollmentRole};
use crate::models::users::responses::UserSummary;

/// 批量操作中单个用户的失败原因
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "api/enrollment.ts")]
pub struct MemberError {
    pub user_id: i64,
    pub message: String,
}

// 批量添加成员响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "api/enrollment.ts")]
pub struct BulkEnrollResponse {
    pub enrolled: Vec<CourseEnrollment>,
    pub errors: Vec<MemberError>,
}

// 批量移除成员响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "api/enrollment.ts")]
pub struct RemoveMembersResponse {
    pub removed: i64,
}

// 分组成员
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "api/enrollment.ts")]
pub struct GroupMember {
    pub enrollment_id: i64,
    pub role: EnrollmentRole,
    pub user: UserSummary,
    pub enrolled_at: chrono::DateTime<chrono::Utc>,
}
