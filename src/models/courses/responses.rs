use serde::Serialize;
use ts_rs::TS;

use super::entities::Course;
use crate::models::common::pagination::PaginationInfo;

// 课程列表响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "api/course.ts")]
pub struct CourseListResponse {
    pub items: Vec<Course>,
    pub pagination: PaginationInfo,
}

// 课程导出行，人数按去重后的用户计
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "api/course.ts")]
pub struct CourseExportRow {
    pub course: Course,
    pub students_count: u64,
    pub teachers_count: u64,
    pub groups_count: u64,
    pub tasks_count: u64,
}
