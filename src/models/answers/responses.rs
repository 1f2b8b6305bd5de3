use serde::Serialize;
use ts_rs::TS;

use super::entities::{Answer, AnswerStatus};
use crate::models::common::pagination::PaginationInfo;
use crate::models::grades::{entities::Grade, responses::GradeInfo};
use crate::models::tasks::entities::Task;
use crate::models::users::responses::UserSummary;

// 答案详情
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "api/answer.ts")]
pub struct AnswerRead {
    pub id: i64,
    pub task: Task,
    pub user: UserSummary,
    pub description: Option<String>,
    pub status: AnswerStatus,
    pub status_display: String,
    pub grade_info: Option<GradeInfo>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl AnswerRead {
    /// `grader` 只在查看者为教师或管理员时传入
    pub fn new(
        answer: Answer,
        task: Task,
        user: UserSummary,
        grade: Option<&Grade>,
        grader: Option<UserSummary>,
    ) -> Self {
        Self {
            id: answer.id,
            task,
            user,
            description: answer.description,
            status: answer.status,
            status_display: answer.status.display_name().to_string(),
            grade_info: grade.map(|g| GradeInfo::new(g, grader)),
            created_at: answer.created_at,
            updated_at: answer.updated_at,
        }
    }
}

// 答案列表响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "api/answer.ts")]
pub struct AnswerListResponse {
    pub items: Vec<AnswerRead>,
    pub pagination: PaginationInfo,
}
