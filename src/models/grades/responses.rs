use serde::Serialize;
use ts_rs::TS;

use super::entities::{Grade, LetterGrade};
use crate::models::users::responses::UserSummary;

/// 答案详情中的评分信息
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "api/grade.ts")]
pub struct GradeInfo {
    pub score: Option<i32>,
    pub max_score: i32,
    pub percentage: f64,
    pub letter_grade: LetterGrade,
    pub feedback_text: Option<String>,
    /// 仅对教师和管理员可见
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graded_by: Option<UserSummary>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl GradeInfo {
    pub fn new(grade: &Grade, graded_by: Option<UserSummary>) -> Self {
        Self {
            score: grade.score,
            max_score: grade.max_score,
            percentage: grade.percentage(),
            letter_grade: grade.letter_grade(),
            feedback_text: grade.feedback_text.clone(),
            graded_by,
            updated_at: grade.updated_at,
        }
    }
}
