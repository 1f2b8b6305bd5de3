use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 答案状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "api/answer.ts")]
pub enum AnswerStatus {
    InReview,
    Approved,
    HaveFlaws,
    Rejected,
}

impl AnswerStatus {
    pub const ALL: [AnswerStatus; 4] = [
        AnswerStatus::InReview,
        AnswerStatus::Approved,
        AnswerStatus::HaveFlaws,
        AnswerStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerStatus::InReview => "in_review",
            AnswerStatus::Approved => "approved",
            AnswerStatus::HaveFlaws => "have_flaws",
            AnswerStatus::Rejected => "rejected",
        }
    }

    /// 面向学生展示的状态名
    pub fn display_name(&self) -> &'static str {
        match self {
            AnswerStatus::InReview => "In review",
            AnswerStatus::Approved => "Approved",
            AnswerStatus::HaveFlaws => "Have Flaws",
            AnswerStatus::Rejected => "Rejected",
        }
    }

    /// 状态变更时通知正文的首段，`in_review` 没有对应文案
    pub fn review_message(&self) -> Option<&'static str> {
        match self {
            AnswerStatus::Approved => Some("Great job! Your answer has been approved ✅."),
            AnswerStatus::Rejected => Some(
                "Unfortunately, your answer was rejected ❌. Please review the task requirements and try again.",
            ),
            AnswerStatus::HaveFlaws => Some(
                "Your answer has some issues ⚠️. Please check the feedback and make the necessary improvements.",
            ),
            AnswerStatus::InReview => None,
        }
    }
}

impl std::fmt::Display for AnswerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnswerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnswerStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid answer status: {s}"))
    }
}

// 学生提交的答案
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "api/answer.ts")]
pub struct Answer {
    pub id: i64,
    pub task_id: i64,
    pub user_id: i64,
    pub description: Option<String>,
    pub status: AnswerStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// 答案连同任务、提交者与评分，供列表和详情组装读模型
#[derive(Debug, Clone)]
pub struct AnswerRecord {
    pub answer: Answer,
    pub task: crate::models::tasks::entities::Task,
    pub student: crate::models::users::entities::User,
    pub grade: Option<crate::models::grades::entities::Grade>,
}
