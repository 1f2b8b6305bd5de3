//! 答案评阅流程中的纯逻辑
//!
//! 评阅被拆成三步：
//! 1. [`plan_review`]：根据当前状态、已有评分和请求计算差异（[`ReviewPlan`]）
//! 2. 存储层按计划在事务内落库
//! 3. [`compose_notification`]：根据计划生成通知标题与正文（[`NotificationDraft`]）
//!
//! 不变量：评阅后状态不是 `approved` 时，评分中的 `score` 一定为空。

use serde::Serialize;

use super::entities::{Answer, AnswerStatus};
use crate::models::grades::entities::{
    DEFAULT_MAX_SCORE, Grade, LetterGrade, format_percentage, percentage,
};
use crate::models::notifications::entities::Notification;
use crate::models::tasks::entities::Task;

/// 校验后的评阅请求
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewPayload {
    pub status: Option<AnswerStatus>,
    pub feedback_text: Option<String>,
    pub score: Option<i32>,
    pub max_score: Option<i32>,
    pub delete_grade: bool,
}

impl ReviewPayload {
    fn touches_grade(&self) -> bool {
        self.score.is_some() || self.max_score.is_some() || self.feedback_text.is_some()
    }
}

/// 评分中参与变更判断的字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeValues {
    pub score: Option<i32>,
    pub max_score: i32,
    pub feedback_text: Option<String>,
}

impl From<&Grade> for GradeValues {
    fn from(grade: &Grade) -> Self {
        Self {
            score: grade.score,
            max_score: grade.max_score,
            feedback_text: grade.feedback_text.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeAction {
    Added,
    Updated,
    Removed,
}

impl GradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeAction::Added => "added",
            GradeAction::Updated => "updated",
            GradeAction::Removed => "removed",
        }
    }
}

/// 存储层需要对评分表执行的写操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradeWrite {
    Keep,
    Delete,
    /// 不存在时创建，存在时覆盖
    Save(GradeValues),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewPlan {
    pub previous_status: AnswerStatus,
    pub new_status: AnswerStatus,
    pub status_changed: bool,
    pub grade_write: GradeWrite,
    pub grade_changed: bool,
    /// 仅在 `grade_changed` 时有值
    pub grade_action: Option<GradeAction>,
    /// 评阅完成后的评分，删除或从未评分时为空
    pub resulting_grade: Option<GradeValues>,
}

impl ReviewPlan {
    pub fn has_changes(&self) -> bool {
        self.status_changed || self.grade_changed
    }

    pub fn grade_removed(&self) -> bool {
        self.grade_action == Some(GradeAction::Removed)
    }

    /// 通知中保存的评语快照
    pub fn feedback_snapshot(&self) -> String {
        if self.grade_removed() {
            return String::new();
        }
        self.resulting_grade
            .as_ref()
            .and_then(|g| g.feedback_text.clone())
            .unwrap_or_default()
    }
}

/// 计算一次评阅的全部差异
pub fn plan_review(
    previous_status: AnswerStatus,
    existing: Option<&GradeValues>,
    payload: &ReviewPayload,
) -> ReviewPlan {
    let new_status = payload.status.unwrap_or(previous_status);
    let status_changed = previous_status != new_status;

    let (grade_write, grade_changed, grade_action, resulting_grade) = if payload.delete_grade {
        match existing {
            Some(_) => (GradeWrite::Delete, true, Some(GradeAction::Removed), None),
            None => (GradeWrite::Keep, false, None, None),
        }
    } else if payload.touches_grade() {
        let mut values = existing.cloned().unwrap_or(GradeValues {
            score: None,
            max_score: DEFAULT_MAX_SCORE,
            feedback_text: None,
        });

        if new_status == AnswerStatus::Approved {
            if let Some(score) = payload.score {
                values.score = Some(score);
            }
            if let Some(max_score) = payload.max_score {
                values.max_score = if max_score == 0 {
                    DEFAULT_MAX_SCORE
                } else {
                    max_score
                };
            }
        } else {
            values.score = None;
        }

        if let Some(feedback) = &payload.feedback_text {
            values.feedback_text = Some(feedback.clone());
        }

        let changed = existing != Some(&values);
        let action = match existing {
            None => GradeAction::Added,
            Some(_) => GradeAction::Updated,
        };
        (
            GradeWrite::Save(values.clone()),
            changed,
            changed.then_some(action),
            Some(values),
        )
    } else {
        match existing {
            // 状态离开 approved 时清掉残留分数
            Some(current) if new_status != AnswerStatus::Approved && current.score.is_some() => {
                let values = GradeValues {
                    score: None,
                    ..current.clone()
                };
                (
                    GradeWrite::Save(values.clone()),
                    true,
                    Some(GradeAction::Updated),
                    Some(values),
                )
            }
            _ => (GradeWrite::Keep, false, None, existing.cloned()),
        }
    };

    ReviewPlan {
        previous_status,
        new_status,
        status_changed,
        grade_write,
        grade_changed,
        grade_action,
        resulting_grade,
    }
}

/// 待写入的通知内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub title: String,
    pub content: String,
    pub feedback: String,
}

/// 评分行：`Grade: 95/100 (95.0% - A)` 与 `Feedback: ...`
pub fn grade_lines(values: &GradeValues) -> String {
    let mut lines = Vec::new();
    if let Some(score) = values.score {
        let letter = LetterGrade::from_percentage(percentage(Some(score), values.max_score));
        lines.push(format!(
            "Grade: {}/{} ({}% - {})",
            score,
            values.max_score,
            format_percentage(Some(score), values.max_score),
            letter
        ));
    }
    if let Some(feedback) = &values.feedback_text
        && !feedback.trim().is_empty()
    {
        lines.push(format!("Feedback: {}", feedback.trim()));
    }
    lines.join("\n")
}

fn append_block(content: &mut String, block: &str) {
    if !content.is_empty() {
        content.push_str("\n\n");
    }
    content.push_str(block);
}

/// 根据评阅计划生成通知；状态与评分都未变化时返回 `None`
pub fn compose_notification(plan: &ReviewPlan, task: &Task) -> Option<NotificationDraft> {
    if !plan.has_changes() {
        return None;
    }

    let task_title = task.display_title();
    let status_display = plan.new_status.display_name();
    let updated_title = format!("Your answer for {task_title} has been updated");

    let mut title: Option<String> = None;
    let mut content = String::new();

    if plan.status_changed
        && let Some(message) = plan.new_status.review_message()
    {
        let action = if plan.previous_status == AnswerStatus::InReview {
            "reviewed"
        } else {
            "updated"
        };
        title = Some(format!("Your answer for {task_title} has been {action}"));
        content = format!(
            "{message}\n\nTask: {} (#{})\nStatus: {status_display}",
            task.name,
            task.number_label()
        );
    }

    if plan.grade_changed {
        let action = plan.grade_action.unwrap_or(GradeAction::Updated).as_str();
        let removed = plan.grade_removed();
        let lines = if removed {
            String::new()
        } else {
            plan.resulting_grade
                .as_ref()
                .map(grade_lines)
                .unwrap_or_default()
        };

        if plan.status_changed {
            title = Some(format!(
                "{} with grade {action}",
                title.unwrap_or_else(|| updated_title.clone())
            ));
            if removed {
                append_block(&mut content, "The grade has been removed.");
            } else if !lines.is_empty() {
                append_block(&mut content, &lines);
            }
        } else {
            title = Some(format!("Your grade for {task_title} has been {action}"));
            content = if removed {
                format!("The grade for your answer has been removed.\n\nStatus: {status_display}")
            } else if !lines.is_empty() {
                format!("{lines}\n\nStatus: {status_display}")
            } else {
                format!("Status: {status_display}")
            };
        }
    }

    let title = title.unwrap_or(updated_title);
    if content.is_empty() {
        content = format!("Status: {status_display}");
    }

    Some(NotificationDraft {
        title,
        content,
        feedback: plan.feedback_snapshot(),
    })
}

/// 评阅事务提交后的结果
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub answer: Answer,
    pub grade: Option<Grade>,
    pub plan: ReviewPlan,
    /// 本次评阅写入（或更新）的通知
    pub notification: Option<Notification>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        let now = chrono::Utc::now();
        Task {
            id: 7,
            course_id: 1,
            number: Some(4),
            name: "Sorting".into(),
            description: None,
            created_by: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn grade(score: Option<i32>, feedback: Option<&str>) -> GradeValues {
        GradeValues {
            score,
            max_score: 100,
            feedback_text: feedback.map(str::to_string),
        }
    }

    #[test]
    fn test_no_changes_yields_no_notification() {
        let existing = grade(Some(80), Some("ok"));
        let payload = ReviewPayload {
            status: Some(AnswerStatus::Approved),
            score: Some(80),
            feedback_text: Some("ok".into()),
            ..Default::default()
        };
        let plan = plan_review(AnswerStatus::Approved, Some(&existing), &payload);
        assert!(!plan.has_changes());
        assert!(compose_notification(&plan, &task()).is_none());
    }

    #[test]
    fn test_empty_payload_is_a_no_op() {
        let plan = plan_review(AnswerStatus::InReview, None, &ReviewPayload::default());
        assert!(!plan.has_changes());
        assert_eq!(plan.grade_write, GradeWrite::Keep);
    }

    #[test]
    fn test_approve_with_grade_on_fresh_answer() {
        let payload = ReviewPayload {
            status: Some(AnswerStatus::Approved),
            score: Some(95),
            max_score: Some(100),
            feedback_text: Some("Clean solution".into()),
            ..Default::default()
        };
        let plan = plan_review(AnswerStatus::InReview, None, &payload);
        assert!(plan.status_changed);
        assert!(plan.grade_changed);
        assert_eq!(plan.grade_action, Some(GradeAction::Added));

        let draft = compose_notification(&plan, &task()).unwrap();
        assert_eq!(
            draft.title,
            "Your answer for Task 4. Sorting has been reviewed with grade added"
        );
        assert_eq!(
            draft.content,
            "Great job! Your answer has been approved ✅.\n\n\
             Task: Sorting (#4)\nStatus: Approved\n\n\
             Grade: 95/100 (95.0% - A)\nFeedback: Clean solution"
        );
        assert_eq!(draft.feedback, "Clean solution");
    }

    #[test]
    fn test_score_cleared_for_non_approved_status() {
        let existing = grade(Some(70), None);
        let payload = ReviewPayload {
            status: Some(AnswerStatus::HaveFlaws),
            score: Some(90),
            feedback_text: Some("Fix edge cases".into()),
            ..Default::default()
        };
        let plan = plan_review(AnswerStatus::Approved, Some(&existing), &payload);
        let resulting = plan.resulting_grade.clone().unwrap();
        assert_eq!(resulting.score, None);
        assert_eq!(plan.grade_action, Some(GradeAction::Updated));

        let draft = compose_notification(&plan, &task()).unwrap();
        assert_eq!(
            draft.title,
            "Your answer for Task 4. Sorting has been updated with grade updated"
        );
        assert!(draft.content.ends_with("Feedback: Fix edge cases"));
        assert!(!draft.content.contains("Grade:"));
    }

    #[test]
    fn test_status_change_alone_clears_leftover_score() {
        let existing = grade(Some(88), Some("good"));
        let payload = ReviewPayload {
            status: Some(AnswerStatus::Rejected),
            ..Default::default()
        };
        let plan = plan_review(AnswerStatus::Approved, Some(&existing), &payload);
        assert_eq!(
            plan.grade_write,
            GradeWrite::Save(grade(None, Some("good")))
        );
        assert!(plan.grade_changed);
    }

    #[test]
    fn test_delete_grade_mentions_removal() {
        let existing = grade(Some(60), Some("meh"));
        let payload = ReviewPayload {
            delete_grade: true,
            score: Some(100),
            ..Default::default()
        };
        let plan = plan_review(AnswerStatus::Approved, Some(&existing), &payload);
        assert_eq!(plan.grade_write, GradeWrite::Delete);
        assert!(plan.grade_removed());

        let draft = compose_notification(&plan, &task()).unwrap();
        assert_eq!(draft.title, "Your grade for Task 4. Sorting has been removed");
        assert_eq!(
            draft.content,
            "The grade for your answer has been removed.\n\nStatus: Approved"
        );
        assert_eq!(draft.feedback, "");
    }

    #[test]
    fn test_delete_grade_with_status_change() {
        let existing = grade(Some(60), None);
        let payload = ReviewPayload {
            status: Some(AnswerStatus::Rejected),
            delete_grade: true,
            ..Default::default()
        };
        let plan = plan_review(AnswerStatus::Approved, Some(&existing), &payload);
        let draft = compose_notification(&plan, &task()).unwrap();
        assert_eq!(
            draft.title,
            "Your answer for Task 4. Sorting has been updated with grade removed"
        );
        assert!(draft.content.ends_with("\n\nThe grade has been removed."));
    }

    #[test]
    fn test_delete_without_grade_is_not_a_change() {
        let payload = ReviewPayload {
            delete_grade: true,
            ..Default::default()
        };
        let plan = plan_review(AnswerStatus::InReview, None, &payload);
        assert!(!plan.has_changes());
    }

    #[test]
    fn test_grade_only_update() {
        let existing = grade(Some(50), None);
        let payload = ReviewPayload {
            score: Some(75),
            ..Default::default()
        };
        let plan = plan_review(AnswerStatus::Approved, Some(&existing), &payload);
        let draft = compose_notification(&plan, &task()).unwrap();
        assert_eq!(draft.title, "Your grade for Task 4. Sorting has been updated");
        assert_eq!(
            draft.content,
            "Grade: 75/100 (75.0% - B)\n\nStatus: Approved"
        );
    }

    #[test]
    fn test_back_to_in_review_uses_fallback_title() {
        let payload = ReviewPayload {
            status: Some(AnswerStatus::InReview),
            ..Default::default()
        };
        let plan = plan_review(AnswerStatus::HaveFlaws, None, &payload);
        let draft = compose_notification(&plan, &task()).unwrap();
        assert_eq!(draft.title, "Your answer for Task 4. Sorting has been updated");
        assert_eq!(draft.content, "Status: In review");
    }

    #[test]
    fn test_zero_max_score_falls_back_to_default() {
        let payload = ReviewPayload {
            status: Some(AnswerStatus::Approved),
            score: Some(40),
            max_score: Some(0),
            ..Default::default()
        };
        let plan = plan_review(AnswerStatus::InReview, None, &payload);
        assert_eq!(plan.resulting_grade.unwrap().max_score, DEFAULT_MAX_SCORE);
    }

    #[test]
    fn test_re_review_from_rejected_says_updated() {
        let payload = ReviewPayload {
            status: Some(AnswerStatus::Approved),
            ..Default::default()
        };
        let plan = plan_review(AnswerStatus::Rejected, None, &payload);
        let draft = compose_notification(&plan, &task()).unwrap();
        assert_eq!(draft.title, "Your answer for Task 4. Sorting has been updated");
        assert!(draft.content.starts_with("Great job!"));
    }
}
