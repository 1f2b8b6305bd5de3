use serde::Deserialize;
use ts_rs::TS;

use super::entities::AnswerStatus;
use super::review::ReviewPayload;
use crate::models::FieldErrors;
use crate::models::common::pagination::{default_page, default_size, deserialize_string_to_i64};

/// 评语最大长度（字符）
pub const FEEDBACK_MAX_CHARS: usize = 2000;

// 提交答案请求
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "api/answer.ts")]
pub struct CreateAnswerRequest {
    pub task_id: i64,
    pub description: Option<String>,
}

// 答案列表查询参数
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "api/answer.ts")]
pub struct AnswerListQuery {
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
    pub status: Option<AnswerStatus>,
    pub task_id: Option<i64>,
    pub course_id: Option<i64>,
}

/// 存储层的答案可见范围
#[derive(Debug, Clone)]
pub enum AnswerScope {
    /// 管理员：全部
    All,
    /// 学生：仅自己的答案
    Owner(i64),
    /// 教师：所带分组中学生在对应课程下的答案
    Teacher(i64),
}

/// 评阅请求的字段校验失败
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewValidationError {
    pub errors: FieldErrors,
}

/// 评阅请求体，未经校验
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = "api/answer.ts")]
pub struct AnswerReviewRequest {
    pub status: Option<String>,
    pub feedback_text: Option<String>,
    pub score: Option<i64>,
    pub max_score: Option<i64>,
    #[serde(default)]
    pub delete_grade: bool,
}

impl AnswerReviewRequest {
    /// 在加锁之前完成全部字段校验
    pub fn validate(self) -> Result<ReviewPayload, ReviewValidationError> {
        let mut errors = FieldErrors::new();

        let status = match self.status.as_deref() {
            None => None,
            Some(raw) => match raw.parse::<AnswerStatus>() {
                Ok(status) => Some(status),
                Err(_) => {
                    push_error(&mut errors, "status", "Invalid status value");
                    None
                }
            },
        };

        let feedback_text = match self.feedback_text {
            None => None,
            Some(text) => {
                if text.chars().count() > FEEDBACK_MAX_CHARS {
                    push_error(
                        &mut errors,
                        "feedback_text",
                        format!("Ensure this field has no more than {FEEDBACK_MAX_CHARS} characters."),
                    );
                    None
                } else if !text.is_empty() && text.trim().is_empty() {
                    push_error(
                        &mut errors,
                        "feedback_text",
                        "Feedback text cannot be empty if provided",
                    );
                    None
                } else {
                    Some(text.trim().to_string())
                }
            }
        };

        let score = match self.score {
            None => None,
            Some(value) if (0..=100).contains(&value) => Some(value as i32),
            Some(_) => {
                push_error(&mut errors, "score", "Ensure this value is between 0 and 100.");
                None
            }
        };

        let max_score = match self.max_score {
            None => None,
            Some(value) if (0..=i64::from(i32::MAX)).contains(&value) => Some(value as i32),
            Some(_) => {
                push_error(
                    &mut errors,
                    "max_score",
                    "Ensure this value is greater than or equal to 0.",
                );
                None
            }
        };

        if !errors.is_empty() {
            return Err(ReviewValidationError { errors });
        }

        Ok(ReviewPayload {
            status,
            feedback_text,
            score,
            max_score,
            delete_grade: self.delete_grade,
        })
    }
}

fn push_error(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_status_is_a_field_error() {
        let req = AnswerReviewRequest {
            status: Some("graded".into()),
            ..Default::default()
        };
        let errors = req.validate().unwrap_err().errors;
        assert_eq!(errors["status"], vec!["Invalid status value".to_string()]);
    }

    #[test]
    fn test_feedback_is_trimmed() {
        let req = AnswerReviewRequest {
            feedback_text: Some("  nice work \n".into()),
            ..Default::default()
        };
        let payload = req.validate().unwrap();
        assert_eq!(payload.feedback_text.as_deref(), Some("nice work"));
        assert!(payload.status.is_none());
        assert!(!payload.delete_grade);
    }

    #[test]
    fn test_whitespace_only_feedback_rejected_but_empty_allowed() {
        let blank = AnswerReviewRequest {
            feedback_text: Some("   ".into()),
            ..Default::default()
        };
        assert!(
            blank
                .validate()
                .unwrap_err()
                .errors
                .contains_key("feedback_text")
        );

        let empty = AnswerReviewRequest {
            feedback_text: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(empty.validate().unwrap().feedback_text.as_deref(), Some(""));
    }

    #[test]
    fn test_feedback_length_counts_chars() {
        let ok = AnswerReviewRequest {
            feedback_text: Some("é".repeat(FEEDBACK_MAX_CHARS)),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let too_long = AnswerReviewRequest {
            feedback_text: Some("a".repeat(FEEDBACK_MAX_CHARS + 1)),
            ..Default::default()
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_score_bounds_collect_all_errors() {
        let req = AnswerReviewRequest {
            status: Some("nope".into()),
            score: Some(101),
            max_score: Some(-1),
            ..Default::default()
        };
        let errors = req.validate().unwrap_err().errors;
        assert_eq!(errors.len(), 3);
    }
}
