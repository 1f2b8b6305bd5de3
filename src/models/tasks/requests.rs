use serde::Deserialize;
use ts_rs::TS;

use crate::models::FieldErrors;

// 创建任务请求
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "api/task.ts")]
pub struct CreateTaskRequest {
    pub number: Option<i32>,
    pub name: String,
    pub description: Option<String>,
}

impl CreateTaskRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.insert("name".into(), vec!["This field may not be blank.".into()]);
        }
        if self.number.is_some_and(|n| n < 0) {
            errors.insert(
                "number".into(),
                vec!["Ensure this value is greater than or equal to 0.".into()],
            );
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_validation() {
        let ok = CreateTaskRequest {
            number: Some(3),
            name: "Loops".into(),
            description: None,
        };
        assert!(ok.validate().is_ok());

        let bad = CreateTaskRequest {
            number: Some(-1),
            name: "  ".into(),
            description: None,
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.contains_key("name"));
        assert!(errors.contains_key("number"));
    }
}
