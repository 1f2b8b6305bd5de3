use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 课程任务
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "api/task.ts")]
pub struct Task {
    pub id: i64,
    pub course_id: i64,
    pub number: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub created_by: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Task {
    /// 编号展示，缺失时为 `-`
    pub fn number_label(&self) -> String {
        self.number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    /// 通知中使用的任务标题：`Task {number}. {name}`
    pub fn display_title(&self) -> String {
        format!("Task {}. {}", self.number_label(), self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(number: Option<i32>) -> Task {
        let now = chrono::Utc::now();
        Task {
            id: 1,
            course_id: 1,
            number,
            name: "Linked lists".into(),
            description: None,
            created_by: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_display_title() {
        assert_eq!(task(Some(3)).display_title(), "Task 3. Linked lists");
        assert_eq!(task(None).display_title(), "Task -. Linked lists");
    }
}
