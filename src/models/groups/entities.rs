use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 课程分组
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "api/group.ts")]
pub struct CourseGroup {
    pub id: i64,
    pub course_id: i64,
    pub name: String,
    pub students_limit: Option<i32>,
    pub days_of_week: Option<String>,
    pub self_registration: bool,
    #[serde(skip_serializing, default)] // 只通过 registration_link 暴露给管理者
    #[ts(skip)]
    pub registration_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub token_validity_hours: i32,
    pub token_validity_days: i32,
    pub is_active: bool,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseGroup {
    /// 令牌是否已过期；没有过期时间的令牌永不过期
    pub fn is_token_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.token_expires_at {
            Some(expires_at) => expires_at < now,
            None => false,
        }
    }

    pub fn is_token_expired(&self) -> bool {
        self.is_token_expired_at(Utc::now())
    }

    /// 自助注册链接，未开启或没有令牌时为空串
    pub fn registration_link(&self, base_url: &str) -> String {
        match (&self.registration_token, self.self_registration) {
            (Some(token), true) => format!("{base_url}{token}"),
            _ => String::new(),
        }
    }

    /// 学生名额上限，未设置或为 0 时不限
    pub fn student_capacity(&self) -> Option<u64> {
        self.students_limit
            .filter(|limit| *limit > 0)
            .map(|limit| limit as u64)
    }

    /// 是否可以通过令牌加入
    pub fn accepts_token(&self) -> bool {
        self.self_registration && !self.is_deleted && self.registration_token.is_some()
    }
}
