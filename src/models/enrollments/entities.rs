use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 分组内的角色
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "api/enrollment.ts")]
pub enum EnrollmentRole {
    Student, // 学生
    Teacher, // 教师
}

impl EnrollmentRole {
    pub const STUDENT: &'static str = "student";
    pub const TEACHER: &'static str = "teacher";
}

impl<'de> Deserialize<'de> for EnrollmentRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|_| {
            serde::de::Error::custom(format!("无效的分组角色: '{s}'. 支持的角色: student, teacher"))
        })
    }
}

impl std::fmt::Display for EnrollmentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrollmentRole::Student => write!(f, "{}", EnrollmentRole::STUDENT),
            EnrollmentRole::Teacher => write!(f, "{}", EnrollmentRole::TEACHER),
        }
    }
}

impl std::str::FromStr for EnrollmentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            EnrollmentRole::STUDENT => Ok(EnrollmentRole::Student),
            EnrollmentRole::TEACHER => Ok(EnrollmentRole::Teacher),
            _ => Err(format!("Invalid enrollment role: {s}")),
        }
    }
}

// 选课记录
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "api/enrollment.ts")]
pub struct CourseEnrollment {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub group_id: i64,
    pub role: EnrollmentRole,
    pub enrolled_at: chrono::DateTime<chrono::Utc>,
}
