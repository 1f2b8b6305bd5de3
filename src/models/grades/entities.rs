//! 评分实体与派生指标
//!
//! 百分比与等级只由 `score` / `max_score` 推导，不落库。

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// 默认满分
pub const DEFAULT_MAX_SCORE: i32 = 100;

// 评分实体，与答案一对一
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "api/grade.ts")]
pub struct Grade {
    pub id: i64,
    pub answer_id: i64,
    pub score: Option<i32>,
    pub max_score: i32,
    pub feedback_text: Option<String>,
    pub graded_by: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Grade {
    pub fn percentage(&self) -> f64 {
        percentage(self.score, self.max_score)
    }

    pub fn letter_grade(&self) -> LetterGrade {
        LetterGrade::from_percentage(self.percentage())
    }
}

/// 得分百分比；没有分数或满分为 0 时为 0
pub fn percentage(score: Option<i32>, max_score: i32) -> f64 {
    match score {
        Some(score) if score != 0 && max_score > 0 => {
            f64::from(score) / f64::from(max_score) * 100.0
        }
        _ => 0.0,
    }
}

/// 百分比文本：整数值保留一位小数（`95.0`），为 0 时输出 `0`
pub fn format_percentage(score: Option<i32>, max_score: i32) -> String {
    let value = percentage(score, max_score);
    if value == 0.0 {
        "0".to_string()
    } else if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "api/grade.ts")]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            LetterGrade::A
        } else if percentage >= 70.0 {
            LetterGrade::B
        } else if percentage >= 50.0 {
            LetterGrade::C
        } else if percentage >= 31.0 {
            LetterGrade::D
        } else {
            LetterGrade::F
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::F => "F",
        }
    }
}

impl std::fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
