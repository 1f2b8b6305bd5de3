//! 分组自助注册令牌
//!
//! 状态机：`no_token` --生成--> `active` --作废/关闭自助注册--> `no_token`。
//! 令牌的签发和作废在这里计算，由存储层落库。

use chrono::{DateTime, Duration, Utc};

use super::entities::CourseGroup;
use crate::models::ErrorCode;
use crate::utils::random_code::generate_registration_token;

/// 新签发的令牌
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// 令牌过期时间；小时和天数都不为正时永不过期
pub fn compute_expiry(now: DateTime<Utc>, hours: i32, days: i32) -> Option<DateTime<Utc>> {
    let hours = i64::from(hours.max(0));
    let days = i64::from(days.max(0));
    if hours == 0 && days == 0 {
        return None;
    }
    Some(now + Duration::days(days) + Duration::hours(hours))
}

pub fn issue_token(now: DateTime<Utc>, hours: i32, days: i32) -> IssuedToken {
    IssuedToken {
        token: generate_registration_token(),
        expires_at: compute_expiry(now, hours, days),
    }
}

/// 分组更新时令牌的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenTransition {
    Generate,
    Invalidate,
    Keep,
}

pub fn plan_token_transition(
    was_enabled: bool,
    now_enabled: bool,
    has_token: bool,
    validity_changed: bool,
) -> TokenTransition {
    match (was_enabled, now_enabled) {
        (false, true) => TokenTransition::Generate,
        (true, false) => TokenTransition::Invalidate,
        (true, true) if !has_token || validity_changed => TokenTransition::Generate,
        _ => TokenTransition::Keep,
    }
}

/// 通过令牌加入分组被拒绝的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentRejection {
    InvalidToken,
    TokenExpired,
    AlreadyEnrolled,
    AlreadyInCourse,
    GroupFull,
}

impl EnrollmentRejection {
    pub fn message(&self) -> &'static str {
        match self {
            EnrollmentRejection::InvalidToken => "Invalid or expired token.",
            EnrollmentRejection::TokenExpired => "Token is expired",
            EnrollmentRejection::AlreadyEnrolled => "User is already enrolled",
            EnrollmentRejection::AlreadyInCourse => {
                "User is already enrolled in another group of this course"
            }
            EnrollmentRejection::GroupFull => "Too many students",
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            EnrollmentRejection::InvalidToken => ErrorCode::RegistrationTokenInvalid,
            EnrollmentRejection::TokenExpired => ErrorCode::RegistrationTokenExpired,
            EnrollmentRejection::AlreadyEnrolled | EnrollmentRejection::AlreadyInCourse => {
                ErrorCode::AlreadyEnrolled
            }
            EnrollmentRejection::GroupFull => ErrorCode::GroupFull,
        }
    }

    /// 过期令牌返回 403，其余均为 400
    pub fn is_forbidden(&self) -> bool {
        matches!(self, EnrollmentRejection::TokenExpired)
    }
}

impl std::fmt::Display for EnrollmentRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// 加入分组前读取到的现状
#[derive(Debug, Clone, Default)]
pub struct EnrollmentSnapshot {
    pub in_group: bool,
    pub in_other_group_of_course: bool,
    pub member_count: u64,
}

/// 按顺序检查：令牌有效、未过期、未加入、课程内未加入其他分组、未满员
pub fn check_enrollment(
    group: Option<&CourseGroup>,
    now: DateTime<Utc>,
    snapshot: &EnrollmentSnapshot,
) -> Result<(), EnrollmentRejection> {
    let group = match group {
        Some(group) if group.accepts_token() => group,
        _ => return Err(EnrollmentRejection::InvalidToken),
    };
    if group.is_token_expired_at(now) {
        return Err(EnrollmentRejection::TokenExpired);
    }
    if snapshot.in_group {
        return Err(EnrollmentRejection::AlreadyEnrolled);
    }
    if snapshot.in_other_group_of_course {
        return Err(EnrollmentRejection::AlreadyInCourse);
    }
    if let Some(capacity) = group.student_capacity()
        && snapshot.member_count >= capacity
    {
        return Err(EnrollmentRejection::GroupFull);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(now: DateTime<Utc>) -> CourseGroup {
        CourseGroup {
            id: 3,
            course_id: 1,
            name: "Morning".into(),
            students_limit: Some(2),
            days_of_week: Some("Mon,Wed".into()),
            self_registration: true,
            registration_token: Some(generate_registration_token()),
            token_expires_at: None,
            token_validity_hours: 0,
            token_validity_days: 0,
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_compute_expiry() {
        let now = Utc::now();
        assert_eq!(compute_expiry(now, 0, 0), None);
        assert_eq!(compute_expiry(now, -5, 0), None);
        assert_eq!(
            compute_expiry(now, 6, 2),
            Some(now + Duration::days(2) + Duration::hours(6))
        );
    }

    #[test]
    fn test_issued_tokens_are_unique_and_url_safe() {
        let now = Utc::now();
        let a = issue_token(now, 0, 1);
        let b = issue_token(now, 0, 1);
        assert_ne!(a.token, b.token);
        assert_eq!(a.token.len(), 86);
        assert!(
            a.token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert!(a.expires_at.is_some());
    }

    #[test]
    fn test_token_transitions() {
        use TokenTransition::*;
        assert_eq!(plan_token_transition(false, true, false, false), Generate);
        assert_eq!(plan_token_transition(true, false, true, false), Invalidate);
        assert_eq!(plan_token_transition(true, true, false, false), Generate);
        assert_eq!(plan_token_transition(true, true, true, true), Generate);
        assert_eq!(plan_token_transition(true, true, true, false), Keep);
        assert_eq!(plan_token_transition(false, false, false, true), Keep);
    }

    #[test]
    fn test_unknown_or_disabled_token_is_invalid() {
        let now = Utc::now();
        let snapshot = EnrollmentSnapshot::default();
        assert_eq!(
            check_enrollment(None, now, &snapshot),
            Err(EnrollmentRejection::InvalidToken)
        );

        let mut g = group(now);
        g.self_registration = false;
        assert_eq!(
            check_enrollment(Some(&g), now, &snapshot),
            Err(EnrollmentRejection::InvalidToken)
        );

        let mut g = group(now);
        g.is_deleted = true;
        assert_eq!(
            check_enrollment(Some(&g), now, &snapshot),
            Err(EnrollmentRejection::InvalidToken)
        );
    }

    #[test]
    fn test_expired_token_is_forbidden() {
        let now = Utc::now();
        let mut g = group(now);
        g.token_expires_at = Some(now - Duration::minutes(1));
        let err = check_enrollment(Some(&g), now, &EnrollmentSnapshot::default()).unwrap_err();
        assert_eq!(err, EnrollmentRejection::TokenExpired);
        assert!(err.is_forbidden());
    }

    #[test]
    fn test_check_order_and_limit() {
        let now = Utc::now();
        let g = group(now);

        let snapshot = EnrollmentSnapshot {
            in_group: true,
            in_other_group_of_course: true,
            member_count: 5,
        };
        assert_eq!(
            check_enrollment(Some(&g), now, &snapshot),
            Err(EnrollmentRejection::AlreadyEnrolled)
        );

        let snapshot = EnrollmentSnapshot {
            member_count: 2,
            ..Default::default()
        };
        assert_eq!(
            check_enrollment(Some(&g), now, &snapshot),
            Err(EnrollmentRejection::GroupFull)
        );

        let snapshot = EnrollmentSnapshot {
            member_count: 1,
            ..Default::default()
        };
        assert!(check_enrollment(Some(&g), now, &snapshot).is_ok());
    }

    #[test]
    fn test_zero_limit_means_unlimited() {
        let now = Utc::now();
        let mut g = group(now);
        g.students_limit = Some(0);
        assert_eq!(g.student_capacity(), None);

        let snapshot = EnrollmentSnapshot {
            member_count: 40,
            ..Default::default()
        };
        assert!(check_enrollment(Some(&g), now, &snapshot).is_ok());
    }
}
