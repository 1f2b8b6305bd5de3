//! 数据模型定义
//!
//! 每个领域按 `entities` / `requests` / `responses` 划分，
//! 纯业务规则（评阅计划、注册令牌状态机）也放在对应领域下。

pub mod answers;
pub mod auth;
pub mod chat;
pub mod common;
pub mod courses;
pub mod enrollments;
pub mod grades;
pub mod groups;
pub mod notifications;
pub mod tasks;
pub mod users;

pub use common::pagination::{PaginatedResponse, PaginationInfo, PaginationQuery};
pub use common::response::{ApiResponse, FieldErrors};

/// 程序启动时间
#[derive(Debug, Clone)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

/// 业务错误码，作为 `ApiResponse.code` 返回
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    // 通用错误
    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    Conflict = 1009,
    RateLimitExceeded = 1029,
    ValidationFailed = 1100,
    InternalServerError = 1500,

    // 认证与用户
    AuthFailed = 2000,
    RegisterFailed = 2001,
    UserNotFound = 2100,
    UserAlreadyExists = 2104,

    // 课程与任务
    CourseNotFound = 3000,
    TaskNotFound = 3100,

    // 课程分组与选课
    GroupNotFound = 4000,
    GroupPermissionDenied = 4003,
    RegistrationTokenInvalid = 4010,
    RegistrationTokenExpired = 4011,
    AlreadyEnrolled = 4012,
    GroupFull = 4013,
    SelfRegistrationDisabled = 4014,
    ExportFailed = 4020,

    // 答案与评阅
    AnswerNotFound = 5000,
    AnswerAlreadyExists = 5001,
    AnswerPermissionDenied = 5002,

    // 通知
    NotificationNotFound = 6000,

    // 聊天
    ChatRoomNotFound = 7000,
    ChatRoomInvalid = 7001,
    ChatPermissionDenied = 7002,
}
