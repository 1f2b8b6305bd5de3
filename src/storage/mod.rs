use std::sync::Arc;

use crate::models::{
    answers::{
        entities::{Answer, AnswerRecord},
        requests::{AnswerListQuery, AnswerScope, CreateAnswerRequest},
        review::{ReviewOutcome, ReviewPayload},
    },
    chat::entities::{ChatMessage, ChatRoom},
    courses::{
        entities::Course,
        requests::{CourseListQuery, CreateCourseRequest},
        responses::{CourseExportRow, CourseListResponse},
    },
    enrollments::{
        entities::{CourseEnrollment, EnrollmentRole},
        responses::{BulkEnrollResponse, GroupMember},
    },
    grades::entities::Grade,
    groups::{
        entities::CourseGroup,
        registration::EnrollmentRejection,
        requests::{CreateGroupRequest, GroupListQuery, UpdateGroupRequest},
        responses::GroupListResponse,
    },
    notifications::{
        entities::{Notification, NotificationBox},
        requests::NotificationListQuery,
        responses::NotificationListResponse,
    },
    tasks::{entities::Task, requests::CreateTaskRequest},
    users::{entities::User, requests::CreateUserRequest},
    PaginationInfo, PaginationQuery,
};

use crate::errors::Result;

pub mod sea_orm_storage;

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 用户管理方法
    // 创建用户
    async fn create_user(&self, user: CreateUserRequest) -> Result<User>;
    // 通过ID获取用户信息
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;
    // 通过用户名获取用户信息
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    // 通过邮箱获取用户信息
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    // 通过用户名或邮箱获取用户信息
    async fn get_user_by_username_or_email(&self, identifier: &str) -> Result<Option<User>>;
    // 批量获取用户
    async fn get_users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>>;
    // 用户总数
    async fn count_users(&self) -> Result<u64>;
    // 更新用户最后登录时间
    async fn update_last_login(&self, id: i64) -> Result<bool>;

    /// 课程与任务
    async fn create_course(&self, req: CreateCourseRequest) -> Result<Course>;
    async fn get_course_by_id(&self, id: i64) -> Result<Option<Course>>;
    async fn list_courses_with_pagination(
        &self,
        query: CourseListQuery,
    ) -> Result<CourseListResponse>;
    // 导出用：全部课程及其成员、分组与任务数量
    async fn list_courses_for_export(&self) -> Result<Vec<CourseExportRow>>;
    async fn create_task(
        &self,
        course_id: i64,
        created_by: i64,
        req: CreateTaskRequest,
    ) -> Result<Task>;
    async fn get_task_by_id(&self, id: i64) -> Result<Option<Task>>;
    // 按编号排序，编号为空的排在最后
    async fn list_tasks_by_course(&self, course_id: i64) -> Result<Vec<Task>>;

    /// 课程分组
    async fn create_group(&self, req: CreateGroupRequest) -> Result<CourseGroup>;
    // 未软删除的分组
    async fn get_group_by_id(&self, id: i64) -> Result<Option<CourseGroup>>;
    async fn list_groups_with_pagination(&self, query: GroupListQuery)
    -> Result<GroupListResponse>;
    // 用户所在的分组
    async fn list_user_groups(&self, user_id: i64) -> Result<Vec<CourseGroup>>;
    // 更新分组并驱动注册令牌状态
    async fn update_group(&self, id: i64, req: UpdateGroupRequest) -> Result<Option<CourseGroup>>;
    async fn soft_delete_group(&self, id: i64) -> Result<bool>;
    async fn deactivate_group(&self, id: i64) -> Result<Option<CourseGroup>>;
    // 重新生成注册令牌
    async fn refresh_group_token(&self, id: i64) -> Result<Option<CourseGroup>>;

    /// 选课
    // 外层错误为存储错误，内层为业务拒绝
    async fn enroll_by_token(
        &self,
        user_id: i64,
        token: &str,
    ) -> Result<std::result::Result<(CourseGroup, CourseEnrollment), EnrollmentRejection>>;
    async fn add_group_members(
        &self,
        group_id: i64,
        user_ids: &[i64],
        role: EnrollmentRole,
    ) -> Result<BulkEnrollResponse>;
    async fn remove_group_members(&self, group_id: i64, user_ids: &[i64]) -> Result<u64>;
    async fn list_group_members(&self, group_id: i64) -> Result<Vec<GroupMember>>;
    // (学生数, 教师数)
    async fn count_group_members(&self, group_id: i64) -> Result<(u64, u64)>;

    /// 权限判断
    async fn is_group_teacher(&self, user_id: i64, group_id: i64) -> Result<bool>;
    async fn is_course_teacher(&self, user_id: i64, course_id: i64) -> Result<bool>;
    async fn is_enrolled_in_course(
        &self,
        user_id: i64,
        course_id: i64,
        role: EnrollmentRole,
    ) -> Result<bool>;
    // 教师与学生在该课程的同一分组中
    async fn teacher_can_access_student(
        &self,
        teacher_id: i64,
        student_id: i64,
        course_id: i64,
    ) -> Result<bool>;

    /// 答案与评阅
    async fn create_answer(&self, user_id: i64, req: CreateAnswerRequest) -> Result<Answer>;
    async fn get_answer_record(&self, id: i64) -> Result<Option<AnswerRecord>>;
    async fn list_answers_with_pagination(
        &self,
        scope: AnswerScope,
        query: AnswerListQuery,
    ) -> Result<(Vec<AnswerRecord>, PaginationInfo)>;
    // 在行锁事务中完成评分写入与通知 upsert，答案不存在时返回 None
    async fn review_answer(
        &self,
        answer_id: i64,
        reviewer_id: i64,
        payload: ReviewPayload,
    ) -> Result<Option<ReviewOutcome>>;
    // 导出成绩单
    async fn list_answers_for_gradebook(
        &self,
        course_id: i64,
        user_ids: &[i64],
    ) -> Result<Vec<(Answer, Option<Grade>)>>;

    /// 通知
    async fn list_notifications(
        &self,
        user_id: i64,
        mailbox: NotificationBox,
        query: NotificationListQuery,
    ) -> Result<NotificationListResponse>;
    async fn get_notification_by_id(&self, id: i64) -> Result<Option<Notification>>;
    async fn mark_notification_read(&self, id: i64, receiver_id: i64) -> Result<Option<Notification>>;
    async fn mark_all_notifications_read(&self, receiver_id: i64) -> Result<u64>;
    async fn count_unread_notifications(&self, receiver_id: i64) -> Result<u64>;

    /// 聊天
    // 返回 (房间, 是否新建)
    async fn get_or_create_chat_room(
        &self,
        teacher_id: i64,
        student_id: i64,
        course_id: i64,
    ) -> Result<(ChatRoom, bool)>;
    async fn get_chat_room(&self, id: i64) -> Result<Option<ChatRoom>>;
    async fn list_user_chat_rooms(&self, user_id: i64) -> Result<Vec<ChatRoom>>;
    async fn create_chat_message(
        &self,
        room_id: i64,
        sender_id: i64,
        content: &str,
    ) -> Result<ChatMessage>;
    async fn list_chat_messages(
        &self,
        room_id: i64,
        query: PaginationQuery,
    ) -> Result<(Vec<ChatMessage>, PaginationInfo)>;
    // 最近的消息，按时间正序
    async fn recent_chat_messages(&self, room_id: i64, limit: u64) -> Result<Vec<ChatMessage>>;
    // 只能标记他人发送的消息
    async fn mark_chat_message_read(
        &self,
        room_id: i64,
        message_id: i64,
        reader_id: i64,
    ) -> Result<bool>;
}

pub async fn create_storage() -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}
