//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod answers;
mod chat;
mod courses;
mod enrollments;
mod groups;
mod notifications;
mod reviews;
mod tasks;
mod users;

use crate::config::AppConfig;
use crate::errors::{CourseHubError, Result};
use crate::models::PaginationInfo;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend};
use std::time::Duration;
use tracing::info;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

impl SeaOrmStorage {
    /// 按全局配置创建存储实例
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        Self::connect(
            &config.database.url,
            config.database.pool_size,
            config.database.timeout,
        )
        .await
    }

    /// 连接数据库并运行迁移
    pub async fn connect(url: &str, pool_size: u32, timeout: u64) -> Result<Self> {
        let db_url = Self::build_database_url(url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite:") {
            Self::connect_sqlite(&db_url, pool_size, timeout).await?
        } else {
            Self::connect_generic(&db_url, pool_size, timeout).await?
        };

        // 运行迁移
        Migrator::up(&db, None)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("数据库迁移失败: {e}")))?;

        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(Self { db })
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, pool_size: u32, timeout: u64) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let in_memory = url.contains(":memory:");
        let mut opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| CourseHubError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory");
        if !in_memory {
            opt = opt
                .journal_mode(SqliteJournalMode::Wal)
                .pragma("mmap_size", "536870912")
                .pragma("wal_autocheckpoint", "1000");
        }

        // 内存库每个连接都是独立的数据库，只能用单连接
        let max_connections = if in_memory { 1 } else { pool_size.max(1) };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(timeout))
            .idle_timeout(if in_memory {
                None
            } else {
                Some(Duration::from_secs(300))
            })
            .max_lifetime(if in_memory {
                None
            } else {
                Some(Duration::from_secs(1800))
            })
            .connect_with(opt)
            .await
            .map_err(|e| CourseHubError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, pool_size: u32, timeout: u64) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(pool_size)
            .min_connections(pool_size.min(5))
            .connect_timeout(Duration::from_secs(timeout))
            .acquire_timeout(Duration::from_secs(timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| CourseHubError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite:") {
            Ok(url.to_string())
        } else if url == ":memory:" {
            Ok("sqlite::memory:".to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") {
            Ok(format!("sqlite://{}?mode=rwc", url))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(CourseHubError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }

    /// SQLite 不支持 `SELECT ... FOR UPDATE`，写事务改为以一条空更新开头抢占库级写锁
    pub(crate) fn supports_row_lock(&self) -> bool {
        self.db.get_database_backend() != DbBackend::Sqlite
    }

    /// 测试用内存数据库
    #[cfg(test)]
    pub(crate) async fn in_memory() -> Self {
        Self::connect("sqlite::memory:", 1, 5)
            .await
            .expect("in-memory sqlite should open")
    }

    /// 测试用文件数据库（WAL，多连接），返回库文件路径
    #[cfg(test)]
    pub(crate) async fn temp_file(pool_size: u32) -> (Self, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("coursehub-{}.db", uuid::Uuid::new_v4()));
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let storage = Self::connect(&url, pool_size, 5)
            .await
            .expect("file sqlite should open");
        (storage, path)
    }
}

/// 由分页器结果构造分页信息
pub(crate) fn pagination_info(page: u64, size: u64, total: u64, pages: u64) -> PaginationInfo {
    PaginationInfo {
        page: page as i64,
        page_size: size as i64,
        total: total as i64,
        total_pages: pages as i64,
    }
}

/// 唯一约束冲突
pub(crate) fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    )
}

// Storage trait 实现
use crate::models::{
    PaginationQuery,
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
};
use crate::storage::Storage;
use async_trait::async_trait;

#[async_trait]
impl Storage for SeaOrmStorage {
    // 用户模块
    async fn create_user(&self, user: CreateUserRequest) -> Result<User> {
        self.create_user_impl(user).await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.get_user_by_id_impl(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.get_user_by_username_impl(username).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.get_user_by_email_impl(email).await
    }

    async fn get_user_by_username_or_email(&self, identifier: &str) -> Result<Option<User>> {
        self.get_user_by_username_or_email_impl(identifier).await
    }

    async fn get_users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>> {
        self.get_users_by_ids_impl(ids).await
    }

    async fn count_users(&self) -> Result<u64> {
        self.count_users_impl().await
    }

    async fn update_last_login(&self, id: i64) -> Result<bool> {
        self.update_last_login_impl(id).await
    }

    // 课程模块
    async fn create_course(&self, req: CreateCourseRequest) -> Result<Course> {
        self.create_course_impl(req).await
    }

    async fn get_course_by_id(&self, id: i64) -> Result<Option<Course>> {
        self.get_course_by_id_impl(id).await
    }

    async fn list_courses_with_pagination(
        &self,
        query: CourseListQuery,
    ) -> Result<CourseListResponse> {
        self.list_courses_with_pagination_impl(query).await
    }

    async fn list_courses_for_export(&self) -> Result<Vec<CourseExportRow>> {
        self.list_courses_for_export_impl().await
    }

    // 任务模块
    async fn create_task(
        &self,
        course_id: i64,
        created_by: i64,
        req: CreateTaskRequest,
    ) -> Result<Task> {
        self.create_task_impl(course_id, created_by, req).await
    }

    async fn get_task_by_id(&self, id: i64) -> Result<Option<Task>> {
        self.get_task_by_id_impl(id).await
    }

    async fn list_tasks_by_course(&self, course_id: i64) -> Result<Vec<Task>> {
        self.list_tasks_by_course_impl(course_id).await
    }

    // 分组模块
    async fn create_group(&self, req: CreateGroupRequest) -> Result<CourseGroup> {
        self.create_group_impl(req).await
    }

    async fn get_group_by_id(&self, id: i64) -> Result<Option<CourseGroup>> {
        self.get_group_by_id_impl(id).await
    }

    async fn list_groups_with_pagination(
        &self,
        query: GroupListQuery,
    ) -> Result<GroupListResponse> {
        self.list_groups_with_pagination_impl(query).await
    }

    async fn list_user_groups(&self, user_id: i64) -> Result<Vec<CourseGroup>> {
        self.list_user_groups_impl(user_id).await
    }

    async fn update_group(&self, id: i64, req: UpdateGroupRequest) -> Result<Option<CourseGroup>> {
        self.update_group_impl(id, req).await
    }

    async fn soft_delete_group(&self, id: i64) -> Result<bool> {
        self.soft_delete_group_impl(id).await
    }

    async fn deactivate_group(&self, id: i64) -> Result<Option<CourseGroup>> {
        self.deactivate_group_impl(id).await
    }

    async fn refresh_group_token(&self, id: i64) -> Result<Option<CourseGroup>> {
        self.refresh_group_token_impl(id).await
    }

    // 选课模块
    async fn enroll_by_token(
        &self,
        user_id: i64,
        token: &str,
    ) -> Result<std::result::Result<(CourseGroup, CourseEnrollment), EnrollmentRejection>> {
        self.enroll_by_token_impl(user_id, token).await
    }

    async fn add_group_members(
        &self,
        group_id: i64,
        user_ids: &[i64],
        role: EnrollmentRole,
    ) -> Result<BulkEnrollResponse> {
        self.add_group_members_impl(group_id, user_ids, role).await
    }

    async fn remove_group_members(&self, group_id: i64, user_ids: &[i64]) -> Result<u64> {
        self.remove_group_members_impl(group_id, user_ids).await
    }

    async fn list_group_members(&self, group_id: i64) -> Result<Vec<GroupMember>> {
        self.list_group_members_impl(group_id).await
    }

    async fn count_group_members(&self, group_id: i64) -> Result<(u64, u64)> {
        self.count_group_members_impl(group_id).await
    }

    async fn is_group_teacher(&self, user_id: i64, group_id: i64) -> Result<bool> {
        self.is_group_teacher_impl(user_id, group_id).await
    }

    async fn is_course_teacher(&self, user_id: i64, course_id: i64) -> Result<bool> {
        self.is_course_teacher_impl(user_id, course_id).await
    }

    async fn is_enrolled_in_course(
        &self,
        user_id: i64,
        course_id: i64,
        role: EnrollmentRole,
    ) -> Result<bool> {
        self.is_enrolled_in_course_impl(user_id, course_id, role)
            .await
    }

    async fn teacher_can_access_student(
        &self,
        teacher_id: i64,
        student_id: i64,
        course_id: i64,
    ) -> Result<bool> {
        self.teacher_can_access_student_impl(teacher_id, student_id, course_id)
            .await
    }

    // 答案模块
    async fn create_answer(&self, user_id: i64, req: CreateAnswerRequest) -> Result<Answer> {
        self.create_answer_impl(user_id, req).await
    }

    async fn get_answer_record(&self, id: i64) -> Result<Option<AnswerRecord>> {
        self.get_answer_record_impl(id).await
    }

    async fn list_answers_with_pagination(
        &self,
        scope: AnswerScope,
        query: AnswerListQuery,
    ) -> Result<(Vec<AnswerRecord>, PaginationInfo)> {
        self.list_answers_with_pagination_impl(scope, query).await
    }

    async fn review_answer(
        &self,
        answer_id: i64,
        reviewer_id: i64,
        payload: ReviewPayload,
    ) -> Result<Option<ReviewOutcome>> {
        self.review_answer_impl(answer_id, reviewer_id, payload)
            .await
    }

    async fn list_answers_for_gradebook(
        &self,
        course_id: i64,
        user_ids: &[i64],
    ) -> Result<Vec<(Answer, Option<Grade>)>> {
        self.list_answers_for_gradebook_impl(course_id, user_ids)
            .await
    }

    // 通知模块
    async fn list_notifications(
        &self,
        user_id: i64,
        mailbox: NotificationBox,
        query: NotificationListQuery,
    ) -> Result<NotificationListResponse> {
        self.list_notifications_impl(user_id, mailbox, query).await
    }

    async fn get_notification_by_id(&self, id: i64) -> Result<Option<Notification>> {
        self.get_notification_by_id_impl(id).await
    }

    async fn mark_notification_read(
        &self,
        id: i64,
        receiver_id: i64,
    ) -> Result<Option<Notification>> {
        self.mark_notification_read_impl(id, receiver_id).await
    }

    async fn mark_all_notifications_read(&self, receiver_id: i64) -> Result<u64> {
        self.mark_all_notifications_read_impl(receiver_id).await
    }

    async fn count_unread_notifications(&self, receiver_id: i64) -> Result<u64> {
        self.count_unread_notifications_impl(receiver_id).await
    }

    // 聊天模块
    async fn get_or_create_chat_room(
        &self,
        teacher_id: i64,
        student_id: i64,
        course_id: i64,
    ) -> Result<(ChatRoom, bool)> {
        self.get_or_create_chat_room_impl(teacher_id, student_id, course_id)
            .await
    }

    async fn get_chat_room(&self, id: i64) -> Result<Option<ChatRoom>> {
        self.get_chat_room_impl(id).await
    }

    async fn list_user_chat_rooms(&self, user_id: i64) -> Result<Vec<ChatRoom>> {
        self.list_user_chat_rooms_impl(user_id).await
    }

    async fn create_chat_message(
        &self,
        room_id: i64,
        sender_id: i64,
        content: &str,
    ) -> Result<ChatMessage> {
        self.create_chat_message_impl(room_id, sender_id, content)
            .await
    }

    async fn list_chat_messages(
        &self,
        room_id: i64,
        query: PaginationQuery,
    ) -> Result<(Vec<ChatMessage>, PaginationInfo)> {
        self.list_chat_messages_impl(room_id, query).await
    }

    async fn recent_chat_messages(&self, room_id: i64, limit: u64) -> Result<Vec<ChatMessage>> {
        self.recent_chat_messages_impl(room_id, limit).await
    }

    async fn mark_chat_message_read(
        &self,
        room_id: i64,
        message_id: i64,
        reader_id: i64,
    ) -> Result<bool> {
        self.mark_chat_message_read_impl(room_id, message_id, reader_id)
            .await
    }
}

/// 存储层测试共用的数据构造
#[cfg(test)]
pub(crate) mod fixtures {
    use super::SeaOrmStorage;
    use crate::models::{
        courses::{entities::Course, requests::CreateCourseRequest},
        enrollments::entities::EnrollmentRole,
        groups::{entities::CourseGroup, requests::CreateGroupRequest},
        tasks::{entities::Task, requests::CreateTaskRequest},
        users::{
            entities::{User, UserRole},
            requests::CreateUserRequest,
        },
    };

    pub async fn user(storage: &SeaOrmStorage, username: &str, role: UserRole) -> User {
        storage
            .create_user_impl(CreateUserRequest {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password: "hash".to_string(),
                first_name: username.to_string(),
                last_name: "Tester".to_string(),
                role,
            })
            .await
            .unwrap()
    }

    pub async fn course(storage: &SeaOrmStorage, name: &str) -> Course {
        storage
            .create_course_impl(CreateCourseRequest {
                name: name.to_string(),
                description: None,
            })
            .await
            .unwrap()
    }

    pub fn group_request(course_id: i64, name: &str) -> CreateGroupRequest {
        CreateGroupRequest {
            course_id,
            name: name.to_string(),
            students_limit: None,
            days_of_week: None,
            self_registration: false,
            token_validity_hours: 0,
            token_validity_days: 0,
        }
    }

    pub async fn group(storage: &SeaOrmStorage, course_id: i64, name: &str) -> CourseGroup {
        storage
            .create_group_impl(group_request(course_id, name))
            .await
            .unwrap()
    }

    pub async fn task(
        storage: &SeaOrmStorage,
        course_id: i64,
        created_by: i64,
        number: Option<i32>,
    ) -> Task {
        storage
            .create_task_impl(
                course_id,
                created_by,
                CreateTaskRequest {
                    number,
                    name: "Linked lists".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap()
    }

    pub async fn enroll(
        storage: &SeaOrmStorage,
        group_id: i64,
        user_id: i64,
        role: EnrollmentRole,
    ) {
        let result = storage
            .add_group_members_impl(group_id, &[user_id], role)
            .await
            .unwrap();
        assert!(result.errors.is_empty(), "{:?}", result.errors);
    }

    /// 删除库文件及其 WAL 附属文件
    pub fn remove_sqlite_file(path: &std::path::Path) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }
}
