//! 选课存储操作

use super::SeaOrmStorage;
use crate::entity::course_enrollments::{ActiveModel, Column, Entity as CourseEnrollments};
use crate::entity::course_groups::{Column as GroupColumn, Entity as CourseGroups};
use crate::entity::users::Entity as Users;
use crate::errors::{CourseHubError, Result};
use crate::models::enrollments::{
    entities::{CourseEnrollment, EnrollmentRole},
    responses::{BulkEnrollResponse, GroupMember, MemberError},
};
use crate::models::groups::{
    entities::CourseGroup,
    registration::{EnrollmentRejection, EnrollmentSnapshot, check_enrollment},
};
use crate::models::users::responses::UserSummary;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

async fn insert_enrollment<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    group: &CourseGroup,
    role: EnrollmentRole,
) -> Result<CourseEnrollment> {
    let model = ActiveModel {
        user_id: Set(user_id),
        course_id: Set(group.course_id),
        group_id: Set(group.id),
        role: Set(role.to_string()),
        enrolled_at: Set(chrono::Utc::now().timestamp()),
        ..Default::default()
    };
    let result = model
        .insert(conn)
        .await
        .map_err(|e| CourseHubError::database_operation(format!("创建选课记录失败: {e}")))?;
    Ok(result.into_enrollment())
}

impl SeaOrmStorage {
    /// 通过注册令牌加入分组
    ///
    /// 读取分组、检查与写入在同一事务内完成。分组行在事务期间加锁
    /// （SQLite 以分组行的空更新开头抢占写锁），并发加入时名额检查不会被绕过。
    pub async fn enroll_by_token_impl(
        &self,
        user_id: i64,
        token: &str,
    ) -> Result<std::result::Result<(CourseGroup, CourseEnrollment), EnrollmentRejection>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("开启事务失败: {e}")))?;

        let mut select = CourseGroups::find()
            .filter(GroupColumn::RegistrationToken.eq(token))
            .filter(GroupColumn::IsDeleted.eq(false));
        if self.supports_row_lock() {
            select = select.lock_exclusive();
        } else {
            CourseGroups::update_many()
                .col_expr(
                    GroupColumn::UpdatedAt,
                    sea_orm::sea_query::Expr::col(GroupColumn::UpdatedAt),
                )
                .filter(GroupColumn::RegistrationToken.eq(token))
                .exec(&txn)
                .await
                .map_err(|e| CourseHubError::database_operation(format!("锁定分组失败: {e}")))?;
        }
        let group = select
            .one(&txn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询分组失败: {e}")))?
            .map(|m| m.into_group());

        let mut snapshot = EnrollmentSnapshot::default();
        if let Some(group) = group.as_ref().filter(|g| g.accepts_token()) {
            snapshot.in_group = CourseEnrollments::find()
                .filter(Column::UserId.eq(user_id))
                .filter(Column::GroupId.eq(group.id))
                .count(&txn)
                .await
                .map_err(|e| CourseHubError::database_operation(format!("查询选课记录失败: {e}")))?
                > 0;
            snapshot.in_other_group_of_course = CourseEnrollments::find()
                .filter(Column::UserId.eq(user_id))
                .filter(Column::CourseId.eq(group.course_id))
                .filter(Column::GroupId.ne(group.id))
                .filter(Column::Role.eq(EnrollmentRole::STUDENT))
                .count(&txn)
                .await
                .map_err(|e| CourseHubError::database_operation(format!("查询选课记录失败: {e}")))?
                > 0;
            snapshot.member_count = CourseEnrollments::find()
                .filter(Column::GroupId.eq(group.id))
                .count(&txn)
                .await
                .map_err(|e| CourseHubError::database_operation(format!("查询分组人数失败: {e}")))?;
        }

        if let Err(rejection) = check_enrollment(group.as_ref(), chrono::Utc::now(), &snapshot) {
            // 事务随 txn 析构回滚
            return Ok(Err(rejection));
        }
        let Some(group) = group else {
            return Ok(Err(EnrollmentRejection::InvalidToken));
        };

        let enrollment = insert_enrollment(&txn, user_id, &group, EnrollmentRole::Student).await?;

        txn.commit()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(Ok((group, enrollment)))
    }

    /// 批量加入分组，逐个处理并收集每个用户的错误
    ///
    /// 学生在同一课程只保留一条记录，再次添加会转到当前分组；
    /// 教师在每个分组各有一条记录。
    pub async fn add_group_members_impl(
        &self,
        group_id: i64,
        user_ids: &[i64],
        role: EnrollmentRole,
    ) -> Result<BulkEnrollResponse> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("开启事务失败: {e}")))?;

        let group = CourseGroups::find_by_id(group_id)
            .filter(GroupColumn::IsDeleted.eq(false))
            .one(&txn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询分组失败: {e}")))?
            .map(|m| m.into_group())
            .ok_or_else(|| CourseHubError::not_found("Group not found"))?;

        if role == EnrollmentRole::Student
            && let Some(limit) = group.student_capacity()
        {
            let current = CourseEnrollments::find()
                .filter(Column::GroupId.eq(group.id))
                .filter(Column::Role.eq(EnrollmentRole::STUDENT))
                .count(&txn)
                .await
                .map_err(|e| CourseHubError::database_operation(format!("查询分组人数失败: {e}")))?;
            if current + user_ids.len() as u64 > limit {
                return Err(CourseHubError::validation(format!(
                    "Too many students, maximum limit is {limit}"
                )));
            }
        }

        let mut response = BulkEnrollResponse {
            enrolled: Vec::new(),
            errors: Vec::new(),
        };

        for &user_id in user_ids {
            let exists = Users::find_by_id(user_id)
                .one(&txn)
                .await
                .map_err(|e| CourseHubError::database_operation(format!("查询用户失败: {e}")))?
                .is_some();
            if !exists {
                response.errors.push(MemberError {
                    user_id,
                    message: "not found".to_string(),
                });
                continue;
            }

            let existing = match role {
                EnrollmentRole::Student => CourseEnrollments::find()
                    .filter(Column::UserId.eq(user_id))
                    .filter(Column::CourseId.eq(group.course_id))
                    .filter(Column::Role.eq(EnrollmentRole::STUDENT)),
                EnrollmentRole::Teacher => CourseEnrollments::find()
                    .filter(Column::UserId.eq(user_id))
                    .filter(Column::GroupId.eq(group.id))
                    .filter(Column::Role.eq(EnrollmentRole::TEACHER)),
            }
            .one(&txn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询选课记录失败: {e}")))?;

            let enrollment = match existing {
                Some(model) if model.group_id == group.id => model.into_enrollment(),
                Some(model) => {
                    let mut active: ActiveModel = model.into();
                    active.group_id = Set(group.id);
                    active
                        .update(&txn)
                        .await
                        .map_err(|e| {
                            CourseHubError::database_operation(format!("更新选课记录失败: {e}"))
                        })?
                        .into_enrollment()
                }
                None => insert_enrollment(&txn, user_id, &group, role).await?,
            };
            response.enrolled.push(enrollment);
        }

        txn.commit()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(response)
    }

    /// 从分组移除成员（任意角色）
    pub async fn remove_group_members_impl(&self, group_id: i64, user_ids: &[i64]) -> Result<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let result = CourseEnrollments::delete_many()
            .filter(Column::GroupId.eq(group_id))
            .filter(Column::UserId.is_in(user_ids.iter().copied()))
            .exec(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("移除分组成员失败: {e}")))?;

        Ok(result.rows_affected)
    }

    /// 分组成员，教师在前
    pub async fn list_group_members_impl(&self, group_id: i64) -> Result<Vec<GroupMember>> {
        let rows = CourseEnrollments::find()
            .filter(Column::GroupId.eq(group_id))
            .find_also_related(Users)
            .order_by_desc(Column::Role)
            .order_by_asc(Column::UserId)
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询分组成员失败: {e}")))?;

        Ok(rows
            .into_iter()
            .filter_map(|(enrollment, user)| {
                let user = user?.into_user();
                let enrollment = enrollment.into_enrollment();
                Some(GroupMember {
                    enrollment_id: enrollment.id,
                    role: enrollment.role,
                    user: UserSummary::from(&user),
                    enrolled_at: enrollment.enrolled_at,
                })
            })
            .collect())
    }

    /// (学生数, 教师数)
    pub async fn count_group_members_impl(&self, group_id: i64) -> Result<(u64, u64)> {
        let count_role = |role: &'static str| {
            CourseEnrollments::find()
                .filter(Column::GroupId.eq(group_id))
                .filter(Column::Role.eq(role))
                .count(&self.db)
        };
        let students = count_role(EnrollmentRole::STUDENT)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询分组人数失败: {e}")))?;
        let teachers = count_role(EnrollmentRole::TEACHER)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询分组人数失败: {e}")))?;
        Ok((students, teachers))
    }

    /// 是否为分组教师
    pub async fn is_group_teacher_impl(&self, user_id: i64, group_id: i64) -> Result<bool> {
        let count = CourseEnrollments::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::GroupId.eq(group_id))
            .filter(Column::Role.eq(EnrollmentRole::TEACHER))
            .count(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询选课记录失败: {e}")))?;
        Ok(count > 0)
    }

    /// 是否为课程任一分组的教师
    pub async fn is_course_teacher_impl(&self, user_id: i64, course_id: i64) -> Result<bool> {
        self.is_enrolled_in_course_impl(user_id, course_id, EnrollmentRole::Teacher)
            .await
    }

    pub async fn is_enrolled_in_course_impl(
        &self,
        user_id: i64,
        course_id: i64,
        role: EnrollmentRole,
    ) -> Result<bool> {
        let count = CourseEnrollments::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::CourseId.eq(course_id))
            .filter(Column::Role.eq(role.to_string()))
            .count(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询选课记录失败: {e}")))?;
        Ok(count > 0)
    }

    /// 教师所带的该课程分组中是否有这名学生
    pub async fn teacher_can_access_student_impl(
        &self,
        teacher_id: i64,
        student_id: i64,
        course_id: i64,
    ) -> Result<bool> {
        let group_ids = self.teacher_group_ids(teacher_id, Some(course_id)).await?;
        if group_ids.is_empty() {
            return Ok(false);
        }

        let count = CourseEnrollments::find()
            .filter(Column::UserId.eq(student_id))
            .filter(Column::Role.eq(EnrollmentRole::STUDENT))
            .filter(Column::GroupId.is_in(group_ids))
            .count(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询选课记录失败: {e}")))?;
        Ok(count > 0)
    }

    /// 教师所在的分组 ID，可按课程过滤
    pub(crate) async fn teacher_group_ids(
        &self,
        teacher_id: i64,
        course_id: Option<i64>,
    ) -> Result<Vec<i64>> {
        let mut select = CourseEnrollments::find()
            .select_only()
            .column(Column::GroupId)
            .filter(Column::UserId.eq(teacher_id))
            .filter(Column::Role.eq(EnrollmentRole::TEACHER));
        if let Some(course_id) = course_id {
            select = select.filter(Column::CourseId.eq(course_id));
        }

        select
            .into_tuple::<i64>()
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询教师分组失败: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::groups::requests::UpdateGroupRequest;
    use crate::models::users::entities::UserRole;
    use crate::storage::sea_orm_storage::fixtures;

    async fn open_group(storage: &SeaOrmStorage, course_id: i64, limit: Option<i32>) -> CourseGroup {
        let mut req = fixtures::group_request(course_id, "Open");
        req.self_registration = true;
        req.students_limit = limit;
        storage.create_group_impl(req).await.unwrap()
    }

    #[tokio::test]
    async fn test_enroll_by_token_once() {
        let storage = SeaOrmStorage::in_memory().await;
        let course = fixtures::course(&storage, "Rust").await;
        let group = open_group(&storage, course.id, None).await;
        let student = fixtures::user(&storage, "student", UserRole::Student).await;
        let token = group.registration_token.clone().unwrap();

        let (joined, enrollment) = storage
            .enroll_by_token_impl(student.id, &token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(joined.id, group.id);
        assert_eq!(enrollment.role, EnrollmentRole::Student);
        assert_eq!(enrollment.course_id, course.id);

        let again = storage.enroll_by_token_impl(student.id, &token).await.unwrap();
        assert_eq!(again.unwrap_err(), EnrollmentRejection::AlreadyEnrolled);
    }

    #[tokio::test]
    async fn test_enroll_rejects_unknown_and_disabled_tokens() {
        let storage = SeaOrmStorage::in_memory().await;
        let course = fixtures::course(&storage, "Rust").await;
        let group = open_group(&storage, course.id, None).await;
        let student = fixtures::user(&storage, "student", UserRole::Student).await;
        let token = group.registration_token.clone().unwrap();

        let unknown = storage.enroll_by_token_impl(student.id, "nope").await.unwrap();
        assert_eq!(unknown.unwrap_err(), EnrollmentRejection::InvalidToken);

        storage
            .update_group_impl(
                group.id,
                UpdateGroupRequest {
                    self_registration: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let disabled = storage.enroll_by_token_impl(student.id, &token).await.unwrap();
        assert_eq!(disabled.unwrap_err(), EnrollmentRejection::InvalidToken);
    }

    #[tokio::test]
    async fn test_enroll_rejects_expired_token() {
        use crate::entity::course_groups::ActiveModel as GroupActiveModel;

        let storage = SeaOrmStorage::in_memory().await;
        let course = fixtures::course(&storage, "Rust").await;
        let group = open_group(&storage, course.id, None).await;
        let student = fixtures::user(&storage, "student", UserRole::Student).await;

        GroupActiveModel {
            id: Set(group.id),
            token_expires_at: Set(Some(chrono::Utc::now().timestamp() - 60)),
            ..Default::default()
        }
        .update(&storage.db)
        .await
        .unwrap();

        let result = storage
            .enroll_by_token_impl(student.id, group.registration_token.as_deref().unwrap())
            .await
            .unwrap();
        let rejection = result.unwrap_err();
        assert_eq!(rejection, EnrollmentRejection::TokenExpired);
        assert!(rejection.is_forbidden());
    }

    #[tokio::test]
    async fn test_enroll_respects_limit_and_course_uniqueness() {
        let storage = SeaOrmStorage::in_memory().await;
        let course = fixtures::course(&storage, "Rust").await;
        let full = open_group(&storage, course.id, Some(1)).await;
        let other = open_group(&storage, course.id, None).await;
        let a = fixtures::user(&storage, "a_student", UserRole::Student).await;
        let b = fixtures::user(&storage, "b_student", UserRole::Student).await;

        let token = full.registration_token.clone().unwrap();
        assert!(storage.enroll_by_token_impl(a.id, &token).await.unwrap().is_ok());
        let rejected = storage.enroll_by_token_impl(b.id, &token).await.unwrap();
        assert_eq!(rejected.unwrap_err(), EnrollmentRejection::GroupFull);

        let other_token = other.registration_token.clone().unwrap();
        let moved = storage.enroll_by_token_impl(a.id, &other_token).await.unwrap();
        assert_eq!(moved.unwrap_err(), EnrollmentRejection::AlreadyInCourse);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_token_enrollment_keeps_limit_on_sqlite_file() {
        let (storage, path) = SeaOrmStorage::temp_file(8).await;
        let course = fixtures::course(&storage, "Rust").await;
        let group = open_group(&storage, course.id, Some(2)).await;
        let token = group.registration_token.clone().unwrap();

        let mut students = Vec::new();
        for i in 0..6 {
            students.push(fixtures::user(&storage, &format!("student{i}"), UserRole::Student).await);
        }

        let handles: Vec<_> = students
            .iter()
            .map(|student| {
                let storage = storage.clone();
                let (user_id, token) = (student.id, token.clone());
                tokio::spawn(async move { storage.enroll_by_token_impl(user_id, &token).await })
            })
            .collect();

        let mut enrolled = 0;
        let mut full = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(Ok(_)) => enrolled += 1,
                Ok(Err(EnrollmentRejection::GroupFull)) => full += 1,
                other => panic!("unexpected enrollment result: {other:?}"),
            }
        }
        assert_eq!((enrolled, full), (2, 4));

        fixtures::remove_sqlite_file(&path);
    }

    #[tokio::test]
    async fn test_bulk_add_collects_errors_and_moves_students() {
        let storage = SeaOrmStorage::in_memory().await;
        let course = fixtures::course(&storage, "Rust").await;
        let first = fixtures::group(&storage, course.id, "First").await;
        let second = fixtures::group(&storage, course.id, "Second").await;
        let student = fixtures::user(&storage, "student", UserRole::Student).await;

        let added = storage
            .add_group_members_impl(first.id, &[student.id, 4242], EnrollmentRole::Student)
            .await
            .unwrap();
        assert_eq!(added.enrolled.len(), 1);
        assert_eq!(added.errors.len(), 1);
        assert_eq!(added.errors[0].user_id, 4242);

        let moved = storage
            .add_group_members_impl(second.id, &[student.id], EnrollmentRole::Student)
            .await
            .unwrap();
        assert_eq!(moved.enrolled[0].id, added.enrolled[0].id);
        assert_eq!(moved.enrolled[0].group_id, second.id);
        assert_eq!(storage.count_group_members_impl(first.id).await.unwrap(), (0, 0));
        assert_eq!(storage.count_group_members_impl(second.id).await.unwrap(), (1, 0));
    }

    #[tokio::test]
    async fn test_bulk_add_over_limit_is_rejected() {
        let storage = SeaOrmStorage::in_memory().await;
        let course = fixtures::course(&storage, "Rust").await;
        let mut req = fixtures::group_request(course.id, "Small");
        req.students_limit = Some(1);
        let group = storage.create_group_impl(req).await.unwrap();
        let a = fixtures::user(&storage, "a_student", UserRole::Student).await;
        let b = fixtures::user(&storage, "b_student", UserRole::Student).await;

        let err = storage
            .add_group_members_impl(group.id, &[a.id, b.id], EnrollmentRole::Student)
            .await
            .unwrap_err();
        assert!(matches!(err, CourseHubError::Validation(_)));
    }

    #[tokio::test]
    async fn test_zero_limit_accepts_token_and_bulk_enrollment() {
        let storage = SeaOrmStorage::in_memory().await;
        let course = fixtures::course(&storage, "Rust").await;
        let group = open_group(&storage, course.id, Some(0)).await;
        let a = fixtures::user(&storage, "a_student", UserRole::Student).await;
        let b = fixtures::user(&storage, "b_student", UserRole::Student).await;

        let token = group.registration_token.clone().unwrap();
        assert!(storage.enroll_by_token_impl(a.id, &token).await.unwrap().is_ok());
        let added = storage
            .add_group_members_impl(group.id, &[b.id], EnrollmentRole::Student)
            .await
            .unwrap();
        assert_eq!(added.enrolled.len(), 1);
    }

    #[tokio::test]
    async fn test_teacher_access_and_removal() {
        let storage = SeaOrmStorage::in_memory().await;
        let course = fixtures::course(&storage, "Rust").await;
        let mine = fixtures::group(&storage, course.id, "Mine").await;
        let theirs = fixtures::group(&storage, course.id, "Theirs").await;
        let teacher = fixtures::user(&storage, "teacher", UserRole::Teacher).await;
        let near = fixtures::user(&storage, "near", UserRole::Student).await;
        let far = fixtures::user(&storage, "far", UserRole::Student).await;

        fixtures::enroll(&storage, mine.id, teacher.id, EnrollmentRole::Teacher).await;
        fixtures::enroll(&storage, mine.id, near.id, EnrollmentRole::Student).await;
        fixtures::enroll(&storage, theirs.id, far.id, EnrollmentRole::Student).await;

        assert!(storage.is_group_teacher_impl(teacher.id, mine.id).await.unwrap());
        assert!(!storage.is_group_teacher_impl(teacher.id, theirs.id).await.unwrap());
        assert!(storage.is_course_teacher_impl(teacher.id, course.id).await.unwrap());
        assert!(
            storage
                .teacher_can_access_student_impl(teacher.id, near.id, course.id)
                .await
                .unwrap()
        );
        assert!(
            !storage
                .teacher_can_access_student_impl(teacher.id, far.id, course.id)
                .await
                .unwrap()
        );

        let members = storage.list_group_members_impl(mine.id).await.unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].role, EnrollmentRole::Teacher);

        let removed = storage
            .remove_group_members_impl(mine.id, &[near.id, far.id])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(storage.count_group_members_impl(mine.id).await.unwrap(), (0, 1));
    }
}
