//! 答案评阅事务
//!
//! 差异计算与通知文案都在 `models::answers::review` 中完成，
//! 这里负责在同一事务内加锁、写评分、改状态并 upsert 通知。

use super::SeaOrmStorage;
use crate::entity::answers::{
    ActiveModel as AnswerActiveModel, Column as AnswerColumn, Entity as Answers,
};
use crate::entity::grades::{ActiveModel as GradeActiveModel, Column as GradeColumn, Entity as Grades};
use crate::entity::notifications::{
    ActiveModel as NotificationActiveModel, Column as NotificationColumn, Entity as Notifications,
};
use crate::entity::tasks::Entity as Tasks;
use crate::errors::{CourseHubError, Result};
use crate::models::answers::review::{
    GradeValues, GradeWrite, NotificationDraft, ReviewOutcome, ReviewPayload, compose_notification,
    plan_review,
};
use crate::models::notifications::entities::Notification;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QuerySelect,
    Set, TransactionTrait,
};

/// 以 (接收者, 答案, 标题) 为键写入通知，已存在时覆盖内容并重新置为未读
async fn upsert_notification(
    txn: &DatabaseTransaction,
    receiver_id: i64,
    sender_id: i64,
    answer_id: i64,
    draft: NotificationDraft,
) -> Result<Notification> {
    let now = chrono::Utc::now().timestamp();
    let existing = Notifications::find()
        .filter(NotificationColumn::ReceiverId.eq(receiver_id))
        .filter(NotificationColumn::AnswerId.eq(answer_id))
        .filter(NotificationColumn::Title.eq(draft.title.as_str()))
        .one(txn)
        .await
        .map_err(|e| CourseHubError::database_operation(format!("查询通知失败: {e}")))?;

    let saved = match existing {
        Some(model) => {
            let mut active: NotificationActiveModel = model.into();
            active.content = Set(draft.content);
            active.feedback = Set(Some(draft.feedback));
            active.sender_id = Set(Some(sender_id));
            active.is_read = Set(false);
            active.updated_at = Set(now);
            active
                .update(txn)
                .await
                .map_err(|e| CourseHubError::database_operation(format!("更新通知失败: {e}")))?
        }
        None => NotificationActiveModel {
            receiver_id: Set(receiver_id),
            sender_id: Set(Some(sender_id)),
            answer_id: Set(Some(answer_id)),
            title: Set(draft.title),
            content: Set(draft.content),
            feedback: Set(Some(draft.feedback)),
            is_read: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await
        .map_err(|e| CourseHubError::database_operation(format!("创建通知失败: {e}")))?,
    };

    Ok(saved.into_notification())
}

impl SeaOrmStorage {
    /// 评阅答案
    ///
    /// 答案行在整个事务期间加锁，并发评阅按提交顺序串行，后提交者覆盖先提交者。
    /// SQLite 没有行锁，事务的第一条语句是对答案行的空更新，开局即持有库级写锁，
    /// 其余评阅在 `busy_timeout` 内排队。状态与评分都没有变化时不写通知。
    pub async fn review_answer_impl(
        &self,
        answer_id: i64,
        reviewer_id: i64,
        payload: ReviewPayload,
    ) -> Result<Option<ReviewOutcome>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("开启事务失败: {e}")))?;

        let mut select = Answers::find_by_id(answer_id);
        if self.supports_row_lock() {
            select = select.lock_exclusive();
        } else {
            // 先读后写的延迟事务在升级写锁时直接返回 SQLITE_BUSY，不会等待
            Answers::update_many()
                .col_expr(
                    AnswerColumn::UpdatedAt,
                    sea_orm::sea_query::Expr::col(AnswerColumn::UpdatedAt),
                )
                .filter(AnswerColumn::Id.eq(answer_id))
                .exec(&txn)
                .await
                .map_err(|e| CourseHubError::database_operation(format!("锁定答案失败: {e}")))?;
        }
        let Some(answer_model) = select
            .one(&txn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询答案失败: {e}")))?
        else {
            return Ok(None);
        };

        let task = Tasks::find_by_id(answer_model.task_id)
            .one(&txn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询任务失败: {e}")))?
            .ok_or_else(|| CourseHubError::not_found("Task not found"))?
            .into_task();

        let grade_model = Grades::find()
            .filter(GradeColumn::AnswerId.eq(answer_id))
            .one(&txn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询评分失败: {e}")))?;
        let existing = grade_model
            .as_ref()
            .map(|m| GradeValues::from(&m.clone().into_grade()));

        let previous = answer_model.clone().into_answer();
        let plan = plan_review(previous.status, existing.as_ref(), &payload);
        let now = chrono::Utc::now().timestamp();

        // 评分
        let grade = match (&plan.grade_write, grade_model) {
            (GradeWrite::Delete, _) => {
                Grades::delete_many()
                    .filter(GradeColumn::AnswerId.eq(answer_id))
                    .exec(&txn)
                    .await
                    .map_err(|e| CourseHubError::database_operation(format!("删除评分失败: {e}")))?;
                None
            }
            (GradeWrite::Save(values), Some(model)) => {
                let mut active: GradeActiveModel = model.into();
                active.score = Set(values.score);
                active.max_score = Set(values.max_score);
                active.feedback_text = Set(values.feedback_text.clone());
                active.graded_by = Set(Some(reviewer_id));
                active.updated_at = Set(now);
                Some(
                    active
                        .update(&txn)
                        .await
                        .map_err(|e| {
                            CourseHubError::database_operation(format!("更新评分失败: {e}"))
                        })?
                        .into_grade(),
                )
            }
            (GradeWrite::Save(values), None) => Some(
                GradeActiveModel {
                    answer_id: Set(answer_id),
                    score: Set(values.score),
                    max_score: Set(values.max_score),
                    feedback_text: Set(values.feedback_text.clone()),
                    graded_by: Set(Some(reviewer_id)),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .map_err(|e| CourseHubError::database_operation(format!("创建评分失败: {e}")))?
                .into_grade(),
            ),
            (GradeWrite::Keep, model) => model.map(|m| m.into_grade()),
        };

        // 状态
        let answer = if plan.has_changes() {
            let mut active: AnswerActiveModel = answer_model.into();
            active.status = Set(plan.new_status.to_string());
            active.updated_at = Set(now);
            active
                .update(&txn)
                .await
                .map_err(|e| CourseHubError::database_operation(format!("更新答案失败: {e}")))?
                .into_answer()
        } else {
            previous
        };

        // 通知
        let notification = match compose_notification(&plan, &task) {
            Some(draft) => Some(
                upsert_notification(&txn, answer.user_id, reviewer_id, answer.id, draft).await?,
            ),
            None => None,
        };

        txn.commit()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(Some(ReviewOutcome {
            answer,
            grade,
            plan,
            notification,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::answers::entities::{Answer, AnswerStatus};
    use crate::models::answers::requests::CreateAnswerRequest;
    use crate::models::users::entities::{User, UserRole};
    use crate::storage::sea_orm_storage::fixtures;
    use sea_orm::PaginatorTrait;

    struct Setup {
        storage: SeaOrmStorage,
        teacher: User,
        answer: Answer,
    }

    async fn setup() -> Setup {
        let storage = SeaOrmStorage::in_memory().await;
        let teacher = fixtures::user(&storage, "teacher", UserRole::Teacher).await;
        let student = fixtures::user(&storage, "student", UserRole::Student).await;
        let course = fixtures::course(&storage, "Rust").await;
        let task = fixtures::task(&storage, course.id, teacher.id, Some(3)).await;
        let answer = storage
            .create_answer_impl(
                student.id,
                CreateAnswerRequest {
                    task_id: task.id,
                    description: None,
                },
            )
            .await
            .unwrap();
        Setup {
            storage,
            teacher,
            answer,
        }
    }

    async fn notification_count(storage: &SeaOrmStorage) -> u64 {
        Notifications::find().count(&storage.db).await.unwrap()
    }

    #[tokio::test]
    async fn test_approve_with_score_creates_grade_and_notification() {
        let s = setup().await;
        let outcome = s
            .storage
            .review_answer_impl(
                s.answer.id,
                s.teacher.id,
                ReviewPayload {
                    status: Some(AnswerStatus::Approved),
                    score: Some(95),
                    max_score: Some(100),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.answer.status, AnswerStatus::Approved);
        let grade = outcome.grade.unwrap();
        assert_eq!(grade.score, Some(95));
        assert_eq!(grade.graded_by, Some(s.teacher.id));
        assert_eq!(grade.percentage(), 95.0);

        let notification = outcome.notification.unwrap();
        assert_eq!(
            notification.title,
            "Your answer for Task 3. Linked lists has been reviewed with grade added"
        );
        assert!(notification.content.contains("Grade: 95/100 (95.0% - A)"));
        assert_eq!(notification.sender_id, Some(s.teacher.id));
        assert_eq!(notification.answer_id, Some(s.answer.id));
        assert!(!notification.is_read);
    }

    #[tokio::test]
    async fn test_noop_review_writes_nothing() {
        let s = setup().await;
        let outcome = s
            .storage
            .review_answer_impl(s.answer.id, s.teacher.id, ReviewPayload::default())
            .await
            .unwrap()
            .unwrap();
        assert!(!outcome.plan.has_changes());
        assert!(outcome.notification.is_none());
        assert_eq!(notification_count(&s.storage).await, 0);

        // 状态不变、评分不变的重复评阅同样不写通知
        let approve = ReviewPayload {
            status: Some(AnswerStatus::Approved),
            score: Some(80),
            ..Default::default()
        };
        s.storage
            .review_answer_impl(s.answer.id, s.teacher.id, approve.clone())
            .await
            .unwrap();
        let repeated = s
            .storage
            .review_answer_impl(s.answer.id, s.teacher.id, approve)
            .await
            .unwrap()
            .unwrap();
        assert!(repeated.notification.is_none());
        assert_eq!(notification_count(&s.storage).await, 1);
    }

    #[tokio::test]
    async fn test_score_cleared_when_leaving_approved() {
        let s = setup().await;
        s.storage
            .review_answer_impl(
                s.answer.id,
                s.teacher.id,
                ReviewPayload {
                    status: Some(AnswerStatus::Approved),
                    score: Some(70),
                    feedback_text: Some("ok".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let outcome = s
            .storage
            .review_answer_impl(
                s.answer.id,
                s.teacher.id,
                ReviewPayload {
                    status: Some(AnswerStatus::HaveFlaws),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        let grade = outcome.grade.unwrap();
        assert_eq!(grade.score, None);
        assert_eq!(grade.feedback_text.as_deref(), Some("ok"));

        let stored = Grades::find()
            .filter(GradeColumn::AnswerId.eq(s.answer.id))
            .one(&s.storage.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.score, None);
    }

    #[tokio::test]
    async fn test_delete_grade_mentions_removal() {
        let s = setup().await;
        s.storage
            .review_answer_impl(
                s.answer.id,
                s.teacher.id,
                ReviewPayload {
                    status: Some(AnswerStatus::Approved),
                    score: Some(90),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let outcome = s
            .storage
            .review_answer_impl(
                s.answer.id,
                s.teacher.id,
                ReviewPayload {
                    delete_grade: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert!(outcome.grade.is_none());
        let notification = outcome.notification.unwrap();
        assert!(notification.content.contains("removed"));
        assert_eq!(notification.feedback.as_deref(), Some(""));
        let remaining = Grades::find().count(&s.storage.db).await.unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_same_title_upserts_and_marks_unread() {
        let s = setup().await;
        let grade_only = |score: i32| ReviewPayload {
            score: Some(score),
            ..Default::default()
        };

        // 先通过，再三次只改分数；后两次标题都是 "has been updated"
        s.storage
            .review_answer_impl(
                s.answer.id,
                s.teacher.id,
                ReviewPayload {
                    status: Some(AnswerStatus::Approved),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        s.storage
            .review_answer_impl(s.answer.id, s.teacher.id, grade_only(60))
            .await
            .unwrap();
        let first = s
            .storage
            .review_answer_impl(s.answer.id, s.teacher.id, grade_only(75))
            .await
            .unwrap()
            .unwrap()
            .notification
            .unwrap();

        NotificationActiveModel {
            id: Set(first.id),
            is_read: Set(true),
            ..Default::default()
        }
        .update(&s.storage.db)
        .await
        .unwrap();

        let second = s
            .storage
            .review_answer_impl(s.answer.id, s.teacher.id, grade_only(85))
            .await
            .unwrap()
            .unwrap()
            .notification
            .unwrap();

        assert_eq!(
            second.title,
            "Your grade for Task 3. Linked lists has been updated"
        );
        assert_eq!(first.title, second.title);
        assert_eq!(first.id, second.id);
        assert!(!second.is_read);
        assert!(second.content.contains("85/100"));
        assert_eq!(notification_count(&s.storage).await, 3);
    }

    #[tokio::test]
    async fn test_missing_answer_returns_none() {
        let s = setup().await;
        assert!(
            s.storage
                .review_answer_impl(9999, s.teacher.id, ReviewPayload::default())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reviews_serialize_on_sqlite_file() {
        let (storage, path) = SeaOrmStorage::temp_file(8).await;
        let teacher = fixtures::user(&storage, "teacher", UserRole::Teacher).await;
        let student = fixtures::user(&storage, "student", UserRole::Student).await;
        let course = fixtures::course(&storage, "Rust").await;
        let task = fixtures::task(&storage, course.id, teacher.id, Some(1)).await;
        let answer = storage
            .create_answer_impl(
                student.id,
                CreateAnswerRequest {
                    task_id: task.id,
                    description: None,
                },
            )
            .await
            .unwrap();

        for round in 0..10 {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let storage = storage.clone();
                    let (answer_id, teacher_id) = (answer.id, teacher.id);
                    tokio::spawn(async move {
                        storage
                            .review_answer_impl(
                                answer_id,
                                teacher_id,
                                ReviewPayload {
                                    status: Some(AnswerStatus::Approved),
                                    score: Some(round * 4 + i),
                                    ..Default::default()
                                },
                            )
                            .await
                    })
                })
                .collect();
            for handle in handles {
                let outcome = handle.await.unwrap();
                assert!(outcome.is_ok(), "review failed: {outcome:?}");
            }
        }

        // 所有评阅都落在同一条评分上
        let grades = Grades::find()
            .filter(GradeColumn::AnswerId.eq(answer.id))
            .count(&storage.db)
            .await
            .unwrap();
        assert_eq!(grades, 1);

        fixtures::remove_sqlite_file(&path);
    }
}
