//! 答案存储操作

use std::collections::HashMap;

use super::{SeaOrmStorage, is_unique_violation, pagination_info};
use crate::entity::answers::{ActiveModel, Column, Entity as Answers, Model, Relation};
use crate::entity::course_enrollments::{Column as EnrollmentColumn, Entity as CourseEnrollments};
use crate::entity::grades::{Column as GradeColumn, Entity as Grades};
use crate::entity::tasks::{Column as TaskColumn, Entity as Tasks};
use crate::entity::users::{Column as UserColumn, Entity as Users};
use crate::errors::{CourseHubError, Result};
use crate::models::{
    PaginationInfo,
    answers::{
        entities::{Answer, AnswerRecord, AnswerStatus},
        requests::{AnswerListQuery, AnswerScope, CreateAnswerRequest},
    },
    enrollments::entities::EnrollmentRole,
    grades::entities::Grade,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};

impl SeaOrmStorage {
    /// 提交答案，同一学生对同一任务只能提交一次
    pub async fn create_answer_impl(&self, user_id: i64, req: CreateAnswerRequest) -> Result<Answer> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            task_id: Set(req.task_id),
            user_id: Set(user_id),
            description: Set(req.description),
            status: Set(AnswerStatus::InReview.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model.insert(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                CourseHubError::conflict("Answer for this task already exists")
            } else {
                CourseHubError::database_operation(format!("创建答案失败: {e}"))
            }
        })?;

        Ok(result.into_answer())
    }

    /// 答案详情（含任务、学生与评分）
    pub async fn get_answer_record_impl(&self, id: i64) -> Result<Option<AnswerRecord>> {
        let Some(model) = Answers::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询答案失败: {e}")))?
        else {
            return Ok(None);
        };

        Ok(self.load_records(vec![model]).await?.pop())
    }

    /// 按可见范围分页列出答案
    pub async fn list_answers_with_pagination_impl(
        &self,
        scope: AnswerScope,
        query: AnswerListQuery,
    ) -> Result<(Vec<AnswerRecord>, PaginationInfo)> {
        let page = query.page.max(1) as u64;
        let size = query.size.clamp(1, 100) as u64;

        let mut select = Answers::find().join(JoinType::InnerJoin, Relation::Task.def());

        match scope {
            AnswerScope::All => {}
            AnswerScope::Owner(user_id) => {
                select = select.filter(Column::UserId.eq(user_id));
            }
            AnswerScope::Teacher(teacher_id) => {
                let visible = self.teacher_visibility(teacher_id).await?;
                if visible.is_empty() {
                    return Ok((Vec::new(), pagination_info(page, size, 0, 0)));
                }
                // 学生只在其所在分组对应的课程下可见
                let mut condition = Condition::any();
                for (course_id, student_ids) in visible {
                    condition = condition.add(
                        Condition::all()
                            .add(TaskColumn::CourseId.eq(course_id))
                            .add(Column::UserId.is_in(student_ids)),
                    );
                }
                select = select.filter(condition);
            }
        }

        if let Some(status) = query.status {
            select = select.filter(Column::Status.eq(status.as_str()));
        }
        if let Some(task_id) = query.task_id {
            select = select.filter(Column::TaskId.eq(task_id));
        }
        if let Some(course_id) = query.course_id {
            select = select.filter(TaskColumn::CourseId.eq(course_id));
        }

        select = select
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询答案总数失败: {e}")))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询答案页数失败: {e}")))?;
        let models = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询答案列表失败: {e}")))?;

        let records = self.load_records(models).await?;
        Ok((records, pagination_info(page, size, total, pages)))
    }

    /// 课程下指定学生的答案与评分，用于导出成绩单
    pub async fn list_answers_for_gradebook_impl(
        &self,
        course_id: i64,
        user_ids: &[i64],
    ) -> Result<Vec<(Answer, Option<Grade>)>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = Answers::find()
            .join(JoinType::InnerJoin, Relation::Task.def())
            .filter(TaskColumn::CourseId.eq(course_id))
            .filter(Column::UserId.is_in(user_ids.iter().copied()))
            .find_also_related(Grades)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询成绩单失败: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(answer, grade)| (answer.into_answer(), grade.map(|g| g.into_grade())))
            .collect())
    }

    /// 教师可见的 (课程, 学生列表)
    async fn teacher_visibility(&self, teacher_id: i64) -> Result<HashMap<i64, Vec<i64>>> {
        let group_ids = self.teacher_group_ids(teacher_id, None).await?;
        if group_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i64, i64)> = CourseEnrollments::find()
            .select_only()
            .column(EnrollmentColumn::CourseId)
            .column(EnrollmentColumn::UserId)
            .filter(EnrollmentColumn::GroupId.is_in(group_ids))
            .filter(EnrollmentColumn::Role.eq(EnrollmentRole::STUDENT))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询教师学生失败: {e}")))?;

        let mut visible: HashMap<i64, Vec<i64>> = HashMap::new();
        for (course_id, user_id) in rows {
            visible.entry(course_id).or_default().push(user_id);
        }
        Ok(visible)
    }

    /// 批量补齐任务、学生与评分，保持输入顺序
    async fn load_records(&self, models: Vec<Model>) -> Result<Vec<AnswerRecord>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let answer_ids: Vec<i64> = models.iter().map(|m| m.id).collect();
        let task_ids: Vec<i64> = models.iter().map(|m| m.task_id).collect();
        let user_ids: Vec<i64> = models.iter().map(|m| m.user_id).collect();

        let tasks: HashMap<i64, _> = Tasks::find()
            .filter(TaskColumn::Id.is_in(task_ids))
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询任务失败: {e}")))?
            .into_iter()
            .map(|m| (m.id, m.into_task()))
            .collect();
        let users: HashMap<i64, _> = Users::find()
            .filter(UserColumn::Id.is_in(user_ids))
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询用户失败: {e}")))?
            .into_iter()
            .map(|m| (m.id, m.into_user()))
            .collect();
        let mut grades: HashMap<i64, Grade> = Grades::find()
            .filter(GradeColumn::AnswerId.is_in(answer_ids))
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询评分失败: {e}")))?
            .into_iter()
            .map(|m| (m.answer_id, m.into_grade()))
            .collect();

        Ok(models
            .into_iter()
            .filter_map(|m| {
                let task = tasks.get(&m.task_id)?.clone();
                let student = users.get(&m.user_id)?.clone();
                let grade = grades.remove(&m.id);
                Some(AnswerRecord {
                    answer: m.into_answer(),
                    task,
                    student,
                    grade,
                })
            })
            .collect())
    }
}
