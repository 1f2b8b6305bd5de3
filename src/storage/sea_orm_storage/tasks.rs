use super::SeaOrmStorage;
use crate::entity::tasks::{ActiveModel, Column, Entity as Tasks};
use crate::errors::{CourseHubError, Result};
use crate::models::tasks::{entities::Task, requests::CreateTaskRequest};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

impl SeaOrmStorage {
    /// 创建任务
    pub async fn create_task_impl(
        &self,
        course_id: i64,
        created_by: i64,
        req: CreateTaskRequest,
    ) -> Result<Task> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            course_id: Set(course_id),
            number: Set(req.number),
            name: Set(req.name.trim().to_string()),
            description: Set(req.description),
            created_by: Set(created_by),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("创建任务失败: {e}")))?;

        Ok(result.into_task())
    }

    /// 通过 ID 获取任务
    pub async fn get_task_by_id_impl(&self, id: i64) -> Result<Option<Task>> {
        let result = Tasks::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询任务失败: {e}")))?;

        Ok(result.map(|m| m.into_task()))
    }

    /// 课程下的全部任务
    pub async fn list_tasks_by_course_impl(&self, course_id: i64) -> Result<Vec<Task>> {
        let result = Tasks::find()
            .filter(Column::CourseId.eq(course_id))
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询任务列表失败: {e}")))?;

        let mut tasks: Vec<Task> = result.into_iter().map(|m| m.into_task()).collect();
        // 无编号的任务排在最后
        tasks.sort_by_key(|t| (t.number.is_none(), t.number));
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::entities::UserRole;
    use crate::storage::sea_orm_storage::fixtures;

    #[tokio::test]
    async fn test_tasks_sorted_by_number_with_unnumbered_last() {
        let storage = SeaOrmStorage::in_memory().await;
        let admin = fixtures::user(&storage, "admin", UserRole::Admin).await;
        let course = fixtures::course(&storage, "Rust").await;
        let other = fixtures::course(&storage, "Go").await;

        fixtures::task(&storage, course.id, admin.id, None).await;
        fixtures::task(&storage, course.id, admin.id, Some(2)).await;
        fixtures::task(&storage, course.id, admin.id, Some(1)).await;
        fixtures::task(&storage, other.id, admin.id, Some(1)).await;

        let tasks = storage.list_tasks_by_course_impl(course.id).await.unwrap();
        let numbers: Vec<_> = tasks.iter().map(|t| t.number).collect();
        assert_eq!(numbers, vec![Some(1), Some(2), None]);
        assert!(tasks.iter().all(|t| t.course_id == course.id));
    }
}
