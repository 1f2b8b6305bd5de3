use super::{SeaOrmStorage, pagination_info};
use crate::entity::course_enrollments::{Column as EnrollmentColumn, Entity as CourseEnrollments};
use crate::entity::course_groups::{Column as GroupColumn, Entity as CourseGroups};
use crate::entity::courses::{ActiveModel, Column, Entity as Courses};
use crate::entity::tasks::{Column as TaskColumn, Entity as Tasks};
use crate::errors::{CourseHubError, Result};
use crate::models::courses::{
    entities::Course,
    requests::{CourseListQuery, CreateCourseRequest},
    responses::{CourseExportRow, CourseListResponse},
};
use crate::models::enrollments::entities::EnrollmentRole;
use crate::utils::like_contains;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::collections::{HashMap, HashSet};

impl SeaOrmStorage {
    /// 创建课程
    pub async fn create_course_impl(&self, req: CreateCourseRequest) -> Result<Course> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            name: Set(req.name.trim().to_string()),
            description: Set(req.description),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("创建课程失败: {e}")))?;

        Ok(result.into_course())
    }

    /// 通过 ID 获取课程
    pub async fn get_course_by_id_impl(&self, id: i64) -> Result<Option<Course>> {
        let result = Courses::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程失败: {e}")))?;

        Ok(result.map(|m| m.into_course()))
    }

    /// 分页列出课程
    pub async fn list_courses_with_pagination_impl(
        &self,
        query: CourseListQuery,
    ) -> Result<CourseListResponse> {
        let page = query.page.max(1) as u64;
        let size = query.size.clamp(1, 100) as u64;

        let mut select = Courses::find();

        // 搜索条件
        if let Some(ref search) = query.search
            && !search.trim().is_empty()
        {
            select = select.filter(Column::Name.like(like_contains(search.trim())));
        }

        select = select.order_by_asc(Column::Name).order_by_asc(Column::Id);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程总数失败: {e}")))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程页数失败: {e}")))?;
        let courses = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程列表失败: {e}")))?;

        Ok(CourseListResponse {
            items: courses.into_iter().map(|m| m.into_course()).collect(),
            pagination: pagination_info(page, size, total, pages),
        })
    }

    /// 导出全部课程，按 ID 排序
    pub async fn list_courses_for_export_impl(&self) -> Result<Vec<CourseExportRow>> {
        let courses = Courses::find()
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程列表失败: {e}")))?;

        let enrollments: Vec<(i64, i64, String)> = CourseEnrollments::find()
            .select_only()
            .column(EnrollmentColumn::CourseId)
            .column(EnrollmentColumn::UserId)
            .column(EnrollmentColumn::Role)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程成员失败: {e}")))?;
        let group_courses: Vec<i64> = CourseGroups::find()
            .select_only()
            .column(GroupColumn::CourseId)
            .filter(GroupColumn::IsDeleted.eq(false))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程分组失败: {e}")))?;
        let task_courses: Vec<i64> = Tasks::find()
            .select_only()
            .column(TaskColumn::CourseId)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询课程任务失败: {e}")))?;

        // 同一用户可能在多个分组中出现
        let mut students: HashMap<i64, HashSet<i64>> = HashMap::new();
        let mut teachers: HashMap<i64, HashSet<i64>> = HashMap::new();
        for (course_id, user_id, role) in enrollments {
            let bucket = match role.as_str() {
                EnrollmentRole::STUDENT => &mut students,
                EnrollmentRole::TEACHER => &mut teachers,
                _ => continue,
            };
            bucket.entry(course_id).or_default().insert(user_id);
        }
        let tally = |ids: Vec<i64>| {
            let mut counts: HashMap<i64, u64> = HashMap::new();
            for id in ids {
                *counts.entry(id).or_default() += 1;
            }
            counts
        };
        let groups = tally(group_courses);
        let tasks = tally(task_courses);

        Ok(courses
            .into_iter()
            .map(|m| {
                let id = m.id;
                CourseExportRow {
                    course: m.into_course(),
                    students_count: students.get(&id).map_or(0, |s| s.len() as u64),
                    teachers_count: teachers.get(&id).map_or(0, |s| s.len() as u64),
                    groups_count: groups.get(&id).copied().unwrap_or(0),
                    tasks_count: tasks.get(&id).copied().unwrap_or(0),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sea_orm_storage::fixtures;

    #[tokio::test]
    async fn test_course_search_escapes_wildcards() {
        let storage = SeaOrmStorage::in_memory().await;
        fixtures::course(&storage, "Algorithms").await;
        fixtures::course(&storage, "100% Rust").await;
        fixtures::course(&storage, "Databases").await;

        let query = |search: &str| CourseListQuery {
            page: 1,
            size: 10,
            search: Some(search.to_string()),
        };

        let found = storage
            .list_courses_with_pagination_impl(query("%"))
            .await
            .unwrap();
        assert_eq!(found.items.len(), 1);
        assert_eq!(found.items[0].name, "100% Rust");

        let found = storage
            .list_courses_with_pagination_impl(query("a"))
            .await
            .unwrap();
        assert_eq!(found.pagination.total, 2);
    }

    #[tokio::test]
    async fn test_course_pagination() {
        let storage = SeaOrmStorage::in_memory().await;
        for name in ["A", "B", "C"] {
            fixtures::course(&storage, name).await;
        }
        let page = storage
            .list_courses_with_pagination_impl(CourseListQuery {
                page: 2,
                size: 2,
                search: None,
            })
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "C");
        assert_eq!(page.pagination.total_pages, 2);
    }

    #[tokio::test]
    async fn test_export_rows_count_distinct_members() {
        use crate::models::enrollments::entities::EnrollmentRole;
        use crate::models::users::entities::UserRole;

        let storage = SeaOrmStorage::in_memory().await;
        let rust = fixtures::course(&storage, "Rust").await;
        let empty = fixtures::course(&storage, "Empty").await;
        let a = fixtures::group(&storage, rust.id, "A").await;
        let b = fixtures::group(&storage, rust.id, "B").await;
        let gone = fixtures::group(&storage, rust.id, "Gone").await;
        storage.soft_delete_group_impl(gone.id).await.unwrap();

        let teacher = fixtures::user(&storage, "teach", UserRole::Teacher).await;
        fixtures::enroll(&storage, a.id, teacher.id, EnrollmentRole::Teacher).await;
        fixtures::enroll(&storage, b.id, teacher.id, EnrollmentRole::Teacher).await;
        for name in ["ann", "bob", "cid"] {
            let student = fixtures::user(&storage, name, UserRole::Student).await;
            fixtures::enroll(&storage, a.id, student.id, EnrollmentRole::Student).await;
        }
        fixtures::task(&storage, rust.id, teacher.id, Some(1)).await;
        fixtures::task(&storage, rust.id, teacher.id, Some(2)).await;

        let rows = storage.list_courses_for_export_impl().await.unwrap();
        assert_eq!(rows.len(), 2);
        let row = &rows[0];
        assert_eq!(row.course.id, rust.id);
        assert_eq!(
            (row.students_count, row.teachers_count, row.groups_count, row.tasks_count),
            (3, 1, 2, 2)
        );
        let row = &rows[1];
        assert_eq!(row.course.id, empty.id);
        assert_eq!(
            (row.students_count, row.teachers_count, row.groups_count, row.tasks_count),
            (0, 0, 0, 0)
        );
    }
}
