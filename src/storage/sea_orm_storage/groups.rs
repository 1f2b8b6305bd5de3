//! 课程分组存储操作
//!
//! 注册令牌的状态迁移由 `models::groups::registration` 计算，这里只负责落库。

use super::{SeaOrmStorage, pagination_info};
use crate::entity::course_enrollments::Column as EnrollmentColumn;
use crate::entity::course_groups::{ActiveModel, Column, Entity as CourseGroups, Relation};
use crate::entity::courses::Column as CourseColumn;
use crate::errors::{CourseHubError, Result};
use crate::models::groups::{
    entities::CourseGroup,
    registration::{TokenTransition, issue_token, plan_token_transition},
    requests::{CreateGroupRequest, GroupListQuery, UpdateGroupRequest},
    responses::GroupListResponse,
};
use crate::utils::like_contains;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};

/// 写入新令牌或清空令牌
fn apply_transition(model: &mut ActiveModel, transition: TokenTransition, hours: i32, days: i32) {
    match transition {
        TokenTransition::Generate => {
            let issued = issue_token(chrono::Utc::now(), hours, days);
            model.registration_token = Set(Some(issued.token));
            model.token_expires_at = Set(issued.expires_at.map(|t| t.timestamp()));
        }
        TokenTransition::Invalidate => {
            model.registration_token = Set(None);
            model.token_expires_at = Set(None);
        }
        TokenTransition::Keep => {}
    }
}

impl SeaOrmStorage {
    /// 创建分组，开启自助注册时同时签发令牌
    pub async fn create_group_impl(&self, req: CreateGroupRequest) -> Result<CourseGroup> {
        let now = chrono::Utc::now().timestamp();

        let mut model = ActiveModel {
            course_id: Set(req.course_id),
            name: Set(req.name.trim().to_string()),
            students_limit: Set(req.students_limit),
            days_of_week: Set(req.days_of_week),
            self_registration: Set(req.self_registration),
            registration_token: Set(None),
            token_expires_at: Set(None),
            token_validity_hours: Set(req.token_validity_hours),
            token_validity_days: Set(req.token_validity_days),
            is_active: Set(true),
            is_deleted: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        if req.self_registration {
            apply_transition(
                &mut model,
                TokenTransition::Generate,
                req.token_validity_hours,
                req.token_validity_days,
            );
        }

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("创建分组失败: {e}")))?;

        Ok(result.into_group())
    }

    async fn find_group_model(&self, id: i64) -> Result<Option<crate::entity::course_groups::Model>> {
        CourseGroups::find_by_id(id)
            .filter(Column::IsDeleted.eq(false))
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询分组失败: {e}")))
    }

    /// 通过 ID 获取分组（不含已删除）
    pub async fn get_group_by_id_impl(&self, id: i64) -> Result<Option<CourseGroup>> {
        Ok(self.find_group_model(id).await?.map(|m| m.into_group()))
    }

    /// 分页列出分组，搜索同时匹配分组名和课程名
    pub async fn list_groups_with_pagination_impl(
        &self,
        query: GroupListQuery,
    ) -> Result<GroupListResponse> {
        let page = query.page.max(1) as u64;
        let size = query.size.clamp(1, 100) as u64;
        let active = query.active_filter().map_err(CourseHubError::validation)?;

        let mut select = CourseGroups::find()
            .join(JoinType::InnerJoin, Relation::Course.def())
            .filter(Column::IsDeleted.eq(false));

        if let Some(is_active) = active {
            select = select.filter(Column::IsActive.eq(is_active));
        }

        if let Some(course_id) = query.course_id {
            select = select.filter(Column::CourseId.eq(course_id));
        }

        if let Some(ref search) = query.search
            && !search.trim().is_empty()
        {
            let pattern = search.trim();
            select = select.filter(
                Condition::any()
                    .add(Column::Name.like(like_contains(pattern)))
                    .add(CourseColumn::Name.like(like_contains(pattern))),
            );
        }

        select = select.order_by_asc(Column::Name).order_by_asc(Column::Id);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询分组总数失败: {e}")))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询分组页数失败: {e}")))?;
        let groups = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询分组列表失败: {e}")))?;

        Ok(GroupListResponse {
            items: groups.into_iter().map(|m| m.into_group()).collect(),
            pagination: pagination_info(page, size, total, pages),
        })
    }

    /// 用户以任意角色加入的分组
    pub async fn list_user_groups_impl(&self, user_id: i64) -> Result<Vec<CourseGroup>> {
        let groups = CourseGroups::find()
            .join(JoinType::InnerJoin, Relation::CourseEnrollments.def())
            .filter(EnrollmentColumn::UserId.eq(user_id))
            .filter(Column::IsDeleted.eq(false))
            .distinct()
            .order_by_asc(Column::Name)
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询用户分组失败: {e}")))?;

        Ok(groups.into_iter().map(|m| m.into_group()).collect())
    }

    /// 更新分组，并按自助注册开关与有效期变化处理令牌
    pub async fn update_group_impl(
        &self,
        id: i64,
        req: UpdateGroupRequest,
    ) -> Result<Option<CourseGroup>> {
        let Some(existing) = self.find_group_model(id).await? else {
            return Ok(None);
        };

        let was_enabled = existing.self_registration;
        let now_enabled = req.self_registration.unwrap_or(was_enabled);
        let hours = req
            .token_validity_hours
            .unwrap_or(existing.token_validity_hours);
        let days = req.token_validity_days.unwrap_or(existing.token_validity_days);
        let validity_changed =
            hours != existing.token_validity_hours || days != existing.token_validity_days;
        let transition = plan_token_transition(
            was_enabled,
            now_enabled,
            existing.registration_token.is_some(),
            validity_changed,
        );

        let mut model: ActiveModel = existing.into();
        if let Some(name) = req.name {
            model.name = Set(name.trim().to_string());
        }
        if let Some(limit) = req.students_limit {
            model.students_limit = Set(Some(limit));
        }
        if let Some(days_of_week) = req.days_of_week {
            model.days_of_week = Set(Some(days_of_week));
        }
        if let Some(is_active) = req.is_active {
            model.is_active = Set(is_active);
        }
        model.self_registration = Set(now_enabled);
        model.token_validity_hours = Set(hours);
        model.token_validity_days = Set(days);
        apply_transition(&mut model, transition, hours, days);
        model.updated_at = Set(chrono::Utc::now().timestamp());

        let updated = model
            .update(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("更新分组失败: {e}")))?;

        Ok(Some(updated.into_group()))
    }

    /// 软删除分组并作废令牌
    pub async fn soft_delete_group_impl(&self, id: i64) -> Result<bool> {
        let Some(existing) = self.find_group_model(id).await? else {
            return Ok(false);
        };

        let mut model: ActiveModel = existing.into();
        model.is_deleted = Set(true);
        model.is_active = Set(false);
        apply_transition(&mut model, TokenTransition::Invalidate, 0, 0);
        model.updated_at = Set(chrono::Utc::now().timestamp());
        model
            .update(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("删除分组失败: {e}")))?;

        Ok(true)
    }

    /// 停用分组
    pub async fn deactivate_group_impl(&self, id: i64) -> Result<Option<CourseGroup>> {
        let Some(existing) = self.find_group_model(id).await? else {
            return Ok(None);
        };

        let mut model: ActiveModel = existing.into();
        model.is_active = Set(false);
        model.updated_at = Set(chrono::Utc::now().timestamp());
        let updated = model
            .update(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("停用分组失败: {e}")))?;

        Ok(Some(updated.into_group()))
    }

    /// 按分组当前的有效期设置重新签发令牌
    pub async fn refresh_group_token_impl(&self, id: i64) -> Result<Option<CourseGroup>> {
        let Some(existing) = self.find_group_model(id).await? else {
            return Ok(None);
        };

        let hours = existing.token_validity_hours;
        let days = existing.token_validity_days;
        let mut model: ActiveModel = existing.into();
        apply_transition(&mut model, TokenTransition::Generate, hours, days);
        model.updated_at = Set(chrono::Utc::now().timestamp());
        let updated = model
            .update(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("刷新分组令牌失败: {e}")))?;

        Ok(Some(updated.into_group()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enrollments::entities::EnrollmentRole;
    use crate::models::users::entities::UserRole;
    use crate::storage::sea_orm_storage::fixtures;

    #[tokio::test]
    async fn test_create_with_self_registration_issues_token() {
        let storage = SeaOrmStorage::in_memory().await;
        let course = fixtures::course(&storage, "Rust").await;

        let mut req = fixtures::group_request(course.id, "Evening");
        req.self_registration = true;
        req.token_validity_days = 2;
        let group = storage.create_group_impl(req).await.unwrap();

        assert_eq!(group.registration_token.as_ref().map(String::len), Some(86));
        assert!(group.token_expires_at.is_some());
        assert!(!group.is_token_expired());

        let plain = fixtures::group(&storage, course.id, "Morning").await;
        assert!(plain.registration_token.is_none());
        assert!(plain.token_expires_at.is_none());
    }

    #[tokio::test]
    async fn test_update_drives_token_lifecycle() {
        let storage = SeaOrmStorage::in_memory().await;
        let course = fixtures::course(&storage, "Rust").await;
        let group = fixtures::group(&storage, course.id, "A").await;

        // 开启：生成永不过期的令牌
        let enabled = storage
            .update_group_impl(
                group.id,
                UpdateGroupRequest {
                    self_registration: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        let first = enabled.registration_token.clone().unwrap();
        assert!(enabled.token_expires_at.is_none());

        // 仅改名：令牌保持不变
        let renamed = storage
            .update_group_impl(
                group.id,
                UpdateGroupRequest {
                    name: Some("A1".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.registration_token.as_deref(), Some(first.as_str()));

        // 有效期变化：重新生成
        let rotated = storage
            .update_group_impl(
                group.id,
                UpdateGroupRequest {
                    token_validity_hours: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_ne!(rotated.registration_token.as_deref(), Some(first.as_str()));
        assert!(rotated.token_expires_at.is_some());

        // 关闭：作废
        let disabled = storage
            .update_group_impl(
                group.id,
                UpdateGroupRequest {
                    self_registration: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(disabled.registration_token.is_none());
        assert!(disabled.token_expires_at.is_none());
    }

    #[tokio::test]
    async fn test_list_filters_and_search() {
        let storage = SeaOrmStorage::in_memory().await;
        let rust = fixtures::course(&storage, "Rust").await;
        let go = fixtures::course(&storage, "Go").await;
        let a = fixtures::group(&storage, rust.id, "Alpha").await;
        let b = fixtures::group(&storage, go.id, "Beta").await;
        let c = fixtures::group(&storage, go.id, "Gamma").await;
        storage.deactivate_group_impl(b.id).await.unwrap();
        assert!(storage.soft_delete_group_impl(c.id).await.unwrap());

        let query = |search: Option<&str>, is_active: Option<&str>| GroupListQuery {
            page: 1,
            size: 10,
            search: search.map(str::to_string),
            course_id: None,
            is_active: is_active.map(str::to_string),
        };

        let active = storage
            .list_groups_with_pagination_impl(query(None, None))
            .await
            .unwrap();
        assert_eq!(active.items.iter().map(|g| g.id).collect::<Vec<_>>(), vec![a.id]);

        let all = storage
            .list_groups_with_pagination_impl(query(None, Some("all")))
            .await
            .unwrap();
        assert_eq!(all.pagination.total, 2);

        // 按课程名搜索
        let by_course = storage
            .list_groups_with_pagination_impl(query(Some("go"), Some("all")))
            .await
            .unwrap();
        assert_eq!(by_course.items.iter().map(|g| g.id).collect::<Vec<_>>(), vec![b.id]);

        assert!(
            storage
                .list_groups_with_pagination_impl(query(None, Some("sometimes")))
                .await
                .is_err()
        );
        assert!(storage.get_group_by_id_impl(c.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_user_groups() {
        let storage = SeaOrmStorage::in_memory().await;
        let course = fixtures::course(&storage, "Rust").await;
        let a = fixtures::group(&storage, course.id, "A").await;
        fixtures::group(&storage, course.id, "B").await;
        let teacher = fixtures::user(&storage, "teacher", UserRole::Teacher).await;
        fixtures::enroll(&storage, a.id, teacher.id, EnrollmentRole::Teacher).await;

        let groups = storage.list_user_groups_impl(teacher.id).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, a.id);
    }

    #[tokio::test]
    async fn test_refresh_token_rotates() {
        let storage = SeaOrmStorage::in_memory().await;
        let course = fixtures::course(&storage, "Rust").await;
        let mut req = fixtures::group_request(course.id, "A");
        req.self_registration = true;
        let group = storage.create_group_impl(req).await.unwrap();

        let refreshed = storage
            .refresh_group_token_impl(group.id)
            .await
            .unwrap()
            .unwrap();
        assert!(refreshed.registration_token.is_some());
        assert_ne!(refreshed.registration_token, group.registration_token);
    }
}
