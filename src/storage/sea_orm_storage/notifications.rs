//! 通知存储操作

use super::{SeaOrmStorage, pagination_info};
use crate::entity::notifications::{ActiveModel, Column, Entity as Notifications};
use crate::errors::{CourseHubError, Result};
use crate::models::notifications::{
    entities::{Notification, NotificationBox},
    requests::NotificationListQuery,
    responses::NotificationListResponse,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
};

impl SeaOrmStorage {
    /// 分页列出通知：未读在前，同组内按创建时间倒序
    pub async fn list_notifications_impl(
        &self,
        user_id: i64,
        mailbox: NotificationBox,
        query: NotificationListQuery,
    ) -> Result<NotificationListResponse> {
        let page = query.page.max(1) as u64;
        let size = query.size.clamp(1, 100) as u64;

        let owner = match mailbox {
            NotificationBox::Inbox => Condition::all().add(Column::ReceiverId.eq(user_id)),
            NotificationBox::Outbox => Condition::all().add(Column::SenderId.eq(user_id)),
            NotificationBox::All => Condition::any()
                .add(Column::ReceiverId.eq(user_id))
                .add(Column::SenderId.eq(user_id)),
        };

        let mut select = Notifications::find().filter(owner);

        if let Some(is_read) = query.is_read {
            select = select.filter(Column::IsRead.eq(is_read));
        }

        select = select
            .order_by_asc(Column::IsRead)
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询通知总数失败: {e}")))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询通知页数失败: {e}")))?;
        let notifications = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询通知列表失败: {e}")))?;

        Ok(NotificationListResponse {
            items: notifications
                .into_iter()
                .map(|m| m.into_notification())
                .collect(),
            pagination: pagination_info(page, size, total, pages),
        })
    }

    /// 通过 ID 获取通知
    pub async fn get_notification_by_id_impl(&self, id: i64) -> Result<Option<Notification>> {
        let result = Notifications::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询通知失败: {e}")))?;

        Ok(result.map(|m| m.into_notification()))
    }

    /// 接收者标记单条通知为已读
    pub async fn mark_notification_read_impl(
        &self,
        id: i64,
        receiver_id: i64,
    ) -> Result<Option<Notification>> {
        let existing = Notifications::find_by_id(id)
            .filter(Column::ReceiverId.eq(receiver_id))
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询通知失败: {e}")))?;

        let Some(model) = existing else {
            return Ok(None);
        };
        if model.is_read {
            return Ok(Some(model.into_notification()));
        }

        let mut active: ActiveModel = model.into();
        active.is_read = Set(true);
        active.updated_at = Set(chrono::Utc::now().timestamp());
        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("标记通知已读失败: {e}")))?;

        Ok(Some(updated.into_notification()))
    }

    /// 标记全部通知为已读，返回本次标记的数量
    pub async fn mark_all_notifications_read_impl(&self, receiver_id: i64) -> Result<u64> {
        let result = Notifications::update_many()
            .col_expr(Column::IsRead, sea_orm::sea_query::Expr::value(true))
            .col_expr(
                Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().timestamp()),
            )
            .filter(Column::ReceiverId.eq(receiver_id))
            .filter(Column::IsRead.eq(false))
            .exec(&self.db)
            .await
            .map_err(|e| {
                CourseHubError::database_operation(format!("批量标记通知已读失败: {e}"))
            })?;

        Ok(result.rows_affected)
    }

    /// 未读通知数量
    pub async fn count_unread_notifications_impl(&self, receiver_id: i64) -> Result<u64> {
        Notifications::find()
            .filter(Column::ReceiverId.eq(receiver_id))
            .filter(Column::IsRead.eq(false))
            .count(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询未读通知数量失败: {e}")))
    }
}
