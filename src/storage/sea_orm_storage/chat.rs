//! 聊天存储操作

use super::{SeaOrmStorage, is_unique_violation, pagination_info};
use crate::entity::chat_messages::{
    ActiveModel as MessageActiveModel, Column as MessageColumn, Entity as ChatMessages,
};
use crate::entity::chat_rooms::{ActiveModel as RoomActiveModel, Column as RoomColumn, Entity as ChatRooms};
use crate::errors::{CourseHubError, Result};
use crate::models::{
    PaginationInfo, PaginationQuery,
    chat::entities::{ChatMessage, ChatRoom},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};

impl SeaOrmStorage {
    async fn find_room_by_pair(&self, teacher_id: i64, student_id: i64) -> Result<Option<ChatRoom>> {
        let result = ChatRooms::find()
            .filter(RoomColumn::TeacherId.eq(teacher_id))
            .filter(RoomColumn::StudentId.eq(student_id))
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询聊天室失败: {e}")))?;

        Ok(result.map(|m| m.into_room()))
    }

    /// 每对 (教师, 学生) 只有一个聊天室，已存在时直接返回
    pub async fn get_or_create_chat_room_impl(
        &self,
        teacher_id: i64,
        student_id: i64,
        course_id: i64,
    ) -> Result<(ChatRoom, bool)> {
        if let Some(room) = self.find_room_by_pair(teacher_id, student_id).await? {
            return Ok((room, false));
        }

        let now = chrono::Utc::now().timestamp();
        let model = RoomActiveModel {
            teacher_id: Set(teacher_id),
            student_id: Set(student_id),
            course_id: Set(course_id),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        match model.insert(&self.db).await {
            Ok(room) => Ok((room.into_room(), true)),
            // 并发创建时以先写入者为准
            Err(e) if is_unique_violation(&e) => self
                .find_room_by_pair(teacher_id, student_id)
                .await?
                .map(|room| (room, false))
                .ok_or_else(|| CourseHubError::database_operation(format!("创建聊天室失败: {e}"))),
            Err(e) => Err(CourseHubError::database_operation(format!(
                "创建聊天室失败: {e}"
            ))),
        }
    }

    /// 通过 ID 获取聊天室
    pub async fn get_chat_room_impl(&self, id: i64) -> Result<Option<ChatRoom>> {
        let result = ChatRooms::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询聊天室失败: {e}")))?;

        Ok(result.map(|m| m.into_room()))
    }

    /// 用户参与的活跃聊天室，最近更新的在前
    pub async fn list_user_chat_rooms_impl(&self, user_id: i64) -> Result<Vec<ChatRoom>> {
        let result = ChatRooms::find()
            .filter(
                Condition::any()
                    .add(RoomColumn::TeacherId.eq(user_id))
                    .add(RoomColumn::StudentId.eq(user_id)),
            )
            .filter(RoomColumn::IsActive.eq(true))
            .order_by_desc(RoomColumn::UpdatedAt)
            .order_by_desc(RoomColumn::Id)
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询聊天室列表失败: {e}")))?;

        Ok(result.into_iter().map(|m| m.into_room()).collect())
    }

    /// 写入消息并刷新聊天室的更新时间
    pub async fn create_chat_message_impl(
        &self,
        room_id: i64,
        sender_id: i64,
        content: &str,
    ) -> Result<ChatMessage> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("开启事务失败: {e}")))?;
        let now = chrono::Utc::now().timestamp();

        let message = MessageActiveModel {
            room_id: Set(room_id),
            sender_id: Set(sender_id),
            content: Set(content.to_string()),
            is_read: Set(false),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| CourseHubError::database_operation(format!("创建聊天消息失败: {e}")))?;

        ChatRooms::update_many()
            .col_expr(RoomColumn::UpdatedAt, sea_orm::sea_query::Expr::value(now))
            .filter(RoomColumn::Id.eq(room_id))
            .exec(&txn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("更新聊天室失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(message.into_message())
    }

    /// 分页列出消息，最新的在前
    pub async fn list_chat_messages_impl(
        &self,
        room_id: i64,
        query: PaginationQuery,
    ) -> Result<(Vec<ChatMessage>, PaginationInfo)> {
        let (page, size) = query.normalized();

        let paginator = ChatMessages::find()
            .filter(MessageColumn::RoomId.eq(room_id))
            .order_by_desc(MessageColumn::CreatedAt)
            .order_by_desc(MessageColumn::Id)
            .paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询消息总数失败: {e}")))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询消息页数失败: {e}")))?;
        let messages = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询消息列表失败: {e}")))?;

        Ok((
            messages.into_iter().map(|m| m.into_message()).collect(),
            pagination_info(page, size, total, pages),
        ))
    }

    /// 最近 `limit` 条消息，按时间正序
    pub async fn recent_chat_messages_impl(
        &self,
        room_id: i64,
        limit: u64,
    ) -> Result<Vec<ChatMessage>> {
        let mut messages: Vec<ChatMessage> = ChatMessages::find()
            .filter(MessageColumn::RoomId.eq(room_id))
            .order_by_desc(MessageColumn::CreatedAt)
            .order_by_desc(MessageColumn::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询最近消息失败: {e}")))?
            .into_iter()
            .map(|m| m.into_message())
            .collect();
        messages.reverse();
        Ok(messages)
    }

    /// 标记他人发送的消息为已读
    pub async fn mark_chat_message_read_impl(
        &self,
        room_id: i64,
        message_id: i64,
        reader_id: i64,
    ) -> Result<bool> {
        let result = ChatMessages::update_many()
            .col_expr(MessageColumn::IsRead, sea_orm::sea_query::Expr::value(true))
            .filter(MessageColumn::Id.eq(message_id))
            .filter(MessageColumn::RoomId.eq(room_id))
            .filter(MessageColumn::SenderId.ne(reader_id))
            .exec(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("标记消息已读失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::entities::UserRole;
    use crate::storage::sea_orm_storage::fixtures;

    #[tokio::test]
    async fn test_room_is_unique_per_pair() {
        let storage = SeaOrmStorage::in_memory().await;
        let teacher = fixtures::user(&storage, "teacher", UserRole::Teacher).await;
        let student = fixtures::user(&storage, "student", UserRole::Student).await;
        let course = fixtures::course(&storage, "Rust").await;

        let (room, created) = storage
            .get_or_create_chat_room_impl(teacher.id, student.id, course.id)
            .await
            .unwrap();
        assert!(created);
        assert!(room.is_participant(student.id));

        let (again, created) = storage
            .get_or_create_chat_room_impl(teacher.id, student.id, course.id)
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(again.id, room.id);
        assert_eq!(storage.list_user_chat_rooms_impl(student.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_messages_recent_order_and_read_marks() {
        let storage = SeaOrmStorage::in_memory().await;
        let teacher = fixtures::user(&storage, "teacher", UserRole::Teacher).await;
        let student = fixtures::user(&storage, "student", UserRole::Student).await;
        let course = fixtures::course(&storage, "Rust").await;
        let (room, _) = storage
            .get_or_create_chat_room_impl(teacher.id, student.id, course.id)
            .await
            .unwrap();

        let mut ids = Vec::new();
        for text in ["one", "two", "three"] {
            ids.push(
                storage
                    .create_chat_message_impl(room.id, teacher.id, text)
                    .await
                    .unwrap()
                    .id,
            );
        }

        let recent = storage.recent_chat_messages_impl(room.id, 2).await.unwrap();
        assert_eq!(
            recent.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
            vec!["two", "three"]
        );

        let (page, pagination) = storage
            .list_chat_messages_impl(room.id, PaginationQuery { page: 1, size: 2 })
            .await
            .unwrap();
        assert_eq!(page[0].content, "three");
        assert_eq!(pagination.total, 3);

        // 发送者不能标记自己的消息
        assert!(
            !storage
                .mark_chat_message_read_impl(room.id, ids[0], teacher.id)
                .await
                .unwrap()
        );
        assert!(
            storage
                .mark_chat_message_read_impl(room.id, ids[0], student.id)
                .await
                .unwrap()
        );
    }
}
