/*!
 * 聊天室 WebSocket
 *
 * 客户端通过 `ws://host/api/v1/ws/chat/{room_id}?token=<access_token>` 连接，
 * 认证与房间权限在握手前由路由层校验。连接建立后先按时间正序回放最近的消息。
 *
 * ## 客户端帧
 * ```json
 * {"type": "send_message", "content": "..."}
 * {"type": "mark_as_read", "message_id": 1}
 * {"type": "typing", "is_typing": true}
 * ```
 */

use actix_ws::Message;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::{ChannelLayer, RealtimeEvent, chat_room_group};
use crate::config::AppConfig;
use crate::errors::Result;
use crate::models::chat::entities::{ChatMessage, ChatRoom};
use crate::models::chat::frames::{ChatEvent, ClientFrame, EMPTY_MESSAGE, ServerFrame};
use crate::models::users::entities::User;
use crate::storage::Storage;

const INTERNAL_ERROR: &str = "Internal server error";

/// 聊天显示名，姓名为空时退回用户名
pub(crate) fn display_name(user: &User) -> String {
    let name = user.full_name();
    if name.is_empty() {
        user.username.clone()
    } else {
        name
    }
}

/// 单个聊天连接的上下文
pub struct ChatConsumer {
    storage: Arc<dyn Storage>,
    user: User,
    room: ChatRoom,
    group: String,
}

impl ChatConsumer {
    pub fn new(storage: Arc<dyn Storage>, user: User, room: ChatRoom) -> Self {
        let group = chat_room_group(room.id);
        Self {
            storage,
            user,
            room,
            group,
        }
    }

    /// 处理一条客户端文本帧，返回需要单独回给本连接的帧
    pub async fn receive(&self, text: &str) -> Option<ServerFrame> {
        let frame = match ClientFrame::parse(text) {
            Ok(frame) => frame,
            Err(message) => return Some(ServerFrame::error(message)),
        };

        match self.handle_frame(frame).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(
                    "Chat frame failed in room {} for user {}: {}",
                    self.room.id, self.user.id, e
                );
                Some(ServerFrame::error(INTERNAL_ERROR))
            }
        }
    }

    async fn handle_frame(&self, frame: ClientFrame) -> Result<Option<ServerFrame>> {
        let layer = ChannelLayer::get();
        match frame {
            ClientFrame::SendMessage { content } => {
                let content = content.trim();
                if content.is_empty() {
                    return Ok(Some(ServerFrame::error(EMPTY_MESSAGE)));
                }
                let message = self
                    .storage
                    .create_chat_message(self.room.id, self.user.id, content)
                    .await?;
                debug!(
                    event = "chat.message.send",
                    room_id = self.room.id,
                    sender_id = self.user.id,
                    message_id = message.id,
                    "chat message stored"
                );
                layer.group_send(
                    &self.group,
                    RealtimeEvent::Chat(ChatEvent::Message {
                        message,
                        sender_name: display_name(&self.user),
                    }),
                );
            }
            ClientFrame::MarkAsRead { message_id } => {
                let marked = self
                    .storage
                    .mark_chat_message_read(self.room.id, message_id, self.user.id)
                    .await?;
                if marked {
                    layer.group_send(
                        &self.group,
                        RealtimeEvent::Chat(ChatEvent::Read {
                            message_id,
                            reader_id: self.user.id,
                        }),
                    );
                }
            }
            ClientFrame::Typing { is_typing } => {
                layer.group_send(
                    &self.group,
                    RealtimeEvent::Chat(ChatEvent::Typing {
                        user_id: self.user.id,
                        user_name: display_name(&self.user),
                        is_typing,
                    }),
                );
            }
        }
        Ok(None)
    }

    /// 最近的消息，按时间正序渲染给当前用户
    pub async fn recent_frames(&self) -> Result<Vec<ServerFrame>> {
        let limit = AppConfig::get().realtime.recent_messages;
        let messages = self.storage.recent_chat_messages(self.room.id, limit).await?;
        let names = self.sender_names(&messages).await?;

        Ok(messages
            .into_iter()
            .filter_map(|message| {
                let sender_name = names.get(&message.sender_id).cloned().unwrap_or_default();
                ChatEvent::Message {
                    message,
                    sender_name,
                }
                .render_for(self.user.id)
            })
            .collect())
    }

    async fn sender_names(&self, messages: &[ChatMessage]) -> Result<HashMap<i64, String>> {
        let mut ids: Vec<i64> = messages.iter().map(|m| m.sender_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let users = self.storage.get_users_by_ids(&ids).await?;
        Ok(users.iter().map(|u| (u.id, display_name(u))).collect())
    }

    /// 处理连接直到任一方关闭
    pub async fn run(self, mut session: actix_ws::Session, mut stream: actix_ws::MessageStream) {
        let layer = ChannelLayer::get();
        let mut rx = layer.group_add(&self.group);
        info!(
            "Chat socket connected: room {} user {}",
            self.room.id, self.user.id
        );

        match self.recent_frames().await {
            Ok(frames) => {
                for frame in frames {
                    if send_frame(&mut session, &frame).await.is_err() {
                        break;
                    }
                }
            }
            Err(e) => warn!("Failed to load recent messages for room {}: {}", self.room.id, e),
        }

        let heartbeat_secs = AppConfig::get().realtime.heartbeat_secs.max(1);
        let mut heartbeat = tokio::time::interval(std::time::Duration::from_secs(heartbeat_secs));
        heartbeat.tick().await;

        loop {
            tokio::select! {
                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(reply) = self.receive(&text).await
                                && send_frame(&mut session, &reply).await.is_err()
                            {
                                break;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if session.pong(&data).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(e)) => {
                            warn!("Chat socket error in room {}: {:?}", self.room.id, e);
                            break;
                        }
                        _ => {}
                    }
                }

                event = rx.recv() => {
                    match event {
                        Ok(event) => {
                            if let RealtimeEvent::Chat(chat_event) = &*event
                                && let Some(frame) = chat_event.render_for(self.user.id)
                                && send_frame(&mut session, &frame).await.is_err()
                            {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Chat socket in room {} lagged by {} events", self.room.id, n);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }

                _ = heartbeat.tick() => {
                    if session.ping(b"").await.is_err() {
                        break;
                    }
                }
            }
        }

        drop(rx);
        layer.group_discard(&self.group);
        let _ = session.close(None).await;
        info!(
            "Chat socket disconnected: room {} user {}",
            self.room.id, self.user.id
        );
    }
}

async fn send_frame(
    session: &mut actix_ws::Session,
    frame: &ServerFrame,
) -> std::result::Result<(), actix_ws::Closed> {
    match serde_json::to_string(frame) {
        Ok(json) => session.text(json).await,
        Err(e) => {
            warn!("Failed to serialize chat frame: {}", e);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::entities::UserRole;
    use crate::storage::sea_orm_storage::{SeaOrmStorage, fixtures};

    async fn setup() -> (Arc<dyn Storage>, User, User, ChatRoom) {
        let storage = SeaOrmStorage::in_memory().await;
        let teacher = fixtures::user(&storage, "teacher", UserRole::Teacher).await;
        let student = fixtures::user(&storage, "student", UserRole::Student).await;
        let course = fixtures::course(&storage, "Rust").await;
        let (room, _) = storage
            .get_or_create_chat_room(teacher.id, student.id, course.id)
            .await
            .unwrap();
        (Arc::new(storage), teacher, student, room)
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let (storage, teacher, _, room) = setup().await;
        let consumer = ChatConsumer::new(storage.clone(), teacher, room.clone());

        let reply = consumer
            .receive(r#"{"type":"send_message","content":"   "}"#)
            .await
            .unwrap();
        let json = serde_json::to_value(reply).unwrap();
        assert_eq!(json["message"], EMPTY_MESSAGE);
        assert!(storage.recent_chat_messages(room.id, 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_gets_error_frame() {
        let (storage, teacher, _, room) = setup().await;
        let consumer = ChatConsumer::new(storage, teacher, room);
        let reply = consumer.receive("not json").await.unwrap();
        assert_eq!(
            serde_json::to_value(reply).unwrap()["message"],
            "Invalid JSON format"
        );
    }

    #[tokio::test]
    async fn test_send_broadcasts_to_room_group() {
        let (storage, teacher, student, room) = setup().await;
        let mut rx = ChannelLayer::get().group_add(&chat_room_group(room.id));
        let consumer = ChatConsumer::new(storage.clone(), teacher, room.clone());

        assert!(
            consumer
                .receive(r#"{"type":"send_message","content":" hello "}"#)
                .await
                .is_none()
        );

        let event = rx.recv().await.unwrap();
        let RealtimeEvent::Chat(chat_event) = &*event else {
            panic!("expected chat event");
        };
        let frame = serde_json::to_value(chat_event.render_for(student.id).unwrap()).unwrap();
        assert_eq!(frame["data"]["content"], "hello");
        assert_eq!(frame["data"]["is_mine"], false);
        assert_eq!(frame["data"]["sender_name"], "teacher Tester");
    }

    #[tokio::test]
    async fn test_recent_frames_oldest_first() {
        let (storage, teacher, student, room) = setup().await;
        storage
            .create_chat_message(room.id, teacher.id, "first")
            .await
            .unwrap();
        storage
            .create_chat_message(room.id, student.id, "second")
            .await
            .unwrap();

        let consumer = ChatConsumer::new(storage, student, room);
        let frames: Vec<_> = consumer
            .recent_frames()
            .await
            .unwrap()
            .into_iter()
            .map(|f| serde_json::to_value(f).unwrap())
            .collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["data"]["content"], "first");
        assert_eq!(frames[1]["data"]["is_mine"], true);
    }
}
