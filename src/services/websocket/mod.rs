/*!
 * 实时通道层
 *
 * 进程内的按组名发布/订阅，供 WebSocket 连接使用：
 *
 * - `user_notifications_{user_id}`：推送给某个用户的站内通知
 * - `chat_room_{room_id}`：聊天室内的消息、已读与输入状态
 *
 * 推送是尽力而为的：组内没有订阅者时事件直接丢弃，不重试也不确认。
 */

pub mod chat;
pub mod notifications;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::config::AppConfig;
use crate::models::chat::frames::ChatEvent;
use crate::models::notifications::entities::Notification;

pub use chat::ChatConsumer;
pub use notifications::NotificationConsumer;

/// 全局通道层
static CHANNEL_LAYER: Lazy<ChannelLayer> =
    Lazy::new(|| ChannelLayer::new(AppConfig::get().realtime.channel_capacity));

/// 通过通道层广播的事件
#[derive(Debug, Clone)]
pub enum RealtimeEvent {
    Notification(Notification),
    Chat(ChatEvent),
}

pub fn user_notifications_group(user_id: i64) -> String {
    format!("user_notifications_{user_id}")
}

pub fn chat_room_group(room_id: i64) -> String {
    format!("chat_room_{room_id}")
}

pub struct ChannelLayer {
    /// 组名 -> 广播发送器
    groups: DashMap<String, broadcast::Sender<Arc<RealtimeEvent>>>,
    capacity: usize,
}

impl ChannelLayer {
    pub fn new(capacity: usize) -> Self {
        Self {
            groups: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// 获取全局实例
    pub fn get() -> &'static Self {
        &CHANNEL_LAYER
    }

    /// 加入组，返回该连接的接收端
    pub fn group_add(&self, group: &str) -> broadcast::Receiver<Arc<RealtimeEvent>> {
        let entry = self.groups.entry(group.to_string()).or_insert_with(|| {
            let (tx, _) = broadcast::channel(self.capacity);
            tx
        });
        entry.subscribe()
    }

    /// 调用前需先丢弃接收端；组内没有订阅者时移除
    pub fn group_discard(&self, group: &str) {
        self.groups
            .remove_if(group, |_, sender| sender.receiver_count() == 0);
    }

    /// 向组内广播，返回收到事件的连接数
    pub fn group_send(&self, group: &str, event: RealtimeEvent) -> usize {
        let Some(sender) = self.groups.get(group) else {
            debug!("No subscribers in group {}, event dropped", group);
            return 0;
        };
        sender.send(Arc::new(event)).unwrap_or(0)
    }

    /// 组内当前订阅者数量
    pub fn group_size(&self, group: &str) -> usize {
        self.groups
            .get(group)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// 推送通知到接收者的通知组
    pub fn push_notification(&self, notification: Notification) -> usize {
        let group = user_notifications_group(notification.receiver_id);
        self.group_send(&group, RealtimeEvent::Notification(notification))
    }
}
