/*!
 * 通知 WebSocket
 *
 * 客户端通过 `ws://host/api/v1/ws/notifications?token=<access_token>` 连接。
 *
 * ## 消息格式
 *
 * ```json
 * {"type": "connected", "user_id": 1}
 * {"type": "answer_status_notification", "data": {"id": 1, "title": "...", ...}}
 * {"type": "ping"}
 * {"type": "pong"}
 * ```
 */

use actix_ws::Message;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{ChannelLayer, RealtimeEvent, user_notifications_group};
use crate::config::AppConfig;
use crate::models::notifications::entities::Notification;

/// 通知连接上的帧
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationFrame {
    /// 连接成功
    Connected { user_id: i64 },
    /// 评阅结果通知
    AnswerStatusNotification { data: Notification },
    /// 心跳请求
    Ping,
    /// 心跳响应
    Pong,
    /// 错误消息
    Error { message: String },
}

impl NotificationFrame {
    fn to_json(&self) -> Option<String> {
        serde_json::to_string(self)
            .map_err(|e| warn!("Failed to serialize notification frame: {}", e))
            .ok()
    }
}

pub struct NotificationConsumer;

impl NotificationConsumer {
    /// 处理一个已认证的通知连接，直到任一方关闭
    pub async fn run(
        user_id: i64,
        mut session: actix_ws::Session,
        mut stream: actix_ws::MessageStream,
    ) {
        let group = user_notifications_group(user_id);
        let layer = ChannelLayer::get();
        let mut rx = layer.group_add(&group);
        info!("Notification socket connected for user: {}", user_id);

        if let Some(json) = (NotificationFrame::Connected { user_id }).to_json() {
            let _ = session.text(json).await;
        }

        let heartbeat_secs = AppConfig::get().realtime.heartbeat_secs.max(1);
        let mut heartbeat = tokio::time::interval(std::time::Duration::from_secs(heartbeat_secs));
        // 第一次 tick 立即返回
        heartbeat.tick().await;

        loop {
            tokio::select! {
                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<NotificationFrame>(&text) {
                                Ok(NotificationFrame::Ping) => {
                                    let pong = NotificationFrame::Pong
                                        .to_json()
                                        .unwrap_or_else(|| r#"{"type":"pong"}"#.to_string());
                                    if session.text(pong).await.is_err() {
                                        break;
                                    }
                                }
                                Ok(frame) => {
                                    debug!("Ignoring frame from user {}: {:?}", user_id, frame);
                                }
                                Err(_) => {
                                    debug!("Ignoring malformed frame from user {}", user_id);
                                }
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if session.pong(&data).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            break;
                        }
                        Some(Err(e)) => {
                            warn!("Notification socket error for user {}: {:?}", user_id, e);
                            break;
                        }
                        _ => {}
                    }
                }

                event = rx.recv() => {
                    match event {
                        Ok(event) => {
                            if let RealtimeEvent::Notification(notification) = &*event {
                                let frame = NotificationFrame::AnswerStatusNotification {
                                    data: notification.clone(),
                                };
                                if let Some(json) = frame.to_json()
                                    && session.text(json).await.is_err()
                                {
                                    break;
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Notification socket for user {} lagged by {} events", user_id, n);
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
        layer.group_discard(&group);
        let _ = session.close(None).await;
        info!("Notification socket disconnected for user: {}", user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_envelopes() {
        let connected = serde_json::to_value(NotificationFrame::Connected { user_id: 3 }).unwrap();
        assert_eq!(connected["type"], "connected");
        assert_eq!(connected["user_id"], 3);

        let ping: NotificationFrame = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(ping, NotificationFrame::Ping));
        assert_eq!(
            serde_json::to_string(&NotificationFrame::Pong).unwrap(),
            r#"{"type":"pong"}"#
        );
    }

    #[test]
    fn test_notification_frame_carries_data() {
        let now = chrono::Utc::now();
        let frame = NotificationFrame::AnswerStatusNotification {
            data: Notification {
                id: 9,
                receiver_id: 2,
                sender_id: Some(1),
                answer_id: Some(4),
                title: "Your answer for Task 1. Intro has been reviewed".into(),
                content: "Status: Approved".into(),
                feedback: None,
                is_read: false,
                created_at: now,
                updated_at: now,
            },
        };
        let json = serde_json::to_value(frame).unwrap();
        assert_eq!(json["type"], "answer_status_notification");
        assert_eq!(json["data"]["id"], 9);
        assert_eq!(json["data"]["answer_id"], 4);
    }
}
