//! 聊天 WebSocket 帧
//!
//! 信封格式为 `{"type": ..., ...}`。房间内广播的是 [`ChatEvent`]，
//! 每个连接再按查看者渲染成 [`ServerFrame`]。

use serde::{Deserialize, Serialize};

use super::entities::ChatMessage;
use super::responses::ChatMessageView;

pub const INVALID_JSON: &str = "Invalid JSON format";
pub const EMPTY_MESSAGE: &str = "Invalid message. Message content can't be empty";
pub const UNKNOWN_TYPE: &str = "Unknown message type";

/// 客户端发来的帧
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    SendMessage {
        #[serde(default)]
        content: String,
    },
    MarkAsRead {
        message_id: i64,
    },
    Typing {
        #[serde(default)]
        is_typing: bool,
    },
}

impl ClientFrame {
    /// 无法解析时返回应发回给客户端的错误文本
    pub fn parse(text: &str) -> Result<Self, &'static str> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(|_| INVALID_JSON)?;
        serde_json::from_value(value).map_err(|_| UNKNOWN_TYPE)
    }
}

/// 发给客户端的帧
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Message {
        data: ChatMessageView,
    },
    MessageRead {
        message_id: i64,
    },
    Typing {
        user_id: i64,
        user_name: String,
        is_typing: bool,
    },
    Error {
        message: String,
    },
}

impl ServerFrame {
    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            message: message.into(),
        }
    }
}

/// 房间内广播的事件
#[derive(Debug, Clone)]
pub enum ChatEvent {
    Message {
        message: ChatMessage,
        sender_name: String,
    },
    Read {
        message_id: i64,
        reader_id: i64,
    },
    Typing {
        user_id: i64,
        user_name: String,
        is_typing: bool,
    },
}

impl ChatEvent {
    /// 已读和输入状态不回显给触发者本人
    pub fn render_for(&self, viewer_id: i64) -> Option<ServerFrame> {
        match self {
            ChatEvent::Message {
                message,
                sender_name,
            } => Some(ServerFrame::Message {
                data: ChatMessageView::new(message, sender_name, viewer_id),
            }),
            ChatEvent::Read {
                message_id,
                reader_id,
            } => (*reader_id != viewer_id).then(|| ServerFrame::MessageRead {
                message_id: *message_id,
            }),
            ChatEvent::Typing {
                user_id,
                user_name,
                is_typing,
            } => (*user_id != viewer_id).then(|| ServerFrame::Typing {
                user_id: *user_id,
                user_name: user_name.clone(),
                is_typing: *is_typing,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender_id: i64) -> ChatMessage {
        ChatMessage {
            id: 10,
            room_id: 2,
            sender_id,
            content: "hello".into(),
            is_read: false,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_parse_client_frames() {
        assert_eq!(
            ClientFrame::parse(r#"{"type":"send_message","content":"hi"}"#),
            Ok(ClientFrame::SendMessage {
                content: "hi".into()
            })
        );
        assert_eq!(
            ClientFrame::parse(r#"{"type":"send_message"}"#),
            Ok(ClientFrame::SendMessage {
                content: String::new()
            })
        );
        assert_eq!(
            ClientFrame::parse(r#"{"type":"mark_as_read","message_id":4}"#),
            Ok(ClientFrame::MarkAsRead { message_id: 4 })
        );
        assert_eq!(ClientFrame::parse("{not json"), Err(INVALID_JSON));
        assert_eq!(ClientFrame::parse(r#"{"type":"dance"}"#), Err(UNKNOWN_TYPE));
    }

    #[test]
    fn test_message_rendered_per_viewer() {
        let event = ChatEvent::Message {
            message: message(1),
            sender_name: "Ada Lovelace".into(),
        };
        let mine = serde_json::to_value(event.render_for(1).unwrap()).unwrap();
        let theirs = serde_json::to_value(event.render_for(2).unwrap()).unwrap();
        assert_eq!(mine["type"], "message");
        assert_eq!(mine["data"]["is_mine"], true);
        assert_eq!(theirs["data"]["is_mine"], false);
    }

    #[test]
    fn test_read_and_typing_not_echoed() {
        let read = ChatEvent::Read {
            message_id: 10,
            reader_id: 2,
        };
        assert!(read.render_for(2).is_none());
        let frame = serde_json::to_value(read.render_for(1).unwrap()).unwrap();
        assert_eq!(
            frame,
            serde_json::json!({"type": "message_read", "message_id": 10})
        );

        let typing = ChatEvent::Typing {
            user_id: 1,
            user_name: "Ada Lovelace".into(),
            is_typing: true,
        };
        assert!(typing.render_for(1).is_none());
        let frame = serde_json::to_value(typing.render_for(2).unwrap()).unwrap();
        assert_eq!(
            frame,
            serde_json::json!({
                "type": "typing",
                "user_id": 1,
                "user_name": "Ada Lovelace",
                "is_typing": true,
            })
        );
    }

    #[test]
    fn test_error_frame_shape() {
        let json = serde_json::to_string(&ServerFrame::error(EMPTY_MESSAGE)).unwrap();
        assert_eq!(
            json,
            r#"{"type":"error","message":"Invalid message. Message content can't be empty"}"#
        );
    }
}
