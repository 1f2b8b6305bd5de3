//! 通知投递
//!
//! 评阅事务提交后调用：先推送到 `user_notifications_{id}`，再为接收者排一封邮件。
//! 两步都是尽力而为，失败只记日志，不影响调用方的响应。

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::notifications::entities::Notification;
use crate::services::mail::templates::{AnswerEmailContext, render_answer_email};
use crate::services::mail::EmailQueue;
use crate::services::websocket::ChannelLayer;
use crate::storage::Storage;

/// 一次投递的结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// 收到推送的连接数
    pub pushed: usize,
    pub email_job: Option<Uuid>,
}

pub struct NotificationDispatcher<'a> {
    layer: &'a ChannelLayer,
    queue: Option<&'a EmailQueue>,
}

impl NotificationDispatcher<'static> {
    /// 使用全局通道层与邮件队列
    pub fn global() -> Self {
        Self::new(ChannelLayer::get(), EmailQueue::global())
    }
}

impl<'a> NotificationDispatcher<'a> {
    pub fn new(layer: &'a ChannelLayer, queue: Option<&'a EmailQueue>) -> Self {
        Self { layer, queue }
    }

    pub async fn dispatch(
        &self,
        storage: &Arc<dyn Storage>,
        notification: Notification,
    ) -> DispatchReport {
        let notification_id = notification.id;
        let receiver_id = notification.receiver_id;

        let pushed = self.layer.push_notification(notification.clone());
        let email_job = self.enqueue_email(storage, &notification).await;

        info!(
            event = "notifications.dispatch",
            notification_id,
            receiver_id,
            pushed,
            email_queued = email_job.is_some(),
            "Notification dispatched"
        );

        DispatchReport { pushed, email_job }
    }

    async fn enqueue_email(
        &self,
        storage: &Arc<dyn Storage>,
        notification: &Notification,
    ) -> Option<Uuid> {
        let Some(queue) = self.queue else {
            debug!("Email queue not installed, skipping email");
            return None;
        };

        let receiver = match storage.get_user_by_id(notification.receiver_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(
                    "Notification {} receiver {} not found, skipping email",
                    notification.id, notification.receiver_id
                );
                return None;
            }
            Err(e) => {
                warn!("Failed to load notification receiver: {}", e);
                return None;
            }
        };

        let Some(context) = AnswerEmailContext::from_notification(notification, &receiver) else {
            debug!(
                "Notification {} carries no task details, skipping email",
                notification.id
            );
            return None;
        };

        queue.enqueue(render_answer_email(&context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Result;
    use crate::models::users::entities::UserRole;
    use crate::services::mail::{Mailer, OutgoingEmail, RetryPolicy};
    use crate::services::websocket::{RealtimeEvent, user_notifications_group};
    use crate::storage::sea_orm_storage::{SeaOrmStorage, fixtures};
    use async_trait::async_trait;
    use sea_orm::TransactionTrait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingEmail>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &OutgoingEmail) -> Result<()> {
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    fn notification(receiver_id: i64, title: &str, content: &str) -> Notification {
        let now = chrono::Utc::now();
        Notification {
            id: 11,
            receiver_id,
            sender_id: Some(1),
            answer_id: Some(3),
            title: title.into(),
            content: content.into(),
            feedback: Some("Nice".into()),
            is_read: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_dispatch_pushes_and_emails() {
        let sea = SeaOrmStorage::in_memory().await;
        let student = fixtures::user(&sea, "ada", UserRole::Student).await;
        let storage: Arc<dyn Storage> = Arc::new(sea.clone());

        let layer = ChannelLayer::new(8);
        let mut rx = layer.group_add(&user_notifications_group(student.id));
        let mailer = Arc::new(RecordingMailer::default());
        let (queue, _worker) = EmailQueue::start(
            mailer.clone(),
            RetryPolicy {
                max_retries: 0,
                backoff_base: Duration::from_millis(1),
            },
        );

        // 内存库只有一个连接：占住它，接收者查询就会阻塞，推送必须先于查询完成
        let txn = sea.db.begin().await.unwrap();
        let dispatcher = NotificationDispatcher::new(&layer, Some(&queue));
        let dispatch = dispatcher.dispatch(
            &storage,
            notification(
                student.id,
                "Your answer for Task 2. Queues has been reviewed",
                "Great job! Your answer has been approved ✅.",
            ),
        );
        let observe = async {
            let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("push arrives while the receiver lookup is blocked")
                .unwrap();
            txn.rollback().await.unwrap();
            event
        };
        let (report, event) = tokio::join!(dispatch, observe);

        assert!(matches!(&*event, RealtimeEvent::Notification(n) if n.id == 11));
        assert_eq!(report.pushed, 1);
        assert!(report.email_job.is_some());

        for _ in 0..100 {
            if !mailer.sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ada@example.com");
        assert_eq!(sent[0].subject, "Answer Approved - Task #2");
    }

    #[tokio::test]
    async fn test_dispatch_without_task_or_receiver_skips_email() {
        let storage: Arc<dyn Storage> = Arc::new(SeaOrmStorage::in_memory().await);
        let layer = ChannelLayer::new(8);
        let mailer = Arc::new(RecordingMailer::default());
        let (queue, _worker) = EmailQueue::start(
            mailer,
            RetryPolicy {
                max_retries: 0,
                backoff_base: Duration::from_millis(1),
            },
        );
        let dispatcher = NotificationDispatcher::new(&layer, Some(&queue));

        // 接收者不存在
        let report = dispatcher
            .dispatch(
                &storage,
                notification(42, "Your answer for Task 1. Stacks has been reviewed", ""),
            )
            .await;
        assert_eq!(report, DispatchReport::default());

        // 没有邮件队列时只推送
        let report = NotificationDispatcher::new(&layer, None)
            .dispatch(&storage, notification(42, "Welcome", ""))
            .await;
        assert_eq!(report.email_job, None);
    }
}
