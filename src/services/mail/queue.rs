//! 异步邮件任务队列
//!
//! 调用方只负责入队。后台 worker 逐个取出任务并各自在独立的 tokio 任务中发送，
//! 失败后按 `backoff_base * 2^attempt` 等待重试，超过重试次数只记录日志。

use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{Mailer, OutgoingEmail};
use crate::config::EmailJobConfig;

static EMAIL_QUEUE: OnceLock<EmailQueue> = OnceLock::new();

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &EmailJobConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: Duration::from_secs(config.backoff_base_secs),
        }
    }

    /// 第 `attempt` 次失败后的等待时间，`attempt` 从 0 开始
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}

#[derive(Debug, Clone)]
struct EmailJob {
    id: Uuid,
    email: OutgoingEmail,
}

#[derive(Clone)]
pub struct EmailQueue {
    tx: mpsc::UnboundedSender<EmailJob>,
}

impl EmailQueue {
    /// 启动 worker，返回队列句柄
    pub fn start(mailer: Arc<dyn Mailer>, policy: RetryPolicy) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<EmailJob>();
        info!(
            "Email worker started with {} backend (max retries: {})",
            mailer.name(),
            policy.max_retries
        );

        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let mailer = mailer.clone();
                tokio::spawn(run_job(mailer, policy, job));
            }
            info!("Email worker stopped");
        });

        (Self { tx }, worker)
    }

    /// 设置全局队列，重复设置时保留第一次的
    pub fn install(queue: EmailQueue) {
        if EMAIL_QUEUE.set(queue).is_err() {
            warn!("Email queue already installed");
        }
    }

    pub fn global() -> Option<&'static EmailQueue> {
        EMAIL_QUEUE.get()
    }

    /// 入队，返回任务 ID；worker 已停止时返回 `None`
    pub fn enqueue(&self, email: OutgoingEmail) -> Option<Uuid> {
        let job = EmailJob {
            id: Uuid::new_v4(),
            email,
        };
        let id = job.id;
        match self.tx.send(job) {
            Ok(()) => Some(id),
            Err(_) => {
                error!("Email worker is not running, job {} dropped", id);
                None
            }
        }
    }
}

/// 发送一封邮件，失败时按策略重试；返回最终是否成功
async fn run_job(mailer: Arc<dyn Mailer>, policy: RetryPolicy, job: EmailJob) -> bool {
    let mut attempt = 0u32;
    loop {
        match mailer.send(&job.email).await {
            Ok(()) => {
                info!(
                    job_id = %job.id,
                    attempt,
                    "Answer status email sent to {}",
                    job.email.to
                );
                return true;
            }
            Err(e) if attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    job_id = %job.id,
                    attempt,
                    "Failed to send email to {}: {}, retrying in {:?}",
                    job.email.to,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!(
                    job_id = %job.id,
                    attempt,
                    "Giving up on email to {}: {}",
                    job.email.to,
                    e
                );
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CourseHubError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// 前 `failures` 次发送失败的测试后端
    struct FlakyMailer {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyMailer {
        fn new(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                failures,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl Mailer for FlakyMailer {
        async fn send(&self, _email: &OutgoingEmail) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(CourseHubError::mail("connection refused"))
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "student@example.com".into(),
            subject: "Answer Approved - Task #1".into(),
            text: "hello".into(),
            html: "<p>hello</p>".into(),
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            backoff_base: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_backoff_doubles_from_base() {
        let policy = RetryPolicy::from_config(&EmailJobConfig::default());
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay_for(0), Duration::from_secs(60));
        assert_eq!(policy.delay_for(1), Duration::from_secs(120));
        assert_eq!(policy.delay_for(2), Duration::from_secs(240));
    }

    #[tokio::test]
    async fn test_job_succeeds_after_retries() {
        let mailer = FlakyMailer::new(2);
        let job = EmailJob {
            id: Uuid::new_v4(),
            email: email(),
        };
        assert!(run_job(mailer.clone(), fast_policy(), job).await);
        assert_eq!(mailer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_job_gives_up_after_max_retries() {
        let mailer = FlakyMailer::new(u32::MAX);
        let job = EmailJob {
            id: Uuid::new_v4(),
            email: email(),
        };
        assert!(!run_job(mailer.clone(), fast_policy(), job).await);
        // 首次发送加 3 次重试
        assert_eq!(mailer.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_enqueue_runs_on_worker() {
        let mailer = FlakyMailer::new(0);
        let (queue, _worker) = EmailQueue::start(mailer.clone(), fast_policy());
        assert!(queue.enqueue(email()).is_some());

        for _ in 0..100 {
            if mailer.calls.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(mailer.calls.load(Ordering::SeqCst), 1);
    }
}
