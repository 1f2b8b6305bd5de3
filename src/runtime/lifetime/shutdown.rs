use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// 等待 Ctrl+C
pub async fn listen_for_shutdown() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        // 无法监听信号时只随服务器退出
        std::future::pending::<()>().await;
    }
    warn!("Shutdown signal received, initiating graceful shutdown...");
}

/// 停止邮件 worker，尚在重试等待中的任务随之丢弃
pub fn stop_background_jobs(email_worker: JoinHandle<()>) {
    email_worker.abort();
    warn!("Email worker stopped, pending retries dropped");
}
