//! 关闭信号
//!
//! K8s 通过 SIGTERM 通知 Pod 停止；本地开发通过 Ctrl+C。

use tokio::sync::watch;
use tracing::{error, info};

/// 等待关闭信号
///
/// 信号处理器注册失败时只记录错误，对应的分支永不返回
pub async fn signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("收到 Ctrl+C，开始优雅关闭"),
        _ = terminate => info!("收到 SIGTERM，开始优雅关闭"),
    }
}

/// 把关闭信号转换为 watch 通道，供多个消费循环共享
pub fn watch() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        signal().await;
        let _ = tx.send(true);
    });
    rx
}
