//! 重试策略与执行器
//!
//! 提供指数退避重试机制，用于瞬时故障（通道不可用、数据库连接池满等）的自动恢复。
//! 是否重试只看 `TicketError::is_retryable`，业务错误（如订单不存在）立即返回。

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::DeliveryConfig;
use crate::error::TicketError;

// ---------------------------------------------------------------------------
// RetryPolicy: 重试策略配置
// ---------------------------------------------------------------------------

/// 重试策略配置
///
/// 首次失败等待 initial_delay，之后每次乘以 multiplier，直到达到 max_delay。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大重试次数（不含首次执行）
    pub max_retries: u32,
    /// 首次重试前的等待时间
    pub initial_delay: Duration,
    /// 退避时间上限
    pub max_delay: Duration,
    /// 每次重试的退避倍数
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    /// 默认策略：最多重试 3 次，初始等待 1 秒，最大等待 30 秒，倍数 2.0
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// 由投递配置构建
    ///
    /// `max_attempts` 含首次处理，因此重试次数为 `max_attempts - 1`
    pub fn from_delivery(config: &DeliveryConfig) -> Self {
        Self {
            max_retries: config.max_attempts.saturating_sub(1),
            initial_delay: config.initial_backoff(),
            max_delay: config.max_backoff(),
            multiplier: 2.0,
        }
    }

    /// 计算第 N 次重试的等待时间（attempt 从 0 开始）
    ///
    /// 公式: initial_delay * multiplier^attempt，结果不超过 max_delay
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_delay.as_millis() as f64;
        let delay_ms = base_ms * self.multiplier.powi(attempt as i32);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    /// 是否应继续重试
    ///
    /// attempt 表示已经失败的次数，当 attempt < max_retries 时返回 true
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

// ---------------------------------------------------------------------------
// retry_transient: 瞬时故障重试
// ---------------------------------------------------------------------------

/// 执行操作，遇到瞬时错误（`TicketError::is_retryable`）时按策略退避重试
///
/// 业务错误立即返回；重试耗尽后返回最后一次的错误。
pub async fn retry_transient<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, TicketError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TicketError>>,
{
    let mut failures: u32 = 0;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if failures > 0 {
                    info!(operation = operation_name, failures, "重试后成功");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !err.is_retryable() || !policy.should_retry(failures) {
            warn!(
                operation = operation_name,
                failures,
                retryable = err.is_retryable(),
                error = %err,
                "操作失败，不再重试"
            );
            return Err(err);
        }

        let delay = policy.delay_for_attempt(failures);
        warn!(
            operation = operation_name,
            failures,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "瞬时故障，退避后重试"
        );
        tokio::time::sleep(delay).await;
        failures += 1;
    }
}

// ---------------------------------------------------------------------------
// 单元测试
// ---------------------------------------------------------------------------
