//! 通道消费与投递处置
//!
//! 消费服务实现 `EventHandler`，对每条投递返回明确的处置结果；
//! `ChannelWorker` 根据处置结果决定确认、退避重投或转入死信队列：
//! - `Handled`：处理完成
//! - `Retry`：瞬时失败，尚有次数时退避后重投，耗尽后写入死信队列
//! - `Skip`：永久失败（数据问题），记录日志后丢弃

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::DeliveryConfig;
use crate::dlq::DlqProducer;
use crate::error::TicketError;
use crate::observability::metrics;
use crate::retry::RetryPolicy;
use crate::transport::{ChannelReceiver, ChannelTransport, Delivery};

// ---------------------------------------------------------------------------
// Disposition / EventHandler
// ---------------------------------------------------------------------------

/// 单条投递的处置结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Handled,
    Retry(String),
    Skip(String),
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Handled => "handled",
            Self::Retry(_) => "retry",
            Self::Skip(_) => "skip",
        }
    }

    /// 按错误是否可重试映射为 Retry 或 Skip
    pub fn from_error(err: &TicketError) -> Self {
        if err.is_retryable() {
            Self::Retry(err.to_string())
        } else {
            Self::Skip(err.to_string())
        }
    }
}

/// 通道消息处理器
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, delivery: &Delivery) -> Disposition;
}

// ---------------------------------------------------------------------------
// ChannelWorker
// ---------------------------------------------------------------------------

/// 单个通道的消费循环
///
/// 批内消息并发处理，整批完成后再提交
pub struct ChannelWorker {
    channel: String,
    handler: Arc<dyn EventHandler>,
    transport: Arc<dyn ChannelTransport>,
    dlq: Arc<DlqProducer>,
    retry_policy: RetryPolicy,
    batch_size: usize,
    max_concurrency: usize,
}

impl ChannelWorker {
    pub fn new(
        channel: impl Into<String>,
        handler: Arc<dyn EventHandler>,
        transport: Arc<dyn ChannelTransport>,
        dlq: Arc<DlqProducer>,
        config: &DeliveryConfig,
    ) -> Self {
        Self {
            channel: channel.into(),
            handler,
            transport,
            dlq,
            retry_policy: RetryPolicy::from_delivery(config),
            batch_size: config.batch_size.max(1),
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// 启动消费循环，直到收到关闭信号或通道关闭
    ///
    /// 关闭信号只在批次之间生效，正在处理的批次会完整处理并提交
    pub async fn run<R: ChannelReceiver>(self, mut receiver: R, mut shutdown: watch::Receiver<bool>) {
        info!(
            channel = %self.channel,
            batch_size = self.batch_size,
            max_concurrency = self.max_concurrency,
            "通道消费循环已启动"
        );

        if *shutdown.borrow() {
            info!(channel = %self.channel, "启动前已收到关闭信号");
            return;
        }

        loop {
            let next = tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!(channel = %self.channel, "收到关闭信号，通道消费循环退出");
                        break;
                    }
                    continue;
                }

                next = receiver.next_batch(self.batch_size) => next,
            };

            match next {
                Ok(Some(batch)) => {
                    self.process_batch(&batch).await;
                    if let Err(e) = receiver.commit(&batch).await {
                        error!(channel = %self.channel, error = %e, "提交消费进度失败");
                    }
                }
                Ok(None) => {
                    warn!(channel = %self.channel, "通道已关闭，消费循环退出");
                    break;
                }
                Err(e) => {
                    error!(channel = %self.channel, error = %e, "拉取消息失败");
                    tokio::time::sleep(self.retry_policy.initial_delay).await;
                }
            }
        }
    }

    async fn process_batch(&self, batch: &[Delivery]) {
        debug!(channel = %self.channel, size = batch.len(), "开始处理批次");
        futures::stream::iter(batch)
            .for_each_concurrent(self.max_concurrency, |delivery| async move {
                self.process_one(delivery).await;
            })
            .await;
    }

    /// 处理单条投递并执行处置
    pub async fn process_one(&self, delivery: &Delivery) -> Disposition {
        let disposition = self.handler.handle(delivery).await;
        metrics::record_delivery(&self.channel, disposition.as_str());

        match &disposition {
            Disposition::Handled => debug!(
                channel = %self.channel,
                event_id = %delivery.envelope.event_id,
                attempt = delivery.attempt,
                "消息处理完成"
            ),
            Disposition::Skip(reason) => warn!(
                channel = %self.channel,
                event_id = %delivery.envelope.event_id,
                order_id = delivery.order_id().unwrap_or_default(),
                reason = %reason,
                "消息无法处理，已跳过"
            ),
            Disposition::Retry(reason) => self.retry_or_dead_letter(delivery, reason).await,
        }

        disposition
    }

    async fn retry_or_dead_letter(&self, delivery: &Delivery, reason: &str) {
        let failures = delivery.attempt.max(1) - 1;

        if self.retry_policy.should_retry(failures) {
            let delay = self.retry_policy.delay_for_attempt(failures);
            warn!(
                channel = %self.channel,
                event_id = %delivery.envelope.event_id,
                order_id = delivery.order_id().unwrap_or_default(),
                attempt = delivery.attempt,
                delay_ms = delay.as_millis() as u64,
                reason,
                "处理失败，退避后重新投递"
            );
            tokio::time::sleep(delay).await;

            match self
                .transport
                .deliver(&self.channel, &delivery.redelivery())
                .await
            {
                Ok(()) => return,
                Err(e) => error!(
                    channel = %self.channel,
                    event_id = %delivery.envelope.event_id,
                    error = %e,
                    "重新投递失败，转入死信队列"
                ),
            }
        }

        let max_attempts = self.retry_policy.max_retries + 1;
        if let Err(e) = self
            .dlq
            .send_to_dlq(delivery, &self.channel, reason, max_attempts)
            .await
        {
            error!(
                channel = %self.channel,
                event_id = %delivery.envelope.event_id,
                order_id = delivery.order_id().unwrap_or_default(),
                error = %e,
                "写入死信队列失败，需人工介入"
            );
        }
    }
}
