//! 死信队列处理
//!
//! 消息重投耗尽后，连同失败原因与重试元数据一起写入死信通道。
//! 死信监控消费该通道并记录日志，等待人工介入。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::delivery::{Disposition, EventHandler};
use crate::error::Result;
use crate::events::EventEnvelope;
use crate::observability::metrics;
use crate::retry::{RetryPolicy, retry_transient};
use crate::transport::{ChannelTransport, Delivery};

/// 死信事件来源
pub const DEAD_LETTER_SOURCE: &str = "com.ticket.delivery";
/// 死信事件类型
pub const DEAD_LETTERED: &str = "DeadLettered";

// ---------------------------------------------------------------------------
// DeadLetterMessage: 死信消息
// ---------------------------------------------------------------------------

/// 死信消息
///
/// 保存原始事件信封以及失败元数据，便于人工排查后重放
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterMessage {
    /// 原始事件 ID
    pub message_id: String,
    /// 原始通道
    pub source_channel: String,
    pub order_id: Option<String>,
    pub envelope: EventEnvelope,
    /// 最后一次失败原因
    pub error: String,
    /// 已处理次数
    pub attempts: u32,
    pub max_attempts: u32,
    pub failed_at: DateTime<Utc>,
    /// 来源服务
    pub source_service: String,
}

impl DeadLetterMessage {
    pub fn new(
        delivery: &Delivery,
        source_channel: impl Into<String>,
        error: impl Into<String>,
        max_attempts: u32,
        source_service: impl Into<String>,
    ) -> Self {
        Self {
            message_id: delivery.envelope.event_id.clone(),
            source_channel: source_channel.into(),
            order_id: delivery.order_id().map(String::from),
            envelope: delivery.envelope.clone(),
            error: error.into(),
            attempts: delivery.attempt,
            max_attempts,
            failed_at: Utc::now(),
            source_service: source_service.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// DlqProducer: 将失败消息发送到死信通道
// ---------------------------------------------------------------------------

pub struct DlqProducer {
    transport: Arc<dyn ChannelTransport>,
    channel: String,
    source_service: String,
    retry_policy: RetryPolicy,
}

impl DlqProducer {
    pub fn new(
        transport: Arc<dyn ChannelTransport>,
        channel: impl Into<String>,
        source_service: impl Into<String>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            channel: channel.into(),
            source_service: source_service.into(),
            retry_policy,
        }
    }

    /// 将失败消息写入死信通道
    pub async fn send_to_dlq(
        &self,
        delivery: &Delivery,
        source_channel: &str,
        error: &str,
        max_attempts: u32,
    ) -> Result<()> {
        let message = DeadLetterMessage::new(
            delivery,
            source_channel,
            error,
            max_attempts,
            &self.source_service,
        );
        let envelope = EventEnvelope::from_detail(DEAD_LETTER_SOURCE, DEAD_LETTERED, &message)?
            .for_channel(&self.channel);
        let dead_letter = Delivery::first(envelope);

        retry_transient(
            &self.retry_policy,
            "dead_letter",
            || self.transport.deliver(&self.channel, &dead_letter),
        )
        .await?;

        metrics::record_dead_lettered(source_channel);
        warn!(
            message_id = %message.message_id,
            order_id = message.order_id.as_deref().unwrap_or_default(),
            source_channel,
            attempts = message.attempts,
            error,
            "消息已发送到死信队列"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DeadLetterMonitor: 死信通道监控
// ---------------------------------------------------------------------------

/// 死信通道处理器：记录每条死信，不做重放
#[derive(Debug, Default)]
pub struct DeadLetterMonitor;

#[async_trait]
impl EventHandler for DeadLetterMonitor {
    async fn handle(&self, delivery: &Delivery) -> Disposition {
        let message: DeadLetterMessage = match delivery.envelope.decode_detail() {
            Ok(m) => m,
            Err(e) => return Disposition::Skip(e.to_string()),
        };

        error!(
            message_id = %message.message_id,
            order_id = message.order_id.as_deref().unwrap_or_default(),
            source_channel = %message.source_channel,
            source_service = %message.source_service,
            detail_type = %message.envelope.detail_type,
            attempts = message.attempts,
            max_attempts = message.max_attempts,
            failed_at = %message.failed_at,
            error = %message.error,
            "死信消息已耗尽重试次数，需人工介入"
        );
        Disposition::Handled
    }
}
