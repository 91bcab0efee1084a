//! 事件路由
//!
//! 按 (source, type) 模式把发布的事件分发到所有匹配的通道。
//! 各通道的投递彼此独立：某个通道投递失败只重试该通道，不影响也不重复其他通道。

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::ChannelsConfig;
use crate::error::{Result, TicketError};
use crate::events::{EventEnvelope, detail_types, sources};
use crate::observability::metrics;
use crate::retry::{RetryPolicy, retry_transient};
use crate::transport::{ChannelTransport, Delivery};

// ---------------------------------------------------------------------------
// EventPattern / RouteRule
// ---------------------------------------------------------------------------

/// 订阅模式
///
/// 列表内为"或"关系，列表之间为"且"关系；空列表匹配任意值
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPattern {
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub detail_types: Vec<String>,
}

impl EventPattern {
    pub fn new(sources: &[&str], detail_types: &[&str]) -> Self {
        Self {
            sources: sources.iter().map(|s| s.to_string()).collect(),
            detail_types: detail_types.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn matches(&self, envelope: &EventEnvelope) -> bool {
        let source_ok = self.sources.is_empty() || self.sources.contains(&envelope.source);
        let type_ok =
            self.detail_types.is_empty() || self.detail_types.contains(&envelope.detail_type);
        source_ok && type_ok
    }
}

/// 路由规则：匹配模式的事件投递到目标通道
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    pub name: String,
    pub pattern: EventPattern,
    pub channel: String,
}

/// 订单流水线的两条路由
///
/// - OrderCreated -> 风险分析通道
/// - PaymentSucceeded -> 支付通道
pub fn default_rules(channels: &ChannelsConfig) -> Vec<RouteRule> {
    vec![
        RouteRule {
            name: "order-created-to-risk-analysis".to_string(),
            pattern: EventPattern::new(&[sources::BOOKING], &[detail_types::ORDER_CREATED]),
            channel: channels.risk_analysis.clone(),
        },
        RouteRule {
            name: "payment-succeeded-to-payments".to_string(),
            pattern: EventPattern::new(
                &[sources::PAYMENT_SIMULATOR],
                &[detail_types::PAYMENT_SUCCEEDED],
            ),
            channel: channels.payments.clone(),
        },
    ]
}

// ---------------------------------------------------------------------------
// EventPublisher
// ---------------------------------------------------------------------------

/// 事件发布接口
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// 发布事件，返回成功投递的通道数
    ///
    /// 任一匹配通道在重试后仍失败时返回可重试错误
    async fn publish(&self, envelope: &EventEnvelope) -> Result<usize>;
}

// ---------------------------------------------------------------------------
// EventRouter
// ---------------------------------------------------------------------------

pub struct EventRouter {
    rules: Vec<RouteRule>,
    transport: Arc<dyn ChannelTransport>,
    retry_policy: RetryPolicy,
}

impl EventRouter {
    pub fn new(
        rules: Vec<RouteRule>,
        transport: Arc<dyn ChannelTransport>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            rules,
            transport,
            retry_policy,
        }
    }

    /// 匹配到的目标通道，同一通道只出现一次
    pub fn matching_channels(&self, envelope: &EventEnvelope) -> Vec<&str> {
        let mut channels: Vec<&str> = Vec::new();
        for rule in &self.rules {
            if rule.pattern.matches(envelope) && !channels.contains(&rule.channel.as_str()) {
                channels.push(rule.channel.as_str());
            }
        }
        channels
    }

    async fn deliver_to(&self, channel: &str, envelope: &EventEnvelope) -> Result<()> {
        let delivery = Delivery::first(envelope.for_channel(channel));
        let result = retry_transient(
            &self.retry_policy,
            "channel_deliver",
            || self.transport.deliver(channel, &delivery),
        )
        .await;

        let status = if result.is_ok() { "ok" } else { "failed" };
        metrics::record_event_published(&envelope.detail_type, channel, status);
        result
    }
}

#[async_trait]
impl EventPublisher for EventRouter {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<usize> {
        let channels = self.matching_channels(envelope);
        if channels.is_empty() {
            debug!(
                source = %envelope.source,
                detail_type = %envelope.detail_type,
                "事件未匹配任何路由规则"
            );
            return Ok(0);
        }

        let results = join_all(
            channels
                .iter()
                .map(|channel| async move { (*channel, self.deliver_to(channel, envelope).await) }),
        )
        .await;

        let mut failed = Vec::new();
        for (channel, result) in &results {
            match result {
                Ok(()) => info!(
                    event_id = %envelope.event_id,
                    detail_type = %envelope.detail_type,
                    order_id = envelope.order_id().unwrap_or_default(),
                    channel,
                    "事件已投递到通道"
                ),
                Err(e) => {
                    error!(
                        event_id = %envelope.event_id,
                        detail_type = %envelope.detail_type,
                        channel,
                        error = %e,
                        "事件投递到通道失败"
                    );
                    failed.push(format!("{channel}: {e}"));
                }
            }
        }

        if !failed.is_empty() {
            return Err(TicketError::ChannelDelivery {
                channel: channels.join(","),
                reason: failed.join("; "),
            });
        }
        Ok(channels.len())
    }
}
