//! 告警发送渠道
//!
//! `Notifier` 抽象一次性的告警投递。未配置 webhook 时使用日志发送器（模拟发送邮件），
//! 配置后以 JSON POST 到 webhook 地址。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ticket_shared::config::AlertConfig;
use tracing::info;
use uuid::Uuid;

use crate::error::AlertError;

/// 一条告警通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// 发送结果
#[derive(Debug, Clone, PartialEq)]
pub struct SendResult {
    pub channel: &'static str,
    /// 渠道侧的消息标识，用于追踪投递状态
    pub message_id: Option<String>,
}

/// 告警发送器
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<SendResult, AlertError>;

    fn channel(&self) -> &'static str;
}

/// 按配置选择告警渠道
pub fn build_notifier(config: &AlertConfig) -> Result<Arc<dyn Notifier>, AlertError> {
    match &config.webhook_url {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(
            url.clone(),
            Duration::from_millis(config.timeout_ms),
        )?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}

// ---------------------------------------------------------------------------
// 日志发送器
// ---------------------------------------------------------------------------

/// 模拟邮件发送器，仅记录日志
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<SendResult, AlertError> {
        let message_id = Uuid::now_v7().to_string();

        info!(
            channel = "EMAIL",
            to = %notification.to,
            message_id = %message_id,
            subject = %notification.subject,
            body = %notification.body,
            "模拟发送邮件告警"
        );

        Ok(SendResult {
            channel: self.channel(),
            message_id: Some(message_id),
        })
    }

    fn channel(&self) -> &'static str {
        "EMAIL"
    }
}

// ---------------------------------------------------------------------------
// Webhook 发送器
// ---------------------------------------------------------------------------

/// Webhook 发送器
///
/// 非 2xx 响应与网络错误都视为发送失败
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AlertError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AlertError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<SendResult, AlertError> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| AlertError::SendFailed {
                channel: self.channel().to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AlertError::SendFailed {
                channel: self.channel().to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        info!(
            channel = self.channel(),
            to = %notification.to,
            subject = %notification.subject,
            status = status.as_u16(),
            "告警已发送到 webhook"
        );

        Ok(SendResult {
            channel: self.channel(),
            message_id: None,
        })
    }

    fn channel(&self) -> &'static str {
        "WEBHOOK"
    }
}
