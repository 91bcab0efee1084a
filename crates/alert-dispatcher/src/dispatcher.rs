//! 告警分发器

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use ticket_shared::observability::metrics;
use tracing::{error, info};

use crate::sender::{Notification, Notifier};
use crate::templates::AlertTemplate;

/// 高风险订单告警
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAlert {
    pub order_id: String,
    pub recommendation: String,
    pub amount: f64,
}

/// 告警分发结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    Sent,
    Failed,
}

pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
    operator_address: String,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, operator_address: impl Into<String>) -> Self {
        Self {
            notifier,
            operator_address: operator_address.into(),
        }
    }

    /// 发送一条告警
    ///
    /// 只尝试一次，失败时记录日志并返回 `Failed`，不向调用方传播错误
    pub async fn dispatch(&self, alert: &RiskAlert) -> AlertOutcome {
        let notification = Notification {
            to: self.operator_address.clone(),
            subject: AlertTemplate::render_subject(alert),
            body: AlertTemplate::render_body(alert),
        };

        match self.notifier.send(&notification).await {
            Ok(result) => {
                metrics::record_risk_alert("sent");
                info!(
                    order_id = %alert.order_id,
                    channel = result.channel,
                    message_id = result.message_id.as_deref().unwrap_or_default(),
                    "高风险告警已发送"
                );
                AlertOutcome::Sent
            }
            Err(e) => {
                metrics::record_risk_alert("failed");
                error!(
                    order_id = %alert.order_id,
                    channel = self.notifier.channel(),
                    error = %e,
                    "高风险告警发送失败"
                );
                AlertOutcome::Failed
            }
        }
    }
}
