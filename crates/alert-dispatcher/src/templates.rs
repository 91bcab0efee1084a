//! 告警模板
//!
//! 标题固定为 `Alert: Risky Order {orderId}`，正文包含风险等级、原因与金额。

use ticket_shared::order::RiskLevel;

use crate::dispatcher::RiskAlert;

pub struct AlertTemplate;

impl AlertTemplate {
    pub fn render_subject(alert: &RiskAlert) -> String {
        format!("Alert: Risky Order {}", alert.order_id)
    }

    pub fn render_body(alert: &RiskAlert) -> String {
        format!(
            "Risk Level: {}\nReason: {}\nAmount: {}",
            RiskLevel::High,
            alert.recommendation,
            alert.amount
        )
    }
}
