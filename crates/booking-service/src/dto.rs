//! 请求与响应 DTO

use serde::{Deserialize, Serialize};
use validator::Validate;

/// 创建订单请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "userId 不能为空"))]
    pub user_id: String,
    #[validate(range(exclusive_min = 0.0, message = "amount 必须为正数"))]
    pub amount: f64,
    #[validate(length(min = 1, message = "ticketType 不能为空"))]
    pub ticket_type: String,
    /// 客户端附加信息，接受但不存储
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// 支付成功回调请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentWebhookRequest {
    #[validate(length(min = 1, message = "orderId 不能为空"))]
    pub order_id: String,
}

/// 订单操作响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAccepted {
    pub message: String,
    pub order_id: String,
}

impl OrderAccepted {
    pub fn created(order_id: impl Into<String>) -> Self {
        Self {
            message: "Order created successfully".to_string(),
            order_id: order_id.into(),
        }
    }

    pub fn payment_published(order_id: impl Into<String>) -> Self {
        Self {
            message: "Payment confirmation published".to_string(),
            order_id: order_id.into(),
        }
    }
}
