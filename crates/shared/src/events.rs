//! 事件模型
//!
//! 定义在事件路由与通道间传递的统一信封，以及订单流水线中的两类业务事件。
//! 事件不落库，被成功消费后即丢弃，或在重投耗尽后转入死信队列。

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TicketError};
use crate::order::Order;

/// 事件来源
pub mod sources {
    /// 订单创建服务
    pub const BOOKING: &str = "com.ticket.booking";
    /// 支付成功模拟器
    pub const PAYMENT_SIMULATOR: &str = "com.ticket.payment.simulator";
}

/// 事件类型
pub mod detail_types {
    pub const ORDER_CREATED: &str = "OrderCreated";
    pub const PAYMENT_SUCCEEDED: &str = "PaymentSucceeded";
}

// ---------------------------------------------------------------------------
// EventEnvelope: 通用事件信封
// ---------------------------------------------------------------------------

/// 通用事件信封
///
/// 线上格式为 `{eventId, source, type, detail, channel, time}`。
/// `channel` 在发布时为空，由路由器在投递到具体通道时填写。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// 事件唯一标识（UUID v7）
    pub event_id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub detail_type: String,
    pub detail: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub time: DateTime<Utc>,
}

impl EventEnvelope {
    /// 构建新事件，自动生成 UUID v7 作为 event_id 并记录当前时间
    pub fn new(
        source: impl Into<String>,
        detail_type: impl Into<String>,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7().to_string(),
            source: source.into(),
            detail_type: detail_type.into(),
            detail,
            channel: None,
            time: Utc::now(),
        }
    }

    /// 以可序列化的业务事件构建信封
    pub fn from_detail<T: Serialize>(
        source: impl Into<String>,
        detail_type: impl Into<String>,
        detail: &T,
    ) -> Result<Self> {
        let detail = serde_json::to_value(detail)
            .map_err(|e| TicketError::InvalidEvent(format!("事件序列化失败: {e}")))?;
        Ok(Self::new(source, detail_type, detail))
    }

    /// 复制一份指向目标通道的信封
    pub fn for_channel(&self, channel: &str) -> Self {
        Self {
            channel: Some(channel.to_string()),
            ..self.clone()
        }
    }

    /// 将 detail 解析为具体业务事件
    pub fn decode_detail<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.detail.clone()).map_err(|e| {
            TicketError::InvalidEvent(format!(
                "{} 事件 detail 解析失败: {e}",
                self.detail_type
            ))
        })
    }

    /// 读取 detail 中的 orderId，缺失或非字符串时返回 None
    pub fn order_id(&self) -> Option<&str> {
        self.detail
            .get("orderId")
            .and_then(|v| v.as_str())
            .filter(|id| !id.is_empty())
    }
}

// ---------------------------------------------------------------------------
// 业务事件
// ---------------------------------------------------------------------------

/// 订单创建事件，携带完整的初始订单记录
pub type OrderCreated = Order;

/// 支付成功事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSucceeded {
    pub order_id: String,
    pub status: String,
    pub provider: String,
    pub timestamp: DateTime<Utc>,
}

impl PaymentSucceeded {
    pub const STATUS_SUCCESS: &'static str = "SUCCESS";

    pub fn new(order_id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            status: Self::STATUS_SUCCESS.to_string(),
            provider: provider.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_wire_shape() {
        let envelope = EventEnvelope::new(
            sources::BOOKING,
            detail_types::ORDER_CREATED,
            json!({"orderId": "ORD-1"}),
        )
        .for_channel("ticket.risk-analysis");

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["source"], "com.ticket.booking");
        assert_eq!(value["type"], "OrderCreated");
        assert_eq!(value["detail"]["orderId"], "ORD-1");
        assert_eq!(value["channel"], "ticket.risk-analysis");
        assert!(value.get("eventId").is_some());

        let decoded: EventEnvelope = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_unrouted_envelope_omits_channel() {
        let envelope = EventEnvelope::new("s", "t", json!({}));
        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value.get("channel").is_none());
    }

    #[test]
    fn test_order_id_lookup() {
        let with_id = EventEnvelope::new("s", "t", json!({"orderId": "ORD-9"}));
        assert_eq!(with_id.order_id(), Some("ORD-9"));

        let missing = EventEnvelope::new("s", "t", json!({"amount": 10}));
        assert_eq!(missing.order_id(), None);

        let blank = EventEnvelope::new("s", "t", json!({"orderId": ""}));
        assert_eq!(blank.order_id(), None);

        let numeric = EventEnvelope::new("s", "t", json!({"orderId": 42}));
        assert_eq!(numeric.order_id(), None);
    }

    #[test]
    fn test_payment_succeeded_detail() {
        let detail = PaymentSucceeded::new("ORD-1", "PayPal-Simulator");
        let envelope = EventEnvelope::from_detail(
            sources::PAYMENT_SIMULATOR,
            detail_types::PAYMENT_SUCCEEDED,
            &detail,
        )
        .unwrap();

        assert_eq!(envelope.detail["status"], "SUCCESS");
        assert_eq!(envelope.detail["provider"], "PayPal-Simulator");

        let decoded: PaymentSucceeded = envelope.decode_detail().unwrap();
        assert_eq!(decoded, detail);
    }

    #[test]
    fn test_decode_detail_rejects_wrong_shape() {
        let envelope = EventEnvelope::new(
            sources::BOOKING,
            detail_types::ORDER_CREATED,
            json!({"orderId": "ORD-1"}),
        );
        let err = envelope.decode_detail::<OrderCreated>().unwrap_err();
        assert_eq!(err.code(), "INVALID_EVENT");
    }
}
