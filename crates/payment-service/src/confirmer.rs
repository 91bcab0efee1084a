//! 支付确认处理器
//!
//! 只写状态字段：PENDING -> PAID 的条件迁移，不读取也不依赖风险字段组。
//! 重复投递时迁移为空操作，不报错。

use std::sync::Arc;

use async_trait::async_trait;
use ticket_shared::delivery::{Disposition, EventHandler};
use ticket_shared::events::PaymentSucceeded;
use ticket_shared::observability::metrics;
use ticket_shared::store::{OrderStore, PaymentTransition};
use ticket_shared::transport::Delivery;
use tracing::{error, info, warn};

use crate::error::PaymentError;

pub struct PaymentConfirmer {
    store: Arc<dyn OrderStore>,
}

impl PaymentConfirmer {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// 将订单标记为已支付
    pub async fn confirm(&self, order_id: &str) -> Disposition {
        match self.store.mark_paid(order_id).await {
            Ok(transition) => {
                metrics::record_payment_confirmed(transition.as_str());
                match transition {
                    PaymentTransition::Transitioned => info!(order_id, "订单已更新为 PAID"),
                    PaymentTransition::AlreadyPaid => {
                        info!(order_id, "订单此前已是 PAID，忽略重复确认")
                    }
                }
                Disposition::Handled
            }
            Err(e) => {
                error!(order_id, error = %e, "更新订单支付状态失败");
                Disposition::from_error(&e)
            }
        }
    }

    /// 校验事件状态；只有 status 字段存在且不是 SUCCESS 时拒绝
    fn check_status(delivery: &Delivery, order_id: &str) -> Result<(), PaymentError> {
        match delivery.envelope.detail.get("status").and_then(|v| v.as_str()) {
            Some(status) if status != PaymentSucceeded::STATUS_SUCCESS => {
                Err(PaymentError::UnexpectedStatus {
                    order_id: order_id.to_string(),
                    status: status.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl EventHandler for PaymentConfirmer {
    async fn handle(&self, delivery: &Delivery) -> Disposition {
        let Some(order_id) = delivery.order_id() else {
            warn!(event_id = %delivery.envelope.event_id, "事件缺少 orderId，跳过");
            return Disposition::Skip("事件缺少 orderId".to_string());
        };

        if let Err(e) = Self::check_status(delivery, order_id) {
            warn!(order_id, error = %e, "支付事件状态无效，跳过");
            return Disposition::Skip(e.to_string());
        }

        let provider = delivery
            .envelope
            .detail
            .get("provider")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        info!(order_id, provider, attempt = delivery.attempt, "开始确认订单支付");

        self.confirm(order_id).await
    }
}
