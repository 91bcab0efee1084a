//! 订单创建与支付模拟

use std::sync::Arc;

use chrono::Utc;
use ticket_shared::events::{EventEnvelope, PaymentSucceeded, detail_types, sources};
use ticket_shared::observability::metrics;
use ticket_shared::order::Order;
use ticket_shared::router::EventPublisher;
use ticket_shared::store::OrderStore;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::dto::CreateOrderRequest;
use crate::error::{BookingError, Result};

/// 模拟支付回调使用的支付渠道名
pub const SIMULATED_PROVIDER: &str = "PayPal-Simulator";

/// 生成订单 ID
pub fn generate_order_id() -> String {
    format!("ORD-{}", Uuid::now_v7().simple())
}

pub struct BookingService {
    store: Arc<dyn OrderStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl BookingService {
    pub fn new(store: Arc<dyn OrderStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    /// 创建订单
    ///
    /// 存储写入失败时不发布事件；写入成功但发布失败时返回错误，记录保持 PENDING 且不会被分析
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<Order> {
        let order = Order::new_pending(
            generate_order_id(),
            request.user_id,
            request.ticket_type,
            request.amount,
            Utc::now(),
        );

        self.store.create(&order).await?;
        metrics::record_order_created(&order.ticket_type);
        info!(
            order_id = %order.order_id,
            amount = order.amount,
            ticket_type = %order.ticket_type,
            "订单已写入存储"
        );

        let envelope =
            EventEnvelope::from_detail(sources::BOOKING, detail_types::ORDER_CREATED, &order)?;
        self.publish(&envelope, &order.order_id).await?;

        Ok(order)
    }

    /// 模拟支付成功回调，发布 PaymentSucceeded 事件
    ///
    /// 不检查订单是否存在，未知订单由支付确认方跳过
    pub async fn simulate_payment_success(&self, order_id: &str) -> Result<()> {
        info!(order_id, "模拟支付成功回调");

        let detail = PaymentSucceeded::new(order_id, SIMULATED_PROVIDER);
        let envelope = EventEnvelope::from_detail(
            sources::PAYMENT_SIMULATOR,
            detail_types::PAYMENT_SUCCEEDED,
            &detail,
        )?;
        self.publish(&envelope, order_id).await
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Order> {
        self.store
            .get(order_id)
            .await?
            .ok_or_else(|| BookingError::OrderNotFound(order_id.to_string()))
    }

    async fn publish(&self, envelope: &EventEnvelope, order_id: &str) -> Result<()> {
        match self.publisher.publish(envelope).await {
            Ok(channels) => {
                info!(
                    order_id,
                    event_id = %envelope.event_id,
                    detail_type = %envelope.detail_type,
                    channels,
                    "事件已发布"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    order_id,
                    event_id = %envelope.event_id,
                    detail_type = %envelope.detail_type,
                    error = %e,
                    "事件发布失败"
                );
                Err(BookingError::PublishFailed(e.to_string()))
            }
        }
    }
}
