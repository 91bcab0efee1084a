//! 内存订单存储
//!
//! 语义与 Postgres 实现一致，用于本地运行与端到端测试。
//! DashMap 的 `get_mut` 持有分片写锁，单个订单的字段组写入因此是原子的。

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use super::{OrderStore, PaymentTransition};
use crate::error::{Result, TicketError};
use crate::order::{Order, OrderStatus, RiskAssessment, RiskLevel};

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: DashMap<String, Order>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: &Order) -> Result<()> {
        match self.orders.entry(order.order_id.clone()) {
            Entry::Occupied(_) => Err(TicketError::AlreadyExists {
                entity: "Order".to_string(),
                field: "order_id".to_string(),
                value: order.order_id.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(order.clone());
                debug!(order_id = %order.order_id, "订单已写入内存存储");
                Ok(())
            }
        }
    }

    async fn update_risk(
        &self,
        order_id: &str,
        assessment: &RiskAssessment,
    ) -> Result<Option<RiskLevel>> {
        let mut order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| TicketError::order_not_found(order_id))?;
        let previous = order.ai_risk;
        order.apply_risk(assessment);
        Ok(previous)
    }

    async fn mark_paid(&self, order_id: &str) -> Result<PaymentTransition> {
        let mut order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| TicketError::order_not_found(order_id))?;

        if order.status == OrderStatus::Paid {
            return Ok(PaymentTransition::AlreadyPaid);
        }
        order.status = OrderStatus::Paid;
        Ok(PaymentTransition::Transitioned)
    }

    async fn get(&self, order_id: &str) -> Result<Option<Order>> {
        Ok(self.orders.get(order_id).map(|o| o.clone()))
    }
}
