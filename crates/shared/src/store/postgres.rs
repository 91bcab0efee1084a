//! Postgres 订单存储
//!
//! 每个写接口都是一条按 order_id 定位的单语句，只涉及所属字段组的列。

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;

use super::{OrderStore, PaymentTransition};
use crate::error::{Result, TicketError};
use crate::order::{Order, OrderStatus, RiskAssessment, RiskLevel};

const SELECT_ORDER: &str = r#"SELECT order_id, user_id, ticket_type, amount, status, created_at,
                                  ai_risk, ai_recommendation, is_vip, ai_analyzed_at
                           FROM orders
                           WHERE order_id = $1"#;

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let ai_risk: Option<String> = row.try_get("ai_risk")?;

        Ok(Order {
            order_id: row.try_get("order_id")?,
            user_id: row.try_get("user_id")?,
            ticket_type: row.try_get("ticket_type")?,
            amount: row.try_get("amount")?,
            status: status.parse::<OrderStatus>()?,
            created_at: row.try_get("created_at")?,
            ai_risk: ai_risk.map(|r| r.parse::<RiskLevel>()).transpose()?,
            ai_recommendation: row.try_get("ai_recommendation")?,
            is_vip: row.try_get("is_vip")?,
            ai_analyzed_at: row.try_get("ai_analyzed_at")?,
        })
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create(&self, order: &Order) -> Result<()> {
        let result = sqlx::query(
            r#"INSERT INTO orders (order_id, user_id, ticket_type, amount, status, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (order_id) DO NOTHING"#,
        )
        .bind(&order.order_id)
        .bind(&order.user_id)
        .bind(&order.ticket_type)
        .bind(order.amount)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TicketError::AlreadyExists {
                entity: "Order".to_string(),
                field: "order_id".to_string(),
                value: order.order_id.clone(),
            });
        }

        debug!(order_id = %order.order_id, "订单已写入数据库");
        Ok(())
    }

    async fn update_risk(
        &self,
        order_id: &str,
        assessment: &RiskAssessment,
    ) -> Result<Option<RiskLevel>> {
        // 锁定行并取出旧等级，同一订单的并发重投依次执行
        let row = sqlx::query(
            r#"WITH prior AS (
                   SELECT order_id, ai_risk FROM orders WHERE order_id = $1 FOR UPDATE
               )
               UPDATE orders o
               SET ai_risk = $2, ai_recommendation = $3, is_vip = $4, ai_analyzed_at = $5
               FROM prior
               WHERE o.order_id = prior.order_id
               RETURNING prior.ai_risk AS previous_risk"#,
        )
        .bind(order_id)
        .bind(assessment.risk.as_str())
        .bind(&assessment.recommendation)
        .bind(assessment.is_vip)
        .bind(assessment.analyzed_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| TicketError::order_not_found(order_id))?;

        let previous: Option<String> = row.try_get("previous_risk")?;
        previous.map(|r| r.parse::<RiskLevel>()).transpose()
    }

    async fn mark_paid(&self, order_id: &str) -> Result<PaymentTransition> {
        let result = sqlx::query(
            "UPDATE orders SET status = 'PAID' WHERE order_id = $1 AND status = 'PENDING'",
        )
        .bind(order_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(PaymentTransition::Transitioned);
        }

        // 未命中条件：订单不存在，或已是 PAID
        let exists: bool =
            sqlx::query("SELECT EXISTS(SELECT 1 FROM orders WHERE order_id = $1) AS exists")
                .bind(order_id)
                .fetch_one(&self.pool)
                .await?
                .try_get("exists")?;

        if exists {
            Ok(PaymentTransition::AlreadyPaid)
        } else {
            Err(TicketError::order_not_found(order_id))
        }
    }

    async fn get(&self, order_id: &str) -> Result<Option<Order>> {
        let row = sqlx::query(SELECT_ORDER)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::map_row).transpose()
    }
}
