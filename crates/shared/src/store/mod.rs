//! 订单存储
//!
//! 订单记录是三个消费方之间唯一的共享可变状态。存储只暴露按字段组划分的写接口：
//! 创建（不存在才写入）、风险字段组整组覆盖、状态条件迁移。
//! 任何写入都不会先读后写对方负责的字段，因此风险写与状态写可以任意顺序并发执行。

mod memory;
mod postgres;

pub use memory::InMemoryOrderStore;
pub use postgres::PgOrderStore;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::config::{DatabaseConfig, StoreBackend, StoreConfig};
use crate::database::Database;
use crate::error::Result;
use crate::order::{Order, RiskAssessment, RiskLevel};

/// 支付状态迁移结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentTransition {
    /// 本次写入完成了 PENDING -> PAID
    Transitioned,
    /// 订单此前已是 PAID，本次为空操作
    AlreadyPaid,
}

impl PaymentTransition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transitioned => "transitioned",
            Self::AlreadyPaid => "already_paid",
        }
    }
}

/// 订单存储接口
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// 创建订单，订单 ID 已存在时返回 `AlreadyExists`
    async fn create(&self, order: &Order) -> Result<()>;

    /// 整组覆盖风险字段，不触碰状态与创建字段；订单不存在时返回 `NotFound`
    ///
    /// 返回写入前的风险等级，尚未分析过时为 `None`
    async fn update_risk(
        &self,
        order_id: &str,
        assessment: &RiskAssessment,
    ) -> Result<Option<RiskLevel>>;

    /// 条件迁移 PENDING -> PAID，重复调用为空操作；订单不存在时返回 `NotFound`
    async fn mark_paid(&self, order_id: &str) -> Result<PaymentTransition>;

    async fn get(&self, order_id: &str) -> Result<Option<Order>>;
}

/// 按配置构建订单存储
///
/// 内存存储只在单进程内共享，多个服务进程必须使用 Postgres
pub async fn connect(
    store: &StoreConfig,
    database: &DatabaseConfig,
) -> Result<Arc<dyn OrderStore>> {
    match store.backend {
        StoreBackend::Memory => {
            warn!("使用内存订单存储，数据不会在进程间共享");
            Ok(Arc::new(InMemoryOrderStore::new()))
        }
        StoreBackend::Postgres => {
            let db = Database::connect(database).await?;
            db.health_check().await?;
            Ok(Arc::new(PgOrderStore::new(db.pool().clone())))
        }
    }
}
