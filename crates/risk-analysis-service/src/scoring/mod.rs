//! 风险评分能力
//!
//! `RiskScorer` 对单个订单给出评分结果或错误。生产环境调用外部模型接口，
//! 测试与本地开发使用确定性的规则评分。

mod model;
mod rules;

pub use model::ModelScorer;
pub use rules::RuleBasedScorer;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use ticket_shared::config::{ScoringConfig, ScoringMode};
use ticket_shared::order::Order;

use crate::decode::ScoringResponse;
use crate::error::ScoringError;

/// 提交给评分能力的订单信息
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_id: String,
    pub user_id: String,
    pub ticket_type: String,
    pub amount: f64,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.order_id.clone(),
            user_id: order.user_id.clone(),
            ticket_type: order.ticket_type.clone(),
            amount: order.amount,
        }
    }
}

/// 风险评分接口
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait RiskScorer: Send + Sync {
    async fn classify(&self, order: &OrderSummary) -> Result<ScoringResponse, ScoringError>;

    /// 评分实现名称，用于日志与指标标签
    fn name(&self) -> &'static str;
}

/// 按配置选择评分实现
pub fn build_scorer(config: &ScoringConfig) -> Result<Arc<dyn RiskScorer>, ScoringError> {
    match config.mode {
        ScoringMode::Model => Ok(Arc::new(ModelScorer::new(config)?)),
        ScoringMode::Rules => Ok(Arc::new(RuleBasedScorer)),
    }
}
