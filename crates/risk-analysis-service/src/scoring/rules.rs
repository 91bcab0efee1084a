//! 规则评分
//!
//! 与模型提示中的阈值规则一致的确定性实现，不访问网络。

use async_trait::async_trait;
use ticket_shared::order::RiskLevel;

use super::{OrderSummary, RiskScorer};
use crate::decode::ScoringResponse;
use crate::error::ScoringError;
use crate::policy;

#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedScorer;

#[async_trait]
impl RiskScorer for RuleBasedScorer {
    async fn classify(&self, order: &OrderSummary) -> Result<ScoringResponse, ScoringError> {
        let risk = policy::classify_amount(order.amount);
        let (recommendation, vip_status) = match risk {
            RiskLevel::High => ("金额超过高风险阈值，建议人工复核后放行", false),
            RiskLevel::Medium => ("中等金额订单，按 VIP 客户优先处理", true),
            RiskLevel::Low => ("低风险订单，正常处理", false),
        };

        Ok(ScoringResponse {
            risk,
            recommendation: recommendation.to_string(),
            vip_status,
        })
    }

    fn name(&self) -> &'static str {
        "rules"
    }
}
