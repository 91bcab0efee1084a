//! 风险分类处理器
//!
//! 处理流程：读取 orderId -> 解析订单 -> 评分 -> 策略校正 -> 整组写入风险字段 -> 首次判定为 HIGH 时告警。
//! 处置规则：
//! - 缺少 orderId、订单无法解析、评分结果格式错误：跳过，不写入、不重投
//! - 评分瞬时失败、存储不可用：重投
//! - 订单不存在：跳过

use std::sync::Arc;

use alert_dispatcher::{AlertDispatcher, RiskAlert};
use async_trait::async_trait;
use chrono::Utc;
use ticket_shared::delivery::{Disposition, EventHandler};
use ticket_shared::events::OrderCreated;
use ticket_shared::observability::metrics;
use ticket_shared::order::{RiskAssessment, RiskLevel};
use ticket_shared::store::OrderStore;
use ticket_shared::transport::Delivery;
use tracing::{error, info, warn};

use crate::error::ScoringError;
use crate::policy;
use crate::scoring::{OrderSummary, RiskScorer};

pub struct RiskClassifier {
    store: Arc<dyn OrderStore>,
    scorer: Arc<dyn RiskScorer>,
    alerts: Arc<AlertDispatcher>,
}

impl RiskClassifier {
    pub fn new(
        store: Arc<dyn OrderStore>,
        scorer: Arc<dyn RiskScorer>,
        alerts: Arc<AlertDispatcher>,
    ) -> Self {
        Self {
            store,
            scorer,
            alerts,
        }
    }

    /// 对一个订单完成分类并写入风险字段组
    pub async fn classify(&self, order: &OrderCreated) -> Disposition {
        let summary = OrderSummary::from(order);

        let response = match self.scorer.classify(&summary).await {
            Ok(response) => response,
            Err(ScoringError::Transient(reason)) => {
                metrics::record_risk_classification("none", "transient");
                warn!(order_id = %order.order_id, reason = %reason, "评分暂时失败，等待重投");
                return Disposition::Retry(reason);
            }
            Err(e @ ScoringError::Malformed(_)) => {
                metrics::record_risk_classification("none", "malformed");
                warn!(order_id = %order.order_id, error = %e, "评分结果无法解析，跳过该订单");
                return Disposition::Skip(e.to_string());
            }
        };

        let classification = policy::apply(order.amount, &response);
        if classification.overridden {
            warn!(
                order_id = %order.order_id,
                amount = order.amount,
                scored = %response.risk,
                applied = %classification.risk,
                "评分等级与金额策略不一致，以策略为准"
            );
        }

        let assessment = RiskAssessment {
            risk: classification.risk,
            recommendation: classification.recommendation,
            is_vip: classification.is_vip,
            analyzed_at: Utc::now(),
        };

        let previous = match self.store.update_risk(&order.order_id, &assessment).await {
            Ok(previous) => previous,
            Err(e) => {
                metrics::record_risk_classification(assessment.risk.as_str(), "store_failed");
                error!(order_id = %order.order_id, error = %e, "写入风险字段失败");
                return Disposition::from_error(&e);
            }
        };

        metrics::record_risk_classification(assessment.risk.as_str(), "written");
        info!(
            order_id = %order.order_id,
            risk = %assessment.risk,
            is_vip = assessment.is_vip,
            "风险分析结果已写入订单"
        );

        // 只在首次进入 HIGH 时告警
        if assessment.risk == RiskLevel::High && previous == Some(RiskLevel::High) {
            info!(order_id = %order.order_id, "订单此前已判定为 HIGH，不再重复告警");
        } else if assessment.risk == RiskLevel::High {
            self.alerts
                .dispatch(&RiskAlert {
                    order_id: order.order_id.clone(),
                    recommendation: assessment.recommendation,
                    amount: order.amount,
                })
                .await;
        }

        Disposition::Handled
    }
}

#[async_trait]
impl EventHandler for RiskClassifier {
    async fn handle(&self, delivery: &Delivery) -> Disposition {
        let Some(order_id) = delivery.order_id() else {
            warn!(event_id = %delivery.envelope.event_id, "事件缺少 orderId，跳过");
            return Disposition::Skip("事件缺少 orderId".to_string());
        };

        info!(order_id, attempt = delivery.attempt, "开始分析订单风险");

        match delivery.envelope.decode_detail::<OrderCreated>() {
            Ok(order) => self.classify(&order).await,
            Err(e) => {
                warn!(order_id, error = %e, "订单事件无法解析，跳过");
                Disposition::Skip(e.to_string())
            }
        }
    }
}
