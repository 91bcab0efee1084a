//! 风险分级与告警

use std::sync::Arc;

use booking_service::dto::CreateOrderRequest;
use ticket_shared::store::OrderStore;
use risk_analysis_service::error::ScoringError;
use risk_analysis_service::scoring::RuleBasedScorer;
use ticket_shared::order::{OrderStatus, RiskLevel};

use crate::helpers::ScriptedScorer;
use crate::setup::TestPipeline;

fn request(amount: f64) -> CreateOrderRequest {
    CreateOrderRequest {
        user_id: "u1".to_string(),
        amount,
        ticket_type: "GENERAL".to_string(),
        metadata: None,
    }
}

#[tokio::test]
async fn test_threshold_law() {
    let pipeline = TestPipeline::start(Arc::new(RuleBasedScorer)).await;

    let cases = [
        (3000.0, RiskLevel::High, None),
        (1000.0, RiskLevel::Medium, Some(true)),
        (100.0, RiskLevel::Low, Some(false)),
    ];

    for (amount, level, vip) in cases {
        let order = pipeline.booking.create_order(request(amount)).await.unwrap();
        let risk = pipeline
            .wait_for_risk(&order.order_id)
            .await
            .risk_assessment()
            .unwrap();
        assert_eq!(risk.risk, level, "amount={amount}");
        if let Some(vip) = vip {
            assert_eq!(risk.is_vip, vip, "amount={amount}");
        }

        let expected_alerts = usize::from(level == RiskLevel::High);
        pipeline.wait_for_alerts(&order.order_id, expected_alerts).await;
        pipeline.settle().await;
        assert_eq!(pipeline.notifier.sent_for(&order.order_id).len(), expected_alerts);
    }

    pipeline.stop().await;
}

#[tokio::test]
async fn test_policy_wins_over_disagreeing_score() {
    // 评分给出 LOW，但金额落在 HIGH 区间
    let pipeline = TestPipeline::start(Arc::new(ScriptedScorer::returning(
        RiskLevel::Low,
        "looks fine",
        false,
    )))
    .await;

    let order = pipeline.booking.create_order(request(5000.0)).await.unwrap();
    let risk = pipeline
        .wait_for_risk(&order.order_id)
        .await
        .risk_assessment()
        .unwrap();
    assert_eq!(risk.risk, RiskLevel::High);
    pipeline.wait_for_alerts(&order.order_id, 1).await;

    pipeline.stop().await;
}

#[tokio::test]
async fn test_malformed_score_never_writes_risk_fields() {
    let scorer = Arc::new(ScriptedScorer::failing(ScoringError::Malformed(
        "expected value at line 1 column 1".to_string(),
    )));
    let pipeline = TestPipeline::start(scorer.clone()).await;

    let order = pipeline.booking.create_order(request(3000.0)).await.unwrap();

    // 等待分类器处理完这条消息
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while scorer.calls() < 1 {
        assert!(tokio::time::Instant::now() < deadline, "评分未被调用");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    pipeline.settle().await;

    let stored = pipeline.store.get(&order.order_id).await.unwrap().unwrap();
    assert!(stored.risk_assessment().is_none());
    assert_eq!(stored.status, OrderStatus::Pending);
    assert!(pipeline.notifier.sent().is_empty());

    // 格式错误不重投，只调用一次
    assert_eq!(scorer.calls(), 1);

    // 分类器仍在工作：后续支付照常处理
    pipeline
        .booking
        .simulate_payment_success(&order.order_id)
        .await
        .unwrap();
    pipeline
        .wait_for_order(&order.order_id, "状态更新为 PAID", |o| {
            o.status == OrderStatus::Paid
        })
        .await;

    pipeline.stop().await;
}
