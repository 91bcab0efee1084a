//! 订单生命周期
//!
//! 创建 -> 风险分析 -> 告警 -> 支付确认

use std::collections::HashSet;
use std::sync::Arc;

use booking_service::dto::CreateOrderRequest;
use ticket_shared::store::OrderStore;
use ticket_shared::order::{OrderStatus, RiskLevel};

use crate::helpers::ScriptedScorer;
use crate::setup::TestPipeline;

fn request(user_id: &str, amount: f64, ticket_type: &str) -> CreateOrderRequest {
    CreateOrderRequest {
        user_id: user_id.to_string(),
        amount,
        ticket_type: ticket_type.to_string(),
        metadata: None,
    }
}

#[tokio::test]
async fn test_high_risk_order_full_lifecycle() {
    let scorer = Arc::new(ScriptedScorer::returning(
        RiskLevel::High,
        "金额异常，建议人工复核",
        true,
    ));
    let pipeline = TestPipeline::start(scorer.clone()).await;

    // 1. 创建订单：记录为 PENDING，没有风险字段
    let created = pipeline
        .booking
        .create_order(request("u1", 3000.0, "VIP"))
        .await
        .unwrap();
    assert_eq!(created.status, OrderStatus::Pending);
    assert!(created.risk_assessment().is_none());

    // 2. 风险分析写入整组风险字段，状态不变
    let analyzed = pipeline.wait_for_risk(&created.order_id).await;
    let risk = analyzed.risk_assessment().unwrap();
    assert_eq!(risk.risk, RiskLevel::High);
    assert_eq!(risk.recommendation, "金额异常，建议人工复核");
    assert!(risk.is_vip);
    assert_eq!(analyzed.status, OrderStatus::Pending);

    // 3. 恰好一条告警，引用该订单
    pipeline.wait_for_alerts(&created.order_id, 1).await;
    pipeline.settle().await;
    let alerts = pipeline.notifier.sent_for(&created.order_id);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].to, "ops@example.com");
    assert!(alerts[0].body.contains("Risk Level: HIGH"));
    assert!(alerts[0].body.contains("Reason: 金额异常，建议人工复核"));
    assert!(alerts[0].body.contains("Amount: 3000"));

    // 4. 支付回调后状态为 PAID，风险字段不变
    pipeline
        .booking
        .simulate_payment_success(&created.order_id)
        .await
        .unwrap();
    let paid = pipeline
        .wait_for_order(&created.order_id, "状态更新为 PAID", |o| {
            o.status == OrderStatus::Paid
        })
        .await;
    assert_eq!(paid.risk_assessment(), Some(risk));
    assert_eq!(paid.amount, 3000.0);
    assert_eq!(paid.user_id, "u1");
    assert_eq!(paid.ticket_type, "VIP");
    assert_eq!(paid.created_at, created.created_at);

    assert_eq!(scorer.calls(), 1);
    pipeline.stop().await;
}

#[tokio::test]
async fn test_order_ids_are_unique_across_requests() {
    let pipeline = TestPipeline::start(Arc::new(ScriptedScorer::returning(
        RiskLevel::Low,
        "ok",
        false,
    )))
    .await;

    let mut ids = HashSet::new();
    for i in 0..20 {
        let order = pipeline
            .booking
            .create_order(request(&format!("u{i}"), 10.0, "GENERAL"))
            .await
            .unwrap();
        assert!(ids.insert(order.order_id));
    }
    assert_eq!(pipeline.store.len(), 20);

    pipeline.stop().await;
}

#[tokio::test]
async fn test_payment_for_unknown_order_is_skipped() {
    let pipeline = TestPipeline::start(Arc::new(ScriptedScorer::returning(
        RiskLevel::Low,
        "ok",
        false,
    )))
    .await;

    pipeline
        .booking
        .simulate_payment_success("ORD-unknown")
        .await
        .unwrap();
    pipeline.settle().await;

    assert!(pipeline.store.get("ORD-unknown").await.unwrap().is_none());
    assert!(pipeline.store.is_empty());
    pipeline.stop().await;
}
