//! 并发与重复投递

use std::sync::Arc;
use std::time::Duration;

use booking_service::dto::CreateOrderRequest;
use ticket_shared::store::OrderStore;
use futures::future::join_all;
use risk_analysis_service::scoring::RuleBasedScorer;
use ticket_shared::events::{EventEnvelope, detail_types, sources};
use ticket_shared::order::{OrderStatus, RiskLevel};
use ticket_shared::transport::{ChannelTransport, Delivery};

use crate::helpers::ScriptedScorer;
use crate::setup::TestPipeline;

fn request(i: usize, amount: f64) -> CreateOrderRequest {
    CreateOrderRequest {
        user_id: format!("u{i}"),
        amount,
        ticket_type: "GENERAL".to_string(),
        metadata: None,
    }
}

#[tokio::test]
async fn test_risk_and_payment_writes_race_without_loss() {
    let pipeline = TestPipeline::start(Arc::new(RuleBasedScorer)).await;

    // 创建后立即触发支付，两个消费方对同一订单的处理顺序不确定
    let orders = join_all((0..20).map(|i| {
        let booking = pipeline.booking.clone();
        async move {
            let order = booking.create_order(request(i, 1000.0)).await.unwrap();
            booking.simulate_payment_success(&order.order_id).await.unwrap();
            order
        }
    }))
    .await;

    for order in &orders {
        let settled = pipeline
            .wait_for_order(&order.order_id, "风险与状态都已写入", |o| {
                o.status == OrderStatus::Paid && o.risk_assessment().is_some()
            })
            .await;
        let risk = settled.risk_assessment().unwrap();
        assert_eq!(risk.risk, RiskLevel::Medium);
        assert!(risk.is_vip);
    }

    pipeline.stop().await;
}

#[tokio::test]
async fn test_duplicate_deliveries_are_idempotent() {
    let pipeline = TestPipeline::start(Arc::new(RuleBasedScorer)).await;
    let channels = pipeline.config.channels.clone();

    let order = pipeline
        .booking
        .create_order(request(1, 800.0))
        .await
        .unwrap();
    let first = pipeline
        .wait_for_risk(&order.order_id)
        .await
        .risk_assessment()
        .unwrap();

    // 至少一次语义下同一 OrderCreated 再次到达
    let duplicate =
        EventEnvelope::from_detail(sources::BOOKING, detail_types::ORDER_CREATED, &order)
            .unwrap()
            .for_channel(&channels.risk_analysis);
    pipeline
        .transport
        .deliver(&channels.risk_analysis, &Delivery::first(duplicate))
        .await
        .unwrap();

    // 支付事件重复两次
    for _ in 0..2 {
        pipeline
            .booking
            .simulate_payment_success(&order.order_id)
            .await
            .unwrap();
    }

    let paid = pipeline
        .wait_for_order(&order.order_id, "状态更新为 PAID", |o| {
            o.status == OrderStatus::Paid
        })
        .await;
    pipeline.settle().await;

    let second = pipeline
        .store
        .get(&order.order_id)
        .await
        .unwrap()
        .unwrap()
        .risk_assessment()
        .unwrap();
    assert_eq!(second.risk, first.risk);
    assert_eq!(second.recommendation, first.recommendation);
    assert_eq!(second.is_vip, first.is_vip);
    assert_eq!(paid.status, OrderStatus::Paid);

    pipeline.stop().await;
}

#[tokio::test]
async fn test_redelivered_high_order_alerts_once() {
    let scorer = Arc::new(ScriptedScorer::returning(
        RiskLevel::High,
        "金额异常，建议人工复核",
        false,
    ));
    let pipeline = TestPipeline::start(scorer.clone()).await;
    let channels = pipeline.config.channels.clone();

    let order = pipeline
        .booking
        .create_order(request(1, 3000.0))
        .await
        .unwrap();
    pipeline.wait_for_risk(&order.order_id).await;
    pipeline.wait_for_alerts(&order.order_id, 1).await;

    // 同一 OrderCreated 以第二次处理的身份再次到达
    let envelope =
        EventEnvelope::from_detail(sources::BOOKING, detail_types::ORDER_CREATED, &order)
            .unwrap()
            .for_channel(&channels.risk_analysis);
    pipeline
        .transport
        .deliver(
            &channels.risk_analysis,
            &Delivery::first(envelope).redelivery(),
        )
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while scorer.calls() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("重投的订单事件未被处理");
    pipeline.settle().await;

    assert_eq!(pipeline.notifier.sent_for(&order.order_id).len(), 1);
    let risk = pipeline
        .store
        .get(&order.order_id)
        .await
        .unwrap()
        .unwrap()
        .risk_assessment()
        .unwrap();
    assert_eq!(risk.risk, RiskLevel::High);

    pipeline.stop().await;
}
