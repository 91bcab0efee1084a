//! 重投耗尽进入死信通道

use std::sync::Arc;

use booking_service::dto::CreateOrderRequest;
use ticket_shared::store::OrderStore;
use risk_analysis_service::error::ScoringError;

use crate::helpers::ScriptedScorer;
use crate::setup::TestPipeline;

#[tokio::test]
async fn test_transient_failures_exhaust_into_dead_letter() {
    let scorer = Arc::new(ScriptedScorer::failing(ScoringError::Transient(
        "评分请求超时".to_string(),
    )));
    let mut pipeline = TestPipeline::start(scorer.clone()).await;

    let order = pipeline
        .booking
        .create_order(CreateOrderRequest {
            user_id: "u1".to_string(),
            amount: 3000.0,
            ticket_type: "VIP".to_string(),
            metadata: None,
        })
        .await
        .unwrap();

    let dead_letter = pipeline.next_dead_letter().await;
    assert_eq!(dead_letter.order_id.as_deref(), Some(order.order_id.as_str()));
    assert_eq!(dead_letter.source_channel, pipeline.config.channels.risk_analysis);
    assert_eq!(dead_letter.source_service, "risk-analysis-service");
    assert_eq!(dead_letter.attempts, 3);
    assert_eq!(dead_letter.max_attempts, 3);
    assert!(dead_letter.error.contains("评分请求超时"));

    // 每次投递各评分一次，风险字段始终为空
    assert_eq!(scorer.calls(), 3);
    let stored = pipeline.store.get(&order.order_id).await.unwrap().unwrap();
    assert!(stored.risk_assessment().is_none());
    assert!(pipeline.notifier.sent().is_empty());

    pipeline.stop().await;
}
