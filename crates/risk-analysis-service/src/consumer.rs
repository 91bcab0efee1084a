//! 风险分析通道消费装配

use std::sync::Arc;

use ticket_shared::config::AppConfig;
use ticket_shared::delivery::{ChannelWorker, EventHandler};
use ticket_shared::dlq::DlqProducer;
use ticket_shared::kafka::{KafkaChannelReceiver, KafkaChannelTransport};
use ticket_shared::retry::RetryPolicy;
use ticket_shared::transport::ChannelTransport;
use tokio::sync::watch;
use tracing::info;

use crate::SERVICE_NAME;
use crate::error::RiskAnalysisError;

/// 构建风险分析通道的消费循环
///
/// 重投写回同一通道，耗尽后写入死信通道
pub fn build_worker(
    config: &AppConfig,
    handler: Arc<dyn EventHandler>,
    transport: Arc<dyn ChannelTransport>,
) -> ChannelWorker {
    let dlq = Arc::new(DlqProducer::new(
        transport.clone(),
        config.channels.dead_letter.clone(),
        SERVICE_NAME,
        RetryPolicy::from_delivery(&config.delivery),
    ));
    ChannelWorker::new(
        config.channels.risk_analysis.clone(),
        handler,
        transport,
        dlq,
        &config.delivery,
    )
}

/// 基于 Kafka 的风险分析消费者
pub struct RiskAnalysisConsumer {
    worker: ChannelWorker,
    receiver: KafkaChannelReceiver,
}

impl RiskAnalysisConsumer {
    pub fn connect(
        config: &AppConfig,
        handler: Arc<dyn EventHandler>,
    ) -> Result<Self, RiskAnalysisError> {
        let transport = Arc::new(KafkaChannelTransport::new(&config.kafka)?);
        let receiver =
            KafkaChannelReceiver::new(&config.kafka, "risk-analysis", &config.channels.risk_analysis)?;

        Ok(Self {
            worker: build_worker(config, handler, transport),
            receiver,
        })
    }

    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        self.worker.run(self.receiver, shutdown).await;
        info!("风险分析消费者已停止");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::RiskClassifier;
    use crate::scoring::RuleBasedScorer;
    use alert_dispatcher::AlertDispatcher;
    use alert_dispatcher::sender::MockNotifier;
    use chrono::Utc;
    use std::time::Duration;
    use ticket_shared::config::DeliveryConfig;
    use ticket_shared::events::{EventEnvelope, detail_types, sources};
    use ticket_shared::order::{Order, RiskLevel};
    use ticket_shared::store::{InMemoryOrderStore, OrderStore};
    use ticket_shared::transport::{Delivery, InMemoryTransport};

    fn config() -> AppConfig {
        AppConfig {
            delivery: DeliveryConfig {
                initial_backoff_ms: 1,
                max_backoff_ms: 5,
                ..DeliveryConfig::default()
            },
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn test_worker_classifies_channel_deliveries() {
        let config = config();
        let transport = Arc::new(InMemoryTransport::new());
        let receiver = transport.receiver(&config.channels.risk_analysis).unwrap();

        let store = Arc::new(InMemoryOrderStore::new());
        let order = Order::new_pending("ORD-9", "u1", "GENERAL", 800.0, Utc::now());
        store.create(&order).await.unwrap();

        let mut notifier = MockNotifier::new();
        notifier.expect_send().never();
        let classifier = Arc::new(RiskClassifier::new(
            store.clone(),
            Arc::new(RuleBasedScorer),
            Arc::new(AlertDispatcher::new(Arc::new(notifier), "ops@example.com")),
        ));

        let worker = build_worker(&config, classifier, transport.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(worker.run(receiver, shutdown_rx));

        let envelope =
            EventEnvelope::from_detail(sources::BOOKING, detail_types::ORDER_CREATED, &order)
                .unwrap()
                .for_channel(&config.channels.risk_analysis);
        transport
            .deliver(&config.channels.risk_analysis, &Delivery::first(envelope))
            .await
            .unwrap();

        let risk = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Some(risk) = store.get("ORD-9").await.unwrap().unwrap().risk_assessment() {
                    break risk;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(risk.risk, RiskLevel::Medium);
        assert!(risk.is_vip);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }
}
