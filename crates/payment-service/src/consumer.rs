//! 支付通道与死信通道的消费装配

use std::sync::Arc;

use ticket_shared::config::AppConfig;
use ticket_shared::delivery::{ChannelWorker, EventHandler};
use ticket_shared::dlq::{DeadLetterMonitor, DlqProducer};
use ticket_shared::kafka::{KafkaChannelReceiver, KafkaChannelTransport};
use ticket_shared::retry::RetryPolicy;
use ticket_shared::transport::ChannelTransport;
use tokio::sync::watch;
use tracing::{error, info};

use crate::SERVICE_NAME;
use crate::error::PaymentError;

/// 按通道名构建消费循环，失败消息写入同一个死信通道
pub fn build_worker(
    config: &AppConfig,
    channel: &str,
    handler: Arc<dyn EventHandler>,
    transport: Arc<dyn ChannelTransport>,
) -> ChannelWorker {
    let dlq = Arc::new(DlqProducer::new(
        transport.clone(),
        config.channels.dead_letter.clone(),
        SERVICE_NAME,
        RetryPolicy::from_delivery(&config.delivery),
    ));
    ChannelWorker::new(channel, handler, transport, dlq, &config.delivery)
}

/// 基于 Kafka 的支付消费者
///
/// 同时运行支付通道与死信通道两个消费循环，二者互不阻塞
pub struct PaymentConsumer {
    payments: (ChannelWorker, KafkaChannelReceiver),
    dead_letters: (ChannelWorker, KafkaChannelReceiver),
}

impl PaymentConsumer {
    pub fn connect(
        config: &AppConfig,
        confirmer: Arc<dyn EventHandler>,
    ) -> Result<Self, PaymentError> {
        let transport: Arc<dyn ChannelTransport> =
            Arc::new(KafkaChannelTransport::new(&config.kafka)?);

        let payments = (
            build_worker(config, &config.channels.payments, confirmer, transport.clone()),
            KafkaChannelReceiver::new(&config.kafka, "payments", &config.channels.payments)?,
        );
        let dead_letters = (
            build_worker(
                config,
                &config.channels.dead_letter,
                Arc::new(DeadLetterMonitor),
                transport,
            ),
            KafkaChannelReceiver::new(&config.kafka, "dead-letter", &config.channels.dead_letter)?,
        );

        Ok(Self {
            payments,
            dead_letters,
        })
    }

    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let (payment_worker, payment_rx) = self.payments;
        let (dlq_worker, dlq_rx) = self.dead_letters;

        let payments = tokio::spawn(payment_worker.run(payment_rx, shutdown.clone()));
        let dead_letters = tokio::spawn(dlq_worker.run(dlq_rx, shutdown));

        for (name, task) in [("payments", payments), ("dead-letter", dead_letters)] {
            if let Err(e) = task.await {
                error!(worker = name, error = %e, "消费循环异常退出");
            }
        }
        info!("支付消费者已停止");
    }
}
