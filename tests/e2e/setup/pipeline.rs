//! 内存版订单流水线
//!
//! 与各服务 main 中的装配方式一致，只把 Kafka 换成内存通道、Postgres 换成内存存储。
//! 死信通道不启动监控，由测试直接读取。

use std::sync::Arc;
use std::time::Duration;

use alert_dispatcher::AlertDispatcher;
use booking_service::service::BookingService;
use payment_service::confirmer::PaymentConfirmer;
use risk_analysis_service::classifier::RiskClassifier;
use risk_analysis_service::scoring::RiskScorer;
use ticket_shared::config::{AppConfig, DeliveryConfig};
use ticket_shared::dlq::DeadLetterMessage;
use ticket_shared::order::Order;
use ticket_shared::retry::RetryPolicy;
use ticket_shared::router::{EventRouter, default_rules};
use ticket_shared::store::{InMemoryOrderStore, OrderStore};
use ticket_shared::transport::{ChannelReceiver, InMemoryReceiver, InMemoryTransport};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::helpers::RecordingNotifier;

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(5);

pub struct TestPipeline {
    pub config: AppConfig,
    pub store: Arc<InMemoryOrderStore>,
    pub transport: Arc<InMemoryTransport>,
    pub booking: Arc<BookingService>,
    pub notifier: Arc<RecordingNotifier>,
    dead_letters: InMemoryReceiver,
    shutdown: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl TestPipeline {
    /// 退避时间缩短到毫秒级，其余与默认配置一致
    pub fn test_config() -> AppConfig {
        AppConfig {
            delivery: DeliveryConfig {
                batch_size: 8,
                max_concurrency: 8,
                max_attempts: 3,
                initial_backoff_ms: 1,
                max_backoff_ms: 10,
            },
            ..AppConfig::default()
        }
    }

    pub async fn start(scorer: Arc<dyn RiskScorer>) -> Self {
        let config = Self::test_config();
        let store = Arc::new(InMemoryOrderStore::new());
        let transport = Arc::new(InMemoryTransport::new());
        let notifier = Arc::new(RecordingNotifier::default());

        let risk_rx = transport.receiver(&config.channels.risk_analysis).unwrap();
        let payment_rx = transport.receiver(&config.channels.payments).unwrap();
        let dead_letters = transport.receiver(&config.channels.dead_letter).unwrap();

        let router = Arc::new(EventRouter::new(
            default_rules(&config.channels),
            transport.clone(),
            RetryPolicy::from_delivery(&config.delivery),
        ));
        let booking = Arc::new(BookingService::new(store.clone(), router));

        let alerts = Arc::new(AlertDispatcher::new(
            notifier.clone(),
            config.alert.operator_address.clone(),
        ));
        let classifier = Arc::new(RiskClassifier::new(store.clone(), scorer, alerts));
        let confirmer = Arc::new(PaymentConfirmer::new(store.clone()));

        let risk_worker = risk_analysis_service::consumer::build_worker(
            &config,
            classifier,
            transport.clone(),
        );
        let payment_worker = payment_service::consumer::build_worker(
            &config,
            &config.channels.payments,
            confirmer,
            transport.clone(),
        );

        let (shutdown, shutdown_rx) = watch::channel(false);
        let workers = vec![
            tokio::spawn(risk_worker.run(risk_rx, shutdown_rx.clone())),
            tokio::spawn(payment_worker.run(payment_rx, shutdown_rx)),
        ];

        Self {
            config,
            store,
            transport,
            booking,
            notifier,
            dead_letters,
            shutdown,
            workers,
        }
    }

    /// 轮询订单直到满足条件
    pub async fn wait_for_order(
        &self,
        order_id: &str,
        what: &str,
        predicate: impl Fn(&Order) -> bool,
    ) -> Order {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        loop {
            if let Some(order) = self.store.get(order_id).await.unwrap() {
                if predicate(&order) {
                    return order;
                }
            }
            assert!(Instant::now() < deadline, "等待订单 {order_id} 超时: {what}");
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// 等待风险字段组写入
    pub async fn wait_for_risk(&self, order_id: &str) -> Order {
        self.wait_for_order(order_id, "风险字段写入", |o| o.risk_assessment().is_some())
            .await
    }

    /// 等待指定订单的告警数量达到 expected
    pub async fn wait_for_alerts(&self, order_id: &str, expected: usize) {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while self.notifier.sent_for(order_id).len() < expected {
            assert!(Instant::now() < deadline, "等待订单 {order_id} 的告警超时");
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// 读取下一条死信
    pub async fn next_dead_letter(&mut self) -> DeadLetterMessage {
        let batch = tokio::time::timeout(WAIT_TIMEOUT, self.dead_letters.next_batch(1))
            .await
            .expect("等待死信超时")
            .unwrap()
            .unwrap();
        batch[0].envelope.decode_detail().unwrap()
    }

    /// 让在途的处理完成
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    pub async fn stop(self) {
        self.shutdown.send(true).unwrap();
        for worker in self.workers {
            tokio::time::timeout(WAIT_TIMEOUT, worker)
                .await
                .expect("消费循环未能按时退出")
                .unwrap();
        }
    }
}
