//! Kafka 通道传输
//!
//! 每个通道对应一个同名 topic。事件信封以 JSON 写入消息体，
//! 处理次数写入 `x-delivery-attempt` 消息头，消息 key 为订单 ID（缺失时为事件 ID）。
//! 消费端关闭自动存储位点，整批处理完成后才存储并提交。

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Header, Headers, Message, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::{Offset, TopicPartitionList};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::config::KafkaConfig;
use crate::error::{Result, TicketError};
use crate::events::EventEnvelope;
use crate::transport::{ChannelReceiver, ChannelTransport, Delivery, Receipt};

/// 处理次数消息头
pub const ATTEMPT_HEADER: &str = "x-delivery-attempt";

/// 拉取批次时等待后续消息的最长时间
const BATCH_LINGER: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// ConsumerMessage
// ---------------------------------------------------------------------------

/// 消费到的 Kafka 消息的统一表示
///
/// 将 rdkafka 的 `BorrowedMessage`（带生命周期约束）转换为拥有所有权的结构体，
/// 使消息可以安全地跨 await 点传递。
#[derive(Debug, Clone)]
pub struct ConsumerMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub headers: HashMap<String, String>,
}

impl ConsumerMessage {
    fn from_borrowed(msg: &BorrowedMessage<'_>) -> Self {
        let key = msg
            .key()
            .and_then(|k| std::str::from_utf8(k).ok())
            .map(String::from);

        let payload = msg.payload().map(|p| p.to_vec()).unwrap_or_default();

        let mut headers = HashMap::new();
        if let Some(h) = msg.headers() {
            for idx in 0..h.count() {
                let header = h.get(idx);
                if let Some(raw) = header.value
                    && let Ok(value) = std::str::from_utf8(raw)
                {
                    headers.insert(header.key.to_string(), value.to_string());
                }
            }
        }

        Self {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            key,
            payload,
            headers,
        }
    }

    /// 将 JSON 格式负载反序列化为目标类型
    pub fn deserialize_payload<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| TicketError::InvalidEvent(format!("负载反序列化失败: {e}")))
    }

    /// 消息头中的处理次数，缺失或无法解析时视为首次
    pub fn attempt(&self) -> u32 {
        self.headers
            .get(ATTEMPT_HEADER)
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(1)
    }

    pub fn receipt(&self) -> Receipt {
        Receipt {
            partition: self.partition,
            offset: self.offset,
        }
    }

    /// 转换为通道投递
    pub fn into_delivery(self) -> Result<Delivery> {
        let envelope: EventEnvelope = self.deserialize_payload()?;
        Ok(Delivery {
            envelope,
            attempt: self.attempt(),
            receipt: Some(self.receipt()),
        })
    }
}

// ---------------------------------------------------------------------------
// KafkaChannelTransport
// ---------------------------------------------------------------------------

/// 基于 Kafka 的通道写入端
///
/// `FutureProducer` 内部是 Arc 包装的，可以廉价克隆
#[derive(Clone)]
pub struct KafkaChannelTransport {
    producer: FutureProducer,
}

impl KafkaChannelTransport {
    /// 根据配置创建生产者
    ///
    /// 5 秒内仍无法投递即返回错误，由调用方重试或转入死信队列
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| TicketError::Kafka(format!("创建生产者失败: {e}")))?;

        info!(brokers = %config.brokers, "Kafka 生产者已初始化");
        Ok(Self { producer })
    }
}

#[async_trait]
impl ChannelTransport for KafkaChannelTransport {
    async fn deliver(&self, channel: &str, delivery: &Delivery) -> Result<()> {
        let payload = serde_json::to_vec(&delivery.envelope)
            .map_err(|e| TicketError::InvalidEvent(format!("事件序列化失败: {e}")))?;
        let key = delivery
            .order_id()
            .unwrap_or(delivery.envelope.event_id.as_str());
        let attempt = delivery.attempt.to_string();
        let headers = OwnedHeaders::new().insert(Header {
            key: ATTEMPT_HEADER,
            value: Some(attempt.as_str()),
        });

        let record = FutureRecord::to(channel)
            .key(key)
            .payload(payload.as_slice())
            .headers(headers);

        let sent = self
            .producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(e, _)| TicketError::ChannelDelivery {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        debug!(
            channel,
            key,
            attempt = delivery.attempt,
            partition = sent.partition,
            offset = sent.offset,
            "消息已发送"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// KafkaChannelReceiver
// ---------------------------------------------------------------------------

/// 基于 Kafka 的通道读取端
pub struct KafkaChannelReceiver {
    consumer: StreamConsumer,
    channel: String,
    /// 无法解析而被跳过的消息，随下一次提交一起存储位点
    skipped: Vec<Receipt>,
}

impl KafkaChannelReceiver {
    /// 创建消费者并订阅通道对应的 topic
    ///
    /// 消费组为 `{consumer_group}.{group_suffix}`，同一服务内不同通道互不干扰
    pub fn new(config: &KafkaConfig, group_suffix: &str, channel: &str) -> Result<Self> {
        let group_id = format!("{}.{}", config.consumer_group, group_suffix);

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &group_id)
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("enable.auto.commit", "true")
            .set("enable.auto.offset.store", "false")
            .create()
            .map_err(|e| TicketError::Kafka(format!("创建消费者失败: {e}")))?;

        consumer
            .subscribe(&[channel])
            .map_err(|e| TicketError::Kafka(format!("订阅 topic 失败: {e}")))?;

        info!(brokers = %config.brokers, group_id, channel, "Kafka 消费者已订阅通道");
        Ok(Self {
            consumer,
            channel: channel.to_string(),
            skipped: Vec::new(),
        })
    }

    fn accept(&mut self, message: ConsumerMessage, batch: &mut Vec<Delivery>) {
        let receipt = message.receipt();
        match message.into_delivery() {
            Ok(delivery) => batch.push(delivery),
            Err(e) => {
                error!(
                    channel = %self.channel,
                    partition = receipt.partition,
                    offset = receipt.offset,
                    error = %e,
                    "无法解析的消息，已跳过"
                );
                self.skipped.push(receipt);
            }
        }
    }
}

#[async_trait]
impl ChannelReceiver for KafkaChannelReceiver {
    fn channel(&self) -> &str {
        &self.channel
    }

    async fn next_batch(&mut self, max: usize) -> Result<Option<Vec<Delivery>>> {
        let first = match self.consumer.recv().await {
            Ok(msg) => ConsumerMessage::from_borrowed(&msg),
            Err(e) => return Err(TicketError::Kafka(format!("接收消息出错: {e}"))),
        };

        let mut batch = Vec::with_capacity(max);
        self.accept(first, &mut batch);

        while batch.len() + self.skipped.len() < max.max(1) {
            let next = match tokio::time::timeout(BATCH_LINGER, self.consumer.recv()).await {
                Ok(Ok(msg)) => ConsumerMessage::from_borrowed(&msg),
                Ok(Err(e)) => {
                    warn!(channel = %self.channel, error = %e, "接收消息出错，提前结束本批次");
                    break;
                }
                Err(_) => break,
            };
            self.accept(next, &mut batch);
        }

        Ok(Some(batch))
    }

    async fn commit(&mut self, batch: &[Delivery]) -> Result<()> {
        let mut next_offsets: HashMap<i32, i64> = HashMap::new();
        let receipts = batch
            .iter()
            .filter_map(|d| d.receipt)
            .chain(self.skipped.iter().copied());
        for receipt in receipts {
            let next = next_offsets.entry(receipt.partition).or_insert(0);
            *next = (*next).max(receipt.offset + 1);
        }

        if next_offsets.is_empty() {
            return Ok(());
        }

        let mut tpl = TopicPartitionList::new();
        for (partition, offset) in &next_offsets {
            tpl.add_partition_offset(&self.channel, *partition, Offset::Offset(*offset))
                .map_err(|e| TicketError::Kafka(format!("构建提交位点失败: {e}")))?;
        }
        self.consumer
            .store_offsets(&tpl)
            .map_err(|e| TicketError::Kafka(format!("存储消费位点失败: {e}")))?;

        self.skipped.clear();
        debug!(channel = %self.channel, ?next_offsets, "消费位点已存储");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
