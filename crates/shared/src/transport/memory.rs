//! 进程内通道传输
//!
//! 每个通道对应一条无界 mpsc 队列。用于本地运行与端到端测试。

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use super::{ChannelReceiver, ChannelTransport, Delivery};
use crate::error::{Result, TicketError};

struct ChannelSlot {
    sender: mpsc::UnboundedSender<Delivery>,
    receiver: Option<mpsc::UnboundedReceiver<Delivery>>,
}

impl ChannelSlot {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Some(receiver),
        }
    }
}

/// 进程内通道集合
///
/// 通道在首次写入或首次获取读取端时创建，读取端只能被取走一次
#[derive(Default)]
pub struct InMemoryTransport {
    channels: DashMap<String, ChannelSlot>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取走指定通道的读取端，已被取走时返回 None
    pub fn receiver(&self, channel: &str) -> Option<InMemoryReceiver> {
        let mut slot = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(ChannelSlot::new);

        slot.receiver.take().map(|rx| InMemoryReceiver {
            channel: channel.to_string(),
            rx,
        })
    }
}

#[async_trait]
impl ChannelTransport for InMemoryTransport {
    async fn deliver(&self, channel: &str, delivery: &Delivery) -> Result<()> {
        let sender = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(ChannelSlot::new)
            .sender
            .clone();

        sender
            .send(delivery.clone())
            .map_err(|_| TicketError::ChannelDelivery {
                channel: channel.to_string(),
                reason: "通道读取端已关闭".to_string(),
            })?;

        debug!(
            channel,
            event_id = %delivery.envelope.event_id,
            attempt = delivery.attempt,
            "消息已写入进程内通道"
        );
        Ok(())
    }
}

/// 进程内通道读取端
pub struct InMemoryReceiver {
    channel: String,
    rx: mpsc::UnboundedReceiver<Delivery>,
}

#[async_trait]
impl ChannelReceiver for InMemoryReceiver {
    fn channel(&self) -> &str {
        &self.channel
    }

    async fn next_batch(&mut self, max: usize) -> Result<Option<Vec<Delivery>>> {
        let Some(first) = self.rx.recv().await else {
            return Ok(None);
        };

        let mut batch = vec![first];
        while batch.len() < max.max(1) {
            match self.rx.try_recv() {
                Ok(delivery) => batch.push(delivery),
                Err(_) => break,
            }
        }
        Ok(Some(batch))
    }

    async fn commit(&mut self, _batch: &[Delivery]) -> Result<()> {
        Ok(())
    }
}
