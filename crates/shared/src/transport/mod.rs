//! 通道传输抽象
//!
//! 路由器把事件写入命名通道，消费服务从各自的通道批量拉取。
//! 通道提供至少一次投递语义：处理完成后再提交，中途崩溃的批次会被重新投递。

mod memory;

pub use memory::{InMemoryReceiver, InMemoryTransport};

use async_trait::async_trait;

use crate::error::Result;
use crate::events::EventEnvelope;

/// 消息在底层传输中的位置，提交时使用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub partition: i32,
    pub offset: i64,
}

/// 一次通道投递
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub envelope: EventEnvelope,
    /// 第几次处理，首次为 1
    pub attempt: u32,
    pub receipt: Option<Receipt>,
}

impl Delivery {
    /// 首次投递
    pub fn first(envelope: EventEnvelope) -> Self {
        Self {
            envelope,
            attempt: 1,
            receipt: None,
        }
    }

    /// 构造下一次重投
    pub fn redelivery(&self) -> Self {
        Self {
            envelope: self.envelope.clone(),
            attempt: self.attempt.saturating_add(1),
            receipt: None,
        }
    }

    /// 用于日志与死信记录的订单 ID
    pub fn order_id(&self) -> Option<&str> {
        self.envelope.order_id()
    }
}

/// 通道写入端
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    async fn deliver(&self, channel: &str, delivery: &Delivery) -> Result<()>;
}

/// 通道读取端
///
/// 由单个工作循环独占持有
#[async_trait]
pub trait ChannelReceiver: Send {
    fn channel(&self) -> &str;

    /// 拉取下一批消息，至少等到一条；通道关闭时返回 None
    async fn next_batch(&mut self, max: usize) -> Result<Option<Vec<Delivery>>>;

    /// 整批处理完成后提交
    async fn commit(&mut self, batch: &[Delivery]) -> Result<()>;
}
