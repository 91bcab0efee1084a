//! 共享库
//!
//! 包含所有服务共用的配置、错误处理、订单模型与存储、事件路由、
//! 通道投递、死信队列、Kafka 与可观测性等基础设施代码。

pub mod config;
pub mod database;
pub mod delivery;
pub mod dlq;
pub mod error;
pub mod events;
pub mod kafka;
pub mod observability;
pub mod order;
pub mod retry;
pub mod router;
pub mod shutdown;
pub mod store;
pub mod transport;
