//! 支付确认服务
//!
//! 消费支付通道中的 PaymentSucceeded 事件，将订单状态条件迁移为 PAID；
//! 同时监控死信通道，记录耗尽重投的消息。

pub mod confirmer;
pub mod consumer;
pub mod error;

/// 服务名，用于配置加载、日志与死信来源
pub const SERVICE_NAME: &str = "payment-service";
