//! 风险分析服务
//!
//! 消费风险分析通道中的 OrderCreated 事件，调用评分能力得到风险等级，
//! 按金额阈值策略校正后整组写入订单的风险字段；等级为 HIGH 时触发一次告警。

pub mod classifier;
pub mod consumer;
pub mod decode;
pub mod error;
pub mod policy;
pub mod scoring;

/// 服务名，用于配置加载、日志与死信来源
pub const SERVICE_NAME: &str = "risk-analysis-service";
