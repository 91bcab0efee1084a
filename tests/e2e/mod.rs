//! 订单流水线端到端测试
//!
//! 在单进程内装配完整的编排链路：订单创建 -> 事件路由 -> 内存通道 ->
//! 风险分析与支付确认消费循环 -> 内存订单存储，验证：
//! - 订单生命周期全流程
//! - 风险分级与告警
//! - 重复投递下的幂等性
//! - 风险写入与状态写入并发
//! - 重投耗尽后进入死信通道

pub mod helpers;
pub mod setup;
pub mod suites;

pub use setup::TestPipeline;
