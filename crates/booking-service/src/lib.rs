//! 订单创建服务
//!
//! 对外提供 HTTP 接口：创建订单、模拟支付成功回调、查询订单。
//! 订单先写入存储，写入成功后再发布 OrderCreated 事件。

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod service;
pub mod state;

/// 服务名，用于配置加载与日志
pub const SERVICE_NAME: &str = "booking-service";
