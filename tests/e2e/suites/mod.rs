//! 测试套件模块

pub mod classification;
pub mod concurrency;
pub mod dead_letter;
pub mod order_lifecycle;
