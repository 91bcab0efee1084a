//! 测试环境装配

mod pipeline;

pub use pipeline::TestPipeline;
