//! 测试替身

mod notifier;
mod scorer;

pub use notifier::RecordingNotifier;
pub use scorer::ScriptedScorer;
