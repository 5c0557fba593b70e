//! # Stack Filters
//!
//! The `hstack_accel` and `vstack_accel` filters: input ports, output
//! negotiation, stepping and teardown around the synchronizer and the
//! composition session.

pub mod sink;
pub mod stack;
pub mod variant;

// Re-exports for convenience
pub use sink::{CollectSink, FrameSink};
pub use stack::{FilterState, FilterStats, InputPort, OutputCanvas, StackFilter, StepStatus};
pub use variant::StackVariant;
