//! # Composition Session
//!
//! Owns the accelerator context for the lifetime of a configured filter and
//! turns one frame per input into one composited output frame.

pub mod session;

// Re-exports for convenience
pub use session::{CompositionSession, SessionStats, Submission};
