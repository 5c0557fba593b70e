//! # Layout Planning
//!
//! Computes the destination rectangle of every input inside the stacked
//! output canvas, once per configuration.

pub mod planner;

pub use planner::{plan, LayoutPlan, LayoutRect, Orientation};
