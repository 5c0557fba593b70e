//! # Stack-Compositor
//!
//! Side-by-side (`hstack_accel`) and top-to-bottom (`vstack_accel`) video
//! stacking, with the pixel work offloaded to a compositing accelerator.
//!
//! The interesting part is not the blit but the timing: N independently
//! clocked inputs, each with its own time base, gaps and end, are aligned
//! into tuples of simultaneous frames, and every tuple becomes exactly one
//! output frame with a timestamp rebased from the tuple time.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stack_compositor::{
//!     accel::SoftwareAccelerator,
//!     config::StackConfig,
//!     filter::{CollectSink, StackFilter, StackVariant, StepStatus},
//!     sync::SyntheticSource,
//!     video::FrameRate,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut filter = StackFilter::open(
//!     StackConfig::default(),
//!     StackVariant::Horizontal,
//!     Box::new(SoftwareAccelerator::new()),
//! )?;
//! filter.attach_input(0, Box::new(SyntheticSource::new(320, 240, FrameRate::FPS_25, 50)))?;
//! filter.attach_input(1, Box::new(SyntheticSource::new(160, 240, FrameRate::FPS_25, 50)))?;
//! let canvas = filter.configure_output()?;
//! assert_eq!(canvas.width, 480);
//!
//! let mut sink = CollectSink::new();
//! while filter.step(&mut sink)? != StepStatus::Drained {}
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`layout`] - placement rectangles and output canvas size
//! - [`sync`] - stream cursors and tuple selection
//! - [`composition`] - the accelerator context and its single open job
//! - [`accel`] - accelerator trait and the CPU reference backend
//! - [`filter`] - lifecycle controller tying everything together
//! - [`video`] - frames, stream declarations and time bases
//! - [`config`] - filter options
//!
//! ## Custom Accelerators
//!
//! Hardware backends implement the [`Accelerator`](accel::Accelerator) trait:
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use stack_compositor::accel::{Accelerator, CompositeParams, ContextHandle};
//! use stack_compositor::error::{HardwareError, ResourceError};
//! use stack_compositor::video::Frame;
//!
//! struct MyDevice;
//!
//! impl Accelerator for MyDevice {
//!     fn name(&self) -> &str {
//!         "my_device"
//!     }
//!
//!     fn create_context(&mut self, params: &CompositeParams) -> Result<ContextHandle, ResourceError> {
//!         Err(ResourceError::InitFailed { reason: format!("{} inputs", params.num_inputs) })
//!     }
//!
//!     fn submit_composite(
//!         &mut self,
//!         _context: ContextHandle,
//!         _inputs: Vec<Frame>,
//!         _timeout: Duration,
//!     ) -> Result<Frame, HardwareError> {
//!         Err(HardwareError::NoContext)
//!     }
//!
//!     fn destroy_context(&mut self, _context: ContextHandle) {}
//! }
//! ```

pub mod accel;
pub mod composition;
pub mod config;
pub mod error;
pub mod filter;
pub mod layout;
pub mod sync;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    accel::{Accelerator, SoftwareAccelerator},
    config::StackConfig,
    error::{Result, StackError},
    filter::{StackFilter, StackVariant, StepStatus},
};
