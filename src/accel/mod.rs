//! # Accelerator Interface
//!
//! The compositing device is an external collaborator. Everything the core
//! needs from it is captured by the [`Accelerator`] trait: create a context
//! sized for a fixed layout, composite one tuple of frames, destroy the
//! context.
//!
//! The configuration handed to the device is the typed [`CompositeParams`]
//! value rather than a vendor extension buffer.
//!
//! ## Backends
//!
//! - [`SoftwareAccelerator`] - CPU reference implementation over NV12 planes

use std::time::Duration;

use crate::error::{HardwareError, ResourceError};
use crate::layout::{LayoutPlan, LayoutRect};
use crate::video::types::{Frame, PixelFormat, SurfaceKind};

pub mod cpu;

#[cfg(test)]
pub(crate) mod mock;

pub use cpu::SoftwareAccelerator;

/// Handle to a context created by an accelerator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextHandle(pub u64);

/// Format of the single composited output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputFormat {
    pub width: u32,
    pub height: u32,
    /// Pixel layout of the output when downloaded to system memory
    pub sw_format: PixelFormat,
    pub surface: SurfaceKind,
}

/// Everything an accelerator needs to build a compositing context
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeParams {
    pub num_inputs: usize,
    pub layout: Vec<LayoutRect>,
    pub output: OutputFormat,
}

impl CompositeParams {
    /// Parameters for compositing `plan` into an NV12 canvas on `surface`
    pub fn from_plan(plan: &LayoutPlan, surface: SurfaceKind) -> Self {
        Self {
            num_inputs: plan.rects.len(),
            layout: plan.rects.clone(),
            output: OutputFormat {
                width: plan.canvas_width,
                height: plan.canvas_height,
                sw_format: PixelFormat::Nv12,
                surface,
            },
        }
    }
}

/// Fixed-function compositing device.
///
/// Implementations own their device state; the composition session is the
/// only caller and never calls concurrently.
pub trait Accelerator: Send {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Create a context compositing `params.num_inputs` inputs into one output
    fn create_context(&mut self, params: &CompositeParams) -> Result<ContextHandle, ResourceError>;

    /// Composite one frame per input, in input order, waiting at most `timeout`.
    ///
    /// The returned frame carries no meaningful timestamp.
    fn submit_composite(
        &mut self,
        context: ContextHandle,
        inputs: Vec<Frame>,
        timeout: Duration,
    ) -> Result<Frame, HardwareError>;

    /// Release a context. Unknown or already destroyed handles are ignored.
    fn destroy_context(&mut self, context: ContextHandle);
}
