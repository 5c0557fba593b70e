//! # Video Types
//!
//! Frame handles, stream declarations and rational time bases shared by the
//! synchronizer, the layout planner and the accelerators.

pub mod time;
pub mod types;

pub use time::{FrameRate, TimeBase};
pub use types::{
    DeviceId, Frame, Nv12Planes, PixelFormat, StreamGeometry, StreamInfo, SurfaceId, SurfaceKind,
};
