//! # Frame Synchronization
//!
//! Aligns independently clocked input streams into tuples of simultaneous
//! frames. The [`FrameSync`] pulls from [`FrameSource`]s without blocking and
//! hands each completed tuple to the composition session.
//!
//! ## Policies
//!
//! - Before its first frame every stream blocks output.
//! - After its last frame a stream either ends the whole run (`shortest`, and
//!   always for the primary stream) or keeps contributing its last frame.

pub mod framesync;
pub mod source;

pub use framesync::{CursorState, Extrapolation, FrameSync, StreamCursor, SyncRole, SyncStatus};
pub use source::{FrameSender, FrameSource, QueueSource, SourcePoll, SyntheticSource};
