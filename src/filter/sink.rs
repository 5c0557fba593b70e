use crate::error::Result;
use crate::video::types::Frame;

/// Downstream consumer of composited frames
pub trait FrameSink {
    /// Accept one output frame; its timestamp is in the output time base
    fn push_frame(&mut self, frame: Frame) -> Result<()>;
}

impl<T: FrameSink + ?Sized> FrameSink for &mut T {
    fn push_frame(&mut self, frame: Frame) -> Result<()> {
        (**self).push_frame(frame)
    }
}

/// Sink that keeps every frame it receives
#[derive(Debug, Default)]
pub struct CollectSink {
    frames: Vec<Frame>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Timestamps of the collected frames in arrival order
    pub fn timestamps(&self) -> Vec<Option<i64>> {
        self.frames.iter().map(Frame::pts).collect()
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

impl FrameSink for CollectSink {
    fn push_frame(&mut self, frame: Frame) -> Result<()> {
        self.frames.push(frame);
        Ok(())
    }
}
