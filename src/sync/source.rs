use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::video::time::{FrameRate, TimeBase, MICROSECONDS};
use crate::video::types::{Frame, StreamGeometry, StreamInfo};

/// Answer of a non-blocking poll on an upstream stream
#[derive(Debug, Clone)]
pub enum SourcePoll {
    /// The next frame, timestamped in the stream's declared time base
    Frame(Frame),
    /// Nothing queued right now; poll again on a later step
    Pending,
    /// The stream has permanently ended
    Ended,
}

/// Upstream collaborator feeding one input port
pub trait FrameSource: Send {
    /// Declared geometry and time base; must be stable before configuration
    fn info(&self) -> StreamInfo;

    /// Hand over the next frame without blocking
    fn poll_frame(&mut self) -> Result<SourcePoll>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn info(&self) -> StreamInfo {
        (**self).info()
    }

    fn poll_frame(&mut self) -> Result<SourcePoll> {
        (**self).poll_frame()
    }
}

impl<T: FrameSource + ?Sized> FrameSource for &mut T {
    fn info(&self) -> StreamInfo {
        (**self).info()
    }

    fn poll_frame(&mut self) -> Result<SourcePoll> {
        (**self).poll_frame()
    }
}

/// Push-to-pull adapter: producers send frames through a [`FrameSender`],
/// the synchronizer polls them here.
///
/// The stream ends once every sender has been finished or dropped and the
/// queued frames have been delivered.
#[derive(Debug)]
pub struct QueueSource {
    info: StreamInfo,
    receiver: Receiver<Frame>,
}

/// Producer side of a [`QueueSource`]
#[derive(Debug, Clone)]
pub struct FrameSender {
    sender: Sender<Frame>,
}

impl QueueSource {
    pub fn new(info: StreamInfo) -> (Self, FrameSender) {
        let (sender, receiver) = channel::unbounded();
        (Self { info, receiver }, FrameSender { sender })
    }
}

impl FrameSender {
    /// Queue a frame. Returns `false` if the source is gone.
    pub fn send(&self, frame: Frame) -> bool {
        self.sender.send(frame).is_ok()
    }

    /// Signal the end of the stream from this producer
    pub fn finish(self) {
        drop(self.sender);
    }
}

impl FrameSource for QueueSource {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn poll_frame(&mut self) -> Result<SourcePoll> {
        match self.receiver.try_recv() {
            Ok(frame) => Ok(SourcePoll::Frame(frame)),
            Err(TryRecvError::Empty) => Ok(SourcePoll::Pending),
            Err(TryRecvError::Disconnected) => Ok(SourcePoll::Ended),
        }
    }
}

/// Test-pattern stream: solid NV12 frames at a fixed rate.
///
/// Each frame gets a slightly different luma so outputs can be told apart.
/// With a non-zero `gap_probability` some polls report `Pending` and some
/// frame slots are skipped entirely, imitating a jittery live source.
pub struct SyntheticSource {
    info: StreamInfo,
    color: [u8; 3],
    total_frames: u64,
    next_index: u64,
    gap_probability: f64,
    rng: SmallRng,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, frame_rate: FrameRate, total_frames: u64) -> Self {
        let time_base = TimeBase::from_frame_rate(frame_rate).unwrap_or(MICROSECONDS);
        let info = StreamInfo::new(StreamGeometry::nv12(width, height), time_base)
            .with_frame_rate(frame_rate);
        Self {
            info,
            color: [128, 128, 128],
            total_frames,
            next_index: 0,
            gap_probability: 0.0,
            rng: SmallRng::seed_from_u64(0),
        }
    }

    /// Base YUV colour of the pattern
    pub fn with_color(mut self, yuv: [u8; 3]) -> Self {
        self.color = yuv;
        self
    }

    /// Randomly stall or skip frames, seeded for reproducible runs
    pub fn with_gaps(mut self, probability: f64, seed: u64) -> Self {
        self.gap_probability = probability.clamp(0.0, 0.9);
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    fn roll_gap(&mut self) -> bool {
        self.gap_probability > 0.0 && self.rng.gen_bool(self.gap_probability)
    }
}

impl FrameSource for SyntheticSource {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn poll_frame(&mut self) -> Result<SourcePoll> {
        if self.next_index >= self.total_frames {
            return Ok(SourcePoll::Ended);
        }
        if self.roll_gap() {
            return Ok(SourcePoll::Pending);
        }
        // Skipped slot: the timestamp jumps, the frame never existed
        if self.roll_gap() && self.next_index + 1 < self.total_frames {
            self.next_index += 1;
        }

        let index = self.next_index;
        self.next_index += 1;

        let luma = self.color[0].wrapping_add((index % 32) as u8);
        let geometry = self.info.geometry;
        let frame = Frame::new_filled(
            geometry.width,
            geometry.height,
            [luma, self.color[1], self.color[2]],
            Some(index as i64),
        );
        Ok(SourcePoll::Frame(frame))
    }
}
