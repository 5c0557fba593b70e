use tracing::{debug, info};

use crate::composition::{CompositionSession, Submission};
use crate::error::{Result, StackError};
use crate::sync::source::{FrameSource, SourcePoll};
use crate::video::time::TimeBase;
use crate::video::types::{Frame, StreamInfo};

/// What a stream contributes outside the range of frames it delivered
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extrapolation {
    /// Missing frames block the cycle; the end of the stream ends everything
    Stop,
    /// Reuse the nearest frame indefinitely
    Infinity,
}

/// Whether a stream's frames drive output cycles
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncRole {
    /// Every new frame of the primary stream opens a cycle
    Primary,
    Secondary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorState {
    /// No frame delivered yet
    Bof,
    Run,
    /// Ended; the last frame is held
    Eof,
}

#[derive(Debug)]
enum Pending {
    Frame { frame: Frame, pts: i64 },
    End,
}

/// Read position of one input stream
#[derive(Debug)]
pub struct StreamCursor {
    index: usize,
    time_base: TimeBase,
    before: Extrapolation,
    after: Extrapolation,
    role: SyncRole,
    state: CursorState,
    current: Option<Frame>,
    current_pts: Option<i64>,
    last_pts: Option<i64>,
    pending: Option<Pending>,
}

impl StreamCursor {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn before(&self) -> Extrapolation {
        self.before
    }

    pub fn after(&self) -> Extrapolation {
        self.after
    }

    pub fn role(&self) -> SyncRole {
        self.role
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Timestamp of the frame the stream currently contributes, in the
    /// synchronizer's time base
    pub fn current_pts(&self) -> Option<i64> {
        self.current_pts
    }

    fn pending_pts(&self) -> Option<i64> {
        match &self.pending {
            Some(Pending::Frame { pts, .. }) => Some(*pts),
            _ => None,
        }
    }

    fn inject(&mut self, frame: Frame, common: TimeBase) -> Result<()> {
        let raw = frame.pts().ok_or_else(|| {
            StackError::invalid_argument(format!("input {} delivered a frame without timestamp", self.index))
        })?;
        let pts = self.time_base.rescale(raw, common);
        if let Some(last) = self.last_pts {
            if pts < last {
                return Err(StackError::invalid_argument(format!(
                    "input {} timestamp went backwards: {} after {}",
                    self.index, pts, last
                )));
            }
        }
        self.last_pts = Some(pts);
        self.pending = Some(Pending::Frame { frame, pts });
        Ok(())
    }

    fn advance(&mut self) {
        if let Some(Pending::Frame { frame, pts }) = self.pending.take() {
            self.current = Some(frame);
            self.current_pts = Some(pts);
            self.state = CursorState::Run;
        }
    }
}

/// Result of one synchronizer step
#[derive(Debug)]
pub enum SyncStatus {
    /// Some input has nothing queued; try again later
    NotReady,
    /// A blocking input ended; no further cycles will ever be produced
    Drained,
    /// A cycle completed; `pts` is the tuple time in the synchronizer's time base
    Composited { frame: Frame, pts: i64 },
}

/// Aligns N input streams into tuples of simultaneous frames.
///
/// Each stream holds at most one pending frame. A step tops the pending
/// entries up from the sources, moves the streams whose pending frame is
/// earliest forward, and fires a cycle whenever the primary stream moved.
/// The tuple offered to the composition session is the current frame of
/// every stream.
#[derive(Debug)]
pub struct FrameSync {
    cursors: Vec<StreamCursor>,
    time_base: TimeBase,
    pts: Option<i64>,
    drained: bool,
    cycles: u64,
}

impl FrameSync {
    /// Set up one cursor per stream.
    ///
    /// Every stream blocks before its first frame. After its last frame a
    /// stream blocks if `shortest` is set and is extended indefinitely
    /// otherwise; the primary stream (index 0) always blocks.
    pub fn configure(streams: &[StreamInfo], shortest: bool) -> Result<Self> {
        if streams.is_empty() {
            return Err(StackError::invalid_argument("frame sync needs at least one stream"));
        }

        let bases: Vec<TimeBase> = streams.iter().map(|s| s.time_base).collect();
        let time_base = TimeBase::common(&bases);

        let cursors = streams
            .iter()
            .enumerate()
            .map(|(index, stream)| {
                let role = if index == 0 { SyncRole::Primary } else { SyncRole::Secondary };
                let after = if shortest || role == SyncRole::Primary {
                    Extrapolation::Stop
                } else {
                    Extrapolation::Infinity
                };
                StreamCursor {
                    index,
                    time_base: stream.time_base,
                    before: Extrapolation::Stop,
                    after,
                    role,
                    state: CursorState::Bof,
                    current: None,
                    current_pts: None,
                    last_pts: None,
                    pending: None,
                }
            })
            .collect();

        info!(
            "Frame sync configured: {} streams, time base {}, shortest={}",
            streams.len(),
            time_base,
            shortest
        );

        Ok(Self {
            cursors,
            time_base,
            pts: None,
            drained: false,
            cycles: 0,
        })
    }

    /// Time base of tuple timestamps
    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    /// Timestamp of the most recent tuple
    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    pub fn is_drained(&self) -> bool {
        self.drained
    }

    /// Number of completed cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn cursors(&self) -> &[StreamCursor] {
        &self.cursors
    }

    /// Try to complete one cycle.
    ///
    /// Never waits on a source: if any stream that still matters has no
    /// frame queued, the step returns [`SyncStatus::NotReady`].
    pub fn step<S: FrameSource>(
        &mut self,
        sources: &mut [S],
        session: &mut CompositionSession,
    ) -> Result<SyncStatus> {
        if self.drained {
            return Ok(SyncStatus::Drained);
        }
        if sources.len() != self.cursors.len() {
            return Err(StackError::invalid_argument(format!(
                "{} sources for {} synchronized streams",
                sources.len(),
                self.cursors.len()
            )));
        }

        loop {
            let missing = self.poll_sources(sources)?;

            if let Some(index) = self.process_ends() {
                self.drain(index);
                return Ok(SyncStatus::Drained);
            }
            if missing {
                return Ok(SyncStatus::NotReady);
            }

            let Some(pts) = self.cursors.iter().filter_map(StreamCursor::pending_pts).min() else {
                // Only held streams are left
                self.drain(0);
                return Ok(SyncStatus::Drained);
            };

            let mut primary_moved = false;
            for cursor in &mut self.cursors {
                if cursor.pending_pts() == Some(pts) {
                    cursor.advance();
                    primary_moved |= cursor.role == SyncRole::Primary;
                }
            }
            self.pts = Some(pts);

            let waiting = self
                .cursors
                .iter()
                .any(|c| c.state == CursorState::Bof && c.before == Extrapolation::Stop);
            if primary_moved && !waiting {
                return self.emit(pts, session);
            }
        }
    }

    /// Fill empty pending slots; true if a live stream had nothing to give
    fn poll_sources<S: FrameSource>(&mut self, sources: &mut [S]) -> Result<bool> {
        let mut missing = false;
        for (cursor, source) in self.cursors.iter_mut().zip(sources.iter_mut()) {
            if cursor.pending.is_some() || cursor.state == CursorState::Eof {
                continue;
            }
            match source.poll_frame()? {
                SourcePoll::Frame(frame) => cursor.inject(frame, self.time_base)?,
                SourcePoll::Ended => cursor.pending = Some(Pending::End),
                SourcePoll::Pending => missing = true,
            }
        }
        Ok(missing)
    }

    /// Apply end-of-stream markers; returns the stream that forces a drain
    fn process_ends(&mut self) -> Option<usize> {
        for cursor in &mut self.cursors {
            if !matches!(cursor.pending, Some(Pending::End)) {
                continue;
            }
            cursor.pending = None;
            if cursor.after == Extrapolation::Stop || cursor.current.is_none() {
                return Some(cursor.index);
            }
            cursor.state = CursorState::Eof;
            info!(
                "Input {} ended, holding its frame at {:.3}s",
                cursor.index,
                self.time_base.seconds(cursor.current_pts.unwrap_or(0))
            );
        }
        None
    }

    fn emit(&mut self, pts: i64, session: &mut CompositionSession) -> Result<SyncStatus> {
        let mut merged = None;
        for cursor in &self.cursors {
            let frame = cursor.current.clone().ok_or_else(|| {
                StackError::invalid_argument(format!("input {} has no frame for the cycle", cursor.index))
            })?;
            if let Submission::Composited(frame) = session.submit(cursor.index, frame)? {
                merged = Some(frame);
                break;
            }
        }

        match merged {
            Some(frame) => {
                self.cycles += 1;
                debug!("cycle {} at {:.3}s", self.cycles, self.time_base.seconds(pts));
                Ok(SyncStatus::Composited { frame, pts })
            }
            None => Ok(SyncStatus::NotReady),
        }
    }

    fn drain(&mut self, index: usize) {
        self.drained = true;
        for cursor in &mut self.cursors {
            cursor.pending = None;
            cursor.current = None;
        }
        info!("Frame sync drained by input {} after {} cycles", index, self.cycles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::accel::mock::{MockAccelerator, MockState};
    use crate::accel::CompositeParams;
    use crate::layout::{plan, Orientation};
    use crate::sync::source::{FrameSender, QueueSource};
    use crate::video::types::{StreamGeometry, SurfaceKind};

    struct Rig {
        sync: FrameSync,
        session: CompositionSession,
        sources: Vec<QueueSource>,
        senders: Vec<Option<FrameSender>>,
        state: Arc<Mutex<MockState>>,
    }

    impl Rig {
        fn new(time_bases: &[(u32, u32)], shortest: bool) -> Self {
            let infos: Vec<StreamInfo> = time_bases
                .iter()
                .map(|&(num, den)| {
                    StreamInfo::new(StreamGeometry::nv12(4, 4), TimeBase::new(num, den).unwrap())
                })
                .collect();
            let (sources, senders): (Vec<_>, Vec<_>) =
                infos.iter().map(|info| QueueSource::new(*info)).unzip();

            let geometries: Vec<_> = infos.iter().map(|i| i.geometry).collect();
            let plan = plan(&geometries, Orientation::Horizontal).unwrap();
            let (accel, state) = MockAccelerator::new();
            let mut session = CompositionSession::new(Box::new(accel), Duration::from_millis(50));
            session
                .init(CompositeParams::from_plan(&plan, SurfaceKind::Software))
                .unwrap();

            Self {
                sync: FrameSync::configure(&infos, shortest).unwrap(),
                session,
                sources,
                senders: senders.into_iter().map(Some).collect(),
                state,
            }
        }

        fn send(&self, index: usize, pts: &[i64]) {
            let sender = self.senders[index].as_ref().unwrap();
            for &p in pts {
                sender.send(Frame::new_filled(4, 4, [16, 128, 128], Some(p)));
            }
        }

        fn end(&mut self, index: usize) {
            if let Some(sender) = self.senders[index].take() {
                sender.finish();
            }
        }

        fn step(&mut self) -> SyncStatus {
            self.sync.step(&mut self.sources, &mut self.session).unwrap()
        }

        fn jobs(&self) -> Vec<Vec<Option<i64>>> {
            self.state.lock().unwrap().jobs.clone()
        }
    }

    fn composited_pts(status: SyncStatus) -> i64 {
        match status {
            SyncStatus::Composited { pts, frame } => {
                assert_eq!(frame.pts(), None);
                pts
            }
            other => panic!("expected a composited cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_policies_follow_shortest_flag() {
        let rig = Rig::new(&[(1, 25), (1, 25), (1, 25)], false);
        let cursors = rig.sync.cursors();
        assert_eq!(cursors[0].role(), SyncRole::Primary);
        assert_eq!(cursors[0].after(), Extrapolation::Stop);
        assert_eq!(cursors[1].after(), Extrapolation::Infinity);
        assert!(cursors.iter().all(|c| c.before() == Extrapolation::Stop));

        let rig = Rig::new(&[(1, 25), (1, 25)], true);
        assert!(rig.sync.cursors().iter().all(|c| c.after() == Extrapolation::Stop));
    }

    #[test]
    fn test_exhausted_secondary_is_held_until_primary_ends() {
        let mut rig = Rig::new(&[(1, 1), (1, 1)], false);
        rig.send(0, &[0, 1, 2]);
        rig.send(1, &[0, 1]);

        assert_eq!(composited_pts(rig.step()), 0);
        assert_eq!(composited_pts(rig.step()), 1);

        // Stream 1 has neither a frame nor an end: the cycle at 2 waits
        assert!(matches!(rig.step(), SyncStatus::NotReady));
        assert!(matches!(rig.step(), SyncStatus::NotReady));

        rig.end(1);
        assert_eq!(composited_pts(rig.step()), 2);
        assert_eq!(rig.sync.cursors()[1].state(), CursorState::Eof);
        assert_eq!(
            rig.jobs(),
            vec![
                vec![Some(0), Some(0)],
                vec![Some(1), Some(1)],
                vec![Some(2), Some(1)],
            ]
        );

        assert!(matches!(rig.step(), SyncStatus::NotReady));
        rig.end(0);
        assert!(matches!(rig.step(), SyncStatus::Drained));
        assert!(matches!(rig.step(), SyncStatus::Drained));
        assert_eq!(rig.sync.cycles(), 3);
    }

    #[test]
    fn test_shortest_drains_on_first_end() {
        let mut rig = Rig::new(&[(1, 1), (1, 1)], true);
        rig.send(0, &[0, 1, 2]);
        rig.send(1, &[0, 1]);
        rig.end(1);

        assert_eq!(composited_pts(rig.step()), 0);
        assert_eq!(composited_pts(rig.step()), 1);
        assert!(matches!(rig.step(), SyncStatus::Drained));
        assert!(rig.sync.is_drained());
        assert_eq!(rig.jobs().len(), 2);
    }

    #[test]
    fn test_primary_end_drains_even_when_others_continue() {
        let mut rig = Rig::new(&[(1, 1), (1, 1)], false);
        rig.send(0, &[0]);
        rig.send(1, &[0, 1, 2, 3]);
        rig.end(0);

        assert_eq!(composited_pts(rig.step()), 0);
        assert!(matches!(rig.step(), SyncStatus::Drained));
    }

    #[test]
    fn test_late_secondary_blocks_until_its_first_frame() {
        let mut rig = Rig::new(&[(1, 1), (1, 1)], false);
        rig.send(0, &[0, 1, 2, 3, 4]);
        rig.send(1, &[3, 4]);

        assert_eq!(composited_pts(rig.step()), 3);
        assert_eq!(composited_pts(rig.step()), 4);
        assert_eq!(rig.jobs(), vec![vec![Some(3), Some(3)], vec![Some(4), Some(4)]]);
    }

    #[test]
    fn test_secondary_contributes_latest_frame_not_after_tuple() {
        // Stream 1 runs twice as fast as the primary
        let mut rig = Rig::new(&[(1, 25), (1, 50)], false);
        rig.send(0, &[0, 1, 2]);
        rig.send(1, &[0, 1, 2, 3, 4]);

        assert_eq!(rig.sync.time_base(), TimeBase::new(1, 50).unwrap());
        assert_eq!(composited_pts(rig.step()), 0);
        assert_eq!(composited_pts(rig.step()), 2);
        assert_eq!(composited_pts(rig.step()), 4);
        assert_eq!(
            rig.jobs(),
            vec![
                vec![Some(0), Some(0)],
                vec![Some(1), Some(2)],
                vec![Some(2), Some(4)],
            ]
        );
    }

    #[test]
    fn test_stream_ending_before_first_frame_drains() {
        let mut rig = Rig::new(&[(1, 1), (1, 1)], false);
        rig.send(0, &[0, 1]);
        rig.end(1);

        assert!(matches!(rig.step(), SyncStatus::Drained));
        assert!(rig.jobs().is_empty());
    }

    #[test]
    fn test_timestamp_violations_are_rejected() {
        let mut rig = Rig::new(&[(1, 1), (1, 1)], false);
        rig.send(0, &[5, 4]);
        rig.send(1, &[5, 6]);
        assert_eq!(composited_pts(rig.step()), 5);
        let err = rig.sync.step(&mut rig.sources, &mut rig.session).unwrap_err();
        assert!(matches!(err, StackError::InvalidArgument { .. }));

        let mut rig = Rig::new(&[(1, 1), (1, 1)], false);
        rig.senders[0]
            .as_ref()
            .unwrap()
            .send(Frame::new_filled(4, 4, [16, 128, 128], None));
        assert!(rig.sync.step(&mut rig.sources, &mut rig.session).is_err());
    }

    #[test]
    fn test_source_count_must_match() {
        let mut rig = Rig::new(&[(1, 1), (1, 1)], false);
        let mut too_few = vec![rig.sources.remove(0)];
        assert!(matches!(
            rig.sync.step(&mut too_few, &mut rig.session),
            Err(StackError::InvalidArgument { .. })
        ));
    }
}
