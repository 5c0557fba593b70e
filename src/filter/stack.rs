use tracing::{debug, info, warn};

use crate::accel::{Accelerator, CompositeParams};
use crate::composition::CompositionSession;
use crate::config::StackConfig;
use crate::error::{ConfigError, Result, StackError};
use crate::filter::sink::FrameSink;
use crate::filter::variant::StackVariant;
use crate::layout::{plan, LayoutPlan};
use crate::sync::{FrameSource, FrameSync, SyncStatus};
use crate::video::time::{FrameRate, TimeBase};
use crate::video::types::{PixelFormat, StreamInfo, SurfaceKind};

/// Lifecycle of a stack filter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterState {
    /// Ports exist, sources may be attached
    Opened,
    /// Output negotiated, the filter can be stepped
    Configured,
    /// A blocking input ended; no more output will follow
    Drained,
    Closed,
}

/// Outcome of one [`StackFilter::step`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepStatus {
    /// An input has nothing queued; step again once it does
    NotReady,
    /// All output has been produced
    Drained,
    /// One frame was pushed to the sink with this output timestamp
    Emitted { pts: i64 },
    /// A cycle completed but its timestamp did not advance; the frame was dropped
    Dropped { pts: i64 },
}

/// Negotiated properties of the output link
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputCanvas {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub surface: SurfaceKind,
    pub time_base: TimeBase,
    pub frame_rate: Option<FrameRate>,
}

/// Counters kept across the filter lifetime
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub frames_emitted: u64,
    pub frames_dropped: u64,
}

/// A named input port
pub struct InputPort {
    name: String,
    source: Option<Box<dyn FrameSource>>,
}

impl InputPort {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_attached(&self) -> bool {
        self.source.is_some()
    }
}

/// An hstack/vstack filter instance.
///
/// Drives the whole pipeline:
/// 1. `open` - validate options, create the input ports
/// 2. `attach_input` - connect an upstream source to every port
/// 3. `configure_output` - plan the layout, configure the synchronizer,
///    create the accelerator context
/// 4. `step` - produce at most one output frame per call
/// 5. `close` - release the accelerator context
pub struct StackFilter {
    variant: StackVariant,
    config: StackConfig,
    ports: Vec<InputPort>,
    session: CompositionSession,
    sync: Option<FrameSync>,
    layout: Option<LayoutPlan>,
    output: Option<OutputCanvas>,
    last_pts: Option<i64>,
    stats: FilterStats,
    state: FilterState,
}

impl StackFilter {
    /// Create a filter with `config.inputs` unattached ports
    pub fn open(
        config: StackConfig,
        variant: StackVariant,
        accelerator: Box<dyn Accelerator>,
    ) -> Result<Self> {
        config.validate()?;

        let ports = (0..config.inputs)
            .map(|index| InputPort {
                name: format!("input{}", index),
                source: None,
            })
            .collect();

        info!(
            "Opened {} with {} inputs (shortest={})",
            variant, config.inputs, config.shortest
        );

        Ok(Self {
            variant,
            session: CompositionSession::new(accelerator, config.timeout()),
            config,
            ports,
            sync: None,
            layout: None,
            output: None,
            last_pts: None,
            stats: FilterStats::default(),
            state: FilterState::Opened,
        })
    }

    pub fn variant(&self) -> StackVariant {
        self.variant
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    pub fn ports(&self) -> &[InputPort] {
        &self.ports
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    pub fn layout(&self) -> Option<&LayoutPlan> {
        self.layout.as_ref()
    }

    pub fn output(&self) -> Option<&OutputCanvas> {
        self.output.as_ref()
    }

    pub fn session(&self) -> &CompositionSession {
        &self.session
    }

    /// Connect `source` to port `index`, replacing any earlier source
    pub fn attach_input(&mut self, index: usize, source: Box<dyn FrameSource>) -> Result<()> {
        self.require_state(FilterState::Opened, "attach_input")?;

        let count = self.ports.len();
        let port = self.ports.get_mut(index).ok_or_else(|| {
            StackError::invalid_argument(format!("input {} out of range for {} inputs", index, count))
        })?;
        debug!("{} attached: {:?}", port.name, source.info().geometry);
        port.source = Some(source);
        Ok(())
    }

    /// Negotiate the output and create the accelerator context.
    ///
    /// Geometry is validated before anything touches the device. On failure
    /// the filter is closed and no context exists.
    pub fn configure_output(&mut self) -> Result<OutputCanvas> {
        self.require_state(FilterState::Opened, "configure_output")?;

        match self.try_configure() {
            Ok(canvas) => {
                self.state = FilterState::Configured;
                Ok(canvas)
            }
            Err(err) => {
                warn!("{} configuration failed: {}", self.variant, err);
                self.close();
                Err(err)
            }
        }
    }

    fn try_configure(&mut self) -> Result<OutputCanvas> {
        let streams = self
            .ports
            .iter()
            .enumerate()
            .map(|(index, port)| {
                port.source
                    .as_ref()
                    .map(|source| source.info())
                    .ok_or(ConfigError::MissingInput { index })
            })
            .collect::<std::result::Result<Vec<StreamInfo>, _>>()?;

        let geometries: Vec<_> = streams.iter().map(|s| s.geometry).collect();
        let layout = plan(&geometries, self.variant.orientation())?;
        let sync = FrameSync::configure(&streams, self.config.shortest)?;

        let primary = streams[0];
        let params = CompositeParams::from_plan(&layout, primary.geometry.surface);
        self.session.init(params)?;

        let canvas = OutputCanvas {
            width: layout.canvas_width,
            height: layout.canvas_height,
            format: PixelFormat::Nv12,
            surface: primary.geometry.surface,
            time_base: primary.time_base,
            frame_rate: primary.frame_rate,
        };

        info!(
            "{} output: {}x{} {}, time base {}",
            self.variant, canvas.width, canvas.height, canvas.format, canvas.time_base
        );

        self.layout = Some(layout);
        self.sync = Some(sync);
        self.output = Some(canvas);
        Ok(canvas)
    }

    /// Produce at most one output frame into `sink`.
    ///
    /// Any error closes the filter before it is returned.
    pub fn step(&mut self, sink: &mut dyn FrameSink) -> Result<StepStatus> {
        match self.state {
            FilterState::Configured => {}
            FilterState::Drained => return Ok(StepStatus::Drained),
            _ => {
                return Err(ConfigError::InvalidState {
                    operation: "step".to_string(),
                }
                .into())
            }
        }

        match self.try_step(sink) {
            Ok(status) => Ok(status),
            Err(err) => {
                warn!("{} failed, closing: {}", self.variant, err);
                self.close();
                Err(err)
            }
        }
    }

    fn try_step(&mut self, sink: &mut dyn FrameSink) -> Result<StepStatus> {
        let (Some(sync), Some(output)) = (self.sync.as_mut(), self.output) else {
            return Err(StackError::invalid_argument("filter has no negotiated output"));
        };

        let mut sources = self
            .ports
            .iter_mut()
            .enumerate()
            .map(|(index, port)| port.source.as_mut().ok_or(ConfigError::MissingInput { index }))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        match sync.step(&mut sources, &mut self.session)? {
            SyncStatus::NotReady => Ok(StepStatus::NotReady),
            SyncStatus::Drained => {
                self.state = FilterState::Drained;
                info!(
                    "{} drained after {} frames ({} dropped)",
                    self.variant, self.stats.frames_emitted, self.stats.frames_dropped
                );
                Ok(StepStatus::Drained)
            }
            SyncStatus::Composited { mut frame, pts } => {
                let out_pts = sync.time_base().rescale(pts, output.time_base);
                if let Some(last) = self.last_pts {
                    if out_pts <= last {
                        self.stats.frames_dropped += 1;
                        warn!(
                            "Dropping composited frame: pts {} does not follow {}",
                            out_pts, last
                        );
                        return Ok(StepStatus::Dropped { pts: out_pts });
                    }
                }

                frame.set_pts(Some(out_pts));
                sink.push_frame(frame)?;
                self.last_pts = Some(out_pts);
                self.stats.frames_emitted += 1;
                Ok(StepStatus::Emitted { pts: out_pts })
            }
        }
    }

    /// Release the accelerator context, then the synchronizer, then the
    /// layout. Safe in any state, repeatedly.
    pub fn close(&mut self) {
        if self.state == FilterState::Closed {
            return;
        }
        self.session.close();
        self.sync = None;
        self.layout = None;
        self.state = FilterState::Closed;
        info!(
            "{} closed: {} frames emitted, {} dropped",
            self.variant, self.stats.frames_emitted, self.stats.frames_dropped
        );
    }

    fn require_state(&self, expected: FilterState, operation: &str) -> Result<()> {
        if self.state != expected {
            return Err(ConfigError::InvalidState {
                operation: operation.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl Drop for StackFilter {
    fn drop(&mut self) {
        self.close();
    }
}
