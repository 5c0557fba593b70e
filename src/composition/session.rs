use std::time::Duration;

use tracing::{debug, info, warn};

use crate::accel::{Accelerator, CompositeParams, ContextHandle};
use crate::error::{HardwareError, Result, StackError};
use crate::video::types::Frame;

/// Outcome of offering one frame to the open job
#[derive(Debug)]
pub enum Submission {
    /// The frame was accepted; other inputs are still missing
    Pending { filled: usize },
    /// The job completed and the accelerator returned the merged frame.
    ///
    /// Its timestamp is always unset.
    Composited(Frame),
}

/// Counters kept across the session lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub jobs_discarded: u64,
}

/// Owner of the accelerator context and the single open composition job.
///
/// A job collects exactly one frame per input. When the last slot fills the
/// job is handed to the accelerator synchronously; whatever the outcome, the
/// next `submit` starts a fresh job.
pub struct CompositionSession {
    accelerator: Box<dyn Accelerator>,
    timeout: Duration,
    context: Option<ContextHandle>,
    params: Option<CompositeParams>,
    slots: Vec<Option<Frame>>,
    filled: usize,
    stats: SessionStats,
}

impl CompositionSession {
    /// Create an uninitialized session around `accelerator`
    pub fn new(accelerator: Box<dyn Accelerator>, timeout: Duration) -> Self {
        Self {
            accelerator,
            timeout,
            context: None,
            params: None,
            slots: Vec::new(),
            filled: 0,
            stats: SessionStats::default(),
        }
    }

    /// Create the accelerator context for `params`.
    ///
    /// Failure is reported as a resource error and leaves the session
    /// uninitialized.
    pub fn init(&mut self, params: CompositeParams) -> Result<()> {
        if self.context.is_some() {
            return Err(StackError::invalid_argument("composition session already initialized"));
        }

        let context = self.accelerator.create_context(&params)?;
        info!(
            "Composition session on {} accelerator: {} inputs -> {}x{} {}",
            self.accelerator.name(),
            params.num_inputs,
            params.output.width,
            params.output.height,
            params.output.sw_format
        );

        self.slots = vec![None; params.num_inputs];
        self.filled = 0;
        self.context = Some(context);
        self.params = Some(params);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    pub fn num_inputs(&self) -> usize {
        self.slots.len()
    }

    /// Number of inputs that contributed to the open job
    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn has_open_job(&self) -> bool {
        self.filled > 0
    }

    pub fn params(&self) -> Option<&CompositeParams> {
        self.params.as_ref()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Attach `frame` to slot `index` of the open job.
    ///
    /// Filling the last slot runs the composition and returns the merged
    /// frame. Submitting twice to one slot, or out of range, is rejected and
    /// leaves the open job untouched.
    pub fn submit(&mut self, index: usize, frame: Frame) -> Result<Submission> {
        let context = self
            .context
            .ok_or_else(|| StackError::invalid_argument("composition session is not initialized"))?;

        let count = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            StackError::invalid_argument(format!(
                "input index {} out of range for {} inputs",
                index, count
            ))
        })?;
        if slot.is_some() {
            return Err(StackError::invalid_argument(format!(
                "input {} already contributed to the open job",
                index
            )));
        }

        *slot = Some(frame);
        self.filled += 1;

        if self.filled < self.slots.len() {
            return Ok(Submission::Pending { filled: self.filled });
        }

        // The job closes here, before the device sees it, so a failure
        // cannot leave a half-submitted job behind.
        let inputs: Vec<Frame> = self.slots.iter_mut().filter_map(Option::take).collect();
        self.filled = 0;

        match self.accelerator.submit_composite(context, inputs, self.timeout) {
            Ok(mut output) => {
                if let Err(err) = self.check_output(&output) {
                    self.stats.jobs_failed += 1;
                    warn!("composition job rejected: {}", err);
                    return Err(err.into());
                }
                output.set_pts(None);
                self.stats.jobs_completed += 1;
                debug!("composition job {} completed", self.stats.jobs_completed);
                Ok(Submission::Composited(output))
            }
            Err(err) => {
                self.stats.jobs_failed += 1;
                warn!("composition job failed: {}", err);
                Err(err.into())
            }
        }
    }

    /// Drop the frames of a partially filled job without touching the device
    pub fn discard_open_job(&mut self) {
        if self.filled > 0 {
            debug!("discarding open job with {} of {} inputs", self.filled, self.slots.len());
            self.slots.iter_mut().for_each(|slot| *slot = None);
            self.filled = 0;
            self.stats.jobs_discarded += 1;
        }
    }

    /// Release the accelerator context. Safe to call at any point, repeatedly.
    pub fn close(&mut self) {
        self.discard_open_job();
        if let Some(context) = self.context.take() {
            self.accelerator.destroy_context(context);
            info!(
                "Composition session closed: {} jobs completed, {} failed",
                self.stats.jobs_completed, self.stats.jobs_failed
            );
        }
        self.params = None;
        self.slots.clear();
    }

    fn check_output(&self, output: &Frame) -> std::result::Result<(), HardwareError> {
        let Some(params) = &self.params else {
            return Err(HardwareError::NoContext);
        };
        if output.width() != params.output.width || output.height() != params.output.height {
            return Err(HardwareError::OutputMismatch {
                width: params.output.width,
                height: params.output.height,
                got_width: output.width(),
                got_height: output.height(),
            });
        }
        Ok(())
    }
}

impl Drop for CompositionSession {
    fn drop(&mut self) {
        self.close();
    }
}
