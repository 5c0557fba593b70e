//! Scripted accelerator for failure injection in tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::accel::{Accelerator, CompositeParams, ContextHandle};
use crate::error::{HardwareError, ResourceError};
use crate::video::types::Frame;

#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub created: usize,
    pub destroyed: usize,
    pub live: Option<ContextHandle>,
    pub params: Option<CompositeParams>,
    /// Input pts of every submitted job, in input order
    pub jobs: Vec<Vec<Option<i64>>>,
    pub fail_create: Option<ResourceError>,
    pub fail_submits: Vec<HardwareError>,
    pub wrong_output_size: bool,
}

/// Accelerator whose behaviour is driven through a shared [`MockState`]
pub(crate) struct MockAccelerator {
    state: Arc<Mutex<MockState>>,
}

impl MockAccelerator {
    pub fn new() -> (Self, Arc<Mutex<MockState>>) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (Self { state: Arc::clone(&state) }, state)
    }
}

impl Accelerator for MockAccelerator {
    fn name(&self) -> &str {
        "mock"
    }

    fn create_context(&mut self, params: &CompositeParams) -> Result<ContextHandle, ResourceError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.fail_create.take() {
            return Err(err);
        }
        state.created += 1;
        let handle = ContextHandle(state.created as u64);
        state.live = Some(handle);
        state.params = Some(params.clone());
        Ok(handle)
    }

    fn submit_composite(
        &mut self,
        context: ContextHandle,
        inputs: Vec<Frame>,
        _timeout: Duration,
    ) -> Result<Frame, HardwareError> {
        let mut state = self.state.lock().unwrap();
        if state.live != Some(context) {
            return Err(HardwareError::NoContext);
        }
        state.jobs.push(inputs.iter().map(Frame::pts).collect());
        if !state.fail_submits.is_empty() {
            return Err(state.fail_submits.remove(0));
        }

        let output = state.params.as_ref().map(|p| p.output).ok_or(HardwareError::NoContext)?;
        let width = if state.wrong_output_size { output.width + 2 } else { output.width };
        // Accelerators may hand back garbage timestamps; the session must clear them
        Ok(Frame::new_filled(width, output.height, [16, 128, 128], Some(-77)))
    }

    fn destroy_context(&mut self, context: ContextHandle) {
        let mut state = self.state.lock().unwrap();
        if state.live == Some(context) {
            state.live = None;
            state.destroyed += 1;
        }
    }
}
