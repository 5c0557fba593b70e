use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::accel::{Accelerator, CompositeParams, ContextHandle};
use crate::error::{HardwareError, ResourceError};
use crate::video::types::{Frame, Nv12Planes, PixelFormat};

/// Limited-range black
const BACKGROUND: [u8; 3] = [16, 128, 128];

/// Largest canvas, in luma samples, a context will allocate
pub const MAX_CANVAS_AREA: u64 = 1 << 28;

/// CPU reference accelerator.
///
/// Composites software NV12 frames by copying each input into its layout
/// rectangle. Useful wherever no device is present: tests, the CLI, and as a
/// correctness reference for hardware backends.
pub struct SoftwareAccelerator {
    contexts: HashMap<u64, CompositeParams>,
    next_id: u64,
    max_contexts: usize,
}

impl SoftwareAccelerator {
    pub fn new() -> Self {
        Self {
            contexts: HashMap::new(),
            next_id: 1,
            max_contexts: 8,
        }
    }

    /// Limit how many contexts may be alive at once
    pub fn with_max_contexts(mut self, max_contexts: usize) -> Self {
        self.max_contexts = max_contexts;
        self
    }

    pub fn live_contexts(&self) -> usize {
        self.contexts.len()
    }
}

impl Default for SoftwareAccelerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accelerator for SoftwareAccelerator {
    fn name(&self) -> &str {
        "software"
    }

    fn create_context(&mut self, params: &CompositeParams) -> Result<ContextHandle, ResourceError> {
        if params.output.sw_format != PixelFormat::Nv12 {
            return Err(ResourceError::UnsupportedFormat {
                format: params.output.sw_format.to_string(),
            });
        }
        if params.output.surface.is_hardware() {
            return Err(ResourceError::UnsupportedFormat {
                format: "hardware surface".to_string(),
            });
        }
        if params.layout.len() != params.num_inputs {
            return Err(ResourceError::InitFailed {
                reason: format!(
                    "{} layout rectangles for {} inputs",
                    params.layout.len(),
                    params.num_inputs
                ),
            });
        }
        let area = (params.output.width as u64).checked_mul(params.output.height as u64);
        if !matches!(area, Some(area) if area <= MAX_CANVAS_AREA) {
            return Err(ResourceError::InitFailed {
                reason: format!(
                    "canvas {}x{} exceeds {} samples",
                    params.output.width, params.output.height, MAX_CANVAS_AREA
                ),
            });
        }
        if self.contexts.len() >= self.max_contexts {
            return Err(ResourceError::DeviceExhausted {
                reason: format!("{} contexts already in use", self.contexts.len()),
            });
        }

        let id = self.next_id;
        self.next_id += 1;
        self.contexts.insert(id, params.clone());

        debug!(
            "software context {} created: {} inputs -> {}x{}",
            id, params.num_inputs, params.output.width, params.output.height
        );
        Ok(ContextHandle(id))
    }

    fn submit_composite(
        &mut self,
        context: ContextHandle,
        inputs: Vec<Frame>,
        timeout: Duration,
    ) -> Result<Frame, HardwareError> {
        let started = Instant::now();
        let params = self.contexts.get(&context.0).ok_or(HardwareError::NoContext)?;

        if inputs.len() != params.num_inputs {
            return Err(HardwareError::SubmitFailed {
                reason: format!("expected {} inputs, got {}", params.num_inputs, inputs.len()),
            });
        }

        let mut canvas = Nv12Planes::filled(params.output.width, params.output.height, BACKGROUND);
        for (index, (frame, rect)) in inputs.iter().zip(&params.layout).enumerate() {
            let planes = frame.planes().ok_or_else(|| HardwareError::SubmitFailed {
                reason: format!("input {} is not a software frame", index),
            })?;
            if planes.width() != rect.width || planes.height() != rect.height {
                return Err(HardwareError::SubmitFailed {
                    reason: format!(
                        "input {} is {}x{}, layout expects {}x{}",
                        index,
                        planes.width(),
                        planes.height(),
                        rect.width,
                        rect.height
                    ),
                });
            }
            canvas.blit(planes, rect.x, rect.y);
        }

        if started.elapsed() > timeout {
            return Err(HardwareError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            });
        }

        Ok(Frame::from_planes(canvas, None))
    }

    fn destroy_context(&mut self, context: ContextHandle) {
        if self.contexts.remove(&context.0).is_some() {
            debug!("software context {} destroyed", context.0);
        }
    }
}
