use thiserror::Error;

/// Main error type for the stack compositor
#[derive(Error, Debug)]
pub enum StackError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Contract violation between synchronizer, session and sources.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Option and lifecycle errors, raised before the filter ever activates
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Unknown filter variant: {name}")]
    UnknownVariant { name: String },

    #[error("Input {index} has no source attached")]
    MissingInput { index: usize },

    #[error("Filter is not in a state that allows {operation}")]
    InvalidState { operation: String },
}

/// Incompatible stream geometry, rejected in `configure_output`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("Stacking needs at least 2 inputs, got {count}")]
    TooFewInputs { count: usize },

    #[error("Input {index} has an empty frame size {width}x{height}")]
    EmptyInput { index: usize, width: u32, height: u32 },

    #[error("Input {index} height {height} does not match input 0 height {expected}")]
    HeightMismatch { index: usize, height: u32, expected: u32 },

    #[error("Input {index} width {width} does not match input 0 width {expected}")]
    WidthMismatch { index: usize, width: u32, expected: u32 },

    #[error("Mixing hardware and software pixel formats is not supported (input {index})")]
    MixedSurfaceKinds { index: usize },

    #[error("Inputs with different underlying devices are forbidden (input {index})")]
    DeviceMismatch { index: usize },

    #[error("Input {index} uses unsupported pixel format {format}")]
    UnsupportedFormat { index: usize, format: String },

    #[error("Input {index} size {width}x{height} is not a multiple of the 2x2 NV12 chroma block")]
    UnalignedInput { index: usize, width: u32, height: u32 },

    #[error("Output canvas overflows at input {index}")]
    CanvasOverflow { index: usize },
}

/// The accelerator context could not be created
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Unsupported output format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Device exhausted: {reason}")]
    DeviceExhausted { reason: String },

    #[error("Accelerator initialization failed: {reason}")]
    InitFailed { reason: String },
}

/// Failure or timeout while compositing one job
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HardwareError {
    #[error("Composite submission failed: {reason}")]
    SubmitFailed { reason: String },

    #[error("Accelerator did not complete within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Accelerator context is not available")]
    NoContext,

    #[error("Composited output is {got_width}x{got_height}, expected {width}x{height}")]
    OutputMismatch {
        width: u32,
        height: u32,
        got_width: u32,
        got_height: u32,
    },
}

/// Convenience type alias for Results using StackError
pub type Result<T> = std::result::Result<T, StackError>;

impl StackError {
    /// Create an invalid-argument error with a custom reason
    pub fn invalid_argument<S: Into<String>>(reason: S) -> Self {
        Self::InvalidArgument { reason: reason.into() }
    }

    /// Whether the filter must be torn down after this error.
    ///
    /// IO and image errors come from inspection helpers outside the
    /// compositing path and leave the filter usable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::Image(_))
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(ConfigError::InvalidValue { key, value }) => {
                format!("Option '{}' has an invalid value '{}'.", key, value)
            }
            Self::Config(ConfigError::UnknownVariant { name }) => {
                format!("Filter '{}' not found. Available filters: hstack_accel, vstack_accel", name)
            }
            Self::Geometry(err) => {
                format!("Inputs cannot be stacked: {}.", err)
            }
            Self::Resource(_) => {
                "The accelerator could not be initialized for this configuration.".to_string()
            }
            Self::Hardware(HardwareError::Timeout { timeout_ms }) => {
                format!("The accelerator did not respond within {} ms.", timeout_ms)
            }
            _ => self.to_string(),
        }
    }
}
