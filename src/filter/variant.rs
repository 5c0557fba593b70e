use std::fmt;

use crate::error::ConfigError;
use crate::layout::Orientation;

/// The two registered stack filters.
///
/// They share every piece of behaviour except the layout orientation, which
/// is fixed by the name the filter was created under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StackVariant {
    Horizontal,
    Vertical,
}

impl StackVariant {
    pub const ALL: [StackVariant; 2] = [StackVariant::Horizontal, StackVariant::Vertical];

    /// Registered filter name
    pub fn name(self) -> &'static str {
        match self {
            Self::Horizontal => "hstack_accel",
            Self::Vertical => "vstack_accel",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Horizontal => "Stack video inputs horizontally on the accelerator",
            Self::Vertical => "Stack video inputs vertically on the accelerator",
        }
    }

    /// Look a variant up by its registered name
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|variant| variant.name() == name)
            .ok_or_else(|| ConfigError::UnknownVariant { name: name.to_string() })
    }

    pub fn orientation(self) -> Orientation {
        match self {
            Self::Horizontal => Orientation::Horizontal,
            Self::Vertical => Orientation::Vertical,
        }
    }

    /// Names of every registered variant
    pub fn available() -> Vec<&'static str> {
        Self::ALL.iter().map(|v| v.name()).collect()
    }
}

impl fmt::Display for StackVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
