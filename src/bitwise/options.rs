// Tunables for schema compilation and field access

use serde::{Deserialize, Serialize};

/// What a setter does with a value wider than its field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Keep the low-order bits, matching what radio firmware does
    #[default]
    Truncate,
    /// Fail with `CodecError::OutOfRange` and leave the image untouched
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Log a warning when `#seekto` moves the cursor backwards
    pub flag_overlapping_seeks: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            flag_overlapping_seeks: cfg!(debug_assertions),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    pub overflow: OverflowPolicy,
}

impl ViewOptions {
    pub fn strict() -> Self {
        Self {
            overflow: OverflowPolicy::Reject,
        }
    }
}
