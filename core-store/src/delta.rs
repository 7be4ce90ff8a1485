//! Tag-set diffing types.

use serde::{Deserialize, Serialize};

/// How a key differs between the current and target tag sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaOp {
    Added,
    Deleted,
    Changed,
    Equal,
}

impl DeltaOp {
    /// Single-letter code for compact display.
    pub fn code(&self) -> char {
        match self {
            DeltaOp::Added => 'A',
            DeltaOp::Deleted => 'D',
            DeltaOp::Changed => 'C',
            DeltaOp::Equal => 'E',
        }
    }
}

/// One entry of a metadata diff.
///
/// `value` holds the target value for added/changed keys and the current
/// value for deleted/equal ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDelta {
    pub key: String,
    pub value: String,
    pub op: DeltaOp,
}

impl MetadataDelta {
    pub fn new(key: impl Into<String>, value: impl Into<String>, op: DeltaOp) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            op,
        }
    }

    /// Whether applying this delta would mutate the container.
    pub fn is_change(&self) -> bool {
        self.op != DeltaOp::Equal
    }
}
