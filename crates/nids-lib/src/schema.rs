//! Flow feature schema
//!
//! The ordered feature set the classifier was trained on. Column order is
//! part of the model contract and never changes at runtime.

/// Feature names in training order
pub const FEATURE_NAMES: [&str; 7] = [
    "FlowDuration",
    "TotalFwdPackets",
    "TotalBackwardPackets",
    "FwdPacketLengthMean",
    "BwdPacketLengthMean",
    "FlowBytesPerSec",
    "FlowPacketsPerSec",
];

/// Name of the column appended to batch results
pub const PREDICTION_COLUMN: &str = "Prediction";

/// Value injected for schema columns absent from the input
const DEFAULT_FILL: f64 = 0.0;

/// Ordered feature set and default-fill policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSchema {
    names: &'static [&'static str],
}

impl FeatureSchema {
    /// The seven-field flow schema used by the intrusion model
    pub const fn flow() -> Self {
        Self {
            names: &FEATURE_NAMES,
        }
    }

    pub fn names(&self) -> &'static [&'static str] {
        self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of a feature in training order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| *n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Fill value for a schema column missing from the input.
    ///
    /// Every feature is numeric, so the fill is the same for all of them.
    pub fn default_fill(&self, name: &str) -> Option<f64> {
        self.position(name).map(|_| DEFAULT_FILL)
    }

    /// Starting value offered for a field on manual single-flow entry
    ///
    /// Means and byte rates start at 0.0, counters and durations at 1.
    pub fn input_default(&self, name: &str) -> f64 {
        if name.contains("Mean") || name.contains("Bytes") {
            0.0
        } else {
            1.0
        }
    }

    /// Check that a model's feature list matches this schema exactly, in order
    pub fn matches<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.len() == self.names.len()
            && names
                .iter()
                .zip(self.names.iter())
                .all(|(a, b)| a.as_ref() == *b)
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::flow()
    }
}
