//! Feature-aligned inference pipeline

mod batch;
mod features;
mod forest;
mod inference;
mod loader;
mod output;

pub use batch::{predict_csv, BatchOutcome};
pub use features::FeatureAligner;
pub use forest::{ForestClassifier, ForestNode, ForestTree};
pub use inference::{InferenceEngine, InferenceStats, OnnxClassifier};
pub use loader::{compute_checksum, load_model, LoadedModel};
pub use output::ResultFormatter;

use crate::error::InferenceError;

/// Trait for trained classifier implementations
pub trait Classifier: Send + Sync {
    /// Class code per row, in input row order
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<i64>, InferenceError>;

    /// Class probability distribution per row, in input row order
    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<Vec<f32>>, InferenceError>;

    /// Number of features the model was trained on
    fn n_features(&self) -> usize;
}

/// Dense row-major f32 matrix handed to a classifier
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    n_features: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    pub fn new(n_features: usize, data: Vec<f32>) -> Result<Self, InferenceError> {
        if n_features == 0 || data.len() % n_features != 0 {
            return Err(InferenceError::FeatureCount {
                expected: n_features,
                actual: data.len(),
            });
        }
        Ok(Self { n_features, data })
    }

    pub fn n_rows(&self) -> usize {
        self.data.len() / self.n_features
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.n_features..(index + 1) * self.n_features]
    }

    pub fn rows(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.n_features)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Index of the largest probability; ties go to the lower class index
pub(crate) fn argmax(probabilities: &[f32]) -> Option<usize> {
    probabilities
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((i, p)),
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_matrix_rows() {
        let m = FeatureMatrix::new(2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.rows().count(), 2);
    }

    #[test]
    fn test_feature_matrix_rejects_partial_rows() {
        assert!(FeatureMatrix::new(3, vec![1.0, 2.0]).is_err());
        assert!(FeatureMatrix::new(0, vec![]).is_err());
    }

    #[test]
    fn test_argmax_prefers_first_on_tie() {
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[0.2, 0.8]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
