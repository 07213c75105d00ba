//! Tree-ensemble classifier loaded from a JSON forest dump
//!
//! The dump mirrors a fitted RandomForest: every tree is a flat node array
//! rooted at index 0, splits send a row left when `x <= threshold`, and
//! leaves carry per-class weights. Class probabilities are the mean of the
//! normalized leaf distributions across trees.

use super::{argmax, Classifier, FeatureMatrix};
use crate::error::{InferenceError, ModelError};
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};

/// A node of a decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForestNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f32>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestTree {
    pub nodes: Vec<ForestNode>,
}

#[derive(Debug, Deserialize)]
struct ForestDump {
    feature_names: Vec<String>,
    classes: Vec<i64>,
    trees: Vec<ForestTree>,
}

/// RandomForest evaluated natively from its exported trees
#[derive(Debug, Clone)]
pub struct ForestClassifier {
    n_features: usize,
    classes: Vec<i64>,
    trees: Vec<ForestTree>,
}

impl ForestClassifier {
    /// Build and validate a forest against the schema it will serve
    pub fn new(
        schema: FeatureSchema,
        feature_names: &[String],
        classes: Vec<i64>,
        trees: Vec<ForestTree>,
    ) -> Result<Self, ModelError> {
        if !schema.matches(feature_names) {
            return Err(ModelError::SchemaMismatch {
                expected: schema.names().iter().map(|s| s.to_string()).collect(),
                found: feature_names.to_vec(),
            });
        }
        if classes.is_empty() {
            return Err(ModelError::Invalid("forest has no classes".into()));
        }
        if trees.is_empty() {
            return Err(ModelError::Invalid("forest has no trees".into()));
        }
        for (t, tree) in trees.iter().enumerate() {
            validate_tree(t, tree, feature_names.len(), classes.len())?;
        }

        Ok(Self {
            n_features: feature_names.len(),
            classes,
            trees,
        })
    }

    pub fn from_json(bytes: &[u8], schema: FeatureSchema) -> Result<Self, ModelError> {
        let dump: ForestDump =
            serde_json::from_slice(bytes).map_err(|e| ModelError::Parse(e.to_string()))?;
        Self::new(schema, &dump.feature_names, dump.classes, dump.trees)
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn row_proba(&self, row: &[f32]) -> Vec<f32> {
        let mut total = vec![0.0f32; self.classes.len()];
        for tree in &self.trees {
            let leaf = leaf_for(tree, row);
            let sum: f32 = leaf.iter().sum();
            for (acc, v) in total.iter_mut().zip(leaf) {
                *acc += v / sum;
            }
        }
        let n = self.trees.len() as f32;
        total.iter_mut().for_each(|p| *p /= n);
        total
    }

    fn check_width(&self, features: &FeatureMatrix) -> Result<(), InferenceError> {
        if features.n_features() != self.n_features {
            return Err(InferenceError::FeatureCount {
                expected: self.n_features,
                actual: features.n_features(),
            });
        }
        Ok(())
    }
}

impl Classifier for ForestClassifier {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<i64>, InferenceError> {
        self.check_width(features)?;
        features
            .rows()
            .map(|row| {
                let proba = self.row_proba(row);
                argmax(&proba)
                    .map(|i| self.classes[i])
                    .ok_or_else(|| InferenceError::UnexpectedOutput("empty distribution".into()))
            })
            .collect()
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<Vec<f32>>, InferenceError> {
        self.check_width(features)?;
        Ok(features.rows().map(|row| self.row_proba(row)).collect())
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

/// Walk from the root to a leaf. Validation guarantees children come after
/// their parent, so this always terminates.
fn leaf_for<'a>(tree: &'a ForestTree, row: &[f32]) -> &'a [f32] {
    let mut idx = 0;
    loop {
        match &tree.nodes[idx] {
            ForestNode::Leaf { value } => return value,
            ForestNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                idx = if f64::from(row[*feature]) <= *threshold {
                    *left
                } else {
                    *right
                };
            }
        }
    }
}

fn validate_tree(
    t: usize,
    tree: &ForestTree,
    n_features: usize,
    n_classes: usize,
) -> Result<(), ModelError> {
    let invalid = |msg: String| ModelError::Invalid(format!("tree {}: {}", t, msg));

    if tree.nodes.is_empty() {
        return Err(invalid("no nodes".into()));
    }
    for (i, node) in tree.nodes.iter().enumerate() {
        match node {
            ForestNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if *feature >= n_features {
                    return Err(invalid(format!("node {} splits on feature {}", i, feature)));
                }
                if !threshold.is_finite() {
                    return Err(invalid(format!("node {} has non-finite threshold", i)));
                }
                for child in [left, right] {
                    if *child <= i || *child >= tree.nodes.len() {
                        return Err(invalid(format!("node {} has bad child {}", i, child)));
                    }
                }
            }
            ForestNode::Leaf { value } => {
                if value.len() != n_classes {
                    return Err(invalid(format!(
                        "leaf {} has {} weights for {} classes",
                        i,
                        value.len(),
                        n_classes
                    )));
                }
                if value.iter().any(|v| !v.is_finite() || *v < 0.0)
                    || value.iter().sum::<f32>() <= 0.0
                {
                    return Err(invalid(format!("leaf {} has invalid weights", i)));
                }
            }
        }
    }
    Ok(())
}
