//! Model artifact loading
//!
//! The artifact format is picked from the file extension: `.onnx` for a
//! forest exported through skl2onnx, `.json` for a native tree dump.

use super::forest::ForestClassifier;
use super::inference::OnnxClassifier;
use super::Classifier;
use crate::error::ModelError;
use crate::models::{ModelInfo, ModelKind};
use crate::schema::FeatureSchema;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

/// A classifier together with what is known about its artifact
pub struct LoadedModel {
    pub classifier: Box<dyn Classifier>,
    pub info: ModelInfo,
}

/// Read, verify and parse the model artifact at `path`
pub fn load_model(
    path: &Path,
    schema: FeatureSchema,
    expected_sha256: Option<&str>,
) -> Result<LoadedModel, ModelError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let kind = match extension.as_str() {
        "onnx" => ModelKind::Onnx,
        "json" => ModelKind::Forest,
        _ => return Err(ModelError::UnsupportedFormat(extension)),
    };

    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ModelError::NotFound(path.to_path_buf()),
        _ => ModelError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let checksum = compute_checksum(&bytes);
    if let Some(expected) = expected_sha256 {
        if !expected.trim().eq_ignore_ascii_case(&checksum) {
            return Err(ModelError::ChecksumMismatch {
                expected: expected.trim().to_string(),
                actual: checksum,
            });
        }
    }

    let classifier: Box<dyn Classifier> = match kind {
        ModelKind::Onnx => Box::new(OnnxClassifier::from_bytes(&bytes, schema.len())?),
        ModelKind::Forest => Box::new(ForestClassifier::from_json(&bytes, schema)?),
    };

    let info = ModelInfo {
        kind,
        path: path.display().to_string(),
        checksum,
        size_bytes: bytes.len(),
        loaded_at: chrono::Utc::now().timestamp(),
    };

    info!(
        path = %info.path,
        kind = kind.as_str(),
        checksum = %info.checksum,
        size_bytes = info.size_bytes,
        "Loaded model artifact"
    );

    Ok(LoadedModel { classifier, info })
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FEATURE_NAMES;
    use std::io::Write;

    fn forest_json() -> String {
        serde_json::json!({
            "feature_names": FEATURE_NAMES,
            "classes": [0, 1],
            "trees": [{"nodes": [{"value": [3.0, 1.0]}]}]
        })
        .to_string()
    }

    fn write_model(suffix: &str, contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_forest_json() {
        let json = forest_json();
        let file = write_model(".json", json.as_bytes());

        let loaded = load_model(file.path(), FeatureSchema::flow(), None).unwrap();
        assert_eq!(loaded.info.kind, ModelKind::Forest);
        assert_eq!(loaded.info.checksum, compute_checksum(json.as_bytes()));
        assert_eq!(loaded.info.size_bytes, json.len());
        assert_eq!(loaded.classifier.n_features(), 7);
    }

    #[test]
    fn test_missing_artifact_is_not_found() {
        let err = load_model(
            Path::new("/nonexistent/intrusion_model.onnx"),
            FeatureSchema::flow(),
            None,
        )
        .err()
        .unwrap();
        assert!(matches!(err, ModelError::NotFound(_)));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let file = write_model(".pkl", b"\x80\x04");
        let err = load_model(file.path(), FeatureSchema::flow(), None)
            .err()
            .unwrap();
        assert!(matches!(err, ModelError::UnsupportedFormat(ref e) if e == "pkl"));
    }

    #[test]
    fn test_checksum_verification() {
        let json = forest_json();
        let file = write_model(".json", json.as_bytes());
        let good = compute_checksum(json.as_bytes()).to_uppercase();

        assert!(load_model(file.path(), FeatureSchema::flow(), Some(&good)).is_ok());

        let err = load_model(file.path(), FeatureSchema::flow(), Some("00ff"))
            .err()
            .unwrap();
        assert!(matches!(err, ModelError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_corrupt_onnx_is_parse_error() {
        let file = write_model(".onnx", b"not a protobuf graph");
        let err = load_model(file.path(), FeatureSchema::flow(), None)
            .err()
            .unwrap();
        assert!(matches!(err, ModelError::Parse(_)));
    }

    #[test]
    fn test_checksum_is_hex_sha256() {
        assert_eq!(
            compute_checksum(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
