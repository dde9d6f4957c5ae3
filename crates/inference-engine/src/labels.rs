//! Label vocabulary and ripeness predictions

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::InferenceError;

/// One class with its confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPrediction {
    pub label: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
}

/// Ordered class names, index-aligned with the ripeness head
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelVocabulary {
    labels: Vec<String>,
}

impl LabelVocabulary {
    /// Create from class names
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Parse a JSON array of strings
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load from a JSON file.
    ///
    /// A missing or unreadable file yields `None`; predictions then use
    /// class indices.
    pub fn load<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No labels file at {}, using class indices", path.display());
            return None;
        }
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|json| Self::from_json(&json).map_err(|e| e.to_string()));
        match parsed {
            Ok(vocabulary) => {
                info!("Loaded {} labels: {:?}", vocabulary.len(), vocabulary.labels);
                Some(vocabulary)
            }
            Err(e) => {
                warn!("Could not load labels from {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the vocabulary is empty
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for a class index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }
}

/// Map raw ripeness values to labeled predictions, highest confidence first.
///
/// A single value is a sigmoid `p` and expands to `[1 - p, p]`. Vectors with
/// any value outside [0, 1] are treated as logits and softmaxed. Classes
/// without a label are named `class_<i>`. NaN or infinite values fail the
/// request instead of leaking into the confidences.
pub fn build_predictions(
    values: &[f32],
    labels: Option<&LabelVocabulary>,
) -> Result<Vec<LabeledPrediction>, InferenceError> {
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(InferenceError::InferenceFailed(format!(
            "ripeness output contains non-finite value {bad}"
        )));
    }

    let probabilities: Vec<f64> = match values {
        [] => return Ok(Vec::new()),
        [p] => {
            let p = (*p as f64).clamp(0.0, 1.0);
            vec![1.0 - p, p]
        }
        many if many.iter().any(|v| !(0.0..=1.0).contains(v)) => softmax(many),
        many => many.iter().map(|&v| v as f64).collect(),
    };

    let mut predictions: Vec<LabeledPrediction> = probabilities
        .into_iter()
        .enumerate()
        .map(|(i, confidence)| LabeledPrediction {
            label: labels
                .and_then(|vocab| vocab.get(i))
                .map(str::to_string)
                .unwrap_or_else(|| format!("class_{i}")),
            confidence,
        })
        .collect();

    predictions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    Ok(predictions)
}

fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits
        .iter()
        .map(|&v| v as f64)
        .fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&v| (v as f64 - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn vocab() -> LabelVocabulary {
        LabelVocabulary::new(vec!["unripe".into(), "ripe".into(), "overripe".into()])
    }

    #[test]
    fn test_sigmoid_expands_to_two_classes() {
        let labels = LabelVocabulary::new(vec!["not_ripe".into(), "ripe".into()]);
        let preds = build_predictions(&[0.8], Some(&labels)).unwrap();

        assert_eq!(preds.len(), 2);
        assert_eq!(preds[0].label, "ripe");
        assert!((preds[0].confidence - 0.8).abs() < 1e-6);
        assert_eq!(preds[1].label, "not_ripe");
    }

    #[test]
    fn test_sorted_descending_and_sums_to_one() {
        let preds = build_predictions(&[0.1, 0.7, 0.2], Some(&vocab())).unwrap();
        let labels: Vec<&str> = preds.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["ripe", "overripe", "unripe"]);

        let total: f64 = preds.iter().map(|p| p.confidence).sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_labels_use_indices() {
        let labels = LabelVocabulary::new(vec!["unripe".into()]);
        let preds = build_predictions(&[0.2, 0.5, 0.3], Some(&labels)).unwrap();
        assert_eq!(preds[0].label, "class_1");
        assert!(preds.iter().any(|p| p.label == "unripe"));
        assert!(build_predictions(&[0.6, 0.4], None).unwrap()[0].label == "class_0");
    }

    #[test]
    fn test_logits_are_softmaxed() {
        let preds = build_predictions(&[2.0, -1.0, 0.5], None).unwrap();
        let total: f64 = preds.iter().map(|p| p.confidence).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(preds[0].label, "class_0");
        assert!(preds.iter().all(|p| (0.0..=1.0).contains(&p.confidence)));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        for values in [vec![f32::NAN], vec![0.2, f32::INFINITY, 0.1], vec![f32::NEG_INFINITY, 1.0]] {
            let err = build_predictions(&values, Some(&vocab())).unwrap_err();
            assert!(matches!(err, InferenceError::InferenceFailed(_)), "got {err:?}");
        }
    }

    #[test]
    fn test_empty_values() {
        assert!(build_predictions(&[], Some(&vocab())).unwrap().is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(br#"["unripe", "ripe"]"#).unwrap();

        let loaded = LabelVocabulary::load(temp.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(1), Some("ripe"));
    }

    #[test]
    fn test_load_invalid_or_missing() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"{not json").unwrap();
        assert!(LabelVocabulary::load(temp.path()).is_none());
        assert!(LabelVocabulary::load("does/not/exist.json").is_none());
    }
}
