use crate::{
    error::{schema_error, AppError},
    types::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Scaler artifact as written by the training pipeline.
#[derive(Debug, Clone, Deserialize)]
struct ScalerFile {
    mean: Vec<f64>,
    scale: Vec<f64>,
    feature_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerEntry {
    pub name: String,
    pub mean: f64,
    pub scale: f64,
}

/// Per-feature standardization parameters. The entry order is the column
/// order of the model input row.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalerParameters {
    entries: Vec<ScalerEntry>,
}

impl ScalerParameters {
    /// Rejects parameters whose names are not exactly the feature schema, or
    /// whose scale is zero or non-finite.
    pub fn new(entries: Vec<ScalerEntry>) -> Result<Self, AppError> {
        if entries.len() != FEATURE_COUNT {
            return Err(schema_error(format!(
                "expected {} scaler entries, found {}",
                FEATURE_COUNT,
                entries.len()
            )));
        }

        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !FEATURE_NAMES.contains(&entry.name.as_str()) {
                return Err(schema_error(format!("unknown feature {:?}", entry.name)));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(schema_error(format!("duplicate feature {:?}", entry.name)));
            }
            if !entry.mean.is_finite() {
                return Err(schema_error(format!("non-finite mean for {:?}", entry.name)));
            }
            if entry.scale == 0.0 || !entry.scale.is_finite() {
                return Err(schema_error(format!(
                    "unusable scale {} for {:?}",
                    entry.scale, entry.name
                )));
            }
        }

        Ok(Self { entries })
    }

    /// Parses the `{"mean": [..], "scale": [..], "feature_names": [..]}` artifact.
    pub fn from_json(content: &str) -> Result<Self, AppError> {
        let file: ScalerFile = serde_json::from_str(content)?;

        if file.mean.len() != file.feature_names.len() || file.scale.len() != file.feature_names.len() {
            return Err(schema_error(format!(
                "scaler arrays differ in length: {} names, {} means, {} scales",
                file.feature_names.len(),
                file.mean.len(),
                file.scale.len()
            )));
        }

        let entries = file
            .feature_names
            .into_iter()
            .zip(file.mean)
            .zip(file.scale)
            .map(|((name, mean), scale)| ScalerEntry { name, mean, scale })
            .collect();

        Self::new(entries)
    }

    /// Zero mean, unit scale, in schema order.
    pub fn identity() -> Self {
        Self {
            entries: FEATURE_NAMES
                .iter()
                .map(|name| ScalerEntry {
                    name: name.to_string(),
                    mean: 0.0,
                    scale: 1.0,
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[ScalerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `(value - mean) / scale` for every parameter entry, in parameter order.
pub fn standardize(features: &FeatureVector, params: &ScalerParameters) -> Result<Vec<f64>, AppError> {
    params
        .entries()
        .iter()
        .map(|entry| {
            features
                .get(&entry.name)
                .map(|value| (value - entry.mean) / entry.scale)
                .ok_or_else(|| schema_error(format!("feature {:?} missing from vector", entry.name)))
        })
        .collect()
}
