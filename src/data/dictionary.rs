//! Per-column feature dictionary.
//!
//! A [`Dictionary`] holds one [`Feature`] per table column. The table facade
//! keeps its length equal to the storage column count.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::feature::{Feature, NumKind};
use crate::error::{Result, TableError};

/// Ordered feature descriptors, one per column.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Dictionary {
    /// Per-column descriptors.
    features: Vec<Feature>,

    /// Feature name → index mapping (built lazily on first lookup).
    #[serde(skip)]
    name_index: Option<HashMap<String, usize>>,
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.features == other.features
    }
}

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dictionary from descriptors.
    pub fn from_features(features: Vec<Feature>) -> Self {
        Self {
            features,
            name_index: None,
        }
    }

    /// `n` continuous features all stored as `kind`.
    pub fn homogeneous(n: usize, kind: NumKind) -> Self {
        Self::from_features(vec![Feature::new(kind); n])
    }

    /// `n` untyped slots.
    pub fn untyped(n: usize) -> Self {
        Self::from_features(vec![Feature::default(); n])
    }

    /// Number of features.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Replace the descriptor at `index`.
    pub fn set_feature(&mut self, feature: Feature, index: usize) -> Result<()> {
        TableError::check_index("feature", index, self.features.len())?;
        self.features[index] = feature;
        self.name_index = None;
        Ok(())
    }

    /// Descriptor at `index`.
    pub fn feature(&self, index: usize) -> Result<&Feature> {
        self.features.get(index).ok_or(TableError::OutOfRange {
            what: "feature",
            index,
            bound: self.features.len(),
        })
    }

    pub(crate) fn feature_mut(&mut self, index: usize) -> Result<&mut Feature> {
        let bound = self.features.len();
        self.name_index = None;
        self.features.get_mut(index).ok_or(TableError::OutOfRange {
            what: "feature",
            index,
            bound,
        })
    }

    /// Truncate or extend to `n` features. New slots are untyped.
    pub fn set_n_features(&mut self, n: usize) {
        self.features.resize(n, Feature::default());
        self.name_index = None;
    }

    /// Append a descriptor.
    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
        // Invalidate name index
        self.name_index = None;
    }

    /// Append every descriptor of `other`.
    pub fn extend_from(&mut self, other: &Dictionary) {
        self.features.extend(other.features.iter().cloned());
        self.name_index = None;
    }

    /// Iterate over descriptors in column order.
    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// All descriptors as a slice.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Column index of the feature called `name`.
    ///
    /// Builds the name index on first call.
    pub fn feature_index(&mut self, name: &str) -> Option<usize> {
        if self.name_index.is_none() {
            self.build_name_index();
        }
        self.name_index.as_ref().and_then(|idx| idx.get(name).copied())
    }

    fn build_name_index(&mut self) {
        let mut index = HashMap::new();
        for (i, feature) in self.features.iter().enumerate() {
            if let Some(ref name) = feature.name {
                // First occurrence wins on duplicate names.
                index.entry(name.clone()).or_insert(i);
            }
        }
        self.name_index = Some(index);
    }

    /// Returns true if every feature has a numeric kind.
    pub fn is_fully_typed(&self) -> bool {
        self.features.iter().all(Feature::is_typed)
    }

    /// Index of the first untyped feature, if any.
    pub fn first_untyped(&self) -> Option<usize> {
        self.features.iter().position(|f| !f.is_typed())
    }

    /// Check if any feature is categorical.
    pub fn has_categorical(&self) -> bool {
        self.features.iter().any(|f| f.kind.is_categorical())
    }

    /// The single kind shared by every typed feature, if they agree.
    ///
    /// Returns `Ok(None)` when no feature is typed.
    pub fn common_kind(&self) -> Result<Option<NumKind>> {
        let mut common: Option<NumKind> = None;
        for (column, f) in self.features.iter().enumerate() {
            match (common, f.num_kind) {
                (None, k) => common = k,
                (Some(c), Some(k)) if c != k => {
                    return Err(TableError::TypeMismatch {
                        column,
                        requested: k,
                        stored: Some(c),
                    })
                }
                _ => {}
            }
        }
        Ok(common)
    }
}
