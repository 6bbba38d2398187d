//! Feature descriptors.
//!
//! A [`Feature`] describes one column: the numeric kind its values are stored
//! as, how the values are to be interpreted ([`FeatureKind`]), and for
//! categorical columns the number of category levels.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::element::Element;

/// Closed set of numeric kinds a column can be stored as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumKind {
    F64,
    F32,
    I32,
    I64,
}

impl NumKind {
    /// All kinds, in tag order.
    pub const ALL: [NumKind; 4] = [NumKind::F64, NumKind::F32, NumKind::I32, NumKind::I64];

    /// Size of one element in bytes.
    #[inline]
    pub fn size_of(self) -> usize {
        match self {
            NumKind::F64 | NumKind::I64 => 8,
            NumKind::F32 | NumKind::I32 => 4,
        }
    }

    /// Returns true for the integer kinds.
    #[inline]
    pub fn is_integer(self) -> bool {
        matches!(self, NumKind::I32 | NumKind::I64)
    }

    /// Kind of the Rust element type `T`.
    #[inline]
    pub fn of<T: Element>() -> Self {
        T::KIND
    }
}

impl fmt::Display for NumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NumKind::F64 => "f64",
            NumKind::F32 => "f32",
            NumKind::I32 => "i32",
            NumKind::I64 => "i64",
        };
        f.write_str(name)
    }
}

/// How a column's values are interpreted by consumers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Continuous numeric feature.
    #[default]
    Continuous,

    /// Ordered discrete levels.
    Ordinal,

    /// Unordered category IDs `0..n_categories`.
    Categorical,
}

impl FeatureKind {
    /// Returns true if this is a categorical feature.
    #[inline]
    pub fn is_categorical(&self) -> bool {
        matches!(self, FeatureKind::Categorical)
    }
}

/// Descriptor of a single column.
///
/// A default descriptor is *untyped* (`num_kind == None`): it reserves a
/// column slot without fixing how the column is stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    /// Optional column name.
    pub name: Option<String>,

    /// Declared storage kind, `None` while untyped.
    pub num_kind: Option<NumKind>,

    /// Semantic kind.
    pub kind: FeatureKind,

    /// Number of category levels (categorical features only).
    pub n_categories: usize,
}

impl Feature {
    /// Continuous feature stored as `num_kind`.
    pub fn new(num_kind: NumKind) -> Self {
        Self {
            num_kind: Some(num_kind),
            ..Self::default()
        }
    }

    /// Continuous feature stored as the element type `T`.
    pub fn of<T: Element>() -> Self {
        Self::new(T::KIND)
    }

    /// Ordinal feature stored as `num_kind`.
    pub fn ordinal(num_kind: NumKind) -> Self {
        Self {
            kind: FeatureKind::Ordinal,
            ..Self::new(num_kind)
        }
    }

    /// Categorical feature with `n_categories` levels.
    pub fn categorical(num_kind: NumKind, n_categories: usize) -> Self {
        Self {
            kind: FeatureKind::Categorical,
            n_categories,
            ..Self::new(num_kind)
        }
    }

    /// Set the feature name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns true once a numeric kind has been declared.
    #[inline]
    pub fn is_typed(&self) -> bool {
        self.num_kind.is_some()
    }

    pub fn set_num_kind(&mut self, num_kind: NumKind) {
        self.num_kind = Some(num_kind);
    }

    pub fn set_feature_kind(&mut self, kind: FeatureKind) {
        self.kind = kind;
    }

    pub fn set_n_categories(&mut self, n_categories: usize) {
        self.n_categories = n_categories;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }
}
