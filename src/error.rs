//! Error types for table operations.
//!
//! Every failure in this crate is local and synchronous: a request is
//! validated before any element is touched, so an error never leaves a
//! table partially updated.

use thiserror::Error;

use crate::data::NumKind;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TableError>;

/// Errors raised by dictionaries, storage backends and tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// A row, column or feature index is beyond its bound.
    #[error("{what} index {index} out of range (bound {bound})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        bound: usize,
    },

    /// A buffer or column kind is incompatible with the stored kind.
    #[error("type mismatch on column {column}: requested {requested}, stored {stored:?}")]
    TypeMismatch {
        column: usize,
        requested: NumKind,
        stored: Option<NumKind>,
    },

    /// Block access before `allocate` or after `free`.
    #[error("table storage is not allocated")]
    Unallocated,

    /// The backend does not support the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Shapes or lengths disagree.
    #[error("dimension mismatch in {field}: expected {expected}, got {got}")]
    DimensionMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },
}

impl TableError {
    /// Check that `[start, start + count)` fits inside `bound`.
    #[inline]
    pub(crate) fn check_range(
        what: &'static str,
        start: usize,
        count: usize,
        bound: usize,
    ) -> Result<()> {
        match start.checked_add(count) {
            Some(end) if end <= bound => Ok(()),
            _ => Err(TableError::OutOfRange {
                what,
                index: start.saturating_add(count),
                bound,
            }),
        }
    }

    /// Check that `index < bound`.
    #[inline]
    pub(crate) fn check_index(what: &'static str, index: usize, bound: usize) -> Result<()> {
        if index < bound {
            Ok(())
        } else {
            Err(TableError::OutOfRange { what, index, bound })
        }
    }

    /// Check that a buffer holds at least `needed` elements.
    #[inline]
    pub(crate) fn check_len(field: &'static str, needed: usize, got: usize) -> Result<()> {
        if got >= needed {
            Ok(())
        } else {
            Err(TableError::DimensionMismatch {
                field,
                expected: needed,
                got,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check_accepts_exact_end() {
        assert!(TableError::check_range("row", 1, 2, 3).is_ok());
        assert!(TableError::check_range("row", 3, 0, 3).is_ok());
    }

    #[test]
    fn range_check_rejects_overflow() {
        let err = TableError::check_range("row", 2, 2, 3).unwrap_err();
        assert_eq!(
            err,
            TableError::OutOfRange {
                what: "row",
                index: 4,
                bound: 3
            }
        );
        assert!(TableError::check_range("row", usize::MAX, 2, 3).is_err());
    }

    #[test]
    fn messages_name_the_offender() {
        let err = TableError::TypeMismatch {
            column: 2,
            requested: NumKind::F32,
            stored: Some(NumKind::F64),
        };
        let msg = err.to_string();
        assert!(msg.contains("column 2"));
        assert!(msg.contains("f32"));
    }
}
