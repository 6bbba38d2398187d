//! Core trait for table access.

use std::fmt::Debug;

use super::element::{BlockBuf, BlockBufMut};
use super::feature::Feature;
use crate::error::Result;

/// Block-access contract seen by algorithms.
///
/// Object safe: algorithms take `&dyn Table` / `&mut dyn Table` and never see
/// the storage layout. Typed convenience access (guards, `Vec` reads) lives
/// in [`TableExt`](super::TableExt), implemented for every `Table`.
///
/// # Block format
///
/// Row blocks are row-major: `n` rows of `n_cols()` values. Buffers may be of
/// any element kind; values are up-cast on read and down-cast on write
/// following the crate's cast policy.
///
/// # Errors
///
/// Requests are validated before any element is touched:
///
/// - `Unallocated` before [`allocate`](Self::allocate) or after [`free`](Self::free)
/// - `OutOfRange` when a row range or column index exceeds the shape
/// - `DimensionMismatch` when a buffer is too small
/// - `Unsupported` for writes to read-only storage
pub trait Table: Send + Sync + Debug {
    /// Number of rows.
    fn n_rows(&self) -> usize;

    /// Number of columns (features).
    fn n_cols(&self) -> usize;

    /// Descriptor of column `index`.
    fn feature(&self, index: usize) -> Result<Feature>;

    /// Replace the descriptor of column `index`.
    fn set_feature(&mut self, index: usize, feature: Feature) -> Result<()>;

    fn is_allocated(&self) -> bool;

    /// Returns false if block writes fail with `Unsupported`.
    fn is_writable(&self) -> bool;

    /// (Re)allocate zero-filled storage for the current shape.
    fn allocate(&mut self) -> Result<()>;

    /// Release storage. The shape and dictionary are kept.
    fn free(&mut self);

    /// Change the row count. Storage is re-allocated if it was allocated;
    /// previous contents are not preserved.
    fn set_n_rows(&mut self, n_rows: usize) -> Result<()>;

    /// Column count after `set_n_rows(n_rows)`, without changing anything.
    fn n_cols_for_rows(&self, _n_rows: usize) -> usize {
        self.n_cols()
    }

    fn read_rows(&self, start: usize, n: usize, dst: BlockBufMut<'_>) -> Result<()>;

    fn write_rows(&mut self, start: usize, n: usize, src: BlockBuf<'_>) -> Result<()>;

    fn read_column(&self, col: usize, start: usize, n: usize, dst: BlockBufMut<'_>) -> Result<()>;

    fn write_column(&mut self, col: usize, start: usize, n: usize, src: BlockBuf<'_>) -> Result<()>;

    /// Zero-copy row block in the stored kind, when the layout allows it.
    fn borrow_rows(&self, _start: usize, _n: usize) -> Option<BlockBuf<'_>> {
        None
    }

    fn borrow_rows_mut(&mut self, _start: usize, _n: usize) -> Option<BlockBufMut<'_>> {
        None
    }

    /// Zero-copy column range in the stored kind, when contiguous.
    fn borrow_column(&self, _col: usize, _start: usize, _n: usize) -> Option<BlockBuf<'_>> {
        None
    }

    fn borrow_column_mut(&mut self, _col: usize, _start: usize, _n: usize) -> Option<BlockBufMut<'_>> {
        None
    }
}
