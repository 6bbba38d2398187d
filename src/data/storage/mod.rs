//! Storage backends.
//!
//! Every backend implements [`Storage`], the block-access contract the table
//! facade delegates to. Requests are validated in full before any element is
//! touched; a failed call leaves the backend unchanged.
//!
//! # Backends
//!
//! - [`RowMajorStorage`]: one homogeneous buffer, `row * n_cols + col`
//! - [`ColumnMajorStorage`]: one independently typed array per column
//! - [`PackedStorage`]: symmetric `n x n` matrix stored as one triangle
//! - [`CsrStorage`]: compressed sparse rows
//!
//! [`Backend`] is the closed sum of the four, used wherever the layout is
//! chosen at runtime (configuration, deserialization).

mod column_major;
mod csr;
mod packed;
mod row_major;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

pub use column_major::ColumnMajorStorage;
pub use csr::{CsrStorage, Indexing};
pub use packed::{packed_len, PackedStorage, Triangle};
pub use row_major::RowMajorStorage;

use super::dictionary::Dictionary;
use super::element::{BlockBuf, BlockBufMut, Scalar};
use super::feature::NumKind;
use crate::error::{Result, TableError};

/// Physical layout of a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageLayout {
    RowMajor,
    ColumnMajor,
    Packed,
    Csr,
}

impl StorageLayout {
    /// One-byte identifier used in serialized headers.
    #[inline]
    pub fn tag(self) -> u8 {
        match self {
            StorageLayout::RowMajor => 0,
            StorageLayout::ColumnMajor => 1,
            StorageLayout::Packed => 2,
            StorageLayout::Csr => 3,
        }
    }

    #[inline]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(StorageLayout::RowMajor),
            1 => Some(StorageLayout::ColumnMajor),
            2 => Some(StorageLayout::Packed),
            3 => Some(StorageLayout::Csr),
            _ => None,
        }
    }

    /// Returns true if every column shares one stored kind.
    #[inline]
    pub fn is_homogeneous(self) -> bool {
        !matches!(self, StorageLayout::ColumnMajor)
    }
}

/// Block-access contract shared by all backends.
///
/// Row blocks are always exchanged row-major: `n` rows of `n_cols` values.
/// Buffers may be of any [`NumKind`]; values are up-cast on read and
/// down-cast on write.
pub trait Storage: Send + Sync + Debug {
    fn layout(&self) -> StorageLayout;

    fn n_rows(&self) -> usize;

    fn n_cols(&self) -> usize;

    fn is_allocated(&self) -> bool;

    /// Returns false if writes are rejected with `Unsupported`.
    fn is_writable(&self) -> bool {
        true
    }

    /// Stored kind of column `col`.
    fn column_kind(&self, col: usize) -> Option<NumKind>;

    /// Change the shape. Existing data is dropped.
    fn resize(&mut self, n_rows: usize, n_cols: usize) -> Result<()>;

    /// (Re)allocate zero-filled storage for the current shape.
    ///
    /// `dict` must describe exactly `n_cols` columns.
    fn allocate(&mut self, dict: &Dictionary) -> Result<()>;

    /// Drop the storage. The shape is kept.
    fn free(&mut self);

    /// Up-cast rows `[start, start + n)` into `dst`.
    fn read_rows(&self, start: usize, n: usize, dst: BlockBufMut<'_>) -> Result<()>;

    /// Down-cast `src` into rows `[start, start + n)`.
    fn write_rows(&mut self, start: usize, n: usize, src: BlockBuf<'_>) -> Result<()>;

    /// Up-cast rows `[start, start + n)` of column `col` into `dst`.
    fn read_column(&self, col: usize, start: usize, n: usize, dst: BlockBufMut<'_>) -> Result<()>;

    /// Down-cast `src` into rows `[start, start + n)` of column `col`.
    fn write_column(&mut self, col: usize, start: usize, n: usize, src: BlockBuf<'_>) -> Result<()>;

    /// Zero-copy view of a row block in the stored kind, if the layout has one.
    fn borrow_rows(&self, _start: usize, _n: usize) -> Option<BlockBuf<'_>> {
        None
    }

    fn borrow_rows_mut(&mut self, _start: usize, _n: usize) -> Option<BlockBufMut<'_>> {
        None
    }

    /// Zero-copy view of a column range in the stored kind, if contiguous.
    fn borrow_column(&self, _col: usize, _start: usize, _n: usize) -> Option<BlockBuf<'_>> {
        None
    }

    fn borrow_column_mut(&mut self, _col: usize, _start: usize, _n: usize) -> Option<BlockBufMut<'_>> {
        None
    }

    /// Number of stored elements.
    fn nnz(&self) -> usize;

    /// Set every stored element to `value`.
    fn assign(&mut self, value: Scalar) -> Result<()>;

    /// Verify the structural invariants of the allocated buffers.
    fn check_invariants(&self) -> Result<()>;
}

// =============================================================================
// Shared validation
// =============================================================================

/// Validate a row-block request against a backend's state.
pub(crate) fn check_rows(
    allocated: bool,
    n_rows: usize,
    n_cols: usize,
    start: usize,
    n: usize,
    buf_len: usize,
) -> Result<()> {
    if !allocated {
        return Err(TableError::Unallocated);
    }
    TableError::check_range("row", start, n, n_rows)?;
    TableError::check_len("row block", n.saturating_mul(n_cols), buf_len)
}

/// Validate a column-block request against a backend's state.
pub(crate) fn check_column(
    allocated: bool,
    n_rows: usize,
    n_cols: usize,
    col: usize,
    start: usize,
    n: usize,
    buf_len: usize,
) -> Result<()> {
    if !allocated {
        return Err(TableError::Unallocated);
    }
    TableError::check_index("column", col, n_cols)?;
    TableError::check_range("row", start, n, n_rows)?;
    TableError::check_len("column block", n, buf_len)
}

/// Check `dict` against a homogeneous backend of `kind` with `n_cols` columns.
pub(crate) fn check_dictionary(dict: &Dictionary, n_cols: usize, kind: NumKind) -> Result<()> {
    if dict.len() != n_cols {
        return Err(TableError::DimensionMismatch {
            field: "dictionary",
            expected: n_cols,
            got: dict.len(),
        });
    }
    for (column, f) in dict.iter().enumerate() {
        if let Some(k) = f.num_kind {
            if k != kind {
                return Err(TableError::TypeMismatch {
                    column,
                    requested: k,
                    stored: Some(kind),
                });
            }
        }
    }
    Ok(())
}

// =============================================================================
// Backend
// =============================================================================

/// Any of the four storage backends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Backend {
    RowMajor(RowMajorStorage),
    ColumnMajor(ColumnMajorStorage),
    Packed(PackedStorage),
    Csr(CsrStorage),
}

macro_rules! delegate {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            Backend::RowMajor($s) => $body,
            Backend::ColumnMajor($s) => $body,
            Backend::Packed($s) => $body,
            Backend::Csr($s) => $body,
        }
    };
}

impl Storage for Backend {
    fn layout(&self) -> StorageLayout {
        delegate!(self, s => s.layout())
    }

    fn n_rows(&self) -> usize {
        delegate!(self, s => s.n_rows())
    }

    fn n_cols(&self) -> usize {
        delegate!(self, s => s.n_cols())
    }

    fn is_allocated(&self) -> bool {
        delegate!(self, s => s.is_allocated())
    }

    fn is_writable(&self) -> bool {
        delegate!(self, s => s.is_writable())
    }

    fn column_kind(&self, col: usize) -> Option<NumKind> {
        delegate!(self, s => s.column_kind(col))
    }

    fn resize(&mut self, n_rows: usize, n_cols: usize) -> Result<()> {
        delegate!(self, s => s.resize(n_rows, n_cols))
    }

    fn allocate(&mut self, dict: &Dictionary) -> Result<()> {
        delegate!(self, s => s.allocate(dict))
    }

    fn free(&mut self) {
        delegate!(self, s => s.free())
    }

    fn read_rows(&self, start: usize, n: usize, dst: BlockBufMut<'_>) -> Result<()> {
        delegate!(self, s => s.read_rows(start, n, dst))
    }

    fn write_rows(&mut self, start: usize, n: usize, src: BlockBuf<'_>) -> Result<()> {
        delegate!(self, s => s.write_rows(start, n, src))
    }

    fn read_column(&self, col: usize, start: usize, n: usize, dst: BlockBufMut<'_>) -> Result<()> {
        delegate!(self, s => s.read_column(col, start, n, dst))
    }

    fn write_column(&mut self, col: usize, start: usize, n: usize, src: BlockBuf<'_>) -> Result<()> {
        delegate!(self, s => s.write_column(col, start, n, src))
    }

    fn borrow_rows(&self, start: usize, n: usize) -> Option<BlockBuf<'_>> {
        delegate!(self, s => s.borrow_rows(start, n))
    }

    fn borrow_rows_mut(&mut self, start: usize, n: usize) -> Option<BlockBufMut<'_>> {
        delegate!(self, s => s.borrow_rows_mut(start, n))
    }

    fn borrow_column(&self, col: usize, start: usize, n: usize) -> Option<BlockBuf<'_>> {
        delegate!(self, s => s.borrow_column(col, start, n))
    }

    fn borrow_column_mut(&mut self, col: usize, start: usize, n: usize) -> Option<BlockBufMut<'_>> {
        delegate!(self, s => s.borrow_column_mut(col, start, n))
    }

    fn nnz(&self) -> usize {
        delegate!(self, s => s.nnz())
    }

    fn assign(&mut self, value: Scalar) -> Result<()> {
        delegate!(self, s => s.assign(value))
    }

    fn check_invariants(&self) -> Result<()> {
        delegate!(self, s => s.check_invariants())
    }
}

impl Backend {
    pub fn as_row_major(&self) -> Option<&RowMajorStorage> {
        match self {
            Backend::RowMajor(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_column_major(&self) -> Option<&ColumnMajorStorage> {
        match self {
            Backend::ColumnMajor(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_column_major_mut(&mut self) -> Option<&mut ColumnMajorStorage> {
        match self {
            Backend::ColumnMajor(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_packed(&self) -> Option<&PackedStorage> {
        match self {
            Backend::Packed(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_packed_mut(&mut self) -> Option<&mut PackedStorage> {
        match self {
            Backend::Packed(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_csr(&self) -> Option<&CsrStorage> {
        match self {
            Backend::Csr(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_csr_mut(&mut self) -> Option<&mut CsrStorage> {
        match self {
            Backend::Csr(s) => Some(s),
            _ => None,
        }
    }

    /// Stored kind shared by all columns, for homogeneous layouts.
    pub fn homogeneous_kind(&self) -> Option<NumKind> {
        match self {
            Backend::RowMajor(s) => Some(s.kind()),
            Backend::ColumnMajor(_) => None,
            Backend::Packed(s) => Some(s.kind()),
            Backend::Csr(s) => Some(s.kind()),
        }
    }

    /// Re-type column `col` of a column-major backend, converting its data.
    pub(crate) fn retype_column(&mut self, col: usize, kind: NumKind) -> Result<()> {
        match self {
            Backend::ColumnMajor(s) => s.retype(col, kind),
            _ => Err(TableError::Unsupported("per-column kinds need column-major storage")),
        }
    }
}

impl From<RowMajorStorage> for Backend {
    fn from(s: RowMajorStorage) -> Self {
        Backend::RowMajor(s)
    }
}

impl From<ColumnMajorStorage> for Backend {
    fn from(s: ColumnMajorStorage) -> Self {
        Backend::ColumnMajor(s)
    }
}

impl From<PackedStorage> for Backend {
    fn from(s: PackedStorage) -> Self {
        Backend::Packed(s)
    }
}

impl From<CsrStorage> for Backend {
    fn from(s: CsrStorage) -> Self {
        Backend::Csr(s)
    }
}
