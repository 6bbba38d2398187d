//! Compressed sparse row storage.
//!
//! # Structure
//!
//! - `values`: non-zero values, stored row by row
//! - `col_indices`: column index for each value
//! - `row_offsets`: `row_offsets[r]` is the start of row `r`; length is
//!   `n_rows + 1`
//!
//! Indices and offsets carry the base chosen at construction
//! ([`Indexing::ZeroBased`] or [`Indexing::OneBased`]): for row `r` the
//! entries are `values[row_offsets[r] - base..row_offsets[r + 1] - base]` and
//! the column of entry `k` is `col_indices[k] - base`.
//!
//! Row and column reads rebuild dense slices. Writes are rejected with
//! `Unsupported` unless the storage is mutable, in which case the written
//! rows are re-sparsified: zeros are dropped and the row structure is
//! spliced in place. NaN is not zero and is stored.

use serde::{Deserialize, Serialize};

use super::{check_column, check_dictionary, check_rows, Storage, StorageLayout};
use crate::data::column::ColumnData;
use crate::data::dictionary::Dictionary;
use crate::data::element::{BlockBuf, BlockBufMut, Element, Scalar};
use crate::data::feature::NumKind;
use crate::error::{Result, TableError};

/// Index base of column indices and row offsets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Indexing {
    ZeroBased,
    #[default]
    OneBased,
}

impl Indexing {
    #[inline]
    pub fn base(self) -> usize {
        match self {
            Indexing::ZeroBased => 0,
            Indexing::OneBased => 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct CsrArrays {
    values: ColumnData,
    col_indices: Vec<usize>,
    row_offsets: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CsrStorage {
    kind: NumKind,
    n_rows: usize,
    n_cols: usize,
    indexing: Indexing,
    mutable: bool,
    data: Option<CsrArrays>,
}

impl CsrStorage {
    /// Unallocated storage of the given shape.
    pub fn new(kind: NumKind, n_rows: usize, n_cols: usize, indexing: Indexing) -> Self {
        Self {
            kind,
            n_rows,
            n_cols,
            indexing,
            mutable: false,
            data: None,
        }
    }

    /// Adopt the three CSR arrays after validating their structure.
    ///
    /// The row count is `row_offsets.len() - 1`.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if `row_offsets` is empty, not monotone, does
    ///   not start at the base or does not end at `nnz + base`, or if
    ///   `values` and `col_indices` differ in length
    /// - `OutOfRange` if a column index is outside `[base, n_cols + base)`
    pub fn from_raw_parts<T: Element>(
        n_cols: usize,
        values: Vec<T>,
        col_indices: Vec<usize>,
        row_offsets: Vec<usize>,
        indexing: Indexing,
    ) -> Result<Self> {
        let n_rows = row_offsets.len().checked_sub(1).ok_or(TableError::DimensionMismatch {
            field: "row offsets",
            expected: 1,
            got: 0,
        })?;
        let arrays = CsrArrays {
            values: ColumnData::from_vec(values),
            col_indices,
            row_offsets,
        };
        validate(&arrays, n_rows, n_cols, indexing.base())?;
        Ok(Self {
            kind: T::KIND,
            n_rows,
            n_cols,
            indexing,
            mutable: false,
            data: Some(arrays),
        })
    }

    /// Compress a dense row-major slice, dropping zeros.
    pub fn from_dense<T: Element>(n_rows: usize, n_cols: usize, dense: &[T], indexing: Indexing) -> Result<Self> {
        let expected = n_rows.saturating_mul(n_cols);
        if dense.len() != expected {
            return Err(TableError::DimensionMismatch {
                field: "dense data",
                expected,
                got: dense.len(),
            });
        }
        let base = indexing.base();
        let block = ColumnData::from_vec(dense.to_vec());
        let (values, col_indices, counts) = sparsify(&block, n_rows, n_cols, base);

        let mut row_offsets = Vec::with_capacity(n_rows + 1);
        row_offsets.push(base);
        let mut acc = base;
        for count in counts {
            acc += count;
            row_offsets.push(acc);
        }
        Ok(Self {
            kind: T::KIND,
            n_rows,
            n_cols,
            indexing,
            mutable: false,
            data: Some(CsrArrays {
                values,
                col_indices,
                row_offsets,
            }),
        })
    }

    /// Allow or forbid dense writes.
    pub fn with_mutable(mut self, mutable: bool) -> Self {
        self.mutable = mutable;
        self
    }

    pub fn set_mutable(&mut self, mutable: bool) {
        self.mutable = mutable;
    }

    #[inline]
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    #[inline]
    pub fn kind(&self) -> NumKind {
        self.kind
    }

    #[inline]
    pub fn indexing(&self) -> Indexing {
        self.indexing
    }

    pub fn values(&self) -> Option<&ColumnData> {
        self.data.as_ref().map(|d| &d.values)
    }

    pub fn column_indices(&self) -> Option<&[usize]> {
        self.data.as_ref().map(|d| d.col_indices.as_slice())
    }

    pub fn row_offsets(&self) -> Option<&[usize]> {
        self.data.as_ref().map(|d| d.row_offsets.as_slice())
    }

    /// Number of stored entries in row `row`.
    pub fn row_nnz(&self, row: usize) -> Result<usize> {
        let data = self.arrays()?;
        TableError::check_index("row", row, self.n_rows)?;
        Ok(data.row_offsets[row + 1] - data.row_offsets[row])
    }

    /// Fraction of cells stored.
    pub fn density(&self) -> f64 {
        let total = self.n_rows * self.n_cols;
        if total == 0 {
            0.0
        } else {
            self.nnz() as f64 / total as f64
        }
    }

    fn arrays(&self) -> Result<&CsrArrays> {
        self.data.as_ref().ok_or(TableError::Unallocated)
    }

    fn arrays_mut(&mut self) -> Result<&mut CsrArrays> {
        self.data.as_mut().ok_or(TableError::Unallocated)
    }

    /// Entry range of row `r` in `values` / `col_indices`.
    #[inline]
    fn row_range(data: &CsrArrays, r: usize, base: usize) -> std::ops::Range<usize> {
        data.row_offsets[r] - base..data.row_offsets[r + 1] - base
    }
}

/// Split a dense row-major block into non-zero values, based column
/// indices and per-row counts.
fn sparsify(block: &ColumnData, n_rows: usize, n_cols: usize, base: usize) -> (ColumnData, Vec<usize>, Vec<usize>) {
    let mut positions = Vec::new();
    let mut col_indices = Vec::new();
    let mut counts = vec![0usize; n_rows];
    for (r, count) in counts.iter_mut().enumerate() {
        for c in 0..n_cols {
            let i = r * n_cols + c;
            if !block.is_zero_at(i) {
                positions.push(i);
                col_indices.push(c + base);
                *count += 1;
            }
        }
    }
    (block.gather(&positions), col_indices, counts)
}

fn validate(data: &CsrArrays, n_rows: usize, n_cols: usize, base: usize) -> Result<()> {
    let offsets = &data.row_offsets;
    let nnz = data.values.len();
    if offsets.len() != n_rows + 1 {
        return Err(TableError::DimensionMismatch {
            field: "row offsets",
            expected: n_rows + 1,
            got: offsets.len(),
        });
    }
    if data.col_indices.len() != nnz {
        return Err(TableError::DimensionMismatch {
            field: "column indices",
            expected: nnz,
            got: data.col_indices.len(),
        });
    }
    if offsets[0] != base {
        return Err(TableError::DimensionMismatch {
            field: "first row offset",
            expected: base,
            got: offsets[0],
        });
    }
    for w in offsets.windows(2) {
        if w[1] < w[0] {
            return Err(TableError::DimensionMismatch {
                field: "row offsets",
                expected: w[0],
                got: w[1],
            });
        }
    }
    if offsets[n_rows] != nnz + base {
        return Err(TableError::DimensionMismatch {
            field: "last row offset",
            expected: nnz + base,
            got: offsets[n_rows],
        });
    }
    for &c in &data.col_indices {
        if c < base || c - base >= n_cols {
            return Err(TableError::OutOfRange {
                what: "column",
                index: c,
                bound: n_cols + base,
            });
        }
    }
    Ok(())
}

impl Storage for CsrStorage {
    fn layout(&self) -> StorageLayout {
        StorageLayout::Csr
    }

    fn n_rows(&self) -> usize {
        self.n_rows
    }

    fn n_cols(&self) -> usize {
        self.n_cols
    }

    fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    fn is_writable(&self) -> bool {
        self.mutable
    }

    fn column_kind(&self, col: usize) -> Option<NumKind> {
        (col < self.n_cols).then_some(self.kind)
    }

    fn resize(&mut self, n_rows: usize, n_cols: usize) -> Result<()> {
        self.n_rows = n_rows;
        self.n_cols = n_cols;
        self.data = None;
        Ok(())
    }

    /// Allocate an empty structure: every row has no stored entries.
    fn allocate(&mut self, dict: &Dictionary) -> Result<()> {
        check_dictionary(dict, self.n_cols, self.kind)?;
        self.data = Some(CsrArrays {
            values: ColumnData::zeros(self.kind, 0),
            col_indices: Vec::new(),
            row_offsets: vec![self.indexing.base(); self.n_rows + 1],
        });
        Ok(())
    }

    fn free(&mut self) {
        self.data = None;
    }

    fn read_rows(&self, start: usize, n: usize, mut dst: BlockBufMut<'_>) -> Result<()> {
        check_rows(self.is_allocated(), self.n_rows, self.n_cols, start, n, dst.len())?;
        let data = self.arrays()?;
        let base = self.indexing.base();
        dst.zero_range(0, n * self.n_cols);

        let lo = data.row_offsets[start] - base;
        let hi = data.row_offsets[start + n] - base;
        let mut src_pos = Vec::with_capacity(hi - lo);
        let mut dst_pos = Vec::with_capacity(hi - lo);
        for r in start..start + n {
            for k in Self::row_range(data, r, base) {
                src_pos.push(k);
                dst_pos.push((r - start) * self.n_cols + data.col_indices[k] - base);
            }
        }
        data.values.read_indexed(&src_pos, dst, &dst_pos);
        Ok(())
    }

    fn write_rows(&mut self, start: usize, n: usize, src: BlockBuf<'_>) -> Result<()> {
        if !self.mutable {
            return Err(TableError::Unsupported("dense write to immutable CSR storage"));
        }
        check_rows(self.is_allocated(), self.n_rows, self.n_cols, start, n, src.len())?;
        if n == 0 {
            return Ok(());
        }
        let base = self.indexing.base();
        let count = n * self.n_cols;
        let mut block = ColumnData::zeros(self.kind, count);
        block.write_from(0, 1, count, src, 0, 1);
        let (values, col_indices, counts) = sparsify(&block, n, self.n_cols, base);

        let data = self.arrays_mut()?;
        let lo = data.row_offsets[start] - base;
        let hi = data.row_offsets[start + n] - base;
        data.values.splice(lo, hi, &values);
        data.col_indices.splice(lo..hi, col_indices);

        let old_end = data.row_offsets[start + n];
        let mut acc = data.row_offsets[start];
        for (offset, count) in data.row_offsets[start + 1..=start + n].iter_mut().zip(counts) {
            acc += count;
            *offset = acc;
        }
        for offset in &mut data.row_offsets[start + n + 1..] {
            *offset = *offset - old_end + acc;
        }
        Ok(())
    }

    fn read_column(&self, col: usize, start: usize, n: usize, mut dst: BlockBufMut<'_>) -> Result<()> {
        check_column(self.is_allocated(), self.n_rows, self.n_cols, col, start, n, dst.len())?;
        let data = self.arrays()?;
        let base = self.indexing.base();
        dst.zero_range(0, n);

        let mut src_pos = Vec::new();
        let mut dst_pos = Vec::new();
        for r in start..start + n {
            if let Some(k) = Self::row_range(data, r, base).find(|&k| data.col_indices[k] - base == col) {
                src_pos.push(k);
                dst_pos.push(r - start);
            }
        }
        data.values.read_indexed(&src_pos, dst, &dst_pos);
        Ok(())
    }

    fn write_column(&mut self, col: usize, start: usize, n: usize, src: BlockBuf<'_>) -> Result<()> {
        if !self.mutable {
            return Err(TableError::Unsupported("dense write to immutable CSR storage"));
        }
        check_column(self.is_allocated(), self.n_rows, self.n_cols, col, start, n, src.len())?;
        let mut block = ColumnData::zeros(self.kind, n * self.n_cols);
        self.read_rows(start, n, block.as_buf_mut())?;
        block.write_from(col, self.n_cols, n, src, 0, 1);
        self.write_rows(start, n, block.as_buf())
    }

    fn nnz(&self) -> usize {
        self.data.as_ref().map_or(0, |d| d.values.len())
    }

    /// Sets every stored entry. Implicit zeros stay implicit.
    fn assign(&mut self, value: Scalar) -> Result<()> {
        self.arrays_mut()?.values.fill(value);
        Ok(())
    }

    fn check_invariants(&self) -> Result<()> {
        let Some(data) = &self.data else {
            return Ok(());
        };
        if data.values.kind() != self.kind {
            return Err(TableError::TypeMismatch {
                column: 0,
                requested: data.values.kind(),
                stored: Some(self.kind),
            });
        }
        validate(data, self.n_rows, self.n_cols, self.indexing.base())
    }
}
