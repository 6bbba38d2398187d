//! Packed symmetric storage.
//!
//! A symmetric `n x n` matrix stored as one triangle in a single buffer of
//! `n * (n + 1) / 2` elements. The triangle is fixed at construction:
//!
//! - [`Triangle::Upper`] stores the rows of the upper triangle. `(i, j)` with
//!   `i <= j` lives at `i * n - i * (i - 1) / 2 + (j - i)`.
//! - [`Triangle::Lower`] stores the rows of the lower triangle. `(i, j)` with
//!   `i >= j` lives at `i * (i + 1) / 2 + j`.
//!
//! `(i, j)` and `(j, i)` always resolve to the same packed index.

use serde::{Deserialize, Serialize};

use super::{check_column, check_dictionary, check_rows, Storage, StorageLayout};
use crate::data::column::ColumnData;
use crate::data::dictionary::Dictionary;
use crate::data::element::{BlockBuf, BlockBufMut, Element, Scalar};
use crate::data::feature::NumKind;
use crate::error::{Result, TableError};

/// Which triangle a packed buffer holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Triangle {
    #[default]
    Upper,
    Lower,
}

/// Length of the packed buffer for an `n x n` matrix.
#[inline]
pub fn packed_len(n: usize) -> usize {
    n * (n + 1) / 2
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PackedStorage {
    kind: NumKind,
    n: usize,
    triangle: Triangle,
    data: Option<ColumnData>,
}

impl PackedStorage {
    /// Unallocated `n x n` storage.
    pub fn new(kind: NumKind, n: usize, triangle: Triangle) -> Self {
        Self {
            kind,
            n,
            triangle,
            data: None,
        }
    }

    /// Adopt a packed buffer for an `n x n` matrix.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if `packed.len() != n * (n + 1) / 2`.
    pub fn from_vec<T: Element>(n: usize, triangle: Triangle, packed: Vec<T>) -> Result<Self> {
        if packed.len() != packed_len(n) {
            return Err(TableError::DimensionMismatch {
                field: "packed array",
                expected: packed_len(n),
                got: packed.len(),
            });
        }
        Ok(Self {
            kind: T::KIND,
            n,
            triangle,
            data: Some(ColumnData::from_vec(packed)),
        })
    }

    #[inline]
    pub fn kind(&self) -> NumKind {
        self.kind
    }

    #[inline]
    pub fn triangle(&self) -> Triangle {
        self.triangle
    }

    /// Matrix order `n`.
    #[inline]
    pub fn order(&self) -> usize {
        self.n
    }

    /// Packed index of element `(i, j)`. Both `(i, j)` and `(j, i)` map to
    /// the same slot.
    #[inline]
    pub fn packed_index(&self, i: usize, j: usize) -> usize {
        match self.triangle {
            Triangle::Upper => {
                let (i, j) = if i <= j { (i, j) } else { (j, i) };
                // i * n - i * (i - 1) / 2, without underflow at i == 0.
                i * (2 * self.n - i + 1) / 2 + (j - i)
            }
            Triangle::Lower => {
                let (i, j) = if i >= j { (i, j) } else { (j, i) };
                i * (i + 1) / 2 + j
            }
        }
    }

    /// The triangular buffer as a typed slice.
    pub fn packed_array<T: Element>(&self) -> Result<&[T]> {
        let data = self.data.as_ref().ok_or(TableError::Unallocated)?;
        data.as_slice::<T>().ok_or(TableError::TypeMismatch {
            column: 0,
            requested: T::KIND,
            stored: Some(self.kind),
        })
    }

    /// The triangular buffer as a typed mutable slice.
    pub fn packed_array_mut<T: Element>(&mut self) -> Result<&mut [T]> {
        let kind = self.kind;
        let data = self.data.as_mut().ok_or(TableError::Unallocated)?;
        data.as_mut_slice::<T>().ok_or(TableError::TypeMismatch {
            column: 0,
            requested: T::KIND,
            stored: Some(kind),
        })
    }

    /// Up-cast the whole triangular buffer into `dst`.
    pub fn read_packed(&self, dst: BlockBufMut<'_>) -> Result<()> {
        let data = self.data.as_ref().ok_or(TableError::Unallocated)?;
        TableError::check_len("packed array", data.len(), dst.len())?;
        data.read_into(0, 1, data.len(), dst, 0, 1);
        Ok(())
    }

    /// Down-cast `src` into the whole triangular buffer.
    pub fn write_packed(&mut self, src: BlockBuf<'_>) -> Result<()> {
        let data = self.data.as_mut().ok_or(TableError::Unallocated)?;
        TableError::check_len("packed array", data.len(), src.len())?;
        let len = data.len();
        data.write_from(0, 1, len, src, 0, 1);
        Ok(())
    }

    /// Packed positions of rows `[start, start + n)`, in row-major order.
    fn row_positions(&self, start: usize, n: usize) -> Vec<usize> {
        let mut pos = Vec::with_capacity(n * self.n);
        for r in start..start + n {
            pos.extend((0..self.n).map(|c| self.packed_index(r, c)));
        }
        pos
    }

    fn data_ref(&self) -> Result<&ColumnData> {
        self.data.as_ref().ok_or(TableError::Unallocated)
    }

    fn data_mut(&mut self) -> Result<&mut ColumnData> {
        self.data.as_mut().ok_or(TableError::Unallocated)
    }
}

impl Storage for PackedStorage {
    fn layout(&self) -> StorageLayout {
        StorageLayout::Packed
    }

    fn n_rows(&self) -> usize {
        self.n
    }

    fn n_cols(&self) -> usize {
        self.n
    }

    fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    fn column_kind(&self, col: usize) -> Option<NumKind> {
        (col < self.n).then_some(self.kind)
    }

    fn resize(&mut self, n_rows: usize, n_cols: usize) -> Result<()> {
        if n_rows != n_cols {
            return Err(TableError::DimensionMismatch {
                field: "packed dimension",
                expected: n_rows,
                got: n_cols,
            });
        }
        self.n = n_rows;
        self.data = None;
        Ok(())
    }

    fn allocate(&mut self, dict: &Dictionary) -> Result<()> {
        check_dictionary(dict, self.n, self.kind)?;
        self.data = Some(ColumnData::zeros(self.kind, packed_len(self.n)));
        Ok(())
    }

    fn free(&mut self) {
        self.data = None;
    }

    fn read_rows(&self, start: usize, n: usize, dst: BlockBufMut<'_>) -> Result<()> {
        check_rows(self.is_allocated(), self.n, self.n, start, n, dst.len())?;
        let src_pos = self.row_positions(start, n);
        let dst_pos: Vec<usize> = (0..src_pos.len()).collect();
        self.data_ref()?.read_indexed(&src_pos, dst, &dst_pos);
        Ok(())
    }

    // Mirrored cells inside one block are written in row-major order, so the
    // later cell wins.
    fn write_rows(&mut self, start: usize, n: usize, src: BlockBuf<'_>) -> Result<()> {
        check_rows(self.is_allocated(), self.n, self.n, start, n, src.len())?;
        let dst_pos = self.row_positions(start, n);
        let src_pos: Vec<usize> = (0..dst_pos.len()).collect();
        self.data_mut()?.write_indexed(&dst_pos, src, &src_pos);
        Ok(())
    }

    fn read_column(&self, col: usize, start: usize, n: usize, dst: BlockBufMut<'_>) -> Result<()> {
        check_column(self.is_allocated(), self.n, self.n, col, start, n, dst.len())?;
        let src_pos: Vec<usize> = (start..start + n).map(|r| self.packed_index(r, col)).collect();
        let dst_pos: Vec<usize> = (0..n).collect();
        self.data_ref()?.read_indexed(&src_pos, dst, &dst_pos);
        Ok(())
    }

    fn write_column(&mut self, col: usize, start: usize, n: usize, src: BlockBuf<'_>) -> Result<()> {
        check_column(self.is_allocated(), self.n, self.n, col, start, n, src.len())?;
        let dst_pos: Vec<usize> = (start..start + n).map(|r| self.packed_index(r, col)).collect();
        let src_pos: Vec<usize> = (0..n).collect();
        self.data_mut()?.write_indexed(&dst_pos, src, &src_pos);
        Ok(())
    }

    fn nnz(&self) -> usize {
        self.data.as_ref().map_or(0, ColumnData::len)
    }

    fn assign(&mut self, value: Scalar) -> Result<()> {
        self.data_mut()?.fill(value);
        Ok(())
    }

    fn check_invariants(&self) -> Result<()> {
        let Some(data) = &self.data else {
            return Ok(());
        };
        if data.kind() != self.kind {
            return Err(TableError::TypeMismatch {
                column: 0,
                requested: data.kind(),
                stored: Some(self.kind),
            });
        }
        if data.len() != packed_len(self.n) {
            return Err(TableError::DimensionMismatch {
                field: "packed array",
                expected: packed_len(self.n),
                got: data.len(),
            });
        }
        Ok(())
    }
}
