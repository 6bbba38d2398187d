//! Dense row-major storage.

use serde::{Deserialize, Serialize};

use super::{check_column, check_dictionary, check_rows, Storage, StorageLayout};
use crate::data::column::ColumnData;
use crate::data::dictionary::Dictionary;
use crate::data::element::{BlockBuf, BlockBufMut, Element, Scalar};
use crate::data::feature::NumKind;
use crate::error::{Result, TableError};

/// Homogeneous dense storage, element `(r, c)` at `r * n_cols + c`.
///
/// Row blocks are contiguous, so same-kind row access is zero-copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowMajorStorage {
    kind: NumKind,
    n_rows: usize,
    n_cols: usize,
    data: Option<ColumnData>,
}

impl RowMajorStorage {
    /// Unallocated storage of the given shape.
    pub fn new(kind: NumKind, n_rows: usize, n_cols: usize) -> Self {
        Self {
            kind,
            n_rows,
            n_cols,
            data: None,
        }
    }

    /// Adopt a row-major vector.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if `data.len() != n_rows * n_cols`.
    pub fn from_vec<T: Element>(n_rows: usize, n_cols: usize, data: Vec<T>) -> Result<Self> {
        Self::from_data(n_rows, n_cols, ColumnData::from_vec(data))
    }

    pub fn from_data(n_rows: usize, n_cols: usize, data: ColumnData) -> Result<Self> {
        let expected = n_rows.checked_mul(n_cols).ok_or(TableError::DimensionMismatch {
            field: "row-major data",
            expected: usize::MAX,
            got: data.len(),
        })?;
        if data.len() != expected {
            return Err(TableError::DimensionMismatch {
                field: "row-major data",
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            kind: data.kind(),
            n_rows,
            n_cols,
            data: Some(data),
        })
    }

    #[inline]
    pub fn kind(&self) -> NumKind {
        self.kind
    }

    /// The whole buffer, if allocated.
    pub fn data(&self) -> Option<&ColumnData> {
        self.data.as_ref()
    }

    /// Typed mutable view of the whole buffer.
    pub fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T]> {
        let kind = self.kind;
        let data = self.data.as_mut().ok_or(TableError::Unallocated)?;
        data.as_mut_slice::<T>().ok_or(TableError::TypeMismatch {
            column: 0,
            requested: T::KIND,
            stored: Some(kind),
        })
    }

    fn data_ref(&self) -> Result<&ColumnData> {
        self.data.as_ref().ok_or(TableError::Unallocated)
    }

    fn data_mut(&mut self) -> Result<&mut ColumnData> {
        self.data.as_mut().ok_or(TableError::Unallocated)
    }
}

impl Storage for RowMajorStorage {
    fn layout(&self) -> StorageLayout {
        StorageLayout::RowMajor
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

    fn column_kind(&self, col: usize) -> Option<NumKind> {
        (col < self.n_cols).then_some(self.kind)
    }

    fn resize(&mut self, n_rows: usize, n_cols: usize) -> Result<()> {
        n_rows.checked_mul(n_cols).ok_or(TableError::DimensionMismatch {
            field: "row-major shape",
            expected: usize::MAX,
            got: n_rows,
        })?;
        self.n_rows = n_rows;
        self.n_cols = n_cols;
        self.data = None;
        Ok(())
    }

    fn allocate(&mut self, dict: &Dictionary) -> Result<()> {
        check_dictionary(dict, self.n_cols, self.kind)?;
        self.data = Some(ColumnData::zeros(self.kind, self.n_rows * self.n_cols));
        Ok(())
    }

    fn free(&mut self) {
        self.data = None;
    }

    fn read_rows(&self, start: usize, n: usize, dst: BlockBufMut<'_>) -> Result<()> {
        check_rows(self.is_allocated(), self.n_rows, self.n_cols, start, n, dst.len())?;
        let count = n * self.n_cols;
        self.data_ref()?.read_into(start * self.n_cols, 1, count, dst, 0, 1);
        Ok(())
    }

    fn write_rows(&mut self, start: usize, n: usize, src: BlockBuf<'_>) -> Result<()> {
        check_rows(self.is_allocated(), self.n_rows, self.n_cols, start, n, src.len())?;
        let count = n * self.n_cols;
        let offset = start * self.n_cols;
        self.data_mut()?.write_from(offset, 1, count, src, 0, 1);
        Ok(())
    }

    fn read_column(&self, col: usize, start: usize, n: usize, dst: BlockBufMut<'_>) -> Result<()> {
        check_column(self.is_allocated(), self.n_rows, self.n_cols, col, start, n, dst.len())?;
        let offset = start * self.n_cols + col;
        self.data_ref()?.read_into(offset, self.n_cols, n, dst, 0, 1);
        Ok(())
    }

    fn write_column(&mut self, col: usize, start: usize, n: usize, src: BlockBuf<'_>) -> Result<()> {
        check_column(self.is_allocated(), self.n_rows, self.n_cols, col, start, n, src.len())?;
        let offset = start * self.n_cols + col;
        let stride = self.n_cols;
        self.data_mut()?.write_from(offset, stride, n, src, 0, 1);
        Ok(())
    }

    fn borrow_rows(&self, start: usize, n: usize) -> Option<BlockBuf<'_>> {
        let lo = start.checked_mul(self.n_cols)?;
        let hi = lo.checked_add(n.checked_mul(self.n_cols)?)?;
        let data = self.data.as_ref()?;
        (hi <= data.len()).then(|| data.as_buf().slice(lo, hi))
    }

    fn borrow_rows_mut(&mut self, start: usize, n: usize) -> Option<BlockBufMut<'_>> {
        let lo = start.checked_mul(self.n_cols)?;
        let hi = lo.checked_add(n.checked_mul(self.n_cols)?)?;
        let data = self.data.as_mut()?;
        if hi > data.len() {
            return None;
        }
        Some(data.as_buf_mut().slice(lo, hi))
    }

    // A single-column table stores its column contiguously.
    fn borrow_column(&self, col: usize, start: usize, n: usize) -> Option<BlockBuf<'_>> {
        if self.n_cols != 1 || col != 0 {
            return None;
        }
        self.borrow_rows(start, n)
    }

    fn borrow_column_mut(&mut self, col: usize, start: usize, n: usize) -> Option<BlockBufMut<'_>> {
        if self.n_cols != 1 || col != 0 {
            return None;
        }
        self.borrow_rows_mut(start, n)
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
        let expected = self.n_rows.checked_mul(self.n_cols).unwrap_or(usize::MAX);
        if data.len() != expected {
            return Err(TableError::DimensionMismatch {
                field: "row-major data",
                expected,
                got: data.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RowMajorStorage {
        RowMajorStorage::from_vec(3, 2, vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap()
    }

    #[test]
    fn read_rows_casts_to_buffer_kind() {
        let s = sample();
        let mut out = [0i32; 4];
        s.read_rows(1, 2, i32::buf_mut(&mut out)).unwrap();
        assert_eq!(out, [3, 4, 5, 6]);
    }

    #[test]
    fn write_column_strides() {
        let mut s = sample();
        s.write_column(1, 0, 3, f32::buf(&[20.0, 40.0, 60.0])).unwrap();
        assert_eq!(
            s.data().unwrap().as_slice::<f64>().unwrap(),
            &[1.0, 20.0, 3.0, 40.0, 5.0, 60.0]
        );

        let mut col = [0.0f64; 2];
        s.read_column(0, 1, 2, f64::buf_mut(&mut col)).unwrap();
        assert_eq!(col, [3.0, 5.0]);
    }

    #[test]
    fn out_of_range_rejected_before_touching_data() {
        let mut s = sample();
        let before = s.clone();
        let err = s.write_rows(2, 2, f64::buf(&[0.0; 4])).unwrap_err();
        assert!(matches!(err, TableError::OutOfRange { .. }));
        assert_eq!(s, before);
    }

    #[test]
    fn unallocated_until_allocate() {
        let mut s = RowMajorStorage::new(NumKind::I64, 2, 2);
        let mut out = [0i64; 4];
        assert_eq!(s.read_rows(0, 2, i64::buf_mut(&mut out)), Err(TableError::Unallocated));

        s.allocate(&Dictionary::homogeneous(2, NumKind::I64)).unwrap();
        s.read_rows(0, 2, i64::buf_mut(&mut out)).unwrap();
        assert_eq!(out, [0; 4]);

        s.free();
        assert!(!s.is_allocated());
        assert_eq!(s.nnz(), 0);
    }

    #[test]
    fn allocate_rejects_foreign_dictionary_kind() {
        let mut s = RowMajorStorage::new(NumKind::F32, 2, 2);
        let err = s.allocate(&Dictionary::homogeneous(2, NumKind::F64)).unwrap_err();
        assert!(matches!(err, TableError::TypeMismatch { column: 0, .. }));
    }

    #[test]
    fn borrow_rows_is_zero_copy() {
        let mut s = sample();
        let view = s.borrow_rows(1, 1).unwrap();
        assert_eq!(f64::from_buf(view), Some(&[3.0, 4.0][..]));

        if let Some(buf) = s.borrow_rows_mut(2, 1) {
            let slice = f64::from_buf_mut(buf).unwrap();
            slice[0] = 50.0;
        }
        assert_eq!(s.data().unwrap().as_slice::<f64>().unwrap()[4], 50.0);
        assert!(s.borrow_rows(2, 2).is_none());
        assert!(s.borrow_column(0, 0, 1).is_none());
    }

    #[test]
    fn from_vec_checks_length() {
        let err = RowMajorStorage::from_vec(2, 2, vec![1i32; 3]).unwrap_err();
        assert_eq!(
            err,
            TableError::DimensionMismatch {
                field: "row-major data",
                expected: 4,
                got: 3
            }
        );
    }
}
