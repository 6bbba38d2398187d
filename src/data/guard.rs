//! Typed block access and write guards.
//!
//! [`TableExt`] layers typed convenience over the object-safe [`Table`]
//! trait. Reads return a [`Cow`]: borrowed straight from storage when the
//! requested kind equals the stored kind and the block is contiguous,
//! otherwise an up-cast copy.
//!
//! Writes go through a [`BlockMut`] guard. It derefs to `[T]` and writes the
//! block back on [`release`](BlockMut::release), or on drop if it was never
//! released. A direct guard points into storage and has nothing to write
//! back.

use std::borrow::Cow;
use std::fmt;
use std::ops::{Deref, DerefMut};

use ndarray::Array2;
use tracing::warn;

use super::element::Element;
use super::traits::Table;
use crate::error::{Result, TableError};

type CommitFn<'a, T> = Box<dyn FnOnce(&[T]) -> Result<()> + Send + 'a>;

enum Inner<'a, T> {
    Direct(&'a mut [T]),
    Staged {
        buf: Vec<T>,
        commit: Option<CommitFn<'a, T>>,
    },
}

/// Mutable block view that commits on release.
///
/// Holding the guard borrows the table mutably, so no other access can
/// observe a half-written block.
pub struct BlockMut<'a, T: Element> {
    inner: Inner<'a, T>,
}

impl<'a, T: Element> BlockMut<'a, T> {
    fn direct(slice: &'a mut [T]) -> Self {
        Self {
            inner: Inner::Direct(slice),
        }
    }

    fn staged(buf: Vec<T>, commit: CommitFn<'a, T>) -> Self {
        Self {
            inner: Inner::Staged {
                buf,
                commit: Some(commit),
            },
        }
    }

    /// Returns true if the guard points straight into storage.
    pub fn is_direct(&self) -> bool {
        matches!(self.inner, Inner::Direct(_))
    }

    /// Write the block back, down-casting to the stored kind.
    pub fn release(mut self) -> Result<()> {
        self.commit()
    }

    /// Drop the guard without writing back staged changes.
    ///
    /// Direct guards have already modified storage.
    pub fn discard(mut self) {
        if let Inner::Staged { commit, .. } = &mut self.inner {
            commit.take();
        }
    }

    fn commit(&mut self) -> Result<()> {
        if let Inner::Staged { buf, commit } = &mut self.inner {
            if let Some(f) = commit.take() {
                return f(buf.as_slice());
            }
        }
        Ok(())
    }
}

impl<T: Element> Deref for BlockMut<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        match &self.inner {
            Inner::Direct(s) => s,
            Inner::Staged { buf, .. } => buf,
        }
    }
}

impl<T: Element> DerefMut for BlockMut<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        match &mut self.inner {
            Inner::Direct(s) => s,
            Inner::Staged { buf, .. } => buf,
        }
    }
}

impl<T: Element> Drop for BlockMut<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.commit() {
            warn!(%err, "block guard dropped without a successful write-back");
        }
    }
}

impl<T: Element> fmt::Debug for BlockMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockMut")
            .field("direct", &self.is_direct())
            .field("data", &self.deref())
            .finish()
    }
}

fn check_rows<X: Table + ?Sized>(table: &X, start: usize, n: usize) -> Result<()> {
    if !table.is_allocated() {
        return Err(TableError::Unallocated);
    }
    TableError::check_range("row", start, n, table.n_rows())
}

fn check_column<X: Table + ?Sized>(table: &X, col: usize, start: usize, n: usize) -> Result<()> {
    if !table.is_allocated() {
        return Err(TableError::Unallocated);
    }
    TableError::check_index("column", col, table.n_cols())?;
    TableError::check_range("row", start, n, table.n_rows())
}

fn check_writable<X: Table + ?Sized>(table: &X) -> Result<()> {
    if table.is_writable() {
        Ok(())
    } else {
        Err(TableError::Unsupported("table storage is read-only"))
    }
}

/// Typed access for every [`Table`].
pub trait TableExt: Table {
    /// Rows `[start, start + n)` as `T`, row-major.
    fn rows<T: Element>(&self, start: usize, n: usize) -> Result<Cow<'_, [T]>> {
        check_rows(self, start, n)?;
        if let Some(s) = self.borrow_rows(start, n).and_then(T::from_buf) {
            return Ok(Cow::Borrowed(s));
        }
        let mut out = vec![T::default(); n * self.n_cols()];
        self.read_rows(start, n, T::buf_mut(&mut out))?;
        Ok(Cow::Owned(out))
    }

    /// Writable view of rows `[start, start + n)`.
    ///
    /// # Errors
    ///
    /// Besides the range checks, `Unsupported` if the table is read-only.
    fn rows_mut<T: Element>(&mut self, start: usize, n: usize) -> Result<BlockMut<'_, T>> {
        check_rows(self, start, n)?;
        check_writable(self)?;
        let direct = self.borrow_rows(start, n).is_some_and(|b| b.kind() == T::KIND);
        if direct {
            return match self.borrow_rows_mut(start, n).and_then(T::from_buf_mut) {
                Some(slice) => Ok(BlockMut::direct(slice)),
                None => Err(TableError::Unallocated),
            };
        }
        let mut buf = vec![T::default(); n * self.n_cols()];
        self.read_rows(start, n, T::buf_mut(&mut buf))?;
        Ok(BlockMut::staged(
            buf,
            Box::new(move |data: &[T]| self.write_rows(start, n, T::buf(data))),
        ))
    }

    /// Rows `[start, start + n)` of column `col` as `T`.
    fn column<T: Element>(&self, col: usize, start: usize, n: usize) -> Result<Cow<'_, [T]>> {
        check_column(self, col, start, n)?;
        if let Some(s) = self.borrow_column(col, start, n).and_then(T::from_buf) {
            return Ok(Cow::Borrowed(s));
        }
        let mut out = vec![T::default(); n];
        self.read_column(col, start, n, T::buf_mut(&mut out))?;
        Ok(Cow::Owned(out))
    }

    /// Writable view of rows `[start, start + n)` of column `col`.
    fn column_mut<T: Element>(&mut self, col: usize, start: usize, n: usize) -> Result<BlockMut<'_, T>> {
        check_column(self, col, start, n)?;
        check_writable(self)?;
        let direct = self.borrow_column(col, start, n).is_some_and(|b| b.kind() == T::KIND);
        if direct {
            return match self.borrow_column_mut(col, start, n).and_then(T::from_buf_mut) {
                Some(slice) => Ok(BlockMut::direct(slice)),
                None => Err(TableError::Unallocated),
            };
        }
        let mut buf = vec![T::default(); n];
        self.read_column(col, start, n, T::buf_mut(&mut buf))?;
        Ok(BlockMut::staged(
            buf,
            Box::new(move |data: &[T]| self.write_column(col, start, n, T::buf(data))),
        ))
    }

    fn read_rows_into<T: Element>(&self, start: usize, n: usize, dst: &mut [T]) -> Result<()> {
        self.read_rows(start, n, T::buf_mut(dst))
    }

    fn write_rows_from<T: Element>(&mut self, start: usize, n: usize, src: &[T]) -> Result<()> {
        self.write_rows(start, n, T::buf(src))
    }

    fn read_column_into<T: Element>(&self, col: usize, start: usize, n: usize, dst: &mut [T]) -> Result<()> {
        self.read_column(col, start, n, T::buf_mut(dst))
    }

    fn write_column_from<T: Element>(&mut self, col: usize, start: usize, n: usize, src: &[T]) -> Result<()> {
        self.write_column(col, start, n, T::buf(src))
    }

    /// All rows as a row-major `Vec<T>`.
    fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        Ok(self.rows::<T>(0, self.n_rows())?.into_owned())
    }

    /// All rows as an `n_rows x n_cols` array.
    fn to_array<T: Element>(&self) -> Result<Array2<T>> {
        shape_array(self.n_rows(), self.n_cols(), self.to_vec::<T>()?)
    }
}

impl<X: Table + ?Sized> TableExt for X {}

fn shape_array<T>(n_rows: usize, n_cols: usize, data: Vec<T>) -> Result<Array2<T>> {
    let got = data.len();
    Array2::from_shape_vec((n_rows, n_cols), data).map_err(|_| TableError::DimensionMismatch {
        field: "array shape",
        expected: n_rows.saturating_mul(n_cols),
        got,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AllocationFlag, ColumnData, Indexing, NumericTable};

    fn sample() -> NumericTable {
        NumericTable::from_vec(3, 2, vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap()
    }

    #[test]
    fn same_kind_rows_are_borrowed() {
        let t = sample();
        assert!(matches!(t.rows::<f64>(1, 2).unwrap(), Cow::Borrowed(_)));
        let cast = t.rows::<i32>(1, 2).unwrap();
        assert!(matches!(cast, Cow::Owned(_)));
        assert_eq!(&*cast, &[3, 4, 5, 6]);
    }

    #[test]
    fn direct_guard_writes_in_place() {
        let mut t = sample();
        {
            let mut block = t.rows_mut::<f64>(0, 1).unwrap();
            assert!(block.is_direct());
            block[1] = 20.0;
        }
        assert_eq!(t.get::<f64>(0, 1).unwrap(), 20.0);
    }

    #[test]
    fn staged_guard_commits_on_drop() {
        let mut t = sample();
        {
            let mut block = t.rows_mut::<i32>(2, 1).unwrap();
            assert!(!block.is_direct());
            block.copy_from_slice(&[50, 60]);
        }
        assert_eq!(t.to_vec::<f64>().unwrap(), vec![1.0, 2.0, 3.0, 4.0, 50.0, 60.0]);
    }

    #[test]
    fn discard_skips_write_back() {
        let mut t = sample();
        let mut block = t.column_mut::<f32>(0, 0, 3).unwrap();
        block.fill(0.0);
        block.discard();
        assert_eq!(&*t.column::<f64>(0, 0, 3).unwrap(), &[1.0, 3.0, 5.0]);
    }

    #[test]
    fn column_guard_release() {
        let mut t = NumericTable::from_columns(vec![
            ColumnData::from_vec(vec![1i32, 2]),
            ColumnData::from_vec(vec![3.0f64, 4.0]),
        ])
        .unwrap();
        let mut block = t.column_mut::<f64>(0, 0, 2).unwrap();
        block[1] = 9.7;
        block.release().unwrap();
        assert_eq!(t.column_slice::<i32>(0).unwrap(), &[1, 9]);

        let direct = t.column_mut::<f64>(1, 1, 1).unwrap();
        assert!(direct.is_direct());
    }

    #[test]
    fn guards_validate_at_acquisition() {
        let mut t = sample();
        assert!(matches!(t.rows_mut::<f64>(2, 2), Err(TableError::OutOfRange { .. })));
        assert!(matches!(t.column::<f64>(2, 0, 1), Err(TableError::OutOfRange { what: "column", .. })));

        let mut csr = NumericTable::csr_from_dense(1, 2, &[1.0f64, 0.0], Indexing::ZeroBased).unwrap();
        assert!(matches!(csr.rows_mut::<f64>(0, 1), Err(TableError::Unsupported(_))));
        assert_eq!(&*csr.rows::<f64>(0, 1).unwrap(), &[1.0, 0.0]);

        let unallocated = NumericTable::dense::<f64>(2, 2, AllocationFlag::NotAllocate).unwrap();
        assert!(matches!(unallocated.rows::<f64>(0, 1), Err(TableError::Unallocated)));
    }

    #[test]
    fn works_through_trait_objects() {
        let mut t = sample();
        let dyn_table: &mut dyn Table = &mut t;
        let mut block = dyn_table.rows_mut::<f64>(0, 1).unwrap();
        block[0] = -1.0;
        block.release().unwrap();
        assert_eq!(dyn_table.to_array::<f64>().unwrap()[[0, 0]], -1.0);
    }

    #[test]
    fn shape_error_reports_data_length() {
        let err = shape_array(2, 3, vec![1.0f64; 4]).unwrap_err();
        assert_eq!(
            err,
            TableError::DimensionMismatch {
                field: "array shape",
                expected: 6,
                got: 4
            }
        );
        assert_eq!(shape_array(2, 2, vec![1i32; 4]).unwrap().dim(), (2, 2));
    }
}
