//! Dense column-major storage (structure of arrays).

use serde::{Deserialize, Serialize};

use super::{check_column, check_rows, Storage, StorageLayout};
use crate::data::column::ColumnData;
use crate::data::dictionary::Dictionary;
use crate::data::element::{BlockBuf, BlockBufMut, Element, Scalar};
use crate::data::feature::NumKind;
use crate::error::{Result, TableError};

/// One contiguous array per column, each with its own kind.
///
/// Columns whose feature is untyped at allocation are stored as
/// `default_kind`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnMajorStorage {
    n_rows: usize,
    default_kind: NumKind,
    kinds: Vec<NumKind>,
    columns: Vec<Option<ColumnData>>,
    allocated: bool,
}

impl ColumnMajorStorage {
    /// Unallocated storage; every column starts as `default_kind`.
    pub fn new(n_rows: usize, n_cols: usize, default_kind: NumKind) -> Self {
        Self {
            n_rows,
            default_kind,
            kinds: vec![default_kind; n_cols],
            columns: vec![None; n_cols],
            allocated: false,
        }
    }

    /// Allocated storage adopting one array per column.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if the columns differ in length.
    pub fn from_columns(columns: Vec<ColumnData>) -> Result<Self> {
        let n_rows = columns.first().map_or(0, ColumnData::len);
        for c in &columns {
            if c.len() != n_rows {
                return Err(TableError::DimensionMismatch {
                    field: "column length",
                    expected: n_rows,
                    got: c.len(),
                });
            }
        }
        Ok(Self {
            n_rows,
            default_kind: NumKind::F64,
            kinds: columns.iter().map(ColumnData::kind).collect(),
            allocated: true,
            columns: columns.into_iter().map(Some).collect(),
        })
    }

    /// Kind used for columns that have no declared kind.
    #[inline]
    pub fn default_kind(&self) -> NumKind {
        self.default_kind
    }

    /// Array of column `col`, if allocated.
    pub fn column(&self, col: usize) -> Result<&ColumnData> {
        TableError::check_index("column", col, self.columns.len())?;
        self.columns[col].as_ref().ok_or(TableError::Unallocated)
    }

    /// Adopt `data` as column `col`, replacing its kind.
    ///
    /// The storage counts as allocated once every column holds an array.
    pub fn set_column(&mut self, col: usize, data: ColumnData) -> Result<()> {
        TableError::check_index("column", col, self.columns.len())?;
        if data.len() != self.n_rows {
            return Err(TableError::DimensionMismatch {
                field: "column length",
                expected: self.n_rows,
                got: data.len(),
            });
        }
        self.kinds[col] = data.kind();
        self.columns[col] = Some(data);
        self.allocated = self.columns.iter().all(Option::is_some);
        Ok(())
    }

    /// Change the stored kind of column `col`, converting existing values.
    pub fn retype(&mut self, col: usize, kind: NumKind) -> Result<()> {
        TableError::check_index("column", col, self.columns.len())?;
        if self.kinds[col] == kind {
            return Ok(());
        }
        self.kinds[col] = kind;
        if let Some(data) = &mut self.columns[col] {
            *data = data.cast_to(kind);
        }
        Ok(())
    }

    /// Typed view of column `col`.
    pub fn column_slice<T: Element>(&self, col: usize) -> Result<&[T]> {
        let data = self.column(col)?;
        data.as_slice::<T>().ok_or(TableError::TypeMismatch {
            column: col,
            requested: T::KIND,
            stored: Some(data.kind()),
        })
    }

    fn col_ref(&self, col: usize) -> Result<&ColumnData> {
        self.columns[col].as_ref().ok_or(TableError::Unallocated)
    }

    fn col_mut(&mut self, col: usize) -> Result<&mut ColumnData> {
        self.columns[col].as_mut().ok_or(TableError::Unallocated)
    }
}

impl Storage for ColumnMajorStorage {
    fn layout(&self) -> StorageLayout {
        StorageLayout::ColumnMajor
    }

    fn n_rows(&self) -> usize {
        self.n_rows
    }

    fn n_cols(&self) -> usize {
        self.columns.len()
    }

    fn is_allocated(&self) -> bool {
        self.allocated
    }

    fn column_kind(&self, col: usize) -> Option<NumKind> {
        self.kinds.get(col).copied()
    }

    fn resize(&mut self, n_rows: usize, n_cols: usize) -> Result<()> {
        self.n_rows = n_rows;
        self.kinds.resize(n_cols, self.default_kind);
        self.columns = vec![None; n_cols];
        self.allocated = false;
        Ok(())
    }

    fn allocate(&mut self, dict: &Dictionary) -> Result<()> {
        if dict.len() != self.columns.len() {
            return Err(TableError::DimensionMismatch {
                field: "dictionary",
                expected: self.columns.len(),
                got: dict.len(),
            });
        }
        for (kind, f) in self.kinds.iter_mut().zip(dict.iter()) {
            if let Some(k) = f.num_kind {
                *kind = k;
            }
        }
        self.columns = self
            .kinds
            .iter()
            .map(|&k| Some(ColumnData::zeros(k, self.n_rows)))
            .collect();
        self.allocated = true;
        Ok(())
    }

    fn free(&mut self) {
        self.columns.iter_mut().for_each(|c| *c = None);
        self.allocated = false;
    }

    fn read_rows(&self, start: usize, n: usize, mut dst: BlockBufMut<'_>) -> Result<()> {
        let n_cols = self.columns.len();
        check_rows(self.allocated, self.n_rows, n_cols, start, n, dst.len())?;
        for c in 0..n_cols {
            self.col_ref(c)?.read_into(start, 1, n, dst.reborrow(), c, n_cols);
        }
        Ok(())
    }

    fn write_rows(&mut self, start: usize, n: usize, src: BlockBuf<'_>) -> Result<()> {
        let n_cols = self.columns.len();
        check_rows(self.allocated, self.n_rows, n_cols, start, n, src.len())?;
        for c in 0..n_cols {
            self.col_mut(c)?.write_from(start, 1, n, src, c, n_cols);
        }
        Ok(())
    }

    fn read_column(&self, col: usize, start: usize, n: usize, dst: BlockBufMut<'_>) -> Result<()> {
        check_column(self.allocated, self.n_rows, self.columns.len(), col, start, n, dst.len())?;
        self.col_ref(col)?.read_into(start, 1, n, dst, 0, 1);
        Ok(())
    }

    fn write_column(&mut self, col: usize, start: usize, n: usize, src: BlockBuf<'_>) -> Result<()> {
        check_column(self.allocated, self.n_rows, self.columns.len(), col, start, n, src.len())?;
        self.col_mut(col)?.write_from(start, 1, n, src, 0, 1);
        Ok(())
    }

    fn borrow_column(&self, col: usize, start: usize, n: usize) -> Option<BlockBuf<'_>> {
        let data = self.columns.get(col)?.as_ref()?;
        let end = start.checked_add(n)?;
        (end <= data.len()).then(|| data.as_buf().slice(start, end))
    }

    fn borrow_column_mut(&mut self, col: usize, start: usize, n: usize) -> Option<BlockBufMut<'_>> {
        let data = self.columns.get_mut(col)?.as_mut()?;
        let end = start.checked_add(n)?;
        if end > data.len() {
            return None;
        }
        Some(data.as_buf_mut().slice(start, end))
    }

    // A single-column table's rows are its one column.
    fn borrow_rows(&self, start: usize, n: usize) -> Option<BlockBuf<'_>> {
        if self.columns.len() != 1 {
            return None;
        }
        self.borrow_column(0, start, n)
    }

    fn borrow_rows_mut(&mut self, start: usize, n: usize) -> Option<BlockBufMut<'_>> {
        if self.columns.len() != 1 {
            return None;
        }
        self.borrow_column_mut(0, start, n)
    }

    fn nnz(&self) -> usize {
        self.columns.iter().flatten().map(ColumnData::len).sum()
    }

    fn assign(&mut self, value: Scalar) -> Result<()> {
        if !self.allocated {
            return Err(TableError::Unallocated);
        }
        self.columns.iter_mut().flatten().for_each(|c| c.fill(value));
        Ok(())
    }

    fn check_invariants(&self) -> Result<()> {
        if self.kinds.len() != self.columns.len() {
            return Err(TableError::DimensionMismatch {
                field: "column kinds",
                expected: self.columns.len(),
                got: self.kinds.len(),
            });
        }
        for (column, (data, &kind)) in self.columns.iter().zip(&self.kinds).enumerate() {
            let Some(data) = data else {
                if self.allocated {
                    return Err(TableError::Unallocated);
                }
                continue;
            };
            if data.kind() != kind {
                return Err(TableError::TypeMismatch {
                    column,
                    requested: data.kind(),
                    stored: Some(kind),
                });
            }
            if data.len() != self.n_rows {
                return Err(TableError::DimensionMismatch {
                    field: "column length",
                    expected: self.n_rows,
                    got: data.len(),
                });
            }
        }
        Ok(())
    }
}
