//! Side-by-side composition of tables.
//!
//! A [`MergedTable`] concatenates the columns of its constituents in the
//! order they were added. Constituents are shared, not copied: each is held
//! as an `Arc<RwLock<dyn Table>>`, and every block request is forwarded to
//! the constituent that owns the columns.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::column::ColumnData;
use super::dictionary::Dictionary;
use super::element::{BlockBuf, BlockBufMut};
use super::feature::{Feature, NumKind};
use super::storage::ColumnMajorStorage;
use super::table::NumericTable;
use super::traits::Table;
use crate::error::{Result, TableError};

/// A table shared between owners.
pub type SharedTable = Arc<RwLock<dyn Table>>;

/// Wrap a table for sharing.
pub fn shared<X: Table + 'static>(table: X) -> SharedTable {
    Arc::new(RwLock::new(table))
}

/// Column-wise concatenation of shared tables.
#[derive(Clone, Debug, Default)]
pub struct MergedTable {
    tables: Vec<SharedTable>,
}

impl MergedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `tables` in order.
    pub fn from_tables(tables: impl IntoIterator<Item = SharedTable>) -> Self {
        let mut merged = Self::new();
        for t in tables {
            merged.add_table(t);
        }
        merged
    }

    /// Append the columns of `table`.
    pub fn add_table(&mut self, table: SharedTable) {
        let n_cols = table.read().n_cols();
        self.tables.push(table);
        debug!(
            n_tables = self.tables.len(),
            added_cols = n_cols,
            "added table to merged table"
        );
    }

    pub fn n_tables(&self) -> usize {
        self.tables.len()
    }

    pub fn tables(&self) -> &[SharedTable] {
        &self.tables
    }

    /// Constituent index and local column of merged column `col`.
    pub fn locate(&self, col: usize) -> Result<(usize, usize)> {
        let mut offset = 0;
        for (i, t) in self.tables.iter().enumerate() {
            let w = t.read().n_cols();
            if col < offset + w {
                return Ok((i, col - offset));
            }
            offset += w;
        }
        Err(TableError::OutOfRange {
            what: "column",
            index: col,
            bound: offset,
        })
    }

    /// Descriptors of all columns, in merged order.
    pub fn dictionary(&self) -> Result<Dictionary> {
        let mut dict = Dictionary::new();
        for t in &self.tables {
            let t = t.read();
            for c in 0..t.n_cols() {
                dict.push(t.feature(c)?);
            }
        }
        Ok(dict)
    }

    /// Copy every column into one column-major table.
    pub fn materialize(&self) -> Result<NumericTable> {
        let n_rows = self.common_rows()?;
        let dict = self.dictionary()?;
        let mut columns = Vec::with_capacity(dict.len());
        for (col, f) in dict.iter().enumerate() {
            let (t, local) = self.locate(col)?;
            let mut data = ColumnData::zeros(f.num_kind.unwrap_or(NumKind::F64), n_rows);
            self.tables[t].read().read_column(local, 0, n_rows, data.as_buf_mut())?;
            columns.push(data);
        }
        let mut storage = ColumnMajorStorage::new(n_rows, columns.len(), NumKind::F64);
        for (col, data) in columns.into_iter().enumerate() {
            storage.set_column(col, data)?;
        }
        NumericTable::with_dictionary(dict, storage)
    }

    /// Row count shared by all constituents.
    fn common_rows(&self) -> Result<usize> {
        let mut rows = None;
        for t in &self.tables {
            let n = t.read().n_rows();
            match rows {
                None => rows = Some(n),
                Some(expected) if expected != n => {
                    return Err(TableError::DimensionMismatch {
                        field: "merged rows",
                        expected,
                        got: n,
                    })
                }
                Some(_) => {}
            }
        }
        Ok(rows.unwrap_or(0))
    }

    /// Full validation of a row-block request.
    fn check_block(&self, start: usize, n: usize, buf_len: usize) -> Result<usize> {
        let n_rows = self.common_rows()?;
        if !self.is_allocated() {
            return Err(TableError::Unallocated);
        }
        TableError::check_range("row", start, n, n_rows)?;
        let n_cols = self.n_cols();
        TableError::check_len("row block", n.saturating_mul(n_cols), buf_len)?;
        Ok(n_cols)
    }
}

impl Table for MergedTable {
    /// Row count of the first constituent; zero when empty.
    fn n_rows(&self) -> usize {
        self.tables.first().map_or(0, |t| t.read().n_rows())
    }

    fn n_cols(&self) -> usize {
        self.tables.iter().map(|t| t.read().n_cols()).sum()
    }

    fn feature(&self, index: usize) -> Result<Feature> {
        let (t, local) = self.locate(index)?;
        self.tables[t].read().feature(local)
    }

    fn set_feature(&mut self, index: usize, feature: Feature) -> Result<()> {
        let (t, local) = self.locate(index)?;
        self.tables[t].write().set_feature(local, feature)
    }

    fn is_allocated(&self) -> bool {
        self.tables.iter().all(|t| t.read().is_allocated())
    }

    fn is_writable(&self) -> bool {
        self.tables.iter().all(|t| t.read().is_writable())
    }

    fn allocate(&mut self) -> Result<()> {
        for t in &self.tables {
            t.write().allocate()?;
        }
        debug!(n_tables = self.tables.len(), "allocated merged table");
        Ok(())
    }

    fn free(&mut self) {
        for t in &self.tables {
            t.write().free();
        }
        debug!(n_tables = self.tables.len(), "freed merged table");
    }

    fn n_cols_for_rows(&self, n_rows: usize) -> usize {
        self.tables.iter().map(|t| t.read().n_cols_for_rows(n_rows)).sum()
    }

    /// Every constituent must keep its column count, so a packed
    /// constituent can only be resized to its current order.
    fn set_n_rows(&mut self, n_rows: usize) -> Result<()> {
        for t in &self.tables {
            let t = t.read();
            let got = t.n_cols_for_rows(n_rows);
            if got != t.n_cols() {
                return Err(TableError::DimensionMismatch {
                    field: "merged constituent columns",
                    expected: t.n_cols(),
                    got,
                });
            }
        }
        for t in &self.tables {
            t.write().set_n_rows(n_rows)?;
        }
        debug!(n_rows, n_tables = self.tables.len(), "resized merged table");
        Ok(())
    }

    fn read_rows(&self, start: usize, n: usize, mut dst: BlockBufMut<'_>) -> Result<()> {
        let n_cols = self.check_block(start, n, dst.len())?;
        let mut c0 = 0;
        for t in &self.tables {
            let t = t.read();
            let w = t.n_cols();
            let mut block = ColumnData::zeros(dst.kind(), n * w);
            t.read_rows(start, n, block.as_buf_mut())?;
            for r in 0..n {
                block.read_into(r * w, 1, w, dst.reborrow(), r * n_cols + c0, 1);
            }
            c0 += w;
        }
        Ok(())
    }

    fn write_rows(&mut self, start: usize, n: usize, src: BlockBuf<'_>) -> Result<()> {
        if !self.is_writable() {
            return Err(TableError::Unsupported("merged table has a read-only constituent"));
        }
        let n_cols = self.check_block(start, n, src.len())?;
        let mut c0 = 0;
        for t in &self.tables {
            let mut t = t.write();
            let w = t.n_cols();
            let mut block = ColumnData::zeros(src.kind(), n * w);
            for r in 0..n {
                block.write_from(r * w, 1, w, src, r * n_cols + c0, 1);
            }
            t.write_rows(start, n, block.as_buf())?;
            c0 += w;
        }
        Ok(())
    }

    fn read_column(&self, col: usize, start: usize, n: usize, dst: BlockBufMut<'_>) -> Result<()> {
        let (t, local) = self.locate(col)?;
        self.tables[t].read().read_column(local, start, n, dst)
    }

    fn write_column(&mut self, col: usize, start: usize, n: usize, src: BlockBuf<'_>) -> Result<()> {
        let (t, local) = self.locate(col)?;
        self.tables[t].write().write_column(local, start, n, src)
    }
}
