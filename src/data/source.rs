//! Data source boundary.
//!
//! A [`DataSource`] publishes a fully typed [`Dictionary`] and then hands out
//! rows in blocks, one array per column in the column's declared kind.
//! [`load_into`] drains a source into any [`Table`]: it reads blocks of
//! doubling size, sizes the target to the total row count, allocates it and
//! writes every column.

use tracing::debug;

use super::column::ColumnData;
use super::dictionary::Dictionary;
use super::element::Element;
use super::feature::NumKind;
use super::traits::Table;
use crate::error::{Result, TableError};

/// Block size of the first read in [`load_into`].
pub const DEFAULT_INITIAL_BLOCK_ROWS: usize = 1024;

/// Producer of typed rows.
///
/// The dictionary must be fully typed before the first block is read, and
/// its length must not change while rows are produced.
pub trait DataSource {
    fn dictionary(&self) -> &Dictionary;

    /// Append up to `max_rows` rows to `columns` and return the number of
    /// rows appended. Fewer than `max_rows` means the source is exhausted.
    ///
    /// `columns` holds one array per dictionary column, in the column's
    /// declared kind. Every array must grow by the returned row count.
    fn read_block(&mut self, columns: &mut [ColumnData], max_rows: usize) -> usize;
}

/// In-memory row source.
#[derive(Clone, Debug)]
pub struct RowSource {
    dict: Dictionary,
    columns: Vec<ColumnData>,
    n_rows: usize,
    cursor: usize,
}

impl RowSource {
    /// Serve `data` (row-major, `dict.len()` values per row).
    ///
    /// Each column is kept in its declared kind; untyped columns keep `T`.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if `data.len()` is not a multiple of the
    /// dictionary length.
    pub fn new<T: Element>(dict: Dictionary, data: &[T]) -> Result<Self> {
        let n_cols = dict.len();
        let rem = if n_cols == 0 { data.len() } else { data.len() % n_cols };
        if rem != 0 {
            return Err(TableError::DimensionMismatch {
                field: "row source data",
                expected: data.len() - rem,
                got: data.len(),
            });
        }
        let n_rows = if n_cols == 0 { 0 } else { data.len() / n_cols };
        let columns = dict
            .iter()
            .enumerate()
            .map(|(c, f)| {
                let mut column = ColumnData::with_capacity(f.num_kind.unwrap_or(T::KIND), n_rows);
                column.extend_from(T::buf(data), c, n_cols, n_rows);
                column
            })
            .collect();
        Ok(Self {
            dict,
            columns,
            n_rows,
            cursor: 0,
        })
    }

    /// Rows not yet read.
    pub fn remaining_rows(&self) -> usize {
        self.n_rows - self.cursor
    }
}

impl DataSource for RowSource {
    fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    fn read_block(&mut self, columns: &mut [ColumnData], max_rows: usize) -> usize {
        let rows = self.remaining_rows().min(max_rows);
        for (dst, src) in columns.iter_mut().zip(&self.columns) {
            dst.extend_from(src.as_buf(), self.cursor, 1, rows);
        }
        self.cursor += rows;
        rows
    }
}

/// Load every row of `source` into `table`, starting with blocks of
/// `initial_block_rows` rows and doubling the block size after each full
/// block.
///
/// Descriptors are copied from the source. Where the target cannot store
/// the source kind, the target keeps its own kind and values are cast on
/// write.
///
/// The source is drained and every check is made before the target is
/// touched, so a failed load leaves the target as it was.
///
/// Returns the number of rows loaded.
///
/// # Errors
///
/// - `TypeMismatch` if a source descriptor is untyped
/// - `DimensionMismatch` if the column counts differ, or the target cannot
///   hold the loaded row count with the same columns
/// - `Unsupported` if the target is read-only
pub fn load_into<S, X>(source: &mut S, table: &mut X, initial_block_rows: usize) -> Result<usize>
where
    S: DataSource + ?Sized,
    X: Table + ?Sized,
{
    let dict = source.dictionary();
    if let Some(column) = dict.first_untyped() {
        return Err(TableError::TypeMismatch {
            column,
            requested: NumKind::F64,
            stored: None,
        });
    }
    let n_cols = dict.len();
    if n_cols != table.n_cols() {
        return Err(TableError::DimensionMismatch {
            field: "source columns",
            expected: table.n_cols(),
            got: n_cols,
        });
    }
    if !table.is_writable() {
        return Err(TableError::Unsupported("load into read-only table"));
    }
    let features = dict.features().to_vec();

    let mut block = initial_block_rows.max(1);
    let mut columns: Vec<ColumnData> = features
        .iter()
        .map(|f| ColumnData::with_capacity(f.num_kind.unwrap_or(NumKind::F64), block))
        .collect();
    let mut total = 0usize;
    loop {
        let read = source.read_block(&mut columns, block);
        total += read;
        if read < block || n_cols == 0 {
            break;
        }
        block *= 2;
    }
    for column in &columns {
        if column.len() != total {
            return Err(TableError::DimensionMismatch {
                field: "source column length",
                expected: total,
                got: column.len(),
            });
        }
    }
    let resized_cols = table.n_cols_for_rows(total);
    if resized_cols != n_cols {
        return Err(TableError::DimensionMismatch {
            field: "target columns after resize",
            expected: n_cols,
            got: resized_cols,
        });
    }
    debug!(rows = total, cols = n_cols, "read rows from data source");

    table.set_n_rows(total)?;
    for (index, mut feature) in features.into_iter().enumerate() {
        match table.set_feature(index, feature.clone()) {
            Err(TableError::TypeMismatch { stored, .. }) => {
                feature.num_kind = stored;
                table.set_feature(index, feature)?;
            }
            other => other?,
        }
    }
    table.allocate()?;
    for (col, column) in columns.iter().enumerate() {
        table.write_column(col, 0, total, column.as_buf())?;
    }
    Ok(total)
}
