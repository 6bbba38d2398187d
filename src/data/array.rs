//! ndarray interop.
//!
//! Tables convert to arrays through [`TableExt::to_array`](super::TableExt::to_array);
//! this module adds the constructors in the other direction.

use ndarray::{ArrayView2, Axis};

use super::column::ColumnData;
use super::element::Element;
use super::storage::ColumnMajorStorage;
use super::table::NumericTable;
use crate::error::Result;

impl NumericTable {
    /// Row-major table holding a copy of `array`.
    ///
    /// Works for any memory order of the view.
    pub fn from_array<T: Element>(array: ArrayView2<'_, T>) -> Result<Self> {
        let (n_rows, n_cols) = array.dim();
        Self::from_vec(n_rows, n_cols, array.iter().copied().collect())
    }

    /// Column-major table with one column per array column.
    pub fn from_array_columns<T: Element>(array: ArrayView2<'_, T>) -> Result<Self> {
        let (n_rows, n_cols) = array.dim();
        let mut storage = ColumnMajorStorage::new(n_rows, n_cols, T::KIND);
        for (c, col) in array.axis_iter(Axis(1)).enumerate() {
            storage.set_column(c, ColumnData::from_vec(col.iter().copied().collect()))?;
        }
        Ok(Self::new(storage))
    }
}
