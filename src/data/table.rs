//! The numeric table facade.
//!
//! [`NumericTable`] owns one [`Dictionary`] and one storage [`Backend`] and
//! keeps them in step: the dictionary always has exactly one descriptor per
//! storage column, and every descriptor carries the kind its column is
//! stored as.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::column::ColumnData;
use super::dictionary::Dictionary;
use super::element::{BlockBuf, BlockBufMut, Element};
use super::feature::{Feature, NumKind};
use super::storage::{
    Backend, ColumnMajorStorage, CsrStorage, PackedStorage, RowMajorStorage, Storage, StorageLayout,
    Triangle,
};
use super::traits::Table;
use crate::error::{Result, TableError};

/// Whether a constructor allocates storage right away.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllocationFlag {
    #[default]
    DoAllocate,
    NotAllocate,
}

/// A 2D numeric table: dictionary plus storage backend.
///
/// # Example
///
/// ```
/// use numtable::data::{NumericTable, TableExt};
///
/// let mut table = NumericTable::from_vec(3, 2, vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
///
/// let mut block = table.rows_mut::<f64>(1, 2).unwrap();
/// block.copy_from_slice(&[30.0, 40.0, 50.0, 60.0]);
/// block.release().unwrap();
///
/// assert_eq!(table.to_vec::<f64>().unwrap(), vec![1.0, 2.0, 30.0, 40.0, 50.0, 60.0]);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericTable {
    dict: Dictionary,
    storage: Backend,
}

impl NumericTable {
    /// Wrap a backend, deriving the dictionary from its column kinds.
    pub fn new(storage: impl Into<Backend>) -> Self {
        let storage = storage.into();
        let dict = Dictionary::from_features(
            (0..storage.n_cols())
                .map(|c| storage.column_kind(c).map_or_else(Feature::default, Feature::new))
                .collect(),
        );
        Self { dict, storage }
    }

    /// Wrap a backend with an explicit dictionary.
    ///
    /// Untyped descriptors take the storage kind of their column. A
    /// column-major backend adopts the declared kinds.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if the dictionary length differs from the column count
    /// - `TypeMismatch` if a homogeneous backend cannot store a declared kind
    pub fn with_dictionary(dict: Dictionary, storage: impl Into<Backend>) -> Result<Self> {
        let mut table = Self::new(storage);
        table.set_dictionary(dict)?;
        Ok(table)
    }

    /// Row-major table of `T` with the given shape.
    pub fn dense<T: Element>(n_rows: usize, n_cols: usize, flag: AllocationFlag) -> Result<Self> {
        let mut table = Self::new(RowMajorStorage::new(T::KIND, n_rows, n_cols));
        if flag == AllocationFlag::DoAllocate {
            table.allocate()?;
        }
        Ok(table)
    }

    /// Row-major table adopting `data`.
    pub fn from_vec<T: Element>(n_rows: usize, n_cols: usize, data: Vec<T>) -> Result<Self> {
        Ok(Self::new(RowMajorStorage::from_vec(n_rows, n_cols, data)?))
    }

    /// Unallocated column-major table. Columns default to `default_kind`.
    pub fn column_major(n_rows: usize, n_cols: usize, default_kind: NumKind) -> Self {
        Self::new(ColumnMajorStorage::new(n_rows, n_cols, default_kind))
    }

    /// Column-major table adopting one array per column.
    pub fn from_columns(columns: Vec<ColumnData>) -> Result<Self> {
        Ok(Self::new(ColumnMajorStorage::from_columns(columns)?))
    }

    /// Unallocated packed symmetric `n x n` table.
    pub fn packed(kind: NumKind, n: usize, triangle: Triangle) -> Self {
        Self::new(PackedStorage::new(kind, n, triangle))
    }

    /// Packed symmetric table adopting a triangular buffer.
    pub fn packed_from_vec<T: Element>(n: usize, triangle: Triangle, packed: Vec<T>) -> Result<Self> {
        Ok(Self::new(PackedStorage::from_vec(n, triangle, packed)?))
    }

    /// CSR table from a dense row-major slice.
    pub fn csr_from_dense<T: Element>(
        n_rows: usize,
        n_cols: usize,
        dense: &[T],
        indexing: super::storage::Indexing,
    ) -> Result<Self> {
        Ok(Self::new(CsrStorage::from_dense(n_rows, n_cols, dense, indexing)?))
    }

    #[inline]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    #[inline]
    pub fn storage(&self) -> &Backend {
        &self.storage
    }

    #[inline]
    pub fn layout(&self) -> StorageLayout {
        self.storage.layout()
    }

    /// Number of stored elements.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.storage.nnz()
    }

    /// Replace the whole dictionary.
    ///
    /// Validated in full before anything changes.
    pub fn set_dictionary(&mut self, dict: Dictionary) -> Result<()> {
        if dict.len() != self.n_cols() {
            return Err(TableError::DimensionMismatch {
                field: "dictionary",
                expected: self.n_cols(),
                got: dict.len(),
            });
        }
        for (index, f) in dict.iter().enumerate() {
            self.check_feature_kind(index, f)?;
        }
        for (index, f) in dict.iter().enumerate() {
            if let Some(k) = f.num_kind {
                if self.storage.column_kind(index) != Some(k) {
                    self.storage.retype_column(index, k)?;
                }
            }
        }
        self.dict = dict;
        self.sync_dictionary();
        Ok(())
    }

    /// Change the column count. The dictionary follows; storage is
    /// re-allocated if it was allocated.
    ///
    /// A packed table stays square.
    pub fn set_n_cols(&mut self, n_cols: usize) -> Result<()> {
        let n_rows = match self.layout() {
            StorageLayout::Packed => n_cols,
            _ => self.n_rows(),
        };
        self.resize(n_rows, n_cols)
    }

    fn resize(&mut self, n_rows: usize, n_cols: usize) -> Result<()> {
        let was_allocated = self.storage.is_allocated();
        self.storage.resize(n_rows, n_cols)?;
        self.dict.set_n_features(n_cols);
        self.sync_dictionary();
        debug!(n_rows, n_cols, layout = ?self.layout(), "resized table");
        if was_allocated {
            self.allocate()?;
        }
        Ok(())
    }

    /// Give every untyped descriptor the kind its column is stored as.
    fn sync_dictionary(&mut self) {
        for c in 0..self.dict.len() {
            if let (Ok(f), Some(k)) = (self.dict.feature_mut(c), self.storage.column_kind(c)) {
                if f.num_kind.is_none() {
                    f.set_num_kind(k);
                }
            }
        }
    }

    fn check_feature_kind(&self, index: usize, feature: &Feature) -> Result<()> {
        let (Some(requested), Some(stored)) = (feature.num_kind, self.storage.homogeneous_kind()) else {
            return Ok(());
        };
        if requested != stored {
            return Err(TableError::TypeMismatch {
                column: index,
                requested,
                stored: Some(stored),
            });
        }
        Ok(())
    }

    /// Element `(row, col)` converted to `T`.
    pub fn get<T: Element>(&self, row: usize, col: usize) -> Result<T> {
        let mut v = [T::default()];
        self.storage.read_column(col, row, 1, T::buf_mut(&mut v))?;
        Ok(v[0])
    }

    /// Store `value` at `(row, col)`, down-cast to the column kind.
    pub fn set<T: Element>(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        self.storage.write_column(col, row, 1, T::buf(&[value]))
    }

    /// Set every stored element to `value`.
    pub fn assign<T: Element>(&mut self, value: T) -> Result<()> {
        self.storage.assign(value.to_scalar())
    }

    /// The triangular buffer of a packed table.
    ///
    /// # Errors
    ///
    /// `Unsupported` on other layouts, `TypeMismatch` if `T` is not the
    /// stored kind.
    pub fn packed_array<T: Element>(&self) -> Result<&[T]> {
        self.storage
            .as_packed()
            .ok_or(TableError::Unsupported("packed array access needs packed storage"))?
            .packed_array()
    }

    pub fn packed_array_mut<T: Element>(&mut self) -> Result<&mut [T]> {
        self.storage
            .as_packed_mut()
            .ok_or(TableError::Unsupported("packed array access needs packed storage"))?
            .packed_array_mut()
    }

    /// Copy of the triangular buffer converted to `T`.
    pub fn packed_to_vec<T: Element>(&self) -> Result<Vec<T>> {
        let packed = self
            .storage
            .as_packed()
            .ok_or(TableError::Unsupported("packed array access needs packed storage"))?;
        let mut out = vec![T::default(); packed.nnz()];
        packed.read_packed(T::buf_mut(&mut out))?;
        Ok(out)
    }

    /// Down-cast `values` into the triangular buffer.
    pub fn write_packed<T: Element>(&mut self, values: &[T]) -> Result<()> {
        self.storage
            .as_packed_mut()
            .ok_or(TableError::Unsupported("packed array access needs packed storage"))?
            .write_packed(T::buf(values))
    }

    /// The CSR backend, if this is a CSR table.
    pub fn csr(&self) -> Option<&CsrStorage> {
        self.storage.as_csr()
    }

    /// Adopt `values` as column `col` of a column-major table and re-type
    /// its descriptor.
    pub fn set_column_array<T: Element>(&mut self, col: usize, values: Vec<T>) -> Result<()> {
        let storage = self
            .storage
            .as_column_major_mut()
            .ok_or(TableError::Unsupported("column arrays need column-major storage"))?;
        storage.set_column(col, ColumnData::from_vec(values))?;
        self.dict.feature_mut(col)?.set_num_kind(T::KIND);
        Ok(())
    }

    /// Typed view of column `col` of a column-major table.
    pub fn column_slice<T: Element>(&self, col: usize) -> Result<&[T]> {
        self.storage
            .as_column_major()
            .ok_or(TableError::Unsupported("column arrays need column-major storage"))?
            .column_slice(col)
    }

    /// Check the dictionary against storage and the storage's own structure.
    pub fn check_invariants(&self) -> Result<()> {
        if self.dict.len() != self.storage.n_cols() {
            return Err(TableError::DimensionMismatch {
                field: "dictionary",
                expected: self.storage.n_cols(),
                got: self.dict.len(),
            });
        }
        for (column, f) in self.dict.iter().enumerate() {
            let stored = self.storage.column_kind(column);
            if let Some(requested) = f.num_kind {
                if stored != Some(requested) {
                    return Err(TableError::TypeMismatch {
                        column,
                        requested,
                        stored,
                    });
                }
            }
        }
        self.storage.check_invariants()
    }
}

impl Table for NumericTable {
    fn n_rows(&self) -> usize {
        self.storage.n_rows()
    }

    fn n_cols(&self) -> usize {
        self.storage.n_cols()
    }

    fn feature(&self, index: usize) -> Result<Feature> {
        self.dict.feature(index).cloned()
    }

    /// Homogeneous layouts reject a kind other than the stored one; a
    /// column-major table re-types the column, converting allocated data.
    fn set_feature(&mut self, index: usize, mut feature: Feature) -> Result<()> {
        TableError::check_index("feature", index, self.dict.len())?;
        self.check_feature_kind(index, &feature)?;
        match feature.num_kind {
            None => feature.num_kind = self.storage.column_kind(index),
            Some(k) if self.storage.column_kind(index) != Some(k) => self.storage.retype_column(index, k)?,
            Some(_) => {}
        }
        self.dict.set_feature(feature, index)
    }

    fn is_allocated(&self) -> bool {
        self.storage.is_allocated()
    }

    fn is_writable(&self) -> bool {
        self.storage.is_writable()
    }

    fn allocate(&mut self) -> Result<()> {
        self.storage.allocate(&self.dict)?;
        self.sync_dictionary();
        debug!(
            n_rows = self.n_rows(),
            n_cols = self.n_cols(),
            layout = ?self.layout(),
            "allocated table storage"
        );
        Ok(())
    }

    fn free(&mut self) {
        self.storage.free();
        debug!(layout = ?self.layout(), "freed table storage");
    }

    /// A packed table stays square: its column count follows.
    fn set_n_rows(&mut self, n_rows: usize) -> Result<()> {
        self.resize(n_rows, self.n_cols_for_rows(n_rows))
    }

    fn n_cols_for_rows(&self, n_rows: usize) -> usize {
        match self.layout() {
            StorageLayout::Packed => n_rows,
            _ => self.n_cols(),
        }
    }

    fn read_rows(&self, start: usize, n: usize, dst: BlockBufMut<'_>) -> Result<()> {
        self.storage.read_rows(start, n, dst)
    }

    fn write_rows(&mut self, start: usize, n: usize, src: BlockBuf<'_>) -> Result<()> {
        self.storage.write_rows(start, n, src)
    }

    fn read_column(&self, col: usize, start: usize, n: usize, dst: BlockBufMut<'_>) -> Result<()> {
        self.storage.read_column(col, start, n, dst)
    }

    fn write_column(&mut self, col: usize, start: usize, n: usize, src: BlockBuf<'_>) -> Result<()> {
        self.storage.write_column(col, start, n, src)
    }

    fn borrow_rows(&self, start: usize, n: usize) -> Option<BlockBuf<'_>> {
        self.storage.borrow_rows(start, n)
    }

    fn borrow_rows_mut(&mut self, start: usize, n: usize) -> Option<BlockBufMut<'_>> {
        self.storage.borrow_rows_mut(start, n)
    }

    fn borrow_column(&self, col: usize, start: usize, n: usize) -> Option<BlockBuf<'_>> {
        self.storage.borrow_column(col, start, n)
    }

    fn borrow_column_mut(&mut self, col: usize, start: usize, n: usize) -> Option<BlockBufMut<'_>> {
        self.storage.borrow_column_mut(col, start, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FeatureKind, Indexing};

    #[test]
    fn new_derives_typed_dictionary() {
        let t = NumericTable::dense::<i32>(2, 3, AllocationFlag::NotAllocate).unwrap();
        assert_eq!(t.dictionary().len(), 3);
        assert!(t.dictionary().iter().all(|f| f.num_kind == Some(NumKind::I32)));
        assert!(!t.is_allocated());
    }

    #[test]
    fn set_n_cols_keeps_dictionary_in_step() {
        let mut t = NumericTable::dense::<f64>(2, 2, AllocationFlag::DoAllocate).unwrap();
        t.set_n_cols(4).unwrap();
        assert_eq!(t.n_cols(), 4);
        assert_eq!(t.dictionary().len(), 4);
        assert!(t.is_allocated());
        assert_eq!(t.nnz(), 8);
        t.check_invariants().unwrap();

        t.set_n_cols(1).unwrap();
        assert_eq!(t.dictionary().len(), 1);
    }

    #[test]
    fn set_n_rows_unallocated_stays_unallocated() {
        let mut t = NumericTable::dense::<f32>(2, 2, AllocationFlag::NotAllocate).unwrap();
        t.set_n_rows(5).unwrap();
        assert_eq!(t.n_rows(), 5);
        assert!(!t.is_allocated());
    }

    #[test]
    fn homogeneous_set_feature_rejects_other_kind() {
        let mut t = NumericTable::dense::<f64>(2, 2, AllocationFlag::DoAllocate).unwrap();
        let err = t.set_feature(1, Feature::new(NumKind::I32)).unwrap_err();
        assert_eq!(
            err,
            TableError::TypeMismatch {
                column: 1,
                requested: NumKind::I32,
                stored: Some(NumKind::F64)
            }
        );
        t.set_feature(1, Feature::categorical(NumKind::F64, 3)).unwrap();
        assert_eq!(t.feature(1).unwrap().kind, FeatureKind::Categorical);

        // Untyped descriptors take the stored kind.
        t.set_feature(0, Feature::default()).unwrap();
        assert_eq!(t.feature(0).unwrap().num_kind, Some(NumKind::F64));
    }

    #[test]
    fn column_major_set_feature_retypes() {
        let mut t = NumericTable::from_columns(vec![
            ColumnData::from_vec(vec![1.5f64, 2.5]),
            ColumnData::from_vec(vec![3i32, 4]),
        ])
        .unwrap();
        t.set_feature(0, Feature::new(NumKind::I64)).unwrap();
        assert_eq!(t.column_slice::<i64>(0).unwrap(), &[1, 2]);
        assert_eq!(t.storage().column_kind(0), Some(NumKind::I64));
        t.check_invariants().unwrap();
    }

    #[test]
    fn set_column_array_updates_dictionary() {
        let mut t = NumericTable::column_major(3, 2, NumKind::F64);
        t.set_column_array(0, vec![1.0f32, 2.0, 3.0]).unwrap();
        t.set_column_array(1, vec![4i64, 5, 6]).unwrap();
        assert!(t.is_allocated());
        assert_eq!(t.feature(0).unwrap().num_kind, Some(NumKind::F32));
        assert_eq!(t.feature(1).unwrap().num_kind, Some(NumKind::I64));
        assert_eq!(t.get::<f64>(2, 1).unwrap(), 6.0);

        let mut dense = NumericTable::dense::<f64>(3, 1, AllocationFlag::DoAllocate).unwrap();
        assert!(matches!(
            dense.set_column_array(0, vec![0.0f64; 3]),
            Err(TableError::Unsupported(_))
        ));
    }

    #[test]
    fn element_access_and_assign() {
        let mut t = NumericTable::dense::<i64>(2, 2, AllocationFlag::DoAllocate).unwrap();
        t.set(1, 0, 7.8f64).unwrap();
        assert_eq!(t.get::<i64>(1, 0).unwrap(), 7);
        assert!(matches!(t.get::<f64>(2, 0), Err(TableError::OutOfRange { .. })));

        t.assign(3i32).unwrap();
        assert_eq!(t.get::<f32>(0, 1).unwrap(), 3.0);
    }

    #[test]
    fn packed_accessors() {
        let mut t = NumericTable::packed_from_vec(3, Triangle::Upper, vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(t.get::<f64>(2, 0).unwrap(), 3.0);
        assert_eq!(t.get::<f64>(0, 2).unwrap(), 3.0);

        t.packed_array_mut::<f64>().unwrap()[5] = 60.0;
        assert_eq!(t.packed_to_vec::<i32>().unwrap(), vec![1, 2, 3, 4, 5, 60]);

        t.set_n_rows(4).unwrap();
        assert_eq!((t.n_rows(), t.n_cols()), (4, 4));
        assert_eq!(t.packed_array::<f64>().unwrap().len(), 10);

        let dense = NumericTable::dense::<f64>(2, 2, AllocationFlag::DoAllocate).unwrap();
        assert!(matches!(dense.packed_array::<f64>(), Err(TableError::Unsupported(_))));
    }

    #[test]
    fn csr_table_reads_dense_rows() {
        let t = NumericTable::csr_from_dense(2, 2, &[0.0f32, 1.0, 2.0, 0.0], Indexing::OneBased).unwrap();
        assert_eq!(t.csr().unwrap().nnz(), 2);
        assert_eq!(t.get::<f64>(1, 0).unwrap(), 2.0);
        assert!(!t.is_writable());
    }

    #[test]
    fn with_dictionary_checks_length() {
        let err = NumericTable::with_dictionary(
            Dictionary::untyped(3),
            RowMajorStorage::new(NumKind::F64, 2, 2),
        )
        .unwrap_err();
        assert!(matches!(err, TableError::DimensionMismatch { field: "dictionary", .. }));
    }
}
