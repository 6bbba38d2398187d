//! Loading tables from data sources.

use numtable::data::{
    load_into, shared, ColumnData, DataSource, Dictionary, Feature, MergedTable, NumKind, RowSource,
    DEFAULT_INITIAL_BLOCK_ROWS,
};
use numtable::{AllocationFlag, NumericTable, Table, TableConfig, TableExt};

/// Source that hands out rows one block at a time and records block sizes.
struct CountingSource {
    inner: RowSource,
    requests: Vec<usize>,
}

impl DataSource for CountingSource {
    fn dictionary(&self) -> &Dictionary {
        self.inner.dictionary()
    }

    fn read_block(&mut self, columns: &mut [ColumnData], max_rows: usize) -> usize {
        self.requests.push(max_rows);
        self.inner.read_block(columns, max_rows)
    }
}

fn rows(n: usize) -> Vec<f64> {
    (0..n).flat_map(|r| [r as f64, -(r as f64)]).collect()
}

#[test]
fn block_size_doubles() {
    let dict = Dictionary::homogeneous(2, NumKind::F64);
    let mut source = CountingSource {
        inner: RowSource::new(dict, &rows(10)).unwrap(),
        requests: Vec::new(),
    };
    let mut table = NumericTable::dense::<f64>(0, 2, AllocationFlag::NotAllocate).unwrap();
    assert_eq!(load_into(&mut source, &mut table, 1).unwrap(), 10);
    assert_eq!(source.requests, vec![1, 2, 4, 8]);
    assert_eq!(table.to_vec::<f64>().unwrap(), rows(10));
}

#[test]
fn loads_into_configured_column_major_table() {
    let dict = Dictionary::from_features(vec![
        Feature::ordinal(NumKind::I64).with_name("rank"),
        Feature::new(NumKind::F32),
    ]);
    let mut source = RowSource::new(dict, &rows(3)).unwrap();
    let mut table = TableConfig::builder()
        .layout(numtable::StorageLayout::ColumnMajor)
        .n_cols(2)
        .allocation(AllocationFlag::NotAllocate)
        .build()
        .unwrap()
        .build_table()
        .unwrap();

    load_into(&mut source, &mut table, DEFAULT_INITIAL_BLOCK_ROWS).unwrap();
    assert_eq!(table.column_slice::<i64>(0).unwrap(), &[0, 1, 2]);
    assert_eq!(table.column_slice::<f32>(1).unwrap(), &[0.0, -1.0, -2.0]);
    assert_eq!(table.feature(0).unwrap().name.as_deref(), Some("rank"));
}

#[test]
fn loads_into_merged_target() {
    let a = shared(NumericTable::dense::<f64>(0, 1, AllocationFlag::NotAllocate).unwrap());
    let b = shared(NumericTable::dense::<i32>(0, 1, AllocationFlag::NotAllocate).unwrap());
    let mut merged = MergedTable::from_tables([a.clone(), b.clone()]);

    let mut source = RowSource::new(Dictionary::homogeneous(2, NumKind::F64), &rows(4)).unwrap();
    assert_eq!(load_into(&mut source, &mut merged, 3).unwrap(), 4);

    assert_eq!(a.read().to_vec::<f64>().unwrap(), vec![0.0, 1.0, 2.0, 3.0]);
    assert_eq!(b.read().to_vec::<i32>().unwrap(), vec![0, -1, -2, -3]);
    // The homogeneous i32 constituent keeps its stored kind.
    assert_eq!(b.read().feature(0).unwrap().num_kind, Some(NumKind::I32));
}

#[test]
fn empty_source_yields_empty_table() {
    let mut source = RowSource::new(Dictionary::homogeneous(2, NumKind::F64), &[] as &[f64]).unwrap();
    let mut table = NumericTable::dense::<f64>(5, 2, AllocationFlag::NotAllocate).unwrap();
    assert_eq!(load_into(&mut source, &mut table, 4).unwrap(), 0);
    assert_eq!(table.n_rows(), 0);
    assert!(table.is_allocated());
}

#[test]
fn large_i64_values_load_exactly() {
    let big = 9_007_199_254_740_993i64;
    let dict = Dictionary::from_features(vec![Feature::new(NumKind::I64), Feature::new(NumKind::F64)]);
    let mut source = RowSource::new(dict, &[big, 1, -big, 2]).unwrap();
    let mut table = NumericTable::column_major(0, 2, NumKind::F64);

    assert_eq!(load_into(&mut source, &mut table, 1).unwrap(), 2);
    assert_eq!(table.column_slice::<i64>(0).unwrap(), &[big, -big]);
    assert_eq!(table.column_slice::<f64>(1).unwrap(), &[1.0, 2.0]);
}

#[test]
fn failed_load_into_merged_target_changes_nothing() {
    let a = shared(NumericTable::from_vec(2, 1, vec![1.0f64, 2.0]).unwrap());
    let packed = NumericTable::packed_from_vec(2, numtable::Triangle::Lower, vec![1i32, 2, 3]).unwrap();
    let b = shared(packed);
    let mut merged = MergedTable::from_tables([a.clone(), b.clone()]);

    let mut source = RowSource::new(Dictionary::homogeneous(3, NumKind::F64), &rows3(4)).unwrap();
    assert!(load_into(&mut source, &mut merged, 2).is_err());
    assert_eq!(a.read().to_vec::<f64>().unwrap(), vec![1.0, 2.0]);
    assert_eq!(b.read().to_vec::<i32>().unwrap(), vec![1, 2, 2, 3]);
}

fn rows3(n: usize) -> Vec<f64> {
    (0..n).flat_map(|r| [r as f64, 0.0, 1.0]).collect()
}
