//! Block access across every storage backend.
//!
//! Each backend is built over the same symmetric 3x3 matrix, so reads,
//! writes and casts can be checked against one dense reference.

use approx::assert_abs_diff_eq;
use rstest::rstest;

use numtable::data::{ColumnData, CsrStorage, Indexing, NumKind, StorageLayout, Triangle};
use numtable::{AllocationFlag, NumericTable, Table, TableError, TableExt};

// =============================================================================
// Fixtures
// =============================================================================

/// Symmetric reference matrix, row-major.
const DENSE: [f64; 9] = [1.0, 0.0, 3.0, 0.0, 5.0, 6.0, 3.0, 6.0, 0.0];

fn build(layout: StorageLayout) -> NumericTable {
    match layout {
        StorageLayout::RowMajor => NumericTable::from_vec(3, 3, DENSE.to_vec()).unwrap(),
        StorageLayout::ColumnMajor => NumericTable::from_columns(vec![
            ColumnData::from_vec(vec![1.0f64, 0.0, 3.0]),
            ColumnData::from_vec(vec![0i32, 5, 6]),
            ColumnData::from_vec(vec![3.0f32, 6.0, 0.0]),
        ])
        .unwrap(),
        StorageLayout::Packed => {
            NumericTable::packed_from_vec(3, Triangle::Upper, vec![1.0f64, 0.0, 3.0, 5.0, 6.0, 0.0]).unwrap()
        }
        StorageLayout::Csr => NumericTable::new(
            CsrStorage::from_dense(3, 3, &DENSE, Indexing::OneBased)
                .unwrap()
                .with_mutable(true),
        ),
    }
}

// =============================================================================
// Concrete Scenarios
// =============================================================================

#[test]
fn dense_block_write_back() {
    let mut table = NumericTable::from_vec(3, 2, vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    assert_eq!(&*table.rows::<f64>(1, 2).unwrap(), &[3.0, 4.0, 5.0, 6.0]);

    let mut block = table.rows_mut::<f64>(1, 2).unwrap();
    block.copy_from_slice(&[30.0, 40.0, 50.0, 60.0]);
    block.release().unwrap();

    assert_eq!(
        &*table.rows::<f64>(0, 3).unwrap(),
        &[1.0, 2.0, 30.0, 40.0, 50.0, 60.0]
    );
}

#[test]
fn packed_upper_is_symmetric() {
    let table = NumericTable::packed_from_vec(3, Triangle::Upper, vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    assert_eq!(table.get::<f64>(2, 0).unwrap(), 3.0);
    assert_eq!(table.get::<f64>(0, 2).unwrap(), 3.0);
    assert_eq!(
        table.to_vec::<f64>().unwrap(),
        vec![1.0, 2.0, 3.0, 2.0, 4.0, 5.0, 3.0, 5.0, 6.0]
    );
}

// =============================================================================
// Cross-Backend Behaviour
// =============================================================================

#[rstest]
#[case(StorageLayout::RowMajor)]
#[case(StorageLayout::ColumnMajor)]
#[case(StorageLayout::Packed)]
#[case(StorageLayout::Csr)]
fn reads_match_dense_reference(#[case] layout: StorageLayout) {
    let table = build(layout);
    assert_eq!(table.layout(), layout);
    assert_eq!(table.to_vec::<f64>().unwrap(), DENSE.to_vec());
    assert_eq!(&*table.rows::<f64>(1, 1).unwrap(), &DENSE[3..6]);
    assert_eq!(&*table.column::<f64>(2, 0, 3).unwrap(), &[3.0, 6.0, 0.0]);
    assert_eq!(&*table.column::<i64>(1, 1, 2).unwrap(), &[5, 6]);
}

#[rstest]
#[case(StorageLayout::RowMajor)]
#[case(StorageLayout::ColumnMajor)]
#[case(StorageLayout::Packed)]
#[case(StorageLayout::Csr)]
fn row_write_then_read_is_identity(#[case] layout: StorageLayout) {
    let mut table = build(layout);
    // A symmetric row for the packed case: row 1 and column 1 agree.
    let row = [0.0, 7.0, 6.0];
    table.write_rows_from(1, 1, &row).unwrap();
    assert_eq!(&*table.rows::<f64>(1, 1).unwrap(), &row);
    assert_eq!(&*table.rows::<f64>(0, 1).unwrap(), &DENSE[0..3]);
}

#[rstest]
#[case(StorageLayout::RowMajor)]
#[case(StorageLayout::ColumnMajor)]
#[case(StorageLayout::Csr)]
fn column_guard_commits(#[case] layout: StorageLayout) {
    let mut table = build(layout);
    {
        let mut col = table.column_mut::<f64>(0, 0, 3).unwrap();
        col.iter_mut().for_each(|v| *v += 10.0);
    }
    assert_eq!(&*table.column::<f64>(0, 0, 3).unwrap(), &[11.0, 10.0, 13.0]);
    assert_eq!(&*table.column::<f64>(1, 0, 3).unwrap(), &[0.0, 5.0, 6.0]);
}

#[rstest]
#[case(StorageLayout::RowMajor)]
#[case(StorageLayout::ColumnMajor)]
#[case(StorageLayout::Packed)]
#[case(StorageLayout::Csr)]
fn out_of_range_requests_fail_without_side_effects(#[case] layout: StorageLayout) {
    let mut table = build(layout);
    assert!(matches!(table.rows::<f64>(2, 2), Err(TableError::OutOfRange { .. })));
    assert!(matches!(table.column::<f64>(3, 0, 1), Err(TableError::OutOfRange { .. })));
    assert!(matches!(
        table.write_rows_from(3, 1, &[0.0f64; 3]),
        Err(TableError::OutOfRange { .. })
    ));
    assert!(table.rows_mut::<f64>(1, 5).is_err());
    assert_eq!(table.to_vec::<f64>().unwrap(), DENSE.to_vec());
}

#[rstest]
#[case(StorageLayout::RowMajor)]
#[case(StorageLayout::ColumnMajor)]
#[case(StorageLayout::Packed)]
#[case(StorageLayout::Csr)]
fn freed_tables_reject_block_access(#[case] layout: StorageLayout) {
    let mut table = build(layout);
    table.free();
    assert!(!table.is_allocated());
    assert_eq!(table.rows::<f64>(0, 1).unwrap_err(), TableError::Unallocated);
    assert_eq!(table.column::<f32>(0, 0, 1).unwrap_err(), TableError::Unallocated);

    table.allocate().unwrap();
    assert_eq!(table.to_vec::<f64>().unwrap(), vec![0.0; 9]);
}

#[rstest]
#[case(NumKind::F64)]
#[case(NumKind::F32)]
#[case(NumKind::I32)]
#[case(NumKind::I64)]
fn narrowing_writes_truncate(#[case] kind: NumKind) {
    let mut table = NumericTable::column_major(2, 1, kind);
    table.allocate().unwrap();
    table.write_column_from(0, 0, 2, &[2.75f64, -1.5]).unwrap();
    let back = table.column::<f64>(0, 0, 2).unwrap();
    if kind.is_integer() {
        assert_eq!(&*back, &[2.0, -1.0]);
    } else {
        assert_abs_diff_eq!(back[0], 2.75);
        assert_abs_diff_eq!(back[1], -1.5);
    }
}

// =============================================================================
// Backend Specifics
// =============================================================================

#[test]
fn same_kind_dense_rows_are_borrowed() {
    let table = build(StorageLayout::RowMajor);
    assert!(matches!(table.rows::<f64>(0, 2).unwrap(), std::borrow::Cow::Borrowed(_)));
    assert!(matches!(table.rows::<f32>(0, 2).unwrap(), std::borrow::Cow::Owned(_)));
}

#[test]
fn column_major_columns_keep_their_kinds() {
    let table = build(StorageLayout::ColumnMajor);
    assert_eq!(table.feature(0).unwrap().num_kind, Some(NumKind::F64));
    assert_eq!(table.feature(1).unwrap().num_kind, Some(NumKind::I32));
    assert_eq!(table.feature(2).unwrap().num_kind, Some(NumKind::F32));
    assert!(matches!(
        table.column::<i32>(1, 0, 3).unwrap(),
        std::borrow::Cow::Borrowed(_)
    ));
}

#[test]
fn packed_lower_agrees_with_upper() {
    // Lower triangle of DENSE, row by row: (0,0) (1,0) (1,1) (2,0) (2,1) (2,2).
    let lower = NumericTable::packed_from_vec(3, Triangle::Lower, vec![1.0f64, 0.0, 5.0, 3.0, 6.0, 0.0]).unwrap();
    assert_eq!(lower.to_vec::<f64>().unwrap(), build(StorageLayout::Packed).to_vec::<f64>().unwrap());
}

#[test]
fn packed_write_mirrors() {
    let mut table = build(StorageLayout::Packed);
    table.set::<f64>(2, 1, 9.0).unwrap();
    assert_eq!(table.get::<f64>(1, 2).unwrap(), 9.0);
    assert_eq!(table.packed_to_vec::<f64>().unwrap(), vec![1.0, 0.0, 3.0, 5.0, 9.0, 0.0]);
}

#[test]
fn packed_accessor_on_dense_is_unsupported() {
    let table = build(StorageLayout::RowMajor);
    assert!(matches!(table.packed_array::<f64>(), Err(TableError::Unsupported(_))));
}

#[test]
fn csr_structure_and_immutability() {
    let mut table = NumericTable::csr_from_dense(3, 3, &DENSE, Indexing::OneBased).unwrap();
    assert_eq!(table.nnz(), 6);
    let csr = table.csr().unwrap();
    assert_eq!(csr.row_offsets().unwrap(), &[1, 3, 5, 7]);
    assert_eq!(csr.column_indices().unwrap(), &[1, 3, 2, 3, 1, 2]);

    assert!(!table.is_writable());
    assert!(matches!(
        table.write_rows_from(0, 1, &[0.0f64; 3]),
        Err(TableError::Unsupported(_))
    ));
    assert!(matches!(table.rows_mut::<f64>(0, 1), Err(TableError::Unsupported(_))));
}

#[test]
fn csr_writes_resparsify() {
    let mut table = build(StorageLayout::Csr);
    table.write_rows_from(0, 1, &[0.0f64, 2.0, 0.0]).unwrap();
    let csr = table.csr().unwrap();
    assert_eq!(csr.row_nnz(0).unwrap(), 1);
    assert_eq!(table.nnz(), 5);
    table.check_invariants().unwrap();
}

#[test]
fn resize_keeps_dictionary_in_step() {
    let mut table = NumericTable::dense::<i32>(2, 2, AllocationFlag::DoAllocate).unwrap();
    table.set_n_cols(4).unwrap();
    assert_eq!(table.n_cols(), 4);
    assert_eq!(table.dictionary().len(), 4);
    assert_eq!(table.feature(3).unwrap().num_kind, Some(NumKind::I32));
    table.check_invariants().unwrap();
}
