//! Serialization round trips for every backend.

use rstest::rstest;

use numtable::data::{ColumnData, CsrStorage, Dictionary, Feature, Indexing, NumKind, Triangle};
use numtable::io::{decode, encode, DeserializeError, TableCodec, HEADER_SIZE};
use numtable::{AllocationFlag, NumericTable, Table, TableExt};

fn row_major() -> NumericTable {
    NumericTable::from_vec(2, 2, vec![i64::MIN, -1, 0, i64::MAX]).unwrap()
}

fn column_major() -> NumericTable {
    let mut table = NumericTable::from_columns(vec![
        ColumnData::from_vec(vec![0.1f64, f64::MIN_POSITIVE]),
        ColumnData::from_vec(vec![3i32, 1]),
    ])
    .unwrap();
    table
        .set_feature(1, Feature::categorical(NumKind::I32, 4).with_name("colour"))
        .unwrap();
    table
}

fn packed() -> NumericTable {
    NumericTable::packed_from_vec(3, Triangle::Lower, vec![1.5f32, 2.5, 3.5, 4.5, 5.5, 6.5]).unwrap()
}

fn csr() -> NumericTable {
    NumericTable::new(
        CsrStorage::from_raw_parts(4, vec![1.0f64, 2.0, 3.0], vec![0, 3, 1], vec![0, 2, 2, 3], Indexing::ZeroBased)
            .unwrap()
            .with_mutable(true),
    )
}

fn unallocated() -> NumericTable {
    NumericTable::dense::<f32>(5, 3, AllocationFlag::NotAllocate).unwrap()
}

#[rstest]
#[case::row_major(row_major())]
#[case::column_major(column_major())]
#[case::packed(packed())]
#[case::csr(csr())]
#[case::unallocated(unallocated())]
fn table_roundtrip(#[case] table: NumericTable) {
    let codec = TableCodec::new();
    let bytes = codec.serialize_table(&table).unwrap();
    let loaded = codec.deserialize_table(&bytes).unwrap();

    assert_eq!(loaded, table);
    assert_eq!(loaded.dictionary(), table.dictionary());
    assert_eq!(loaded.is_allocated(), table.is_allocated());
    assert_eq!(loaded.is_writable(), table.is_writable());
    if table.is_allocated() {
        assert_eq!(loaded.to_vec::<f64>().unwrap(), table.to_vec::<f64>().unwrap());
    }
    // Re-serializing reproduces the same bytes.
    assert_eq!(codec.serialize_table(&loaded).unwrap(), bytes);
}

#[test]
fn float_bits_survive() {
    let table = NumericTable::from_vec(1, 3, vec![-0.0f64, f64::EPSILON, 1.0 / 3.0]).unwrap();
    let codec = TableCodec::new();
    let loaded = codec.deserialize_table(&codec.serialize_table(&table).unwrap()).unwrap();
    let before: Vec<u64> = table.to_vec::<f64>().unwrap().iter().map(|v| v.to_bits()).collect();
    let after: Vec<u64> = loaded.to_vec::<f64>().unwrap().iter().map(|v| v.to_bits()).collect();
    assert_eq!(before, after);
}

#[test]
fn dictionary_roundtrip_restores_name_lookup() {
    let table = column_major();
    let mut dict: Dictionary = decode(&encode(table.dictionary()).unwrap()).unwrap();
    assert_eq!(&dict, table.dictionary());
    assert_eq!(dict.feature_index("colour"), Some(1));
}

#[test]
fn truncated_input_is_rejected() {
    let codec = TableCodec::new();
    let bytes = codec.serialize_table(&packed()).unwrap();
    assert!(matches!(
        codec.deserialize_table(&bytes[..HEADER_SIZE + 1]),
        Err(DeserializeError::Truncated { .. })
    ));
}

#[test]
fn foreign_bytes_are_rejected() {
    let codec = TableCodec::new();
    let bytes = vec![0u8; HEADER_SIZE + 4];
    assert!(matches!(codec.deserialize_table(&bytes), Err(DeserializeError::NotATable)));
}
