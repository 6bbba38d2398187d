//! numtable: typed, layout-polymorphic numeric tables.
//!
//! A table is a two-dimensional grid of numeric cells described by a
//! dictionary of per-column descriptors and backed by one of several
//! physical layouts. All layouts share one block-wise access contract.
//!
//! # Key Types
//!
//! - [`NumericTable`] - Dictionary plus storage backend
//! - [`Table`] / [`TableExt`] - Block access, untyped and typed
//! - [`MergedTable`] - Column-wise concatenation of shared tables
//! - [`TableConfig`] - Builder for tables whose layout is chosen at runtime
//! - [`io::TableCodec`] - Binary serialization
//!
//! # Example
//!
//! ```
//! use numtable::{NumericTable, TableExt};
//!
//! let mut table = NumericTable::from_vec(3, 2, vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
//! assert_eq!(&*table.rows::<f64>(1, 2).unwrap(), &[3.0, 4.0, 5.0, 6.0]);
//!
//! let mut block = table.rows_mut::<f64>(1, 2).unwrap();
//! block.copy_from_slice(&[30.0, 40.0, 50.0, 60.0]);
//! block.release().unwrap();
//! assert_eq!(table.to_vec::<f64>().unwrap(), vec![1.0, 2.0, 30.0, 40.0, 50.0, 60.0]);
//! ```

// Re-export approx traits for users who want to compare table contents
pub use approx;

pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use config::{ConfigError, TableConfig};
pub use error::{Result, TableError};

pub use data::{
    AllocationFlag, Backend, BlockMut, Dictionary, Element, Feature, FeatureKind, Indexing,
    MergedTable, NumKind, NumericTable, StorageLayout, Table, TableExt, Triangle,
};

pub use utils::{format_table, Parallelism};
