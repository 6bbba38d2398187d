//! Typed numeric tables.
//!
//! A [`NumericTable`] pairs a [`Dictionary`] of per-column descriptors with
//! one of four storage backends and exposes the same block-wise access
//! contract over all of them.
//!
//! # Overview
//!
//! The core abstraction is [`Table`], an object-safe interface for reading
//! and writing row blocks and column blocks in any supported element type.
//! [`TableExt`] adds typed helpers on top: reads come back as borrowed
//! slices when the storage already holds the requested layout and kind, and
//! as casted copies otherwise. Writable blocks are [`BlockMut`] guards that
//! commit their contents on release.
//!
//! # Storage Types
//!
//! - [`RowMajorStorage`]: one homogeneous contiguous buffer, row after row
//! - [`ColumnMajorStorage`]: one buffer per column, each with its own kind
//! - [`PackedStorage`]: one triangle of a symmetric square matrix
//! - [`CsrStorage`]: compressed sparse rows, read-only unless marked mutable
//!
//! [`MergedTable`] concatenates the columns of several shared tables.
//!
//! # Element Types
//!
//! Cells are `f64`, `f32`, `i32` or `i64` (see [`Element`]). Conversions
//! between kinds follow `as` semantics: float to integer truncates toward
//! zero and saturates, NaN becomes zero.

mod array;
pub mod cast;
mod column;
mod dictionary;
mod element;
mod feature;
mod guard;
mod merged;
mod parallel;
mod source;
pub mod storage;
mod table;
mod traits;

pub use column::ColumnData;
pub use dictionary::Dictionary;
pub use element::{BlockBuf, BlockBufMut, Element, Scalar};
pub use feature::{Feature, FeatureKind, NumKind};
pub use guard::{BlockMut, TableExt};
pub use merged::{shared, MergedTable, SharedTable};
pub use parallel::par_map_row_blocks;
pub use source::{load_into, DataSource, RowSource, DEFAULT_INITIAL_BLOCK_ROWS};
pub use storage::{
    Backend, ColumnMajorStorage, CsrStorage, Indexing, PackedStorage, RowMajorStorage, Storage,
    StorageLayout, Triangle,
};
pub use table::{AllocationFlag, NumericTable};
pub use traits::Table;
