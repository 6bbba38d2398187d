//! Runtime table configuration with builder pattern.
//!
//! [`TableConfig`] describes a table whose layout is chosen at runtime and
//! uses the `bon` crate for builder generation with validation.
//!
//! # Example
//!
//! ```
//! use numtable::{NumKind, StorageLayout, Table, TableConfig};
//!
//! let config = TableConfig::builder()
//!     .layout(StorageLayout::Packed)
//!     .n_rows(4)
//!     .n_cols(4)
//!     .kind(NumKind::F32)
//!     .build()
//!     .unwrap();
//! let table = config.build_table().unwrap();
//! assert!(table.is_allocated());
//! ```

use bon::Builder;
use thiserror::Error;

use crate::data::{
    AllocationFlag, ColumnMajorStorage, CsrStorage, Indexing, NumKind, NumericTable,
    PackedStorage, RowMajorStorage, StorageLayout, Table, Triangle,
};

// =============================================================================
// ConfigError
// =============================================================================

/// Errors raised while validating a [`TableConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Packed tables are square.
    #[error("packed table must be square, got {n_rows}x{n_cols}")]
    NonSquarePacked { n_rows: usize, n_cols: usize },

    /// Packed tables need at least one row.
    #[error("packed table must have a positive dimension")]
    EmptyPacked,

    /// CSR tables need at least one column.
    #[error("CSR table must have at least one column")]
    CsrWithoutColumns,

    /// Only CSR tables carry a mutability switch.
    #[error("csr_mutable is only meaningful for the CSR layout")]
    MutableNonCsr,
}

// =============================================================================
// TableConfig
// =============================================================================

/// Shape, layout and element kind of a table to construct.
///
/// Fields that do not apply to the chosen layout (`triangle` outside packed
/// tables, `indexing` outside CSR) are ignored.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct TableConfig {
    /// Physical layout. Default: row-major.
    #[builder(default = StorageLayout::RowMajor)]
    pub layout: StorageLayout,

    #[builder(default)]
    pub n_rows: usize,

    #[builder(default)]
    pub n_cols: usize,

    /// Stored kind. For column-major tables, the kind of every column
    /// until a descriptor says otherwise. Default: `F64`.
    #[builder(default = NumKind::F64)]
    pub kind: NumKind,

    /// Whether `build_table` allocates. Default: allocate.
    #[builder(default)]
    pub allocation: AllocationFlag,

    /// Stored triangle of a packed table. Default: upper.
    #[builder(default)]
    pub triangle: Triangle,

    /// Index base of a CSR table. Default: one-based.
    #[builder(default)]
    pub indexing: Indexing,

    /// Whether a CSR table accepts writes. Default: false.
    #[builder(default)]
    pub csr_mutable: bool,
}

impl<S: table_config_builder::IsComplete> TableConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for shapes the chosen layout cannot hold.
    pub fn build(self) -> Result<TableConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl TableConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self.layout {
            StorageLayout::Packed if self.n_rows != self.n_cols => Err(ConfigError::NonSquarePacked {
                n_rows: self.n_rows,
                n_cols: self.n_cols,
            }),
            StorageLayout::Packed if self.n_rows == 0 => Err(ConfigError::EmptyPacked),
            StorageLayout::Csr if self.n_cols == 0 => Err(ConfigError::CsrWithoutColumns),
            StorageLayout::RowMajor | StorageLayout::ColumnMajor | StorageLayout::Packed
                if self.csr_mutable =>
            {
                Err(ConfigError::MutableNonCsr)
            }
            _ => Ok(()),
        }
    }

    /// Construct the configured table, allocating it when requested.
    pub fn build_table(&self) -> crate::Result<NumericTable> {
        let mut table = match self.layout {
            StorageLayout::RowMajor => {
                NumericTable::new(RowMajorStorage::new(self.kind, self.n_rows, self.n_cols))
            }
            StorageLayout::ColumnMajor => {
                NumericTable::new(ColumnMajorStorage::new(self.n_rows, self.n_cols, self.kind))
            }
            StorageLayout::Packed => {
                NumericTable::new(PackedStorage::new(self.kind, self.n_rows, self.triangle))
            }
            StorageLayout::Csr => NumericTable::new(
                CsrStorage::new(self.kind, self.n_rows, self.n_cols, self.indexing)
                    .with_mutable(self.csr_mutable),
            ),
        };
        if self.allocation == AllocationFlag::DoAllocate {
            table.allocate()?;
        }
        Ok(table)
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            layout: StorageLayout::RowMajor,
            n_rows: 0,
            n_cols: 0,
            kind: NumKind::F64,
            allocation: AllocationFlag::DoAllocate,
            triangle: Triangle::Upper,
            indexing: Indexing::OneBased,
            csr_mutable: false,
        }
    }
}
