//! Common utilities used across the crate.
//!
//! This module provides the parallelism flag used by block-parallel helpers
//! and a plain-text table printer.

use std::fmt::Write;

use rayon::prelude::*;

use crate::data::{Table, TableExt};
use crate::error::Result;

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// When `Parallel`, helpers may use `rayon` parallel iterators on the current
/// pool. Helpers never build thread pools themselves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    #[default]
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if rayon pool has multiple threads, sequential otherwise)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    #[inline]
    pub fn maybe_par_for_each<T, I, F>(self, iter: I, f: F)
    where
        T: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) + Sync + Send,
    {
        if self.is_parallel() {
            iter.into_par_iter().for_each(f);
        } else {
            iter.into_iter().for_each(f);
        }
    }

    /// Map and collect, in parallel when allowed. Output order follows input
    /// order either way.
    #[inline]
    pub fn maybe_par_map<T, R, I, F>(self, iter: I, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) -> R + Sync + Send,
    {
        if self.is_parallel() {
            iter.into_par_iter().map(f).collect()
        } else {
            iter.into_iter().map(f).collect()
        }
    }
}

// =============================================================================
// Printing
// =============================================================================

/// Render the leading `max_rows x max_cols` block of `table` as text.
///
/// The first line is `title`; each row follows on its own line with values
/// right-aligned to width 10 with 3 decimals. Rows or columns cut off are
/// marked with `...`.
pub fn format_table(title: &str, table: &dyn Table, max_rows: usize, max_cols: usize) -> Result<String> {
    let n_rows = table.n_rows().min(max_rows);
    let n_cols = table.n_cols();
    let shown_cols = n_cols.min(max_cols);
    let block = table.rows::<f64>(0, n_rows)?;

    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{title}");
    for r in 0..n_rows {
        let row = &block[r * n_cols..(r + 1) * n_cols];
        for v in &row[..shown_cols] {
            let _ = write!(out, "{v:>10.3}");
        }
        if shown_cols < n_cols {
            out.push_str("       ...");
        }
        out.push('\n');
    }
    if n_rows < table.n_rows() {
        out.push_str("...\n");
    }
    Ok(out)
}
