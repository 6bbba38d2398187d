//! Block-parallel processing of table rows.
//!
//! Disjoint row blocks of a dense row-major table touch disjoint memory, so
//! they can be handed out as `&mut [T]` chunks and processed concurrently.
//! Other layouts go through casting copies: blocks are read in parallel and
//! written back in order.

use rayon::prelude::*;

use super::element::Element;
use super::guard::TableExt;
use super::table::NumericTable;
use super::traits::Table;
use crate::error::{Result, TableError};
use crate::utils::Parallelism;

fn check_block_rows(rows_per_block: usize) -> Result<()> {
    if rows_per_block == 0 {
        return Err(TableError::DimensionMismatch {
            field: "rows per block",
            expected: 1,
            got: 0,
        });
    }
    Ok(())
}

/// Start rows of the blocks covering `n_rows`.
fn block_starts(n_rows: usize, rows_per_block: usize) -> Vec<usize> {
    (0..n_rows).step_by(rows_per_block).collect()
}

impl NumericTable {
    /// Apply `f(first_row, block)` to consecutive blocks of up to
    /// `rows_per_block` rows, row-major as `T`.
    ///
    /// Same-kind row-major tables are modified in place; anything else is
    /// read, transformed and written back.
    pub fn par_for_each_row_block<T, F>(&mut self, rows_per_block: usize, parallelism: Parallelism, f: F) -> Result<()>
    where
        T: Element,
        F: Fn(usize, &mut [T]) + Sync + Send,
    {
        check_block_rows(rows_per_block)?;
        if !self.is_allocated() {
            return Err(TableError::Unallocated);
        }
        if !self.is_writable() {
            return Err(TableError::Unsupported("table storage is read-only"));
        }
        let n_rows = self.n_rows();
        let n_cols = self.n_cols();
        if n_rows == 0 || n_cols == 0 {
            return Ok(());
        }

        let chunk = rows_per_block * n_cols;
        if let Some(slice) = self.borrow_rows_mut(0, n_rows).and_then(T::from_buf_mut) {
            if parallelism.is_parallel() {
                slice
                    .par_chunks_mut(chunk)
                    .enumerate()
                    .for_each(|(i, block)| f(i * rows_per_block, block));
            } else {
                slice
                    .chunks_mut(chunk)
                    .enumerate()
                    .for_each(|(i, block)| f(i * rows_per_block, block));
            }
            return Ok(());
        }

        let table = &*self;
        let starts = block_starts(n_rows, rows_per_block);
        let blocks = parallelism.maybe_par_map(starts, |start| -> Result<(usize, usize, Vec<T>)> {
            let n = rows_per_block.min(n_rows - start);
            let mut buf = vec![T::default(); n * n_cols];
            table.read_rows(start, n, T::buf_mut(&mut buf))?;
            f(start, &mut buf);
            Ok((start, n, buf))
        });
        for block in blocks {
            let (start, n, buf) = block?;
            self.write_rows(start, n, T::buf(&buf))?;
        }
        Ok(())
    }
}

/// Map `f(first_row, block)` over consecutive row blocks of any table.
///
/// Results are returned in block order.
pub fn par_map_row_blocks<X, T, R, F>(
    table: &X,
    rows_per_block: usize,
    parallelism: Parallelism,
    f: F,
) -> Result<Vec<R>>
where
    X: Table + ?Sized,
    T: Element,
    R: Send,
    F: Fn(usize, &[T]) -> R + Sync + Send,
{
    check_block_rows(rows_per_block)?;
    let n_rows = table.n_rows();
    parallelism
        .maybe_par_map(block_starts(n_rows, rows_per_block), |start| -> Result<R> {
            let n = rows_per_block.min(n_rows - start);
            let block = table.rows::<T>(start, n)?;
            Ok(f(start, &block))
        })
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ColumnData, Indexing};

    fn counting(n_rows: usize) -> NumericTable {
        NumericTable::from_vec(n_rows, 2, (0..n_rows * 2).map(|v| v as f64).collect()).unwrap()
    }

    #[test]
    fn in_place_blocks_cover_every_row() {
        for p in [Parallelism::Sequential, Parallelism::Parallel] {
            let mut t = counting(7);
            t.par_for_each_row_block::<f64, _>(3, p, |first, block| {
                for (i, row) in block.chunks_mut(2).enumerate() {
                    row[0] = (first + i) as f64;
                    row[1] *= -1.0;
                }
            })
            .unwrap();
            let v = t.to_vec::<f64>().unwrap();
            for r in 0..7 {
                assert_eq!(v[r * 2], r as f64);
                assert_eq!(v[r * 2 + 1], -((r * 2 + 1) as f64));
            }
        }
    }

    #[test]
    fn staged_blocks_write_back() {
        let mut t = NumericTable::from_columns(vec![
            ColumnData::from_vec(vec![1i32, 2, 3]),
            ColumnData::from_vec(vec![1.5f32, 2.5, 3.5]),
        ])
        .unwrap();
        t.par_for_each_row_block::<f64, _>(2, Parallelism::Parallel, |_, block| {
            block.iter_mut().for_each(|v| *v *= 2.0);
        })
        .unwrap();
        assert_eq!(t.column_slice::<i32>(0).unwrap(), &[2, 4, 6]);
        assert_eq!(t.column_slice::<f32>(1).unwrap(), &[3.0, 5.0, 7.0]);
    }

    #[test]
    fn zero_block_size_rejected() {
        let mut t = counting(2);
        assert!(t.par_for_each_row_block::<f64, _>(0, Parallelism::Sequential, |_, _| {}).is_err());
        assert!(par_map_row_blocks::<_, f64, (), _>(&t, 0, Parallelism::Sequential, |_, _| ()).is_err());
    }

    #[test]
    fn read_only_table_rejected() {
        let mut t = NumericTable::csr_from_dense(1, 1, &[1.0f64], Indexing::ZeroBased).unwrap();
        assert!(matches!(
            t.par_for_each_row_block::<f64, _>(1, Parallelism::Sequential, |_, _| {}),
            Err(TableError::Unsupported(_))
        ));
    }

    #[test]
    fn map_row_blocks_in_order() {
        let t = counting(5);
        let sums = par_map_row_blocks(&t, 2, Parallelism::Parallel, |first, block: &[f64]| {
            (first, block.iter().sum::<f64>())
        })
        .unwrap();
        assert_eq!(sums, vec![(0, 6.0), (2, 22.0), (4, 17.0)]);
    }
}
