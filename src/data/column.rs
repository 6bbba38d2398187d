//! Typed flat storage shared by every backend.
//!
//! [`ColumnData`] is a tagged vector over the closed kind set. Its read and
//! write methods are the cast table: one `match` on the buffer kind, one on
//! the stored kind, then a monomorphized kernel from [`cast`](super::cast).

use serde::{Deserialize, Serialize};

use super::cast;
use super::element::{BlockBuf, BlockBufMut, Element, Scalar};
use super::feature::NumKind;

/// A flat, homogeneously typed array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    F64(Vec<f64>),
    F32(Vec<f32>),
    I32(Vec<i32>),
    I64(Vec<i64>),
}

/// Run `$body` with `$v` bound to the inner vector, whatever its kind.
macro_rules! with_vec {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ColumnData::F64($v) => $body,
            ColumnData::F32($v) => $body,
            ColumnData::I32($v) => $body,
            ColumnData::I64($v) => $body,
        }
    };
}

impl ColumnData {
    /// Zero-filled array of `len` elements.
    pub fn zeros(kind: NumKind, len: usize) -> Self {
        match kind {
            NumKind::F64 => ColumnData::F64(vec![0.0; len]),
            NumKind::F32 => ColumnData::F32(vec![0.0; len]),
            NumKind::I32 => ColumnData::I32(vec![0; len]),
            NumKind::I64 => ColumnData::I64(vec![0; len]),
        }
    }

    /// Empty array with room for `capacity` elements.
    pub fn with_capacity(kind: NumKind, capacity: usize) -> Self {
        match kind {
            NumKind::F64 => ColumnData::F64(Vec::with_capacity(capacity)),
            NumKind::F32 => ColumnData::F32(Vec::with_capacity(capacity)),
            NumKind::I32 => ColumnData::I32(Vec::with_capacity(capacity)),
            NumKind::I64 => ColumnData::I64(Vec::with_capacity(capacity)),
        }
    }

    /// Take ownership of a typed vector.
    pub fn from_vec<T: Element>(values: Vec<T>) -> Self {
        let mut out = ColumnData::zeros(T::KIND, values.len());
        out.write_from(0, 1, values.len(), T::buf(&values), 0, 1);
        out
    }

    #[inline]
    pub fn kind(&self) -> NumKind {
        match self {
            ColumnData::F64(_) => NumKind::F64,
            ColumnData::F32(_) => NumKind::F32,
            ColumnData::I32(_) => NumKind::I32,
            ColumnData::I64(_) => NumKind::I64,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        with_vec!(self, v => v.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn as_buf(&self) -> BlockBuf<'_> {
        match self {
            ColumnData::F64(v) => BlockBuf::F64(v),
            ColumnData::F32(v) => BlockBuf::F32(v),
            ColumnData::I32(v) => BlockBuf::I32(v),
            ColumnData::I64(v) => BlockBuf::I64(v),
        }
    }

    #[inline]
    pub fn as_buf_mut(&mut self) -> BlockBufMut<'_> {
        match self {
            ColumnData::F64(v) => BlockBufMut::F64(v),
            ColumnData::F32(v) => BlockBufMut::F32(v),
            ColumnData::I32(v) => BlockBufMut::I32(v),
            ColumnData::I64(v) => BlockBufMut::I64(v),
        }
    }

    /// Typed slice if the stored kind is `T`.
    #[inline]
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::from_buf(self.as_buf())
    }

    /// Typed mutable slice if the stored kind is `T`.
    #[inline]
    pub fn as_mut_slice<T: Element>(&mut self) -> Option<&mut [T]> {
        T::from_buf_mut(self.as_buf_mut())
    }

    /// Element `idx` as a [`Scalar`].
    #[inline]
    pub fn scalar(&self, idx: usize) -> Scalar {
        match self {
            ColumnData::F64(v) => Scalar::F64(v[idx]),
            ColumnData::F32(v) => Scalar::F32(v[idx]),
            ColumnData::I32(v) => Scalar::I32(v[idx]),
            ColumnData::I64(v) => Scalar::I64(v[idx]),
        }
    }

    /// Store `value` at `idx`, down-casting to the stored kind.
    #[inline]
    pub fn set_scalar(&mut self, idx: usize, value: Scalar) {
        with_vec!(self, v => v[idx] = Element::from_scalar(value));
    }

    /// Returns true if element `idx` equals zero.
    #[inline]
    pub fn is_zero_at(&self, idx: usize) -> bool {
        with_vec!(self, v => v[idx].is_zero())
    }

    /// Truncate or zero-extend to `len` elements.
    pub fn resize(&mut self, len: usize) {
        with_vec!(self, v => v.resize(len, Default::default()));
    }

    /// Append `count` elements of `src` read at `src_start + i * src_stride`,
    /// down-cast to the stored kind.
    pub fn extend_from(&mut self, src: BlockBuf<'_>, src_start: usize, src_stride: usize, count: usize) {
        let at = self.len();
        self.resize(at + count);
        self.write_from(at, 1, count, src, src_start, src_stride);
    }

    /// Fill every element with `value`, down-cast to the stored kind.
    pub fn fill(&mut self, value: Scalar) {
        with_vec!(self, v => v.fill(Element::from_scalar(value)));
    }

    /// Convert every element to `kind`.
    pub fn cast_to(&self, kind: NumKind) -> ColumnData {
        if kind == self.kind() {
            return self.clone();
        }
        let mut out = ColumnData::zeros(kind, self.len());
        out.write_from(0, 1, self.len(), self.as_buf(), 0, 1);
        out
    }

    /// New array holding the elements at `positions`, same kind.
    pub fn gather(&self, positions: &[usize]) -> ColumnData {
        match self {
            ColumnData::F64(v) => ColumnData::F64(positions.iter().map(|&i| v[i]).collect()),
            ColumnData::F32(v) => ColumnData::F32(positions.iter().map(|&i| v[i]).collect()),
            ColumnData::I32(v) => ColumnData::I32(positions.iter().map(|&i| v[i]).collect()),
            ColumnData::I64(v) => ColumnData::I64(positions.iter().map(|&i| v[i]).collect()),
        }
    }

    /// Replace `[start, end)` with the elements of `with` (converted if needed).
    pub fn splice(&mut self, start: usize, end: usize, with: &ColumnData) {
        let with = with.cast_to(self.kind());
        match (self, with) {
            (ColumnData::F64(v), ColumnData::F64(w)) => drop(v.splice(start..end, w)),
            (ColumnData::F32(v), ColumnData::F32(w)) => drop(v.splice(start..end, w)),
            (ColumnData::I32(v), ColumnData::I32(w)) => drop(v.splice(start..end, w)),
            (ColumnData::I64(v), ColumnData::I64(w)) => drop(v.splice(start..end, w)),
            _ => unreachable!("cast_to returns the requested kind"),
        }
    }

    // =========================================================================
    // Cast table
    // =========================================================================

    /// Up-cast `count` elements read at `src_start + i * src_stride` into
    /// `dst[dst_start + i * dst_stride]`.
    pub fn read_into(
        &self,
        src_start: usize,
        src_stride: usize,
        count: usize,
        dst: BlockBufMut<'_>,
        dst_start: usize,
        dst_stride: usize,
    ) {
        match dst {
            BlockBufMut::F64(d) => self.read_as(src_start, src_stride, count, d, dst_start, dst_stride),
            BlockBufMut::F32(d) => self.read_as(src_start, src_stride, count, d, dst_start, dst_stride),
            BlockBufMut::I32(d) => self.read_as(src_start, src_stride, count, d, dst_start, dst_stride),
            BlockBufMut::I64(d) => self.read_as(src_start, src_stride, count, d, dst_start, dst_stride),
        }
    }

    fn read_as<D: Element>(
        &self,
        src_start: usize,
        src_stride: usize,
        count: usize,
        dst: &mut [D],
        dst_start: usize,
        dst_stride: usize,
    ) {
        match self {
            ColumnData::F64(s) => cast::copy_strided(
                count,
                s,
                src_start,
                src_stride,
                dst,
                dst_start,
                dst_stride,
                D::from_f64,
            ),
            ColumnData::F32(s) => cast::copy_strided(
                count,
                s,
                src_start,
                src_stride,
                dst,
                dst_start,
                dst_stride,
                D::from_f32,
            ),
            ColumnData::I32(s) => cast::copy_strided(
                count,
                s,
                src_start,
                src_stride,
                dst,
                dst_start,
                dst_stride,
                D::from_i32,
            ),
            ColumnData::I64(s) => cast::copy_strided(
                count,
                s,
                src_start,
                src_stride,
                dst,
                dst_start,
                dst_stride,
                D::from_i64,
            ),
        }
    }

    /// Down-cast `count` elements of `src` read at `src_start + i * src_stride`
    /// into stored positions `dst_start + i * dst_stride`.
    pub fn write_from(
        &mut self,
        dst_start: usize,
        dst_stride: usize,
        count: usize,
        src: BlockBuf<'_>,
        src_start: usize,
        src_stride: usize,
    ) {
        match src {
            BlockBuf::F64(s) => self.write_as(dst_start, dst_stride, count, s, src_start, src_stride),
            BlockBuf::F32(s) => self.write_as(dst_start, dst_stride, count, s, src_start, src_stride),
            BlockBuf::I32(s) => self.write_as(dst_start, dst_stride, count, s, src_start, src_stride),
            BlockBuf::I64(s) => self.write_as(dst_start, dst_stride, count, s, src_start, src_stride),
        }
    }

    fn write_as<S: Element>(
        &mut self,
        dst_start: usize,
        dst_stride: usize,
        count: usize,
        src: &[S],
        src_start: usize,
        src_stride: usize,
    ) {
        match self {
            ColumnData::F64(d) => cast::copy_strided(
                count,
                src,
                src_start,
                src_stride,
                d,
                dst_start,
                dst_stride,
                S::to_f64,
            ),
            ColumnData::F32(d) => cast::copy_strided(
                count,
                src,
                src_start,
                src_stride,
                d,
                dst_start,
                dst_stride,
                S::to_f32,
            ),
            ColumnData::I32(d) => cast::copy_strided(
                count,
                src,
                src_start,
                src_stride,
                d,
                dst_start,
                dst_stride,
                S::to_i32,
            ),
            ColumnData::I64(d) => cast::copy_strided(
                count,
                src,
                src_start,
                src_stride,
                d,
                dst_start,
                dst_stride,
                S::to_i64,
            ),
        }
    }

    /// Up-cast `self[src_pos[k]]` into `dst[dst_pos[k]]`.
    pub fn read_indexed(&self, src_pos: &[usize], dst: BlockBufMut<'_>, dst_pos: &[usize]) {
        match dst {
            BlockBufMut::F64(d) => self.read_indexed_as(src_pos, d, dst_pos),
            BlockBufMut::F32(d) => self.read_indexed_as(src_pos, d, dst_pos),
            BlockBufMut::I32(d) => self.read_indexed_as(src_pos, d, dst_pos),
            BlockBufMut::I64(d) => self.read_indexed_as(src_pos, d, dst_pos),
        }
    }

    fn read_indexed_as<D: Element>(&self, src_pos: &[usize], dst: &mut [D], dst_pos: &[usize]) {
        match self {
            ColumnData::F64(s) => cast::copy_indexed(s, src_pos, dst, dst_pos, D::from_f64),
            ColumnData::F32(s) => cast::copy_indexed(s, src_pos, dst, dst_pos, D::from_f32),
            ColumnData::I32(s) => cast::copy_indexed(s, src_pos, dst, dst_pos, D::from_i32),
            ColumnData::I64(s) => cast::copy_indexed(s, src_pos, dst, dst_pos, D::from_i64),
        }
    }

    /// Down-cast `src[src_pos[k]]` into `self[dst_pos[k]]`.
    pub fn write_indexed(&mut self, dst_pos: &[usize], src: BlockBuf<'_>, src_pos: &[usize]) {
        match src {
            BlockBuf::F64(s) => self.write_indexed_as(dst_pos, s, src_pos),
            BlockBuf::F32(s) => self.write_indexed_as(dst_pos, s, src_pos),
            BlockBuf::I32(s) => self.write_indexed_as(dst_pos, s, src_pos),
            BlockBuf::I64(s) => self.write_indexed_as(dst_pos, s, src_pos),
        }
    }

    fn write_indexed_as<S: Element>(&mut self, dst_pos: &[usize], src: &[S], src_pos: &[usize]) {
        match self {
            ColumnData::F64(d) => cast::copy_indexed(src, src_pos, d, dst_pos, S::to_f64),
            ColumnData::F32(d) => cast::copy_indexed(src, src_pos, d, dst_pos, S::to_f32),
            ColumnData::I32(d) => cast::copy_indexed(src, src_pos, d, dst_pos, S::to_i32),
            ColumnData::I64(d) => cast::copy_indexed(src, src_pos, d, dst_pos, S::to_i64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_and_kind() {
        let c = ColumnData::zeros(NumKind::I32, 3);
        assert_eq!(c.kind(), NumKind::I32);
        assert_eq!(c.len(), 3);
        assert_eq!(c.as_slice::<i32>(), Some(&[0, 0, 0][..]));
        assert!(c.as_slice::<f64>().is_none());
    }

    #[test]
    fn read_into_casts_and_strides() {
        let c = ColumnData::from_vec(vec![1i32, 2, 3, 4]);
        let mut out = [0.0f64; 4];
        // Every other element into the first two slots.
        c.read_into(0, 2, 2, f64::buf_mut(&mut out), 0, 1);
        assert_eq!(out, [1.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn write_from_applies_down_cast() {
        let mut c = ColumnData::zeros(NumKind::I32, 3);
        let src = [1.5f64, -2.5, 3e10];
        c.write_from(0, 1, 3, f64::buf(&src), 0, 1);
        assert_eq!(c.as_slice::<i32>().unwrap(), &[1, -2, i32::MAX]);
    }

    #[test]
    fn cast_to_preserves_in_range_values() {
        let c = ColumnData::from_vec(vec![1.0f32, -4.0, 8.5]);
        let wide = c.cast_to(NumKind::F64);
        let back = wide.cast_to(NumKind::F32);
        assert_eq!(back, c);
    }

    #[test]
    fn gather_and_splice() {
        let mut c = ColumnData::from_vec(vec![1i64, 2, 3, 4]);
        let g = c.gather(&[3, 0]);
        assert_eq!(g.as_slice::<i64>().unwrap(), &[4, 1]);

        c.splice(1, 3, &ColumnData::from_vec(vec![9.0f64]));
        assert_eq!(c.as_slice::<i64>().unwrap(), &[1, 9, 4]);
    }

    #[test]
    fn fill_and_scalar_access() {
        let mut c = ColumnData::zeros(NumKind::F32, 2);
        c.fill(Scalar::I32(3));
        assert_eq!(c.scalar(1), Scalar::F32(3.0));
        c.set_scalar(0, Scalar::F64(0.0));
        assert!(c.is_zero_at(0));
        assert!(!c.is_zero_at(1));
    }

    #[test]
    fn extend_keeps_stored_kind() {
        let mut c = ColumnData::with_capacity(NumKind::I64, 2);
        let big = [9_007_199_254_740_993i64, 1, 2, 3];
        c.extend_from(i64::buf(&big), 0, 2, 2);
        assert_eq!(c.as_slice::<i64>().unwrap(), &[9_007_199_254_740_993, 2]);

        c.extend_from(f64::buf(&[4.7]), 0, 1, 1);
        assert_eq!(c.as_slice::<i64>().unwrap(), &[9_007_199_254_740_993, 2, 4]);

        c.resize(1);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn indexed_round_trip() {
        let c = ColumnData::from_vec(vec![5.0f64, 6.0, 7.0]);
        let mut out = [0i32; 3];
        c.read_indexed(&[2, 0], i32::buf_mut(&mut out), &[0, 2]);
        assert_eq!(out, [7, 0, 5]);

        let mut d = ColumnData::zeros(NumKind::F64, 3);
        d.write_indexed(&[1], i32::buf(&out), &[0]);
        assert_eq!(d.as_slice::<f64>().unwrap(), &[0.0, 7.0, 0.0]);
    }
}
