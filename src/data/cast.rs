//! Up-cast and down-cast kernels.
//!
//! *Up-cast* moves stored elements into a caller buffer, *down-cast* moves
//! caller elements back into storage. Both are pure functions of their
//! arguments: they never allocate, hold no state, and may run concurrently on
//! disjoint buffers.
//!
//! The element conversion is passed as a plain function pointer taken from
//! [`Element`](super::Element), so each `(stored, buffer)` pair is
//! monomorphized once and selected by a `match` on the stored kind.
//!
//! Callers validate ranges; the kernels index directly and panic on
//! out-of-bounds access.

/// Convert `count` elements of `src` starting at `offset` into `dst[..count]`.
#[inline]
pub fn up_cast<S: Copy, D>(count: usize, offset: usize, src: &[S], dst: &mut [D], f: fn(S) -> D) {
    for (d, &s) in dst[..count].iter_mut().zip(&src[offset..offset + count]) {
        *d = f(s);
    }
}

/// Convert `count` contiguous stored elements starting at `offset` into
/// `dst[dst_start + i * dst_stride]`.
///
/// Used to scatter one column into an interleaved row-major buffer.
#[inline]
pub fn up_cast_with_stride<S: Copy, D>(
    count: usize,
    offset: usize,
    src: &[S],
    dst_start: usize,
    dst_stride: usize,
    dst: &mut [D],
    f: fn(S) -> D,
) {
    copy_strided(count, src, offset, 1, dst, dst_start, dst_stride, f);
}

/// Convert `src[..count]` into stored elements `dst[offset..offset + count]`.
#[inline]
pub fn down_cast<S: Copy, D>(count: usize, offset: usize, src: &[S], dst: &mut [D], f: fn(S) -> D) {
    for (d, &s) in dst[offset..offset + count].iter_mut().zip(&src[..count]) {
        *d = f(s);
    }
}

/// Convert `src[src_start + i * src_stride]` into contiguous stored elements
/// starting at `offset`.
///
/// Used to gather one column out of an interleaved row-major buffer.
#[inline]
pub fn down_cast_with_stride<S: Copy, D>(
    count: usize,
    offset: usize,
    src_start: usize,
    src_stride: usize,
    src: &[S],
    dst: &mut [D],
    f: fn(S) -> D,
) {
    copy_strided(count, src, src_start, src_stride, dst, offset, 1, f);
}

/// General strided conversion: `dst[ds + i*dst_stride] = f(src[ss + i*src_stride])`.
#[inline]
#[allow(clippy::too_many_arguments)]
pub fn copy_strided<S: Copy, D>(
    count: usize,
    src: &[S],
    src_start: usize,
    src_stride: usize,
    dst: &mut [D],
    dst_start: usize,
    dst_stride: usize,
    f: fn(S) -> D,
) {
    if src_stride == 1 && dst_stride == 1 {
        let src = &src[src_start..src_start + count];
        let dst = &mut dst[dst_start..dst_start + count];
        for (d, &s) in dst.iter_mut().zip(src) {
            *d = f(s);
        }
        return;
    }
    let mut si = src_start;
    let mut di = dst_start;
    for _ in 0..count {
        dst[di] = f(src[si]);
        si += src_stride;
        di += dst_stride;
    }
}

/// Indexed conversion: `dst[dst_pos[k]] = f(src[src_pos[k]])`.
///
/// `src_pos` and `dst_pos` must have equal length.
#[inline]
pub fn copy_indexed<S: Copy, D>(
    src: &[S],
    src_pos: &[usize],
    dst: &mut [D],
    dst_pos: &[usize],
    f: fn(S) -> D,
) {
    debug_assert_eq!(src_pos.len(), dst_pos.len());
    for (&si, &di) in src_pos.iter().zip(dst_pos) {
        dst[di] = f(src[si]);
    }
}
