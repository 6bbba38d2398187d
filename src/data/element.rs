//! Element types and type-erased block buffers.
//!
//! [`Element`] is implemented for exactly the four stored kinds (`f64`, `f32`,
//! `i32`, `i64`) and carries the conversion functions between them. The
//! conversions follow one fixed policy:
//!
//! - Widening (`i32 -> f64`, `f32 -> f64`, `i32 -> i64`) is exact.
//! - Float to integer truncates toward zero and saturates at the target
//!   bounds; NaN becomes `0`.
//! - `i64 -> i32` saturates.
//! - `f64 -> f32` rounds to nearest and clamps finite values to
//!   `±f32::MAX`; infinities and NaN pass through.
//! - Integer to float rounds to nearest.
//!
//! [`BlockBuf`] / [`BlockBufMut`] erase the element type of a caller buffer so
//! storage backends can be driven through an object-safe trait.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::feature::NumKind;

mod sealed {
    pub trait Sealed {}
    impl Sealed for f64 {}
    impl Sealed for f32 {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
}

/// A numeric element type that a table can store or hand out.
///
/// Sealed: the kind set is closed.
pub trait Element:
    sealed::Sealed
    + Copy
    + Default
    + PartialEq
    + PartialOrd
    + Debug
    + Send
    + Sync
    + Serialize
    + DeserializeOwned
    + 'static
{
    /// Kind tag of this type.
    const KIND: NumKind;

    fn from_f64(v: f64) -> Self;
    fn from_f32(v: f32) -> Self;
    fn from_i32(v: i32) -> Self;
    fn from_i64(v: i64) -> Self;

    fn to_f64(self) -> f64;
    fn to_f32(self) -> f32;
    fn to_i32(self) -> i32;
    fn to_i64(self) -> i64;

    /// Wrap a slice as a type-erased buffer.
    fn buf(s: &[Self]) -> BlockBuf<'_>;

    /// Wrap a mutable slice as a type-erased buffer.
    fn buf_mut(s: &mut [Self]) -> BlockBufMut<'_>;

    /// Recover a typed slice if the buffer holds `Self`.
    fn from_buf(b: BlockBuf<'_>) -> Option<&[Self]>;

    /// Recover a typed mutable slice if the buffer holds `Self`.
    fn from_buf_mut(b: BlockBufMut<'_>) -> Option<&mut [Self]>;

    /// Box as a [`Scalar`].
    fn to_scalar(self) -> Scalar;

    /// Convert from a [`Scalar`] of any kind.
    #[inline]
    fn from_scalar(s: Scalar) -> Self {
        match s {
            Scalar::F64(v) => Self::from_f64(v),
            Scalar::F32(v) => Self::from_f32(v),
            Scalar::I32(v) => Self::from_i32(v),
            Scalar::I64(v) => Self::from_i64(v),
        }
    }

    /// Returns true for the additive identity.
    #[inline]
    fn is_zero(self) -> bool {
        self == Self::default()
    }
}

/// Narrow `f64` to `f32`, clamping finite values to the `f32` range.
#[inline]
pub(crate) fn narrow_f64_to_f32(v: f64) -> f32 {
    if v.is_finite() {
        v.clamp(f32::MIN as f64, f32::MAX as f64) as f32
    } else {
        v as f32
    }
}

/// Narrow `i64` to `i32`, saturating at the bounds.
#[inline]
pub(crate) fn narrow_i64_to_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

// Float -> int `as` casts truncate toward zero, saturate, and map NaN to 0.
macro_rules! impl_element {
    (
        $ty:ty, $kind:ident,
        from_f64 = $ff64:expr, from_f32 = $ff32:expr,
        from_i32 = $fi32:expr, from_i64 = $fi64:expr,
        to_f64 = $tf64:expr, to_f32 = $tf32:expr,
        to_i32 = $ti32:expr, to_i64 = $ti64:expr
    ) => {
        impl Element for $ty {
            const KIND: NumKind = NumKind::$kind;

            #[inline]
            fn from_f64(v: f64) -> Self {
                ($ff64)(v)
            }
            #[inline]
            fn from_f32(v: f32) -> Self {
                ($ff32)(v)
            }
            #[inline]
            fn from_i32(v: i32) -> Self {
                ($fi32)(v)
            }
            #[inline]
            fn from_i64(v: i64) -> Self {
                ($fi64)(v)
            }
            #[inline]
            fn to_f64(self) -> f64 {
                ($tf64)(self)
            }
            #[inline]
            fn to_f32(self) -> f32 {
                ($tf32)(self)
            }
            #[inline]
            fn to_i32(self) -> i32 {
                ($ti32)(self)
            }
            #[inline]
            fn to_i64(self) -> i64 {
                ($ti64)(self)
            }

            #[inline]
            fn buf(s: &[Self]) -> BlockBuf<'_> {
                BlockBuf::$kind(s)
            }
            #[inline]
            fn buf_mut(s: &mut [Self]) -> BlockBufMut<'_> {
                BlockBufMut::$kind(s)
            }
            #[inline]
            fn from_buf(b: BlockBuf<'_>) -> Option<&[Self]> {
                match b {
                    BlockBuf::$kind(s) => Some(s),
                    _ => None,
                }
            }
            #[inline]
            fn from_buf_mut(b: BlockBufMut<'_>) -> Option<&mut [Self]> {
                match b {
                    BlockBufMut::$kind(s) => Some(s),
                    _ => None,
                }
            }
            #[inline]
            fn to_scalar(self) -> Scalar {
                Scalar::$kind(self)
            }
        }
    };
}

impl_element!(
    f64, F64,
    from_f64 = |v: f64| v,
    from_f32 = |v: f32| v as f64,
    from_i32 = |v: i32| v as f64,
    from_i64 = |v: i64| v as f64,
    to_f64 = |v: f64| v,
    to_f32 = narrow_f64_to_f32,
    to_i32 = |v: f64| v as i32,
    to_i64 = |v: f64| v as i64
);

impl_element!(
    f32, F32,
    from_f64 = narrow_f64_to_f32,
    from_f32 = |v: f32| v,
    from_i32 = |v: i32| v as f32,
    from_i64 = |v: i64| v as f32,
    to_f64 = |v: f32| v as f64,
    to_f32 = |v: f32| v,
    to_i32 = |v: f32| v as i32,
    to_i64 = |v: f32| v as i64
);

impl_element!(
    i32, I32,
    from_f64 = |v: f64| v as i32,
    from_f32 = |v: f32| v as i32,
    from_i32 = |v: i32| v,
    from_i64 = narrow_i64_to_i32,
    to_f64 = |v: i32| v as f64,
    to_f32 = |v: i32| v as f32,
    to_i32 = |v: i32| v,
    to_i64 = |v: i32| v as i64
);

impl_element!(
    i64, I64,
    from_f64 = |v: f64| v as i64,
    from_f32 = |v: f32| v as i64,
    from_i32 = |v: i32| v as i64,
    from_i64 = |v: i64| v,
    to_f64 = |v: i64| v as f64,
    to_f32 = |v: i64| v as f32,
    to_i32 = narrow_i64_to_i32,
    to_i64 = |v: i64| v
);

/// A single value of any stored kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    F64(f64),
    F32(f32),
    I32(i32),
    I64(i64),
}

impl Scalar {
    #[inline]
    pub fn kind(&self) -> NumKind {
        match self {
            Scalar::F64(_) => NumKind::F64,
            Scalar::F32(_) => NumKind::F32,
            Scalar::I32(_) => NumKind::I32,
            Scalar::I64(_) => NumKind::I64,
        }
    }

    /// Convert to `T` under the crate's cast policy.
    #[inline]
    pub fn get<T: Element>(self) -> T {
        T::from_scalar(self)
    }
}

/// Read-only, type-erased view of a caller buffer.
#[derive(Clone, Copy, Debug)]
pub enum BlockBuf<'a> {
    F64(&'a [f64]),
    F32(&'a [f32]),
    I32(&'a [i32]),
    I64(&'a [i64]),
}

impl<'a> BlockBuf<'a> {
    #[inline]
    pub fn kind(&self) -> NumKind {
        match self {
            BlockBuf::F64(_) => NumKind::F64,
            BlockBuf::F32(_) => NumKind::F32,
            BlockBuf::I32(_) => NumKind::I32,
            BlockBuf::I64(_) => NumKind::I64,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            BlockBuf::F64(s) => s.len(),
            BlockBuf::F32(s) => s.len(),
            BlockBuf::I32(s) => s.len(),
            BlockBuf::I64(s) => s.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sub-view `[start, end)`.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    #[inline]
    pub fn slice(self, start: usize, end: usize) -> BlockBuf<'a> {
        match self {
            BlockBuf::F64(s) => BlockBuf::F64(&s[start..end]),
            BlockBuf::F32(s) => BlockBuf::F32(&s[start..end]),
            BlockBuf::I32(s) => BlockBuf::I32(&s[start..end]),
            BlockBuf::I64(s) => BlockBuf::I64(&s[start..end]),
        }
    }
}

/// Mutable, type-erased view of a caller buffer.
#[derive(Debug)]
pub enum BlockBufMut<'a> {
    F64(&'a mut [f64]),
    F32(&'a mut [f32]),
    I32(&'a mut [i32]),
    I64(&'a mut [i64]),
}

impl<'a> BlockBufMut<'a> {
    #[inline]
    pub fn kind(&self) -> NumKind {
        match self {
            BlockBufMut::F64(_) => NumKind::F64,
            BlockBufMut::F32(_) => NumKind::F32,
            BlockBufMut::I32(_) => NumKind::I32,
            BlockBufMut::I64(_) => NumKind::I64,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            BlockBufMut::F64(s) => s.len(),
            BlockBufMut::F32(s) => s.len(),
            BlockBufMut::I32(s) => s.len(),
            BlockBufMut::I64(s) => s.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reborrow for a shorter lifetime, so the buffer can be passed on
    /// several times.
    #[inline]
    pub fn reborrow(&mut self) -> BlockBufMut<'_> {
        match self {
            BlockBufMut::F64(s) => BlockBufMut::F64(s),
            BlockBufMut::F32(s) => BlockBufMut::F32(s),
            BlockBufMut::I32(s) => BlockBufMut::I32(s),
            BlockBufMut::I64(s) => BlockBufMut::I64(s),
        }
    }

    /// Sub-view `[start, end)`.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    #[inline]
    pub fn slice(self, start: usize, end: usize) -> BlockBufMut<'a> {
        match self {
            BlockBufMut::F64(s) => BlockBufMut::F64(&mut s[start..end]),
            BlockBufMut::F32(s) => BlockBufMut::F32(&mut s[start..end]),
            BlockBufMut::I32(s) => BlockBufMut::I32(&mut s[start..end]),
            BlockBufMut::I64(s) => BlockBufMut::I64(&mut s[start..end]),
        }
    }

    /// Fill `[start, end)` with zeros.
    pub fn zero_range(&mut self, start: usize, end: usize) {
        match self {
            BlockBufMut::F64(s) => s[start..end].fill(0.0),
            BlockBufMut::F32(s) => s[start..end].fill(0.0),
            BlockBufMut::I32(s) => s[start..end].fill(0),
            BlockBufMut::I64(s) => s[start..end].fill(0),
        }
    }

    /// Read-only view of the same memory.
    #[inline]
    pub fn as_buf(&self) -> BlockBuf<'_> {
        match self {
            BlockBufMut::F64(s) => BlockBuf::F64(s),
            BlockBufMut::F32(s) => BlockBuf::F32(s),
            BlockBufMut::I32(s) => BlockBuf::I32(s),
            BlockBufMut::I64(s) => BlockBuf::I64(s),
        }
    }
}
