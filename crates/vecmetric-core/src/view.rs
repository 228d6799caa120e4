//! Borrowed vector views and kernel results.

use half::f16;

use crate::metric::DataType;

/// Non-owning, read-only view over caller memory, tagged with its element type.
///
/// The dimension is the slice length; for [`VectorView::B1`] it counts bytes,
/// each holding eight binary dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VectorView<'a> {
    /// Double precision elements.
    F64(&'a [f64]),
    /// Single precision elements.
    F32(&'a [f32]),
    /// Half precision elements.
    F16(&'a [f16]),
    /// Signed byte elements.
    I8(&'a [i8]),
    /// Bit-packed binary elements.
    B1(&'a [u8]),
}

impl VectorView<'_> {
    /// Element type of the view.
    #[must_use]
    pub const fn datatype(&self) -> DataType {
        match self {
            Self::F64(_) => DataType::F64,
            Self::F32(_) => DataType::F32,
            Self::F16(_) => DataType::F16,
            Self::I8(_) => DataType::I8,
            Self::B1(_) => DataType::B1,
        }
    }

    /// Number of stored elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::F64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F16(v) => v.len(),
            Self::I8(v) => v.len(),
            Self::B1(v) => v.len(),
        }
    }

    /// Returns true for a zero-dimensional view.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Element types a [`VectorView`] can be built from.
pub trait Element: Copy + sealed::Sealed + 'static {
    /// Tag of this element type.
    const DATATYPE: DataType;

    /// Wraps a slice in the matching view.
    fn view(slice: &[Self]) -> VectorView<'_>;
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for f64 {}
    impl Sealed for f32 {}
    impl Sealed for half::f16 {}
    impl Sealed for i8 {}
    impl Sealed for u8 {}
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const DATATYPE: DataType = DataType::$variant;

            #[inline]
            fn view(slice: &[Self]) -> VectorView<'_> {
                VectorView::$variant(slice)
            }
        }

        impl<'a> From<&'a [$ty]> for VectorView<'a> {
            #[inline]
            fn from(slice: &'a [$ty]) -> Self {
                VectorView::$variant(slice)
            }
        }
    };
}

impl_element!(f64, F64);
impl_element!(f32, F32);
impl_element!(f16, F16);
impl_element!(i8, I8);
impl_element!(u8, B1);

/// Scalar produced by a kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    /// Similarity or distance value.
    Real(f32),
    /// Bit count (Hamming distance).
    Count(u64),
}

impl Score {
    /// The score as `f32`; counts are converted.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Reason: Hamming counts stay far below 2^24 for realistic vectors.
    pub fn as_f32(self) -> f32 {
        match self {
            Self::Real(v) => v,
            Self::Count(c) => c as f32,
        }
    }

    /// The count, when this is a Hamming result.
    #[must_use]
    pub fn count(self) -> Option<u64> {
        match self {
            Self::Count(c) => Some(c),
            Self::Real(_) => None,
        }
    }

    /// The real value, when this is not a count.
    #[must_use]
    pub fn real(self) -> Option<f32> {
        match self {
            Self::Real(v) => Some(v),
            Self::Count(_) => None,
        }
    }
}
