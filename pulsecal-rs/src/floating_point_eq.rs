//! Equality and hashing for floating-point values that must behave like keys.
//!
//! `±0.0` are indistinguishable, and all NaNs are equal only to each other.

pub(crate) mod f64 {
    use std::hash::{Hash as _, Hasher};

    /// Reflexive equality: all `NaN`s compare equal, `+0.0` equals `-0.0`.
    #[inline]
    pub(crate) fn eq(left: f64, right: f64) -> bool {
        left == right || left.is_nan() && right.is_nan()
    }

    /// Hash compatible with [`eq`].
    #[inline]
    pub(crate) fn hash<H: Hasher>(value: f64, state: &mut H) {
        let canonical = if value == 0.0 {
            0.0
        } else if value.is_nan() {
            f64::NAN
        } else {
            value
        };
        canonical.to_bits().hash(state)
    }
}

/// [`Complex64`](num_complex::Complex64) utilities; components are compared independently.
pub(crate) mod complex64 {
    use std::hash::Hasher;

    use num_complex::Complex64;

    #[inline]
    pub(crate) fn eq(left: Complex64, right: Complex64) -> bool {
        super::f64::eq(left.re, right.re) && super::f64::eq(left.im, right.im)
    }

    #[inline]
    pub(crate) fn hash<H: Hasher>(value: Complex64, state: &mut H) {
        super::f64::hash(value.re, state);
        super::f64::hash(value.im, state);
    }

    /// Element-wise [`eq`] over two sample buffers.
    pub(crate) fn slice_eq(left: &[Complex64], right: &[Complex64]) -> bool {
        left.len() == right.len() && left.iter().zip(right).all(|(l, r)| eq(*l, *r))
    }
}
