//! Utilities related to numbers.

use ndarray::ScalarOperand;
use num::{self, complex::Complex64};
use std::fmt;

/// Floating-point precision assumed for field data.
#[allow(non_camel_case_types)]
pub type fdt = f64;

/// Scalar marker trait for the element type of flat field vectors,
/// giving easier control over trait bounds for real and complex data.
pub trait FieldScalar:
    Copy + Sync + Send + num::Num + ScalarOperand + fmt::Debug + 'static
{
    /// Creates a scalar with the given real value and no imaginary part.
    fn from_real(value: fdt) -> Self;

    /// Returns the complex conjugate (the value itself for real scalars).
    fn conj(self) -> Self;

    /// Returns the real part.
    fn re(self) -> fdt;

    /// Returns the imaginary part (zero for real scalars).
    fn im(self) -> fdt;

    /// Returns the squared magnitude.
    fn norm_sqr(self) -> fdt {
        self.re() * self.re() + self.im() * self.im()
    }
}

impl FieldScalar for fdt {
    fn from_real(value: fdt) -> Self {
        value
    }

    fn conj(self) -> Self {
        self
    }

    fn re(self) -> fdt {
        self
    }

    fn im(self) -> fdt {
        0.0
    }
}

impl FieldScalar for Complex64 {
    fn from_real(value: fdt) -> Self {
        Complex64::new(value, 0.0)
    }

    fn conj(self) -> Self {
        Complex64::new(self.re, -self.im)
    }

    fn re(self) -> fdt {
        self.re
    }

    fn im(self) -> fdt {
        self.im
    }
}
