//! Flat field vectors supporting the arithmetic needed by modal decompositions.

use crate::{
    error::{ModalError, ModalResult},
    num::{fdt, FieldScalar},
};
use ndarray::prelude::*;
use num::complex::Complex64;

/// A flat field vector, made of concatenated blocks of nodal values.
///
/// Arithmetic always allocates a new vector and leaves the operands untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldVector<T> {
    data: Array1<T>,
}

impl<T: FieldScalar> FieldVector<T> {
    pub fn new(data: Array1<T>) -> Self {
        Self { data }
    }

    /// Creates a vector of zeros with the given length.
    pub fn zeros(len: usize) -> Self {
        Self::new(Array1::zeros(len))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns a view of the underlying values.
    pub fn data(&self) -> ArrayView1<T> {
        self.data.view()
    }

    /// Consumes the vector and returns the underlying array.
    pub fn into_data(self) -> Array1<T> {
        self.data
    }

    fn check_same_len(&self, other: &Self) -> ModalResult<()> {
        if self.len() == other.len() {
            Ok(())
        } else {
            Err(ModalError::DimensionMismatch {
                left: self.len(),
                right: other.len(),
            })
        }
    }

    /// Returns the element-wise sum of this and the other vector.
    pub fn add(&self, other: &Self) -> ModalResult<Self> {
        self.check_same_len(other)?;
        Ok(Self::new(&self.data + &other.data))
    }

    /// Returns the element-wise difference between this and the other vector.
    pub fn sub(&self, other: &Self) -> ModalResult<Self> {
        self.check_same_len(other)?;
        Ok(Self::new(&self.data - &other.data))
    }

    /// Returns this vector with every element multiplied by the given factor.
    pub fn scale(&self, factor: T) -> Self {
        Self::new(&self.data * factor)
    }

    /// Returns the sum of the given vectors weighted by the given coefficients.
    pub fn linear_combination(vectors: &[Self], coefficients: &[T]) -> ModalResult<Self> {
        if vectors.len() != coefficients.len() {
            return Err(ModalError::DimensionMismatch {
                left: vectors.len(),
                right: coefficients.len(),
            });
        }
        let (first, rest) = vectors.split_first().ok_or(ModalError::EmptyInput {
            operation: "linear combination",
        })?;

        let mut data = &first.data * coefficients[0];
        for (vector, &coefficient) in rest.iter().zip(coefficients[1..].iter()) {
            if vector.len() != data.len() {
                return Err(ModalError::DimensionMismatch {
                    left: data.len(),
                    right: vector.len(),
                });
            }
            data.scaled_add(coefficient, &vector.data);
        }
        Ok(Self::new(data))
    }
}

impl FieldVector<fdt> {
    /// Returns a complex copy of this vector with zero imaginary part.
    pub fn to_complex(&self) -> FieldVector<Complex64> {
        FieldVector::new(self.data.mapv(|value| Complex64::new(value, 0.0)))
    }
}

impl FieldVector<Complex64> {
    /// Combines a real and an imaginary part into `re + i*im`.
    pub fn from_parts(re: &FieldVector<fdt>, im: &FieldVector<fdt>) -> ModalResult<Self> {
        if re.len() != im.len() {
            return Err(ModalError::shape_mismatch("imaginary part length", re.len(), im.len()));
        }
        Ok(Self::new(
            re.data
                .iter()
                .zip(im.data.iter())
                .map(|(&re, &im)| Complex64::new(re, im))
                .collect(),
        ))
    }

    pub fn real_part(&self) -> FieldVector<fdt> {
        FieldVector::new(self.data.mapv(|value| value.re))
    }

    pub fn imag_part(&self) -> FieldVector<fdt> {
        FieldVector::new(self.data.mapv(|value| value.im))
    }
}

impl<T: FieldScalar> From<Array1<T>> for FieldVector<T> {
    fn from(data: Array1<T>) -> Self {
        Self::new(data)
    }
}

impl<T: FieldScalar> From<Vec<T>> for FieldVector<T> {
    fn from(values: Vec<T>) -> Self {
        Self::new(Array1::from(values))
    }
}
