//! Lazy handles to flow fields held in storage.
//!
//! A handle only records where its field lives. Nothing is read until
//! [`VectorHandle::load`] is called, so large collections of handles can be
//! passed around while only a few vectors are held in memory at a time.

pub mod complex;
pub mod real;

pub use complex::ComplexFieldHandle;
pub use real::RealFieldHandle;

use crate::{
    error::ModalResult,
    field::{total_blocks, Quantity},
    num::FieldScalar,
    vector::FieldVector,
};

/// Defines the capabilities a modal decomposition needs from a reference
/// to a stored vector.
pub trait VectorHandle: Sync {
    /// Element type of the materialized vectors.
    type Scalar: FieldScalar;

    /// Returns the length of the flat vector this handle refers to,
    /// without modifying any stored data.
    fn size(&self) -> ModalResult<usize>;

    /// Reads the stored field(s) and returns the corresponding vector,
    /// minus the base vector and times the scale factor if either is set.
    fn load(&self) -> ModalResult<FieldVector<Self::Scalar>>;

    /// Writes the given vector to storage, replacing any existing content.
    ///
    /// The write is not transactional: if it fails part way, the stored
    /// data is left in an undefined state.
    fn store(&self, vector: &FieldVector<Self::Scalar>) -> ModalResult<()>;
}

/// Which quantities make up the flat vectors of a handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VectorContent {
    /// Velocity only, `2n` values.
    Velocity,
    /// Velocity followed by pressure, `3n` values.
    VelocityPressure,
}

impl VectorContent {
    /// Returns the quantities in flat vector order.
    pub fn quantities(self) -> &'static [Quantity] {
        match self {
            Self::Velocity => &[Quantity::Velocity],
            Self::VelocityPressure => &[Quantity::Velocity, Quantity::Pressure],
        }
    }

    /// Number of length-`n` blocks in a flat vector.
    pub fn n_blocks(self) -> usize {
        total_blocks(self.quantities())
    }
}

impl Default for VectorContent {
    fn default() -> Self {
        Self::VelocityPressure
    }
}

/// Subtracts the base vector and applies the scale factor, if given.
fn apply_base_and_scale<T, H>(
    vector: FieldVector<T>,
    base: Option<&H>,
    scale: Option<T>,
) -> ModalResult<FieldVector<T>>
where
    T: FieldScalar,
    H: VectorHandle<Scalar = T>,
{
    let vector = match base {
        Some(base) => vector.sub(&base.load()?)?,
        None => vector,
    };
    Ok(match scale {
        Some(scale) => vector.scale(scale),
        None => vector,
    })
}
