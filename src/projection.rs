//! Inner products, means and projections over collections of vector handles.

use crate::{
    error::{ModalError, ModalResult},
    handle::VectorHandle,
    io::Verbosity,
    num::{fdt, FieldScalar},
    vector::FieldVector,
};
use indicatif::ProgressBar;
use ndarray::prelude::*;
use rayon::prelude::*;

/// Defines the properties of an inner product on flat field vectors.
pub trait InnerProduct<T: FieldScalar>: Sync {
    /// Computes the inner product of the two vectors, conjugating the first.
    fn inner_product(&self, a: &FieldVector<T>, b: &FieldVector<T>) -> ModalResult<T>;
}

impl<T, F> InnerProduct<T> for F
where
    T: FieldScalar,
    F: Fn(&FieldVector<T>, &FieldVector<T>) -> ModalResult<T> + Sync,
{
    fn inner_product(&self, a: &FieldVector<T>, b: &FieldVector<T>) -> ModalResult<T> {
        self(a, b)
    }
}

/// Computes `sum_i w_i * conj(a_i) * b_i`.
///
/// # Returns
///
/// A `Result` which is either:
///
/// - `Ok`: Contains the weighted inner product.
/// - `Err`: A `DimensionMismatch` if the lengths of `a`, `b` and `weights` differ.
pub fn weighted_inner_product<T: FieldScalar>(
    a: &FieldVector<T>,
    b: &FieldVector<T>,
    weights: ArrayView1<fdt>,
) -> ModalResult<T> {
    if a.len() != b.len() {
        return Err(ModalError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    if a.len() != weights.len() {
        return Err(ModalError::DimensionMismatch {
            left: a.len(),
            right: weights.len(),
        });
    }
    Ok(a.data()
        .iter()
        .zip(b.data().iter())
        .zip(weights.iter())
        .fold(T::zero(), |sum, ((&a, &b), &w)| {
            sum + T::from_real(w) * a.conj() * b
        }))
}

/// Inner product weighted by a borrowed weight vector, typically the mesh
/// mass matrix.
///
/// The weights are borrowed from their owner, so they cannot be modified
/// while the inner product is alive.
#[derive(Clone, Copy, Debug)]
pub struct WeightedInnerProduct<'a> {
    weights: ArrayView1<'a, fdt>,
}

impl<'a> WeightedInnerProduct<'a> {
    pub fn new(weights: ArrayView1<'a, fdt>) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> ArrayView1<'a, fdt> {
        self.weights
    }
}

impl<'a, T: FieldScalar> InnerProduct<T> for WeightedInnerProduct<'a> {
    fn inner_product(&self, a: &FieldVector<T>, b: &FieldVector<T>) -> ModalResult<T> {
        weighted_inner_product(a, b, self.weights)
    }
}

/// Computes the mean of the vectors referred to by the given handles.
///
/// Vectors are loaded one at a time.
pub fn mean<H: VectorHandle>(handles: &[H]) -> ModalResult<FieldVector<H::Scalar>> {
    let (first, rest) = handles
        .split_first()
        .ok_or(ModalError::EmptyInput { operation: "mean" })?;
    let mut sum = first.load()?;
    for handle in rest {
        sum = sum.add(&handle.load()?)?;
    }
    if handles.len() == 1 {
        Ok(sum)
    } else {
        Ok(sum.scale(H::Scalar::from_real(1.0 / handles.len() as fdt)))
    }
}

/// Computes the linear combination of the vectors referred to by the given
/// handles, loading one vector at a time.
pub fn lin_combine<H: VectorHandle>(
    handles: &[H],
    coefficients: &[H::Scalar],
) -> ModalResult<FieldVector<H::Scalar>> {
    if handles.len() != coefficients.len() {
        return Err(ModalError::DimensionMismatch {
            left: handles.len(),
            right: coefficients.len(),
        });
    }
    let (first, rest) = handles.split_first().ok_or(ModalError::EmptyInput {
        operation: "linear combination",
    })?;
    let mut sum = first.load()?.scale(coefficients[0]);
    for (handle, &coefficient) in rest.iter().zip(coefficients[1..].iter()) {
        sum = sum.add(&handle.load()?.scale(coefficient))?;
    }
    Ok(sum)
}

/// Projects every data vector onto every mode with the default [`Projector`].
///
/// The result is indexed `[mode, data]`.
pub fn project<T, M, D, P>(modes: &[M], data: &[D], inner_product: &P) -> ModalResult<Array2<T>>
where
    T: FieldScalar,
    M: VectorHandle<Scalar = T>,
    D: VectorHandle<Scalar = T>,
    P: InnerProduct<T>,
{
    Projector::default().project(modes, data, inner_product)
}

/// Batch engine for inner products between collections of handles.
///
/// Modes are loaded in blocks so that at most `max_loaded_vectors` mode
/// vectors are held at once, and every data vector is loaded once per block.
#[derive(Clone, Copy, Debug)]
pub struct Projector {
    max_loaded_vectors: usize,
    parallel: bool,
    verbosity: Verbosity,
}

impl Projector {
    pub const DEFAULT_MAX_LOADED_VECTORS: usize = 64;

    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of mode vectors held in memory at once.
    pub fn with_max_loaded_vectors(mut self, max_loaded_vectors: usize) -> Self {
        self.max_loaded_vectors = max_loaded_vectors.max(1);
        self
    }

    /// Sets whether data vectors are processed in parallel.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn max_loaded_vectors(&self) -> usize {
        self.max_loaded_vectors
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// Computes the inner product of every mode with every data vector.
    ///
    /// # Returns
    ///
    /// A `Result` which is either:
    ///
    /// - `Ok`: Contains an array of shape `[modes.len(), data.len()]` where
    ///   entry `[i, j]` is `inner_product(modes[i], data[j])`.
    /// - `Err`: The first error encountered while loading or multiplying.
    pub fn project<T, M, D, P>(
        &self,
        modes: &[M],
        data: &[D],
        inner_product: &P,
    ) -> ModalResult<Array2<T>>
    where
        T: FieldScalar,
        M: VectorHandle<Scalar = T>,
        D: VectorHandle<Scalar = T>,
        P: InnerProduct<T>,
    {
        let mut products = Array2::zeros((modes.len(), data.len()));
        if modes.is_empty() || data.is_empty() {
            return Ok(products);
        }
        let n_blocks = (modes.len() + self.max_loaded_vectors - 1) / self.max_loaded_vectors;
        let progress_bar = self.verbosity.create_progress_bar(n_blocks * data.len());

        for (block_idx, mode_block) in modes.chunks(self.max_loaded_vectors).enumerate() {
            let offset = block_idx * self.max_loaded_vectors;
            let loaded_modes = mode_block
                .iter()
                .map(|mode| mode.load())
                .collect::<ModalResult<Vec<_>>>()?;

            let columns = self.map_handles(data, &progress_bar, |_, handle| {
                let vector = handle.load()?;
                loaded_modes
                    .iter()
                    .map(|mode| inner_product.inner_product(mode, &vector))
                    .collect::<ModalResult<Vec<T>>>()
            })?;

            for (data_idx, column) in columns.into_iter().enumerate() {
                for (mode_idx, value) in column.into_iter().enumerate() {
                    products[[offset + mode_idx, data_idx]] = value;
                }
            }
        }
        progress_bar.finish();
        Ok(products)
    }

    /// Computes the Gram matrix of the given handles.
    ///
    /// Only entries on and above the diagonal are computed; the rest are
    /// filled in by conjugate symmetry.
    pub fn symmetric_inner_products<T, H, P>(&self, handles: &[H], inner_product: &P) -> ModalResult<Array2<T>>
    where
        T: FieldScalar,
        H: VectorHandle<Scalar = T>,
        P: InnerProduct<T>,
    {
        let n = handles.len();
        let mut products = Array2::zeros((n, n));
        if n == 0 {
            return Ok(products);
        }
        let progress_bar = self.verbosity.create_progress_bar(n);

        for (block_idx, block) in handles.chunks(self.max_loaded_vectors).enumerate() {
            let offset = block_idx * self.max_loaded_vectors;
            let loaded_block = block
                .iter()
                .map(|handle| handle.load())
                .collect::<ModalResult<Vec<_>>>()?;

            let columns = self.map_handles(&handles[offset..], &ProgressBar::hidden(), |idx, handle| {
                let column_idx = offset + idx;
                let loaded;
                let vector = if idx < loaded_block.len() {
                    &loaded_block[idx]
                } else {
                    loaded = handle.load()?;
                    &loaded
                };
                loaded_block
                    .iter()
                    .take(idx + 1)
                    .map(|row| inner_product.inner_product(row, vector))
                    .collect::<ModalResult<Vec<T>>>()
                    .map(|column| (column_idx, column))
            })?;

            for (column_idx, column) in columns {
                for (idx, value) in column.into_iter().enumerate() {
                    let row_idx = offset + idx;
                    products[[row_idx, column_idx]] = value;
                    if row_idx != column_idx {
                        products[[column_idx, row_idx]] = value.conj();
                    }
                }
            }
            progress_bar.inc(block.len() as u64);
        }
        progress_bar.finish();
        Ok(products)
    }

    fn map_handles<H, R, F>(&self, handles: &[H], progress_bar: &ProgressBar, f: F) -> ModalResult<Vec<R>>
    where
        H: VectorHandle,
        R: Send,
        F: Fn(usize, &H) -> ModalResult<R> + Sync,
    {
        let apply = |(idx, handle): (usize, &H)| {
            let result = f(idx, handle);
            progress_bar.inc(1);
            result
        };
        if self.parallel {
            handles.par_iter().enumerate().map(apply).collect()
        } else {
            handles.iter().enumerate().map(apply).collect()
        }
    }
}

impl Default for Projector {
    fn default() -> Self {
        Self {
            max_loaded_vectors: Self::DEFAULT_MAX_LOADED_VECTORS,
            parallel: false,
            verbosity: Verbosity::default(),
        }
    }
}
