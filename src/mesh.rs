//! Geometry and integration weights of a two-dimensional spectral element mesh.

use crate::{
    error::{ModalError, ModalResult},
    field::{gather, FieldLayout, Quantity, SpectralField},
    io::{storage::FieldStorage, utils, Verbosity},
    num::{fdt, FieldScalar},
    projection::{weighted_inner_product, WeightedInnerProduct},
    vector::FieldVector,
};
use ndarray::prelude::*;
use std::path::Path;

/// Node coordinates and mass matrix weights of a mesh, in flat vector order.
///
/// The weights cover velocity vectors: the `n` point weights are stored
/// twice, once for the u-block and once for the v-block.
#[derive(Clone, Debug)]
pub struct MeshGeometry {
    layout: FieldLayout,
    cx: Array1<fdt>,
    cy: Array1<fdt>,
    weights: Array1<fdt>,
    verbosity: Verbosity,
}

impl MeshGeometry {
    /// Derives the geometry from the coordinates of the given field and the
    /// given per-point weights.
    pub fn from_field(field: &SpectralField, point_weights: Array1<fdt>) -> ModalResult<Self> {
        let layout = FieldLayout::of_field(field)?;
        let n = layout.n_points();
        if point_weights.len() != n {
            return Err(ModalError::shape_mismatch("number of weights", n, point_weights.len()));
        }
        let coords = gather(field, &layout, Quantity::Position)?;
        let weights = ndarray::concatenate(Axis(0), &[point_weights.view(), point_weights.view()])
            .map_err(|_| ModalError::shape_mismatch("number of weights", 2 * n, 0))?;
        Ok(Self {
            layout,
            cx: coords.slice(s![..n]).to_owned(),
            cy: coords.slice(s![n..]).to_owned(),
            weights,
            verbosity: Verbosity::default(),
        })
    }

    /// Reads the reference field and the weight file and derives the geometry.
    pub fn load<S: FieldStorage + ?Sized>(
        storage: &S,
        reference_path: &Path,
        weight_path: &Path,
    ) -> ModalResult<Self> {
        let field = storage.read_field(reference_path)?;
        let point_weights = utils::read_whitespace_separated_floats(weight_path)?;
        Self::from_field(&field, point_weights)
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    /// Number of mesh points `n`.
    pub fn n_points(&self) -> usize {
        self.cx.len()
    }

    pub fn cx(&self) -> ArrayView1<fdt> {
        self.cx.view()
    }

    pub fn cy(&self) -> ArrayView1<fdt> {
        self.cy.view()
    }

    /// Weights for velocity vectors, of length `2n`.
    pub fn weights(&self) -> ArrayView1<fdt> {
        self.weights.view()
    }

    /// Weights of the individual points, of length `n`.
    pub fn point_weights(&self) -> ArrayView1<fdt> {
        self.weights.slice(s![..self.n_points()])
    }

    /// Sum of the point weights.
    pub fn integration_volume(&self) -> fdt {
        self.point_weights().sum()
    }

    /// Returns `([x_min, x_max], [y_min, y_max])` of the mesh points.
    pub fn bounding_box(&self) -> ([fdt; 2], [fdt; 2]) {
        let range = |values: &Array1<fdt>| {
            values.iter().fold([fdt::INFINITY, fdt::NEG_INFINITY], |[lower, upper], &value| {
                [lower.min(value), upper.max(value)]
            })
        };
        (range(&self.cx), range(&self.cy))
    }

    /// Excludes the masked points from integration by zeroing both copies
    /// of their weights.
    ///
    /// # Returns
    ///
    /// A `Result` which is either:
    ///
    /// - `Ok`: Contains the remaining integration volume.
    /// - `Err`: A `ShapeMismatch` if the mask does not have one entry per point.
    pub fn mask_domain(&mut self, mask: &[bool]) -> ModalResult<fdt> {
        let n = self.n_points();
        if mask.len() != n {
            return Err(ModalError::shape_mismatch("mask length", n, mask.len()));
        }
        for (idx, &masked) in mask.iter().enumerate() {
            if masked {
                self.weights[idx] = 0.0;
                self.weights[n + idx] = 0.0;
            }
        }
        let volume = self.integration_volume();
        if self.verbosity.print_messages() {
            println!("Integration volume: {}", volume);
        }
        Ok(volume)
    }

    /// Returns the inner product weighted by the current velocity weights.
    ///
    /// The inner product borrows the weights, so the domain cannot be
    /// masked while it is alive:
    ///
    /// ```compile_fail
    /// # use sempod::{mesh::MeshGeometry, projection::InnerProduct, vector::FieldVector};
    /// fn masked_dot(geometry: &mut MeshGeometry, mask: &[bool]) -> f64 {
    ///     let inner_product = geometry.inner_product();
    ///     geometry.mask_domain(mask).unwrap();
    ///     let ones = FieldVector::from(vec![1.0_f64; 2]);
    ///     inner_product.inner_product(&ones, &ones).unwrap()
    /// }
    /// ```
    pub fn inner_product(&self) -> WeightedInnerProduct<'_> {
        WeightedInnerProduct::new(self.weights.view())
    }

    /// Computes the weighted inner product of two velocity vectors.
    pub fn dot<T: FieldScalar>(&self, a: &FieldVector<T>, b: &FieldVector<T>) -> ModalResult<T> {
        weighted_inner_product(a, b, self.weights.view())
    }

    /// Returns the point weights repeated once per block, for vectors made
    /// of `n_blocks` blocks.
    pub fn block_weights(&self, n_blocks: usize) -> Array1<fdt> {
        let n = self.n_points();
        let mut weights = Array1::zeros(n_blocks * n);
        for block in 0..n_blocks {
            weights
                .slice_mut(s![block * n..(block + 1) * n])
                .assign(&self.point_weights());
        }
        weights
    }
}
