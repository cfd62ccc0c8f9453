//! Structured grids that scattered mesh data is resampled onto.

use crate::{
    error::{ModalError, ModalResult},
    num::fdt,
};
use ndarray::prelude::*;

#[cfg(feature = "serialization")]
use serde::Serialize;

/// Resolution and extent of a structured 2D grid.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct GridSpec {
    /// Number of points along x.
    pub nx: usize,
    /// Number of points along y.
    pub ny: usize,
    /// Coordinates of the first and last point along x.
    pub x_range: [fdt; 2],
    /// Coordinates of the first and last point along y.
    pub y_range: [fdt; 2],
}

impl GridSpec {
    pub fn new(nx: usize, ny: usize, x_range: [fdt; 2], y_range: [fdt; 2]) -> Self {
        Self {
            nx,
            ny,
            x_range,
            y_range,
        }
    }

    /// Returns the grid shape as `(ny, nx)`, the shape of the meshgrid arrays.
    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    pub fn n_points(&self) -> usize {
        self.nx * self.ny
    }
}

/// A structured 2D grid with uniformly spaced axes.
///
/// Points are enumerated in row-major meshgrid order, so the point with
/// axis indices `(ix, iy)` has flat index `iy * nx + ix`.
#[derive(Clone, Debug)]
pub struct StructuredGrid2 {
    spec: GridSpec,
    x: Array1<fdt>,
    y: Array1<fdt>,
}

impl StructuredGrid2 {
    /// Creates a new grid from the given specification.
    ///
    /// A grid with no points along either axis is rejected.
    pub fn new(spec: GridSpec) -> ModalResult<Self> {
        if spec.nx == 0 {
            return Err(ModalError::shape_mismatch("grid points along x", 1, 0));
        }
        if spec.ny == 0 {
            return Err(ModalError::shape_mismatch("grid points along y", 1, 0));
        }
        Ok(Self {
            x: Array1::linspace(spec.x_range[0], spec.x_range[1], spec.nx),
            y: Array1::linspace(spec.y_range[0], spec.y_range[1], spec.ny),
            spec,
        })
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Coordinates along the x-axis.
    pub fn x(&self) -> ArrayView1<fdt> {
        self.x.view()
    }

    /// Coordinates along the y-axis.
    pub fn y(&self) -> ArrayView1<fdt> {
        self.y.view()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.spec.shape()
    }

    pub fn n_points(&self) -> usize {
        self.spec.n_points()
    }

    /// Returns the coordinates of the point with the given flat index.
    pub fn point(&self, idx: usize) -> [fdt; 2] {
        let nx = self.spec.nx;
        [self.x[idx % nx], self.y[idx / nx]]
    }

    /// Iterates over all grid points in flat index order.
    pub fn points(&self) -> impl Iterator<Item = [fdt; 2]> + '_ {
        (0..self.n_points()).map(move |idx| self.point(idx))
    }

    /// Returns the coordinate arrays of all grid points, each of shape `(ny, nx)`.
    pub fn meshgrid(&self) -> (Array2<fdt>, Array2<fdt>) {
        let shape = self.shape();
        (
            Array2::from_shape_fn(shape, |(_, ix)| self.x[ix]),
            Array2::from_shape_fn(shape, |(iy, _)| self.y[iy]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_are_enumerated_row_by_row() {
        let grid = StructuredGrid2::new(GridSpec::new(3, 2, [0.0, 1.0], [-1.0, 1.0])).unwrap();
        assert_eq!(grid.x().to_vec(), vec![0.0, 0.5, 1.0]);
        assert_eq!(grid.y().to_vec(), vec![-1.0, 1.0]);
        let points: Vec<_> = grid.points().collect();
        assert_eq!(points.len(), 6);
        assert_eq!(points[1], [0.5, -1.0]);
        assert_eq!(points[5], [1.0, 1.0]);

        let (xx, yy) = grid.meshgrid();
        assert_eq!(xx.dim(), (2, 3));
        assert_eq!(xx[[1, 2]], 1.0);
        assert_eq!(yy[[1, 0]], 1.0);
    }

    #[test]
    fn empty_grids_are_rejected() {
        assert!(StructuredGrid2::new(GridSpec::new(0, 4, [0.0, 1.0], [0.0, 1.0])).is_err());
        assert!(StructuredGrid2::new(GridSpec::new(4, 0, [0.0, 1.0], [0.0, 1.0])).is_err());
    }
}
