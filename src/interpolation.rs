//! Interpolation of scattered mesh data onto arbitrary points.
//!
//! Values at a target point are estimated by a weighted least-squares fit
//! of a low-order polynomial to the nearest scattered points, evaluated at
//! the target. The fit reproduces any polynomial of the method's degree
//! exactly, in particular constant fields.

use crate::{
    error::{ModalError, ModalResult},
    grid::StructuredGrid2,
    io::Verbosity,
    num::fdt,
};
use indicatif::ParallelProgressIterator;
use nalgebra::{DMatrix, DVector};
use ndarray::prelude::*;
use rayon::prelude::*;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

#[cfg(feature = "serialization")]
use serde::Serialize;

/// Method used to estimate values between scattered points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub enum InterpolationMethod {
    /// Local cubic least-squares fit.
    Cubic,
    /// Local linear least-squares fit.
    Linear,
    /// Value of the nearest scattered point.
    Nearest,
}

impl InterpolationMethod {
    pub fn name(self) -> &'static str {
        match self {
            Self::Cubic => "cubic",
            Self::Linear => "linear",
            Self::Nearest => "nearest",
        }
    }

    /// Polynomial degree of the local fit, if any.
    pub fn degree(self) -> Option<usize> {
        match self {
            Self::Cubic => Some(3),
            Self::Linear => Some(1),
            Self::Nearest => None,
        }
    }

    /// Minimum number of scattered points the method can work with.
    pub fn min_points(self) -> usize {
        self.degree().map_or(1, n_monomials)
    }

    /// Number of nearest neighbours included in each local fit.
    fn n_neighbours(self) -> usize {
        match self {
            Self::Cubic => 32,
            Self::Linear => 12,
            Self::Nearest => 1,
        }
    }

    /// Method to resort to when a local fit is singular and fallback is enabled.
    fn fallback(self) -> Option<Self> {
        match self {
            Self::Cubic => Some(Self::Linear),
            Self::Linear => Some(Self::Nearest),
            Self::Nearest => None,
        }
    }
}

impl Default for InterpolationMethod {
    fn default() -> Self {
        Self::Cubic
    }
}

/// Number of monomials `x^i y^j` with `i + j <= degree`.
fn n_monomials(degree: usize) -> usize {
    (degree + 1) * (degree + 2) / 2
}

/// Evaluates all monomials of total degree up to `degree` at `(x, y)`,
/// starting with the constant.
fn evaluate_monomials(degree: usize, x: fdt, y: fdt, monomials: &mut Vec<fdt>) {
    monomials.clear();
    for total in 0..=degree {
        for power_y in 0..=total {
            let power_x = total - power_y;
            monomials.push(x.powi(power_x as i32) * y.powi(power_y as i32));
        }
    }
}

#[derive(Clone, Debug)]
struct ScatteredPoint {
    position: [fdt; 2],
    index: usize,
}

impl RTreeObject for ScatteredPoint {
    type Envelope = AABB<[fdt; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for ScatteredPoint {
    fn distance_2(&self, point: &[fdt; 2]) -> fdt {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Interpolator for values given at a fixed set of scattered points.
///
/// The spatial index is built once and reused for every field defined on
/// the same points.
#[derive(Clone, Debug)]
pub struct ScatteredInterpolator {
    tree: RTree<ScatteredPoint>,
    n_points: usize,
    x_range: [fdt; 2],
    y_range: [fdt; 2],
    fill_value: fdt,
    fallback: bool,
}

impl ScatteredInterpolator {
    /// Relative weight regularization keeping weights finite at data points.
    const WEIGHT_EPSILON: fdt = 1e-3;

    /// Relative amount the bounding box is widened by to absorb round-off
    /// in target coordinates.
    const BOUNDS_TOLERANCE: fdt = 1e-12;

    /// Smallest ratio between the extreme singular values of the normal
    /// matrix for which a local fit is accepted.
    const SINGULARITY_TOLERANCE: fdt = 1e-12;

    /// Builds an interpolator for the points with the given coordinates.
    pub fn new(x: ArrayView1<fdt>, y: ArrayView1<fdt>) -> ModalResult<Self> {
        if x.len() != y.len() {
            return Err(ModalError::shape_mismatch("number of y-coordinates", x.len(), y.len()));
        }
        if x.is_empty() {
            return Err(ModalError::EmptyInput {
                operation: "scattered interpolation",
            });
        }
        let points: Vec<_> = x
            .iter()
            .zip(y.iter())
            .enumerate()
            .map(|(index, (&x, &y))| ScatteredPoint {
                position: [x, y],
                index,
            })
            .collect();
        let range = |values: ArrayView1<fdt>| {
            let [lower, upper] = values
                .iter()
                .fold([fdt::INFINITY, fdt::NEG_INFINITY], |[lower, upper], &value| {
                    [lower.min(value), upper.max(value)]
                });
            let margin = Self::BOUNDS_TOLERANCE * (upper - lower);
            [lower - margin, upper + margin]
        };
        Ok(Self {
            n_points: points.len(),
            tree: RTree::bulk_load(points),
            x_range: range(x),
            y_range: range(y),
            fill_value: fdt::NAN,
            fallback: false,
        })
    }

    /// Sets the value assigned to targets outside the bounding box of the
    /// scattered points (NaN by default).
    pub fn with_fill_value(mut self, fill_value: fdt) -> Self {
        self.fill_value = fill_value;
        self
    }

    /// Sets whether a singular local fit is replaced by the next lower
    /// order method for that target. Without fallback a singular fit is an
    /// error.
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    pub fn fill_value(&self) -> fdt {
        self.fill_value
    }

    pub fn fallback(&self) -> bool {
        self.fallback
    }

    fn check_input(&self, values: &ArrayView1<fdt>, method: InterpolationMethod) -> ModalResult<()> {
        if values.len() != self.n_points {
            return Err(ModalError::shape_mismatch(
                "number of values to interpolate",
                self.n_points,
                values.len(),
            ));
        }
        if self.n_points < method.min_points() {
            return Err(ModalError::Interpolation {
                method: method.name(),
                required: method.min_points(),
                available: self.n_points,
            });
        }
        Ok(())
    }

    fn is_inside(&self, point: &[fdt; 2]) -> bool {
        point[0] >= self.x_range[0]
            && point[0] <= self.x_range[1]
            && point[1] >= self.y_range[0]
            && point[1] <= self.y_range[1]
    }

    /// Computes the interpolated value at a single point.
    ///
    /// # Parameters
    ///
    /// - `values`: One value per scattered point.
    /// - `point`: Coordinates where the interpolated value should be computed.
    /// - `method`: Interpolation method to use.
    ///
    /// # Returns
    ///
    /// A `Result` which is either:
    ///
    /// - `Ok`: Contains the interpolated value, or the fill value if the point
    /// lies outside the bounding box of the scattered points.
    /// - `Err`: The number of values is wrong, there are too few points for
    /// the method, or the local fit is singular and fallback is disabled.
    pub fn interpolate_at(
        &self,
        values: ArrayView1<fdt>,
        point: [fdt; 2],
        method: InterpolationMethod,
    ) -> ModalResult<fdt> {
        self.check_input(&values, method)?;
        self.evaluate(&values, &point, method)
    }

    /// Computes interpolated values at all the given points, in parallel.
    pub fn interpolate(
        &self,
        values: ArrayView1<fdt>,
        points: &[[fdt; 2]],
        method: InterpolationMethod,
        verbosity: &Verbosity,
    ) -> ModalResult<Array1<fdt>> {
        self.check_input(&values, method)?;
        let interpolated = points
            .par_iter()
            .progress_with(verbosity.create_progress_bar(points.len()))
            .map(|point| self.evaluate(&values, point, method))
            .collect::<ModalResult<Vec<fdt>>>()?;
        Ok(Array1::from(interpolated))
    }

    /// Computes interpolated values at every point of the given grid, in parallel.
    ///
    /// # Returns
    ///
    /// A `Result` which is either:
    ///
    /// - `Ok`: Contains an array of shape `(ny, nx)` with the interpolated values.
    /// - `Err`: The number of values is wrong, there are too few points for
    /// the method, or a local fit is singular and fallback is disabled.
    pub fn interpolate_onto_grid(
        &self,
        values: ArrayView1<fdt>,
        grid: &StructuredGrid2,
        method: InterpolationMethod,
        verbosity: &Verbosity,
    ) -> ModalResult<Array2<fdt>> {
        self.check_input(&values, method)?;
        let n_values = grid.n_points();
        let interpolated = (0..n_values)
            .into_par_iter()
            .progress_with(verbosity.create_progress_bar(n_values))
            .map(|idx| self.evaluate(&values, &grid.point(idx), method))
            .collect::<ModalResult<Vec<fdt>>>()?;
        Array2::from_shape_vec(grid.shape(), interpolated)
            .map_err(|_| ModalError::shape_mismatch("number of grid values", n_values, 0))
    }

    fn evaluate(&self, values: &ArrayView1<fdt>, point: &[fdt; 2], method: InterpolationMethod) -> ModalResult<fdt> {
        if !self.is_inside(point) {
            return Ok(self.fill_value);
        }
        let degree = match method.degree() {
            Some(degree) => degree,
            None => {
                return Ok(self
                    .tree
                    .nearest_neighbor(point)
                    .map_or(self.fill_value, |nearest| values[nearest.index]))
            }
        };
        if let Some(value) = self.fit_polynomial(values, point, degree, method.n_neighbours()) {
            return Ok(value);
        }
        match method.fallback() {
            Some(fallback) if self.fallback => self.evaluate(values, point, fallback),
            _ => Err(ModalError::SingularFit {
                method: method.name(),
                x: point[0],
                y: point[1],
            }),
        }
    }

    /// Fits a polynomial of the given degree to the nearest neighbours of
    /// the point and returns its value at the point, or `None` if the fit
    /// is underdetermined or numerically singular.
    fn fit_polynomial(
        &self,
        values: &ArrayView1<fdt>,
        point: &[fdt; 2],
        degree: usize,
        n_neighbours: usize,
    ) -> Option<fdt> {
        let neighbours: Vec<&ScatteredPoint> = self.tree.nearest_neighbor_iter(point).take(n_neighbours).collect();
        let n_terms = n_monomials(degree);
        if neighbours.len() < n_terms {
            return None;
        }

        let max_distance_2 = neighbours
            .iter()
            .map(|neighbour| neighbour.distance_2(point))
            .fold(0.0, fdt::max);
        if max_distance_2 == 0.0 {
            return Some(values[neighbours[0].index]);
        }
        let length_scale = max_distance_2.sqrt();

        let mut normal_matrix = DMatrix::<fdt>::zeros(n_terms, n_terms);
        let mut rhs = DVector::<fdt>::zeros(n_terms);
        let mut monomials = Vec::with_capacity(n_terms);

        for neighbour in &neighbours {
            let dx = (neighbour.position[0] - point[0]) / length_scale;
            let dy = (neighbour.position[1] - point[1]) / length_scale;
            let weight = 1.0 / (dx * dx + dy * dy + Self::WEIGHT_EPSILON);
            evaluate_monomials(degree, dx, dy, &mut monomials);

            let value = values[neighbour.index];
            for i in 0..n_terms {
                let weighted = weight * monomials[i];
                rhs[i] += weighted * value;
                for j in i..n_terms {
                    normal_matrix[(i, j)] += weighted * monomials[j];
                }
            }
        }
        normal_matrix.fill_lower_triangle_with_upper_triangle();

        let singular_values = normal_matrix.singular_values();
        let smallest = singular_values.min();
        if smallest.is_nan() || smallest <= Self::SINGULARITY_TOLERANCE * singular_values.max() {
            return None;
        }

        // The monomials are centred on the target, so the fitted value is the constant term.
        normal_matrix
            .cholesky()
            .map(|cholesky| cholesky.solve(&rhs)[0])
    }
}
