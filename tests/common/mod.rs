#![allow(dead_code)]

use sempod::{
    field::{FieldContent, SpectralField},
    io::storage::{FieldStorage, NekFieldStorage},
    num::fdt,
};
use ndarray::prelude::*;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

#[macro_export]
macro_rules! def_test {
    (
        DIR[$dir_ident:ident]
        fn $name:ident $test_body:expr
    ) => {
        #[test]
        fn $name() {
            let test = common::Test::new(stringify!($name));
            let test_body = |$dir_ident: &std::path::Path| $test_body;
            test_body(test.dir());
        }
    };
}

/// Gauss-Lobatto-Legendre nodes on `[-1, 1]` for four points per direction.
pub const GLL_NODES: [fdt; 4] = [-1.0, -0.447_213_595_499_958, 0.447_213_595_499_958, 1.0];

/// Quadrature weights belonging to `GLL_NODES`.
pub const GLL_WEIGHTS: [fdt; 4] = [1.0 / 6.0, 5.0 / 6.0, 5.0 / 6.0, 1.0 / 6.0];

pub const N_GLL: usize = 4;

#[derive(Debug)]
pub struct Test {
    dir: TempDir,
}

impl Test {
    pub fn new<S: AsRef<str>>(name: S) -> Self {
        let dir = tempfile::Builder::new()
            .prefix(name.as_ref())
            .tempdir()
            .unwrap_or_else(|err| panic!("Could not create test directory: {}", err));
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// A rectangular domain split into `nel_x * nel_y` equally sized spectral
/// elements with four GLL nodes per direction.
#[derive(Clone, Debug)]
pub struct RectangularMesh {
    pub nel_x: usize,
    pub nel_y: usize,
    pub x_range: [fdt; 2],
    pub y_range: [fdt; 2],
}

impl RectangularMesh {
    pub fn new(nel_x: usize, nel_y: usize, x_range: [fdt; 2], y_range: [fdt; 2]) -> Self {
        Self {
            nel_x,
            nel_y,
            x_range,
            y_range,
        }
    }

    pub fn n_elements(&self) -> usize {
        self.nel_x * self.nel_y
    }

    pub fn n_points(&self) -> usize {
        self.n_elements() * N_GLL * N_GLL
    }

    pub fn area(&self) -> fdt {
        (self.x_range[1] - self.x_range[0]) * (self.y_range[1] - self.y_range[0])
    }

    fn element_extent(&self) -> (fdt, fdt) {
        (
            (self.x_range[1] - self.x_range[0]) / self.nel_x as fdt,
            (self.y_range[1] - self.y_range[0]) / self.nel_y as fdt,
        )
    }

    /// Coordinates of the node in the given row and column of the given element.
    pub fn node(&self, element: usize, row: usize, column: usize) -> (fdt, fdt) {
        let (dx, dy) = self.element_extent();
        let (ex, ey) = (element % self.nel_x, element / self.nel_x);
        (
            self.x_range[0] + (ex as fdt + 0.5 * (GLL_NODES[column] + 1.0)) * dx,
            self.y_range[0] + (ey as fdt + 0.5 * (GLL_NODES[row] + 1.0)) * dy,
        )
    }

    /// Node coordinates in element, row, column order.
    pub fn points(&self) -> Vec<(fdt, fdt)> {
        let mut points = Vec::with_capacity(self.n_points());
        for element in 0..self.n_elements() {
            for row in 0..N_GLL {
                for column in 0..N_GLL {
                    points.push(self.node(element, row, column));
                }
            }
        }
        points
    }

    /// Mass matrix weights in element, row, column order.
    pub fn weights(&self) -> Vec<fdt> {
        let (dx, dy) = self.element_extent();
        let jacobian = 0.25 * dx * dy;
        let mut weights = Vec::with_capacity(self.n_points());
        for _ in 0..self.n_elements() {
            for row in 0..N_GLL {
                for column in 0..N_GLL {
                    weights.push(GLL_WEIGHTS[row] * GLL_WEIGHTS[column] * jacobian);
                }
            }
        }
        weights
    }

    /// Creates a field whose velocity, pressure and vorticity at each node
    /// are given by the function of the node coordinates.
    pub fn field<F>(&self, values: F) -> SpectralField
    where
        F: Fn(fdt, fdt) -> [fdt; 4],
    {
        let mut field = SpectralField::zeros_2d(self.n_elements(), N_GLL, &FieldContent::all());
        for (element_idx, element) in field.elements.iter_mut().enumerate() {
            for row in 0..N_GLL {
                for column in 0..N_GLL {
                    let (x, y) = self.node(element_idx, row, column);
                    let [u, v, p, w] = values(x, y);
                    element.pos[[0, 0, row, column]] = x;
                    element.pos[[1, 0, row, column]] = y;
                    element.vel[[0, 0, row, column]] = u;
                    element.vel[[1, 0, row, column]] = v;
                    element.pres[[0, 0, row, column]] = p;
                    element.temp[[0, 0, row, column]] = w;
                }
            }
        }
        field
    }

    /// Writes a Nek5000 field file with the given values.
    pub fn write_field<F>(&self, path: &Path, values: F)
    where
        F: Fn(fdt, fdt) -> [fdt; 4],
    {
        NekFieldStorage
            .write_field(path, &self.field(values))
            .unwrap_or_else(|err| panic!("Could not write {}: {}", path.display(), err));
    }

    /// Writes the mass matrix weights to the given text file.
    pub fn write_weights(&self, path: &Path) {
        write_text_file(
            path,
            &self
                .weights()
                .iter()
                .map(|weight| format!("{:.16e}", weight))
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }

    /// Writes the reference snapshot and the weight file of a flow case
    /// with the given file prefix into the given directory.
    pub fn write_case(&self, dir: &Path, prefix: &str) -> PathBuf {
        self.write_field(&dir.join(format!("{}0.f00001", prefix)), |_, _| [0.0; 4]);
        self.write_weights(&dir.join("mass_matrix.dat"));
        dir.to_path_buf()
    }
}

pub fn write_text_file(path: &Path, text: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut file = fs::File::create(path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
}

pub fn assert_file_exists<P: AsRef<Path>>(file_path: P) {
    let file_path = file_path.as_ref();
    assert!(
        file_path.exists(),
        "File {} does not exist",
        file_path.to_string_lossy()
    );
}

pub fn assert_all_close(values: ArrayView1<fdt>, expected: ArrayView1<fdt>, epsilon: fdt) {
    assert_eq!(values.len(), expected.len());
    for (idx, (value, target)) in values.iter().zip(expected.iter()).enumerate() {
        assert!(
            (value - target).abs() <= epsilon,
            "Value {} at index {} differs from expected {}",
            value,
            idx,
            target
        );
    }
}
