//! Flow configurations tying a mesh, its stored snapshots and a structured
//! interpolation grid together.

pub mod modes;

pub use modes::{BaseFlowSet, ModeGradients, ModeSet};

use crate::{
    error::{ModalError, ModalResult},
    grid::{GridSpec, StructuredGrid2},
    handle::{RealFieldHandle, VectorContent},
    interpolation::{InterpolationMethod, ScatteredInterpolator},
    io::{
        storage::{FieldStorage, NekFieldStorage},
        Verbosity,
    },
    mesh::MeshGeometry,
    num::{fdt, FieldScalar},
    projection::WeightedInnerProduct,
    vector::FieldVector,
};
use ndarray::prelude::*;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

#[cfg(feature = "serialization")]
use serde::Serialize;

/// Type of flow case, selecting the file name prefix, the default
/// interpolation grid and the exclusion rule.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub enum FlowKind {
    LidDrivenCavity,
    ShearDrivenCavity,
    MixingLayer,
    CylinderWake,
    /// Any other case, with the given file name prefix and a grid covering
    /// the bounding box of the mesh.
    Custom { prefix: String },
}

impl FlowKind {
    /// Prefix of the stored snapshot file names.
    pub fn prefix(&self) -> &str {
        match self {
            Self::LidDrivenCavity | Self::ShearDrivenCavity => "cav",
            Self::MixingLayer => "mix",
            Self::CylinderWake => "cyl",
            Self::Custom { prefix } => prefix,
        }
    }

    /// Default interpolation grid, or `None` if it is derived from the mesh.
    pub fn default_grid(&self) -> Option<GridSpec> {
        match self {
            Self::LidDrivenCavity => Some(GridSpec::new(200, 200, [-1.0, 1.0], [-1.0, 1.0])),
            Self::ShearDrivenCavity => Some(GridSpec::new(400, 200, [-1.0, 2.5], [-1.0, 0.5])),
            Self::MixingLayer => Some(GridSpec::new(400, 120, [0.0, 250.0], [-10.0, 10.0])),
            Self::CylinderWake => Some(GridSpec::new(400, 200, [-3.0, 9.0], [-3.0, 3.0])),
            Self::Custom { .. } => None,
        }
    }

    /// Rule for grid points whose interpolated values are zeroed.
    pub fn exclusion_rule(&self) -> ExclusionRule {
        match self {
            Self::CylinderWake => ExclusionRule::Disk {
                center: [0.0, 0.0],
                radius: 0.5,
            },
            _ => ExclusionRule::None,
        }
    }
}

/// Region of the interpolation grid lying inside a solid body.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub enum ExclusionRule {
    None,
    /// Points closer to `center` than `radius`.
    Disk { center: [fdt; 2], radius: fdt },
}

impl ExclusionRule {
    /// Whether the given point is excluded.
    pub fn excludes(&self, point: [fdt; 2]) -> bool {
        match *self {
            Self::None => false,
            Self::Disk { center, radius } => {
                let dx = point[0] - center[0];
                let dy = point[1] - center[1];
                (dx * dx + dy * dy).sqrt() < radius
            }
        }
    }

    /// Computes which points of the given grid are excluded, in flat grid order.
    pub fn mask(&self, grid: &StructuredGrid2) -> Option<Vec<bool>> {
        match self {
            Self::None => None,
            _ => Some(grid.points().map(|point| self.excludes(point)).collect()),
        }
    }
}

/// Options for constructing a [`FlowConfiguration`].
#[derive(Clone, Debug)]
pub struct FlowConfigOptions {
    field_path: PathBuf,
    base_path: Option<PathBuf>,
    resolution: Option<(usize, usize)>,
    x_range: Option<[fdt; 2]>,
    y_range: Option<[fdt; 2]>,
    weight_file_name: String,
    reference_index: usize,
    content: VectorContent,
    verbosity: Verbosity,
}

impl FlowConfigOptions {
    pub const DEFAULT_WEIGHT_FILE_NAME: &'static str = "mass_matrix.dat";

    /// Creates options for snapshots stored in the given directory.
    pub fn new<P: AsRef<Path>>(field_path: P) -> Self {
        Self {
            field_path: field_path.as_ref().to_path_buf(),
            base_path: None,
            resolution: None,
            x_range: None,
            y_range: None,
            weight_file_name: Self::DEFAULT_WEIGHT_FILE_NAME.to_string(),
            reference_index: 1,
            content: VectorContent::default(),
            verbosity: Verbosity::default(),
        }
    }

    /// Sets the directory holding base flows and their gradients.
    pub fn with_base_path<P: AsRef<Path>>(mut self, base_path: P) -> Self {
        self.base_path = Some(base_path.as_ref().to_path_buf());
        self
    }

    /// Sets the number of interpolation grid points along x and y.
    pub fn with_grid_resolution(mut self, nx: usize, ny: usize) -> Self {
        self.resolution = Some((nx, ny));
        self
    }

    pub fn with_x_range(mut self, x_range: [fdt; 2]) -> Self {
        self.x_range = Some(x_range);
        self
    }

    pub fn with_y_range(mut self, y_range: [fdt; 2]) -> Self {
        self.y_range = Some(y_range);
        self
    }

    /// Sets the name of the weight file in the field directory.
    pub fn with_weight_file_name<N: Into<String>>(mut self, weight_file_name: N) -> Self {
        self.weight_file_name = weight_file_name.into();
        self
    }

    /// Sets the index of the snapshot the mesh is read from.
    pub fn with_reference_index(mut self, reference_index: usize) -> Self {
        self.reference_index = reference_index;
        self
    }

    /// Sets the content of the vectors of handles created by the configuration.
    pub fn with_content(mut self, content: VectorContent) -> Self {
        self.content = content;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn field_path(&self) -> &Path {
        &self.field_path
    }

    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    fn grid_spec(&self, default: GridSpec) -> GridSpec {
        let (nx, ny) = self.resolution.unwrap_or((default.nx, default.ny));
        GridSpec::new(
            nx,
            ny,
            self.x_range.unwrap_or(default.x_range),
            self.y_range.unwrap_or(default.y_range),
        )
    }
}

/// Returns the name of the snapshot file with the given prefix and index.
pub fn snapshot_file_name(prefix: &str, index: usize) -> String {
    format!("{}0.f{:05}", prefix, index)
}

/// A flow case: the mesh geometry and weights, the stored snapshots and the
/// structured grid used for interpolation.
#[derive(Debug)]
pub struct FlowConfiguration<S = NekFieldStorage> {
    kind: FlowKind,
    field_path: PathBuf,
    base_path: Option<PathBuf>,
    geometry: MeshGeometry,
    grid: StructuredGrid2,
    interpolator: ScatteredInterpolator,
    exclusion_mask: Option<Vec<bool>>,
    content: VectorContent,
    verbosity: Verbosity,
    storage: Arc<S>,
}

impl FlowConfiguration<NekFieldStorage> {
    /// Creates a configuration for Nek5000 snapshot files.
    pub fn from_files(kind: FlowKind, options: FlowConfigOptions) -> ModalResult<Self> {
        Self::new(kind, options, Arc::new(NekFieldStorage))
    }
}

impl<S: FieldStorage> FlowConfiguration<S> {
    /// Creates a new configuration by reading the reference snapshot and the
    /// weight file from the field directory.
    ///
    /// # Parameters
    ///
    /// - `kind`: Type of flow case.
    /// - `options`: Paths and overrides of the defaults of the flow kind.
    /// - `storage`: Storage holding the snapshots.
    ///
    /// # Returns
    ///
    /// A `Result` which is either:
    ///
    /// - `Ok`: Contains the new configuration.
    /// - `Err`: The reference snapshot or weight file could not be read, or
    /// their sizes disagree.
    pub fn new(kind: FlowKind, options: FlowConfigOptions, storage: Arc<S>) -> ModalResult<Self> {
        let reference_path = options
            .field_path
            .join(snapshot_file_name(kind.prefix(), options.reference_index));
        let weight_path = options.field_path.join(&options.weight_file_name);

        if options.verbosity.print_messages() {
            println!("Reading mesh from {}", reference_path.display());
        }
        let geometry = MeshGeometry::load(storage.as_ref(), &reference_path, &weight_path)?
            .with_verbosity(options.verbosity);

        let default_grid = kind.default_grid().unwrap_or_else(|| {
            let (x_range, y_range) = geometry.bounding_box();
            GridSpec::new(200, 200, x_range, y_range)
        });
        let grid = StructuredGrid2::new(options.grid_spec(default_grid))?;
        let exclusion_mask = kind.exclusion_rule().mask(&grid);
        let interpolator = ScatteredInterpolator::new(geometry.cx(), geometry.cy())?;

        Ok(Self {
            kind,
            field_path: options.field_path,
            base_path: options.base_path,
            geometry,
            grid,
            interpolator,
            exclusion_mask,
            content: options.content,
            verbosity: options.verbosity,
            storage,
        })
    }

    pub fn kind(&self) -> &FlowKind {
        &self.kind
    }

    pub fn prefix(&self) -> &str {
        self.kind.prefix()
    }

    pub fn field_path(&self) -> &Path {
        &self.field_path
    }

    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    pub fn geometry(&self) -> &MeshGeometry {
        &self.geometry
    }

    pub fn grid(&self) -> &StructuredGrid2 {
        &self.grid
    }

    /// Grid points whose interpolated values are zeroed, if any.
    pub fn exclusion_mask(&self) -> Option<&[bool]> {
        self.exclusion_mask.as_deref()
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn verbosity(&self) -> &Verbosity {
        &self.verbosity
    }

    /// Number of mesh points `n`.
    pub fn n_points(&self) -> usize {
        self.geometry.n_points()
    }

    /// Returns the name of the snapshot file with the given index.
    pub fn filename(&self, index: usize) -> String {
        snapshot_file_name(self.prefix(), index)
    }

    /// Returns the path of the snapshot file with the given index in the given directory.
    pub fn snapshot_path<P: AsRef<Path>>(&self, dir: P, index: usize) -> PathBuf {
        dir.as_ref().join(self.filename(index))
    }

    /// Excludes the masked mesh points from inner products.
    ///
    /// Returns the remaining integration volume.
    pub fn mask_domain(&mut self, mask: &[bool]) -> ModalResult<fdt> {
        self.geometry.mask_domain(mask)
    }

    /// Returns the inner product weighted by the current mesh weights.
    ///
    /// The inner product borrows the configuration, so it always reflects
    /// every mask applied with [`Self::mask_domain`].
    pub fn inner_product(&self) -> WeightedInnerProduct<'_> {
        self.geometry.inner_product()
    }

    /// Computes the weighted inner product of two velocity vectors.
    pub fn dot<T: FieldScalar>(&self, a: &FieldVector<T>, b: &FieldVector<T>) -> ModalResult<T> {
        self.geometry.dot(a, b)
    }

    /// Interpolates a field given at the mesh points onto the structured grid.
    ///
    /// # Returns
    ///
    /// A `Result` which is either:
    ///
    /// - `Ok`: Contains the `nx*ny` interpolated values in flat grid order,
    /// with excluded grid points set to zero.
    /// - `Err`: The field does not have one value per mesh point, or the
    /// mesh has too few points for the method.
    pub fn interpolate(&self, field: ArrayView1<fdt>, method: InterpolationMethod) -> ModalResult<Array1<fdt>> {
        if field.len() != self.n_points() {
            return Err(ModalError::shape_mismatch(
                "number of field values",
                self.n_points(),
                field.len(),
            ));
        }
        let grid_values = self
            .interpolator
            .interpolate_onto_grid(field, &self.grid, method, &self.verbosity)?;
        let mut values: Array1<fdt> = grid_values.iter().copied().collect();
        if let Some(mask) = &self.exclusion_mask {
            for (value, &excluded) in values.iter_mut().zip(mask.iter()) {
                if excluded {
                    *value = 0.0;
                }
            }
        }
        Ok(values)
    }

    /// Returns a handle to the snapshot with the given index in the field directory.
    pub fn snapshot_handle(&self, index: usize) -> RealFieldHandle<S> {
        RealFieldHandle::new(self.snapshot_path(&self.field_path, index), Arc::clone(&self.storage))
            .with_content(self.content)
    }

    /// Returns handles to the first `count` snapshots in the field directory,
    /// with file indices starting at 1.
    pub fn mode_handles(&self, count: usize) -> Vec<RealFieldHandle<S>> {
        (1..=count).map(|index| self.snapshot_handle(index)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_select_prefix_and_grid() {
        assert_eq!(FlowKind::LidDrivenCavity.prefix(), "cav");
        assert_eq!(FlowKind::ShearDrivenCavity.prefix(), "cav");
        assert_eq!(FlowKind::MixingLayer.prefix(), "mix");
        assert_eq!(FlowKind::CylinderWake.prefix(), "cyl");
        assert_eq!(
            FlowKind::Custom {
                prefix: "pipe".to_string()
            }
            .prefix(),
            "pipe"
        );

        let grid = FlowKind::MixingLayer.default_grid().unwrap();
        assert_eq!((grid.nx, grid.ny), (400, 120));
        assert_eq!(grid.y_range, [-10.0, 10.0]);
        assert!(FlowKind::Custom {
            prefix: "pipe".to_string()
        }
        .default_grid()
        .is_none());
    }

    #[test]
    fn file_names_are_zero_padded() {
        assert_eq!(snapshot_file_name("cyl", 1), "cyl0.f00001");
        assert_eq!(snapshot_file_name("mix", 12345), "mix0.f12345");
    }

    #[test]
    fn only_cylinder_wake_excludes_points() {
        let rule = FlowKind::CylinderWake.exclusion_rule();
        assert!(rule.excludes([0.1, -0.2]));
        assert!(!rule.excludes([0.5, 0.0]));
        assert!(!FlowKind::LidDrivenCavity.exclusion_rule().excludes([0.0, 0.0]));

        let grid = StructuredGrid2::new(GridSpec::new(5, 3, [-1.0, 1.0], [-1.0, 1.0])).unwrap();
        let mask = rule.mask(&grid).unwrap();
        assert_eq!(mask.iter().filter(|&&excluded| excluded).count(), 1);
        assert!(mask[7]);
        assert!(ExclusionRule::None.mask(&grid).is_none());
    }

    #[test]
    fn options_override_kind_defaults() {
        let default = FlowKind::CylinderWake.default_grid().unwrap();
        let spec = FlowConfigOptions::new("fields")
            .with_grid_resolution(40, 20)
            .with_x_range([-1.0, 4.0])
            .grid_spec(default);
        assert_eq!(spec, GridSpec::new(40, 20, [-1.0, 4.0], [-3.0, 3.0]));
    }
}
