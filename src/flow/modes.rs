//! Loading of modes, base flows, their gradients and modal coefficients
//! into column matrices.

use super::FlowConfiguration;
use crate::{
    error::{ModalError, ModalResult},
    field::{gather, Quantity, SpectralField},
    io::{storage::FieldStorage, utils},
    num::fdt,
};
use ndarray::prelude::*;
use std::path::Path;

/// Modes as matrix columns.
#[derive(Clone, Debug, PartialEq)]
pub struct ModeSet {
    /// Velocity of each mode, shape `(2n, r)`.
    pub velocity: Array2<fdt>,
    /// Vorticity of each mode, shape `(n, r)`.
    pub vorticity: Option<Array2<fdt>>,
}

/// Modes together with their spatial derivatives, all as `(2n, r)` matrices.
#[derive(Clone, Debug, PartialEq)]
pub struct ModeGradients {
    pub modes: ModeSet,
    /// `[du/dx ; du/dy]` of each mode.
    pub grad_ux: Array2<fdt>,
    /// `[dv/dx ; dv/dy]` of each mode.
    pub grad_uy: Array2<fdt>,
    /// `[uxx + uyy ; vxx + vyy]` of each mode.
    pub laplacian: Array2<fdt>,
    /// `[dp/dx ; dp/dy]` of each mode.
    pub grad_p: Option<Array2<fdt>>,
}

/// Base flows and their velocity gradients, all as `(2n, nb)` matrices.
#[derive(Clone, Debug, PartialEq)]
pub struct BaseFlowSet {
    pub velocity: Array2<fdt>,
    pub grad_ux: Array2<fdt>,
    pub grad_uy: Array2<fdt>,
}

const GRAD_U_PREFIX: &str = "du_";
const GRAD_V_PREFIX: &str = "dv_";
const HESSIAN_U_PREFIX: &str = "ddu";
const HESSIAN_V_PREFIX: &str = "ddv";
const GRAD_P_PREFIX: &str = "dp_";

impl<S: FieldStorage> FlowConfiguration<S> {
    pub const DEFAULT_COEFFICIENT_FILE_NAME: &'static str = "coeffs.dat";

    fn read_checked(&self, path: &Path) -> ModalResult<SpectralField> {
        let field = self.storage.read_field(path)?;
        self.geometry.layout().check_field(&field)?;
        Ok(field)
    }

    /// Reads the velocity of the stored field as `[u ; v]`, of length `2n`.
    pub fn velocity<P: AsRef<Path>>(&self, path: P) -> ModalResult<Array1<fdt>> {
        let field = self.read_checked(path.as_ref())?;
        gather(&field, self.geometry.layout(), Quantity::Velocity)
    }

    /// Reads the vorticity of the stored field, of length `n`.
    pub fn vorticity<P: AsRef<Path>>(&self, path: P) -> ModalResult<Array1<fdt>> {
        let field = self.read_checked(path.as_ref())?;
        gather(&field, self.geometry.layout(), Quantity::Vorticity)
    }

    /// Stacks the vectors read for file indices `1..=count` as columns.
    fn read_columns<F>(&self, count: usize, n_rows: usize, read: F) -> ModalResult<Array2<fdt>>
    where
        F: Fn(usize) -> ModalResult<Array1<fdt>>,
    {
        let mut columns = Array2::zeros((n_rows, count));
        for (column_idx, mut column) in columns.axis_iter_mut(Axis(1)).enumerate() {
            column.assign(&read(column_idx + 1)?);
        }
        Ok(columns)
    }

    fn read_velocity_columns(&self, dir: &Path, file_prefix: &str, count: usize) -> ModalResult<Array2<fdt>> {
        self.read_columns(count, 2 * self.n_points(), |index| {
            self.velocity(dir.join(format!("{}{}", file_prefix, self.filename(index))))
        })
    }

    /// Reads the modal coefficient table in the given directory (the field
    /// directory by default).
    ///
    /// # Returns
    ///
    /// The time column and the coefficients indexed `[time, mode]`.
    pub fn coefficients(
        &self,
        mode_path: Option<&Path>,
        file_name: Option<&str>,
    ) -> ModalResult<(Array1<fdt>, Array2<fdt>)> {
        let dir = mode_path.unwrap_or(self.field_path.as_path());
        utils::read_coefficient_table(dir.join(file_name.unwrap_or(Self::DEFAULT_COEFFICIENT_FILE_NAME)))
    }

    /// Loads the first `r` modes in the given directory (the field directory
    /// by default) as matrix columns.
    pub fn load_modes(&self, r: usize, mode_path: Option<&Path>, with_vorticity: bool) -> ModalResult<ModeSet> {
        let dir = mode_path.unwrap_or(self.field_path.as_path());
        if self.verbosity.print_messages() {
            println!("Loading {} modes from {}", r, dir.display());
        }
        let velocity = self.read_velocity_columns(dir, "", r)?;
        let vorticity = if with_vorticity {
            Some(self.read_columns(r, self.n_points(), |index| {
                self.vorticity(self.snapshot_path(dir, index))
            })?)
        } else {
            None
        };
        Ok(ModeSet { velocity, vorticity })
    }

    /// Loads the first `r` modes along with their gradients and Laplacians.
    ///
    /// Gradients are read from files with the mode file name prefixed by
    /// `du_`, `dv_` and `dp_`, and second derivatives from files prefixed
    /// by `ddu` and `ddv`, whose two velocity slots hold `[uxx ; uyy]` and
    /// `[vxx ; vyy]` respectively.
    pub fn load_modes_and_gradients(
        &self,
        r: usize,
        mode_path: Option<&Path>,
        with_vorticity: bool,
        with_pressure_gradient: bool,
    ) -> ModalResult<ModeGradients> {
        let dir = mode_path.unwrap_or(self.field_path.as_path());
        let modes = self.load_modes(r, Some(dir), with_vorticity)?;
        let n = self.n_points();

        let grad_ux = self.read_velocity_columns(dir, GRAD_U_PREFIX, r)?;
        let grad_uy = self.read_velocity_columns(dir, GRAD_V_PREFIX, r)?;
        let second_ux = self.read_velocity_columns(dir, HESSIAN_U_PREFIX, r)?;
        let second_uy = self.read_velocity_columns(dir, HESSIAN_V_PREFIX, r)?;

        let mut laplacian = Array2::zeros((2 * n, r));
        laplacian
            .slice_mut(s![..n, ..])
            .assign(&(&second_ux.slice(s![..n, ..]) + &second_ux.slice(s![n.., ..])));
        laplacian
            .slice_mut(s![n.., ..])
            .assign(&(&second_uy.slice(s![..n, ..]) + &second_uy.slice(s![n.., ..])));

        let grad_p = if with_pressure_gradient {
            Some(self.read_velocity_columns(dir, GRAD_P_PREFIX, r)?)
        } else {
            None
        };

        Ok(ModeGradients {
            modes,
            grad_ux,
            grad_uy,
            laplacian,
            grad_p,
        })
    }

    /// Loads the first `nb` base flows and their velocity gradients from the
    /// given directory, or from the configured base path if none is given.
    pub fn load_base_flows_and_gradients(&self, nb: usize, base_path: Option<&Path>) -> ModalResult<BaseFlowSet> {
        let dir = base_path
            .or(self.base_path.as_deref())
            .ok_or(ModalError::MissingBasePath)?;
        if self.verbosity.print_messages() {
            println!("Loading {} base flows from {}", nb, dir.display());
        }
        Ok(BaseFlowSet {
            velocity: self.read_velocity_columns(dir, "", nb)?,
            grad_ux: self.read_velocity_columns(dir, GRAD_U_PREFIX, nb)?,
            grad_uy: self.read_velocity_columns(dir, GRAD_V_PREFIX, nb)?,
        })
    }
}
