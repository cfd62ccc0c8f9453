//! Spectral element fields and their conversion to and from flat vectors.
//!
//! A [`SpectralField`] is organized by element, with each element holding
//! its nodal values in arrays indexed `(component, z-level, row, column)`.
//! Flat vectors are produced by visiting the nodes in the order given by
//! [`node_indices`]: elements outermost, then rows, then columns. Every
//! conversion in the crate, including the extraction of mesh coordinates,
//! goes through this traversal so that all flat vectors of a mesh line up.

use crate::{
    error::{ModalError, ModalResult},
    io::Endianness,
    num::fdt,
};
use ndarray::prelude::*;

/// Physical quantity that can be extracted from a field as one or more
/// blocks of `n` values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantity {
    /// Node coordinates, as an x-block followed by a y-block.
    Position,
    /// Velocity, as a u-block followed by a v-block.
    Velocity,
    Pressure,
    /// Vorticity, stored in the auxiliary temperature slot.
    Vorticity,
}

impl Quantity {
    /// Number of length-`n` blocks this quantity occupies in a flat vector.
    pub fn n_blocks(self) -> usize {
        self.components().len()
    }

    /// Name used in messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Velocity => "velocity",
            Self::Pressure => "pressure",
            Self::Vorticity => "vorticity",
        }
    }

    fn slot(self) -> Slot {
        match self {
            Self::Position => Slot::Position,
            Self::Velocity => Slot::Velocity,
            Self::Pressure => Slot::Pressure,
            Self::Vorticity => Slot::Temperature,
        }
    }

    fn components(self) -> &'static [usize] {
        match self {
            Self::Position | Self::Velocity => &[0, 1],
            Self::Pressure | Self::Vorticity => &[0],
        }
    }
}

/// Total number of blocks occupied by the given sequence of quantities.
pub fn total_blocks(quantities: &[Quantity]) -> usize {
    quantities.iter().map(|quantity| quantity.n_blocks()).sum()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Position,
    Velocity,
    Pressure,
    Temperature,
}

const SLOTS: [Slot; 4] = [Slot::Position, Slot::Velocity, Slot::Pressure, Slot::Temperature];

/// Which variables a field carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldContent {
    pub position: bool,
    pub velocity: bool,
    pub pressure: bool,
    pub temperature: bool,
}

impl FieldContent {
    /// Content with coordinates, velocity, pressure and the auxiliary scalar.
    pub fn all() -> Self {
        Self {
            position: true,
            velocity: true,
            pressure: true,
            temperature: true,
        }
    }

    fn has(&self, slot: Slot) -> bool {
        match slot {
            Slot::Position => self.position,
            Slot::Velocity => self.velocity,
            Slot::Pressure => self.pressure,
            Slot::Temperature => self.temperature,
        }
    }
}

/// Nodal data of a single spectral element.
///
/// Each array has shape `(components, nz, ny, nx)`, where the number of
/// components is zero when the variable is absent.
#[derive(Clone, Debug, PartialEq)]
pub struct SpectralElement {
    pub pos: Array4<fdt>,
    pub vel: Array4<fdt>,
    pub pres: Array4<fdt>,
    pub temp: Array4<fdt>,
}

impl SpectralElement {
    /// Creates an element with all values set to zero.
    ///
    /// `element_shape` is `[nx, ny, nz]`.
    pub fn zeros(n_dim: usize, element_shape: [usize; 3], content: &FieldContent) -> Self {
        let [nx, ny, nz] = element_shape;
        let array = |present: bool, components: usize| {
            Array4::zeros((if present { components } else { 0 }, nz, ny, nx))
        };
        Self {
            pos: array(content.position, n_dim),
            vel: array(content.velocity, n_dim),
            pres: array(content.pressure, 1),
            temp: array(content.temperature, 1),
        }
    }

    fn slot(&self, slot: Slot) -> &Array4<fdt> {
        match slot {
            Slot::Position => &self.pos,
            Slot::Velocity => &self.vel,
            Slot::Pressure => &self.pres,
            Slot::Temperature => &self.temp,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Array4<fdt> {
        match slot {
            Slot::Position => &mut self.pos,
            Slot::Velocity => &mut self.vel,
            Slot::Pressure => &mut self.pres,
            Slot::Temperature => &mut self.temp,
        }
    }
}

/// A field snapshot on a spectral element mesh, with the header
/// metadata needed to write it back out.
#[derive(Clone, Debug, PartialEq)]
pub struct SpectralField {
    pub n_dim: usize,
    /// Nodes per element along x, y and z.
    pub element_shape: [usize; 3],
    pub time: fdt,
    pub time_step: u64,
    /// Bytes per stored float (4 or 8).
    pub word_size: usize,
    pub endianness: Endianness,
    pub elements: Vec<SpectralElement>,
}

impl SpectralField {
    /// Creates a two-dimensional field of zeros with the given number of
    /// elements and nodes per element direction.
    pub fn zeros_2d(n_elements: usize, n_gll: usize, content: &FieldContent) -> Self {
        let element_shape = [n_gll, n_gll, 1];
        Self {
            n_dim: 2,
            element_shape,
            time: 0.0,
            time_step: 0,
            word_size: 8,
            endianness: Endianness::Little,
            elements: (0..n_elements)
                .map(|_| SpectralElement::zeros(2, element_shape, content))
                .collect(),
        }
    }

    /// Number of elements.
    pub fn n_elements(&self) -> usize {
        self.elements.len()
    }

    /// Which variables the field carries, judged from its first element.
    pub fn content(&self) -> FieldContent {
        let present = |slot| {
            self.elements
                .first()
                .map_or(false, |element| element.slot(slot).shape()[0] > 0)
        };
        FieldContent {
            position: present(Slot::Position),
            velocity: present(Slot::Velocity),
            pressure: present(Slot::Pressure),
            temperature: present(Slot::Temperature),
        }
    }
}

/// Number of elements and nodes per element direction of a 2D mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldLayout {
    pub n_elements: usize,
    pub n_gll: usize,
}

impl FieldLayout {
    pub fn new(n_elements: usize, n_gll: usize) -> Self {
        Self { n_elements, n_gll }
    }

    /// Derives the layout of the given field, verifying that every element
    /// is a square single-level element with identically shaped arrays.
    pub fn of_field(field: &SpectralField) -> ModalResult<Self> {
        let first = field
            .elements
            .first()
            .ok_or_else(|| ModalError::shape_mismatch("number of elements", 1, 0))?;

        let shape = first.pos.shape();
        let (nz, ny, nx) = (shape[1], shape[2], shape[3]);
        if nz != 1 {
            return Err(ModalError::shape_mismatch("z-levels per element", 1, nz));
        }
        if ny != nx {
            return Err(ModalError::shape_mismatch("rows per element", nx, ny));
        }

        for (element_idx, element) in field.elements.iter().enumerate() {
            for slot in SLOTS {
                let reference = first.slot(slot).shape();
                let array = element.slot(slot).shape();
                if reference != array {
                    return Err(ModalError::shape_mismatch(
                        format!("array size of element {}", element_idx),
                        reference.iter().product(),
                        array.iter().product(),
                    ));
                }
                if array[0] > 0 && array[1..] != shape[1..] {
                    return Err(ModalError::shape_mismatch(
                        format!("nodes of element {}", element_idx),
                        nx * ny * nz,
                        array[1..].iter().product(),
                    ));
                }
            }
        }
        Ok(Self::new(field.elements.len(), nx))
    }

    /// Total number of nodes, `n_elements * n_gll^2`.
    pub fn n_points(&self) -> usize {
        self.n_elements * self.n_gll * self.n_gll
    }

    /// Verifies that the given field has this layout.
    pub fn check_field(&self, field: &SpectralField) -> ModalResult<()> {
        let layout = Self::of_field(field)?;
        if layout.n_gll != self.n_gll {
            return Err(ModalError::shape_mismatch(
                "nodes per element direction",
                self.n_gll,
                layout.n_gll,
            ));
        }
        if layout.n_elements != self.n_elements {
            return Err(ModalError::shape_mismatch(
                "number of elements",
                self.n_elements,
                layout.n_elements,
            ));
        }
        Ok(())
    }
}

/// Iterates over `(element, row, column)` node indices in flat vector order.
pub fn node_indices(layout: &FieldLayout) -> impl Iterator<Item = (usize, usize, usize)> {
    let n_gll = layout.n_gll;
    (0..layout.n_elements).flat_map(move |element| {
        (0..n_gll).flat_map(move |row| (0..n_gll).map(move |column| (element, row, column)))
    })
}

fn check_quantity_present(field: &SpectralField, quantity: Quantity) -> ModalResult<()> {
    if field.content().has(quantity.slot()) {
        let available = field.elements[0].slot(quantity.slot()).shape()[0];
        let required = quantity.components().iter().max().map_or(0, |&c| c + 1);
        if available >= required {
            return Ok(());
        }
        return Err(ModalError::shape_mismatch(
            format!("{} components", quantity.name()),
            required,
            available,
        ));
    }
    Err(ModalError::shape_mismatch(
        format!("{} components", quantity.name()),
        quantity.n_blocks(),
        0,
    ))
}

/// Extracts the given quantity from the field as a flat vector of
/// `n_blocks * n` values.
pub fn gather(field: &SpectralField, layout: &FieldLayout, quantity: Quantity) -> ModalResult<Array1<fdt>> {
    layout.check_field(field)?;
    check_quantity_present(field, quantity)?;

    let n = layout.n_points();
    let slot = quantity.slot();
    let mut values = Array1::zeros(n * quantity.n_blocks());

    for (block, &component) in quantity.components().iter().enumerate() {
        let mut block_values = values.slice_mut(s![block * n..(block + 1) * n]);
        for (point_idx, (element, row, column)) in node_indices(layout).enumerate() {
            block_values[point_idx] = field.elements[element].slot(slot)[[component, 0, row, column]];
        }
    }
    Ok(values)
}

/// Extracts the given quantities from the field and concatenates them in
/// the given order.
pub fn gather_blocks(
    field: &SpectralField,
    layout: &FieldLayout,
    quantities: &[Quantity],
) -> ModalResult<Array1<fdt>> {
    let parts = quantities
        .iter()
        .map(|&quantity| gather(field, layout, quantity))
        .collect::<ModalResult<Vec<_>>>()?;
    let views: Vec<_> = parts.iter().map(|part| part.view()).collect();
    ndarray::concatenate(Axis(0), &views)
        .map_err(|_| ModalError::shape_mismatch("quantity blocks", views.len(), 0))
}

/// Writes a flat vector of `n_blocks * n` values for the given quantity
/// into the field, using the same node order as [`gather`].
pub fn scatter(
    field: &mut SpectralField,
    layout: &FieldLayout,
    quantity: Quantity,
    values: ArrayView1<fdt>,
) -> ModalResult<()> {
    layout.check_field(field)?;
    check_quantity_present(field, quantity)?;

    let n = layout.n_points();
    let expected = n * quantity.n_blocks();
    if values.len() != expected {
        return Err(ModalError::shape_mismatch(
            format!("{} vector length", quantity.name()),
            expected,
            values.len(),
        ));
    }

    let slot = quantity.slot();
    for (block, &component) in quantity.components().iter().enumerate() {
        let block_values = values.slice(s![block * n..(block + 1) * n]);
        for (point_idx, (element, row, column)) in node_indices(layout).enumerate() {
            field.elements[element].slot_mut(slot)[[component, 0, row, column]] = block_values[point_idx];
        }
    }
    Ok(())
}

/// Writes a flat vector made of the given quantities, concatenated in the
/// given order, into the field.
pub fn scatter_blocks(
    field: &mut SpectralField,
    layout: &FieldLayout,
    quantities: &[Quantity],
    values: ArrayView1<fdt>,
) -> ModalResult<()> {
    let n = layout.n_points();
    let expected = n * total_blocks(quantities);
    if values.len() != expected {
        return Err(ModalError::shape_mismatch("flat vector length", expected, values.len()));
    }

    let mut offset = 0;
    for &quantity in quantities {
        let len = n * quantity.n_blocks();
        scatter(field, layout, quantity, values.slice(s![offset..offset + len]))?;
        offset += len;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_field(n_elements: usize, n_gll: usize) -> SpectralField {
        let mut field = SpectralField::zeros_2d(n_elements, n_gll, &FieldContent::all());
        for (element_idx, element) in field.elements.iter_mut().enumerate() {
            for row in 0..n_gll {
                for column in 0..n_gll {
                    let id = (element_idx * 100 + row * 10 + column) as fdt;
                    element.pos[[0, 0, row, column]] = column as fdt;
                    element.pos[[1, 0, row, column]] = row as fdt;
                    element.vel[[0, 0, row, column]] = id;
                    element.vel[[1, 0, row, column]] = -id;
                    element.pres[[0, 0, row, column]] = 0.5 * id;
                    element.temp[[0, 0, row, column]] = 2.0 * id;
                }
            }
        }
        field
    }

    #[test]
    fn traversal_visits_elements_then_rows_then_columns() {
        let layout = FieldLayout::new(2, 2);
        let indices: Vec<_> = node_indices(&layout).collect();
        assert_eq!(
            indices,
            vec![
                (0, 0, 0),
                (0, 0, 1),
                (0, 1, 0),
                (0, 1, 1),
                (1, 0, 0),
                (1, 0, 1),
                (1, 1, 0),
                (1, 1, 1)
            ]
        );
    }

    #[test]
    fn velocity_is_gathered_as_u_block_then_v_block() {
        let field = numbered_field(2, 3);
        let layout = FieldLayout::of_field(&field).unwrap();
        assert_eq!(layout.n_points(), 18);

        let velocity = gather(&field, &layout, Quantity::Velocity).unwrap();
        assert_eq!(velocity.len(), 36);
        assert_eq!(velocity[0], 0.0);
        assert_eq!(velocity[1], 1.0);
        assert_eq!(velocity[3], 10.0);
        assert_eq!(velocity[9], 100.0);
        assert_eq!(velocity[18 + 9], -100.0);

        let vorticity = gather(&field, &layout, Quantity::Vorticity).unwrap();
        assert_eq!(vorticity[9], 200.0);
    }

    #[test]
    fn scatter_inverts_gather() {
        let field = numbered_field(3, 4);
        let layout = FieldLayout::of_field(&field).unwrap();
        let quantities = [Quantity::Velocity, Quantity::Pressure];
        let flat = gather_blocks(&field, &layout, &quantities).unwrap();
        assert_eq!(flat.len(), 3 * layout.n_points());

        let mut target = SpectralField::zeros_2d(3, 4, &FieldContent::all());
        scatter_blocks(&mut target, &layout, &quantities, flat.view()).unwrap();
        assert_eq!(target.elements[2].vel, field.elements[2].vel);
        assert_eq!(target.elements[1].pres, field.elements[1].pres);
        assert_eq!(gather_blocks(&target, &layout, &quantities).unwrap(), flat);
    }

    #[test]
    fn scatter_rejects_wrong_length() {
        let mut field = numbered_field(2, 2);
        let layout = FieldLayout::of_field(&field).unwrap();
        let values = Array1::zeros(3);
        assert!(matches!(
            scatter(&mut field, &layout, Quantity::Pressure, values.view()),
            Err(ModalError::ShapeMismatch { expected: 8, actual: 3, .. })
        ));
    }

    #[test]
    fn gather_rejects_other_layout() {
        let field = numbered_field(2, 3);
        let layout = FieldLayout::new(4, 3);
        assert!(matches!(
            gather(&field, &layout, Quantity::Velocity),
            Err(ModalError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn absent_quantity_is_reported() {
        let content = FieldContent {
            pressure: false,
            ..FieldContent::all()
        };
        let field = SpectralField::zeros_2d(1, 2, &content);
        let layout = FieldLayout::of_field(&field).unwrap();
        assert!(gather(&field, &layout, Quantity::Pressure).is_err());
        assert!(gather(&field, &layout, Quantity::Velocity).is_ok());
    }
}
