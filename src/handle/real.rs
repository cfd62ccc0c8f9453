//! Handles to real-valued fields.

use super::{apply_base_and_scale, VectorContent, VectorHandle};
use crate::{
    error::ModalResult,
    field::{gather_blocks, scatter_blocks, FieldLayout, SpectralField},
    io::storage::{FieldStorage, NekFieldStorage},
    num::fdt,
    vector::FieldVector,
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

/// Handle to a real-valued field stored at a single path.
#[derive(Debug)]
pub struct RealFieldHandle<S = NekFieldStorage> {
    path: PathBuf,
    save_template: PathBuf,
    base: Option<Box<RealFieldHandle<S>>>,
    scale: Option<fdt>,
    content: VectorContent,
    storage: Arc<S>,
}

impl RealFieldHandle<NekFieldStorage> {
    /// Creates a handle to a Nek5000 field file.
    pub fn nek<P: AsRef<Path>>(path: P) -> Self {
        Self::new(path, Arc::new(NekFieldStorage))
    }
}

impl<S: FieldStorage> RealFieldHandle<S> {
    /// Creates a handle to the field at the given path in the given storage.
    ///
    /// The path also serves as the template when storing, unless another
    /// template is specified.
    pub fn new<P: AsRef<Path>>(path: P, storage: Arc<S>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            save_template: path.clone(),
            path,
            base: None,
            scale: None,
            content: VectorContent::default(),
            storage,
        }
    }

    /// Sets a handle whose vector is subtracted on loading.
    pub fn with_base(mut self, base: Self) -> Self {
        self.base = Some(Box::new(base));
        self
    }

    /// Sets a factor the vector is multiplied with on loading.
    pub fn with_scale(mut self, scale: fdt) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Sets the field whose metadata and mesh are reused when storing.
    pub fn with_save_template<P: AsRef<Path>>(mut self, save_template: P) -> Self {
        self.save_template = save_template.as_ref().to_path_buf();
        self
    }

    pub fn with_content(mut self, content: VectorContent) -> Self {
        self.content = content;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save_template(&self) -> &Path {
        &self.save_template
    }

    pub fn content(&self) -> VectorContent {
        self.content
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Returns the mesh layout of the save template.
    pub fn layout(&self) -> ModalResult<FieldLayout> {
        FieldLayout::of_field(&self.storage.read_field(&self.save_template)?)
    }

    /// Reads the stored field into a vector, ignoring any base or scale.
    pub fn load_raw(&self) -> ModalResult<FieldVector<fdt>> {
        read_vector(self.storage.as_ref(), &self.path, self.content)
    }
}

impl<S> Clone for RealFieldHandle<S> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            save_template: self.save_template.clone(),
            base: self.base.clone(),
            scale: self.scale,
            content: self.content,
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: FieldStorage> VectorHandle for RealFieldHandle<S> {
    type Scalar = fdt;

    fn size(&self) -> ModalResult<usize> {
        Ok(self.layout()?.n_points() * self.content.n_blocks())
    }

    fn load(&self) -> ModalResult<FieldVector<fdt>> {
        apply_base_and_scale(self.load_raw()?, self.base.as_deref(), self.scale)
    }

    fn store(&self, vector: &FieldVector<fdt>) -> ModalResult<()> {
        let template = self.storage.read_field(&self.save_template)?;
        write_vector(self.storage.as_ref(), template, &self.path, self.content, vector)
    }
}

/// Reads the field at the given path and flattens the given content.
pub(super) fn read_vector<S: FieldStorage + ?Sized>(
    storage: &S,
    path: &Path,
    content: VectorContent,
) -> ModalResult<FieldVector<fdt>> {
    let field = storage.read_field(path)?;
    let layout = FieldLayout::of_field(&field)?;
    Ok(FieldVector::new(gather_blocks(&field, &layout, content.quantities())?))
}

/// Writes the vector into the template field and stores the result at
/// the given path.
pub(super) fn write_vector<S: FieldStorage + ?Sized>(
    storage: &S,
    mut template: SpectralField,
    path: &Path,
    content: VectorContent,
    vector: &FieldVector<fdt>,
) -> ModalResult<()> {
    let layout = FieldLayout::of_field(&template)?;
    scatter_blocks(&mut template, &layout, content.quantities(), vector.data())?;
    storage.write_field(path, &template)
}
