//! Handles to complex-valued fields stored as separate real and imaginary parts.

use super::{
    apply_base_and_scale,
    real::{read_vector, write_vector},
    VectorContent, VectorHandle,
};
use crate::{
    error::{ModalError, ModalResult},
    field::FieldLayout,
    io::storage::{FieldStorage, NekFieldStorage},
    vector::FieldVector,
};
use num::complex::Complex64;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

/// Handle to a complex field whose real and imaginary parts are stored as
/// two real fields on the same mesh.
#[derive(Debug)]
pub struct ComplexFieldHandle<S = NekFieldStorage> {
    real_path: PathBuf,
    imag_path: PathBuf,
    save_template: PathBuf,
    base: Option<Box<ComplexFieldHandle<S>>>,
    scale: Option<Complex64>,
    content: VectorContent,
    storage: Arc<S>,
}

impl ComplexFieldHandle<NekFieldStorage> {
    /// Creates a handle to a pair of Nek5000 field files.
    pub fn nek<P: AsRef<Path>, Q: AsRef<Path>>(real_path: P, imag_path: Q) -> Self {
        Self::new(real_path, imag_path, Arc::new(NekFieldStorage))
    }
}

impl<S: FieldStorage> ComplexFieldHandle<S> {
    /// Creates a handle to the given pair of stored fields.
    ///
    /// The real part also serves as the template for both parts when
    /// storing, unless another template is specified.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(real_path: P, imag_path: Q, storage: Arc<S>) -> Self {
        let real_path = real_path.as_ref().to_path_buf();
        Self {
            save_template: real_path.clone(),
            real_path,
            imag_path: imag_path.as_ref().to_path_buf(),
            base: None,
            scale: None,
            content: VectorContent::default(),
            storage,
        }
    }

    pub fn with_base(mut self, base: Self) -> Self {
        self.base = Some(Box::new(base));
        self
    }

    pub fn with_scale(mut self, scale: Complex64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_save_template<P: AsRef<Path>>(mut self, save_template: P) -> Self {
        self.save_template = save_template.as_ref().to_path_buf();
        self
    }

    pub fn with_content(mut self, content: VectorContent) -> Self {
        self.content = content;
        self
    }

    pub fn real_path(&self) -> &Path {
        &self.real_path
    }

    pub fn imag_path(&self) -> &Path {
        &self.imag_path
    }

    pub fn save_template(&self) -> &Path {
        &self.save_template
    }

    pub fn content(&self) -> VectorContent {
        self.content
    }

    /// Reads both parts into a complex vector, ignoring any base or scale.
    pub fn load_raw(&self) -> ModalResult<FieldVector<Complex64>> {
        let re = read_vector(self.storage.as_ref(), &self.real_path, self.content)?;
        let im = read_vector(self.storage.as_ref(), &self.imag_path, self.content)?;
        if re.len() != im.len() {
            return Err(ModalError::shape_mismatch(
                format!("length of {}", self.imag_path.display()),
                re.len(),
                im.len(),
            ));
        }
        FieldVector::from_parts(&re, &im)
    }
}

impl<S> Clone for ComplexFieldHandle<S> {
    fn clone(&self) -> Self {
        Self {
            real_path: self.real_path.clone(),
            imag_path: self.imag_path.clone(),
            save_template: self.save_template.clone(),
            base: self.base.clone(),
            scale: self.scale,
            content: self.content,
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: FieldStorage> VectorHandle for ComplexFieldHandle<S> {
    type Scalar = Complex64;

    fn size(&self) -> ModalResult<usize> {
        let layout = FieldLayout::of_field(&self.storage.read_field(&self.save_template)?)?;
        Ok(layout.n_points() * self.content.n_blocks())
    }

    fn load(&self) -> ModalResult<FieldVector<Complex64>> {
        apply_base_and_scale(self.load_raw()?, self.base.as_deref(), self.scale)
    }

    fn store(&self, vector: &FieldVector<Complex64>) -> ModalResult<()> {
        let template = self.storage.read_field(&self.save_template)?;
        write_vector(
            self.storage.as_ref(),
            template.clone(),
            &self.real_path,
            self.content,
            &vector.real_part(),
        )?;
        write_vector(
            self.storage.as_ref(),
            template,
            &self.imag_path,
            self.content,
            &vector.imag_part(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        field::{FieldContent, SpectralField},
        io::storage::MemoryFieldStorage,
    };
    use approx::assert_abs_diff_eq;

    fn storage_with_parts() -> Arc<MemoryFieldStorage> {
        let storage = Arc::new(MemoryFieldStorage::new());
        let mut re = SpectralField::zeros_2d(2, 3, &FieldContent::all());
        let mut im = re.clone();
        for element in re.elements.iter_mut() {
            element.vel.fill(1.0);
            element.pres.fill(2.0);
        }
        for element in im.elements.iter_mut() {
            element.vel.fill(-1.0);
        }
        storage.write_field(Path::new("re"), &re).unwrap();
        storage.write_field(Path::new("im"), &im).unwrap();
        storage
    }

    #[test]
    fn load_combines_parts() {
        let storage = storage_with_parts();
        let handle = ComplexFieldHandle::new("re", "im", storage);
        assert_eq!(handle.size().unwrap(), 54);
        let vector = handle.load().unwrap();
        assert_eq!(vector.len(), 54);
        assert_eq!(vector.data()[0], Complex64::new(1.0, -1.0));
        assert_eq!(vector.data()[53], Complex64::new(2.0, 0.0));
    }

    #[test]
    fn mismatched_parts_are_rejected() {
        let storage = storage_with_parts();
        let small = SpectralField::zeros_2d(1, 3, &FieldContent::all());
        storage.write_field(Path::new("small"), &small).unwrap();
        let handle = ComplexFieldHandle::new("re", "small", storage);
        assert!(matches!(
            handle.load(),
            Err(ModalError::ShapeMismatch { expected: 54, actual: 27, .. })
        ));
    }

    #[test]
    fn store_writes_both_parts_from_one_template() {
        let storage = storage_with_parts();
        let source = ComplexFieldHandle::new("re", "im", Arc::clone(&storage));
        let target = ComplexFieldHandle::new("out_re", "out_im", Arc::clone(&storage))
            .with_save_template("re");

        let rotated = source.load().unwrap().scale(Complex64::new(0.0, 1.0));
        target.store(&rotated).unwrap();
        assert!(storage.contains(Path::new("out_re")));
        assert!(storage.contains(Path::new("out_im")));
        assert_eq!(target.load().unwrap(), rotated);
    }

    #[test]
    fn complex_base_and_scale_are_applied() {
        let storage = storage_with_parts();
        let base = ComplexFieldHandle::new("re", "im", Arc::clone(&storage));
        let handle = ComplexFieldHandle::new("re", "im", Arc::clone(&storage))
            .with_base(base)
            .with_scale(Complex64::new(2.0, 0.0));
        for value in handle.load().unwrap().data().iter() {
            assert_abs_diff_eq!(value.norm_sqr(), 0.0);
        }

        let scaled = ComplexFieldHandle::new("re", "im", storage).with_scale(Complex64::new(0.0, 1.0));
        let vector = scaled.load().unwrap();
        assert_eq!(vector.data()[0], Complex64::new(1.0, 1.0));
    }
}
