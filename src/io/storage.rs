//! Storage backends for field snapshots.

use super::nek;
use crate::{
    error::{ModalError, ModalResult},
    field::SpectralField,
};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

/// Defines the properties of a store that field snapshots can be read from
/// and written to by path.
pub trait FieldStorage: Send + Sync {
    /// Reads the field stored at the given path.
    fn read_field(&self, path: &Path) -> ModalResult<SpectralField>;

    /// Stores the given field at the given path, replacing any existing field.
    fn write_field(&self, path: &Path, field: &SpectralField) -> ModalResult<()>;
}

/// Storage of fields as Nek5000 binary files on the local file system.
#[derive(Clone, Copy, Debug, Default)]
pub struct NekFieldStorage;

impl FieldStorage for NekFieldStorage {
    fn read_field(&self, path: &Path) -> ModalResult<SpectralField> {
        nek::read_field_file(path)
    }

    fn write_field(&self, path: &Path, field: &SpectralField) -> ModalResult<()> {
        nek::write_field_file(path, field)
    }
}

/// Storage of fields in memory, keyed by path.
#[derive(Debug, Default)]
pub struct MemoryFieldStorage {
    fields: Mutex<HashMap<PathBuf, SpectralField>>,
}

impl MemoryFieldStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a field is stored at the given path.
    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    /// Number of stored fields.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, SpectralField>> {
        self.fields
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FieldStorage for MemoryFieldStorage {
    fn read_field(&self, path: &Path) -> ModalResult<SpectralField> {
        self.lock()
            .get(path)
            .cloned()
            .ok_or_else(|| ModalError::NotFound {
                path: path.to_path_buf(),
            })
    }

    fn write_field(&self, path: &Path, field: &SpectralField) -> ModalResult<()> {
        self.lock().insert(path.to_path_buf(), field.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldContent;

    #[test]
    fn memory_storage_reads_back_written_fields() {
        let storage = MemoryFieldStorage::new();
        let path = Path::new("modes/cav0.f00001");
        assert!(storage.read_field(path).unwrap_err().is_not_found());

        let mut field = SpectralField::zeros_2d(2, 3, &FieldContent::all());
        field.elements[1].pres.fill(4.0);
        storage.write_field(path, &field).unwrap();

        assert!(storage.contains(path));
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.read_field(path).unwrap(), field);
    }

    #[test]
    fn nek_storage_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("mix0.f00002");
        let field = SpectralField::zeros_2d(1, 2, &FieldContent::all());
        NekFieldStorage.write_field(&path, &field).unwrap();
        assert!(path.exists());
        assert_eq!(NekFieldStorage.read_field(&path).unwrap().n_elements(), 1);
    }
}
