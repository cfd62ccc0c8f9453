//! Utilities for input/output.

use crate::{
    error::{ModalError, ModalResult},
    num::fdt,
};
use ndarray::prelude::*;
use std::{
    fs,
    io::{self, Read},
    path::Path,
};

#[cfg(feature = "pickle")]
use serde::Serialize;

/// Reads and returns the content of the specified text file.
pub fn read_text_file<P: AsRef<Path>>(file_path: P) -> ModalResult<String> {
    let file_path = file_path.as_ref();
    let file = fs::File::open(file_path).map_err(|err| ModalError::from_io(file_path, err))?;
    let mut text = String::new();
    let _ = io::BufReader::new(file)
        .read_to_string(&mut text)
        .map_err(|err| ModalError::from_io(file_path, err))?;
    Ok(text)
}

/// Creates the given file, and any missing parent directories, for writing.
pub fn create_file_and_required_directories<P: AsRef<Path>>(file_path: P) -> ModalResult<fs::File> {
    let file_path = file_path.as_ref();
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| ModalError::from_io(parent, err))?;
        }
    }
    fs::File::create(file_path).map_err(|err| ModalError::from_io(file_path, err))
}

fn parse_float(path: &Path, line_idx: usize, word: &str) -> ModalResult<fdt> {
    word.parse::<fdt>().map_err(|err| {
        ModalError::invalid_data(
            path,
            format!("Failed parsing {} on line {}: {}", word, line_idx + 1, err),
        )
    })
}

/// Reads a text file of whitespace separated floating point numbers
/// into a flat array, in reading order.
pub fn read_whitespace_separated_floats<P: AsRef<Path>>(file_path: P) -> ModalResult<Array1<fdt>> {
    let file_path = file_path.as_ref();
    let text = read_text_file(file_path)?;
    let mut values = Vec::new();
    for (line_idx, line) in text.lines().enumerate() {
        for word in line.split_whitespace() {
            values.push(parse_float(file_path, line_idx, word)?);
        }
    }
    Ok(Array1::from(values))
}

/// Reads a table of modal coefficients.
///
/// Column 0 holds the time (or snapshot index) and the remaining columns
/// hold one coefficient per mode. Blank lines and lines starting with `#`
/// are skipped.
///
/// # Returns
///
/// The time column and a 2D array of coefficients indexed `[time, mode]`.
pub fn read_coefficient_table<P: AsRef<Path>>(
    file_path: P,
) -> ModalResult<(Array1<fdt>, Array2<fdt>)> {
    let file_path = file_path.as_ref();
    let text = read_text_file(file_path)?;

    let mut n_columns = None;
    let mut values = Vec::new();
    let mut n_rows = 0;

    for (line_idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|word| parse_float(file_path, line_idx, word))
            .collect::<ModalResult<Vec<_>>>()?;

        match n_columns {
            None => {
                if row.len() < 2 {
                    return Err(ModalError::invalid_data(
                        file_path,
                        "Coefficient table needs a time column and at least one mode column",
                    ));
                }
                n_columns = Some(row.len());
            }
            Some(n) if n != row.len() => {
                return Err(ModalError::shape_mismatch(
                    format!("columns on line {} of {}", line_idx + 1, file_path.display()),
                    n,
                    row.len(),
                ));
            }
            _ => {}
        }
        values.extend(row);
        n_rows += 1;
    }

    let n_columns = n_columns
        .ok_or_else(|| ModalError::invalid_data(file_path, "Coefficient table is empty"))?;
    let table = Array2::from_shape_vec((n_rows, n_columns), values)
        .map_err(|err| ModalError::invalid_data(file_path, err.to_string()))?;

    let times = table.column(0).to_owned();
    let coefficients = table.slice(s![.., 1..]).to_owned();
    Ok((times, coefficients))
}

/// Serializes the given data into protocol 3 pickle format and save at the given path.
#[cfg(feature = "pickle")]
pub fn save_data_as_pickle<P: AsRef<Path>, T: Serialize>(file_path: P, data: &T) -> ModalResult<()> {
    let file_path = file_path.as_ref();
    let mut file = create_file_and_required_directories(file_path)?;
    write_data_as_pickle_to_file(&mut file, data).map_err(|err| ModalError::from_io(file_path, err))
}

/// Serializes the given data into protocol 3 pickle format and write to the given file.
#[cfg(feature = "pickle")]
pub fn write_data_as_pickle_to_file<T: Serialize>(file: &mut fs::File, data: &T) -> io::Result<()> {
    match serde_pickle::to_writer(file, data, serde_pickle::SerOptions::new()) {
        Ok(_) => Ok(()),
        Err(serde_pickle::Error::Io(err)) => Err(err),
        Err(_) => Err(io::Error::new(
            io::ErrorKind::Other,
            "Unexpected error while serializing data to pickle file",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn weights_are_read_across_lines() {
        let file = write_temp("0.25 0.5\n  1.0e-1\n\n2\n");
        let weights = read_whitespace_separated_floats(file.path()).unwrap();
        assert_eq!(weights.len(), 4);
        assert_abs_diff_eq!(weights[2], 0.1);
        assert_abs_diff_eq!(weights.sum(), 2.85, epsilon = 1e-12);
    }

    #[test]
    fn unparsable_weight_is_invalid_data() {
        let file = write_temp("0.25 zero\n");
        assert!(matches!(
            read_whitespace_separated_floats(file.path()),
            Err(ModalError::InvalidData { .. })
        ));
    }

    #[test]
    fn missing_weight_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_whitespace_separated_floats(dir.path().join("mass_matrix.dat")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn coefficient_table_is_split_into_times_and_modes() {
        let file = write_temp("# t a1 a2\n0.0 1.0 2.0\n0.5 3.0 4.0\n1.0 5.0 6.0\n");
        let (t, a) = read_coefficient_table(file.path()).unwrap();
        assert_eq!(t.to_vec(), vec![0.0, 0.5, 1.0]);
        assert_eq!(a.dim(), (3, 2));
        assert_abs_diff_eq!(a[[2, 1]], 6.0);
    }

    #[test]
    fn ragged_coefficient_table_is_rejected() {
        let file = write_temp("0.0 1.0 2.0\n0.5 3.0\n");
        assert!(matches!(
            read_coefficient_table(file.path()),
            Err(ModalError::ShapeMismatch { .. })
        ));
    }
}
