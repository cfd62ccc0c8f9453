//! Reading and writing of Nek5000 binary field files.
//!
//! A field file consists of a 132 byte ASCII header, a four byte float
//! used to detect the byte order, a map from file position to element
//! number and finally the variable data. Each variable listed in the
//! header (`X`, `U`, `P`, `T`) is stored element by element in map
//! order, component by component, with `nx*ny*nz` values per component
//! and x varying fastest.

use super::Endianness;
use crate::{
    error::{ModalError, ModalResult},
    field::{FieldContent, SpectralElement, SpectralField},
    num::fdt,
};
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use lazy_static::lazy_static;
use ndarray::prelude::*;
use regex::Regex;
use std::{
    fs,
    io::{self, BufWriter, Cursor, Write},
    path::Path,
};

/// Length of the ASCII header in bytes.
pub const HEADER_LENGTH: usize = 132;

/// Value written after the header to reveal the byte order.
pub const ENDIANNESS_TAG: f32 = 6.54321;

lazy_static! {
    static ref HEADER_REGEX: Regex = Regex::new(
        r"^#std\s+(\d)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\S+)\s+(\d+)\s+(\d+)\s+(\d+)\s*(.*)$"
    )
    .unwrap();
}

/// Contents of a parsed field file header.
#[derive(Clone, Debug, PartialEq)]
struct Header {
    word_size: usize,
    element_shape: [usize; 3],
    n_elements: usize,
    time: fdt,
    time_step: u64,
    content: FieldContent,
    /// Variable codes in file order.
    variables: Vec<char>,
}

impl Header {
    fn n_dim(&self) -> usize {
        if self.element_shape[2] > 1 {
            3
        } else {
            2
        }
    }

    fn parse(path: &Path, bytes: &[u8]) -> ModalResult<Self> {
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim_end_matches(|c: char| c == '\0' || c.is_whitespace());
        let captures = HEADER_REGEX
            .captures(text)
            .ok_or_else(|| ModalError::invalid_data(path, format!("Unrecognized header: {}", text)))?;

        let integer = |idx: usize| -> ModalResult<usize> {
            captures[idx].parse::<usize>().map_err(|err| {
                ModalError::invalid_data(path, format!("Invalid header entry {}: {}", &captures[idx], err))
            })
        };

        let word_size = integer(1)?;
        if word_size != 4 && word_size != 8 {
            return Err(ModalError::invalid_data(
                path,
                format!("Unsupported word size {}", word_size),
            ));
        }
        let element_shape = [integer(2)?, integer(3)?, integer(4)?];
        let n_elements = integer(5)?;
        let time = captures[7].parse::<fdt>().map_err(|err| {
            ModalError::invalid_data(path, format!("Invalid time {}: {}", &captures[7], err))
        })?;
        let time_step = integer(8)? as u64;

        let mut content = FieldContent {
            position: false,
            velocity: false,
            pressure: false,
            temperature: false,
        };
        let mut variables = Vec::new();
        for code in captures[11].chars().filter(|c| !c.is_whitespace()) {
            match code {
                'X' => content.position = true,
                'U' => content.velocity = true,
                'P' => content.pressure = true,
                'T' => content.temperature = true,
                // Passive scalars come last and are not retained
                'S' => break,
                other => {
                    return Err(ModalError::invalid_data(
                        path,
                        format!("Unknown variable code {}", other),
                    ))
                }
            }
            variables.push(code);
        }

        Ok(Self {
            word_size,
            element_shape,
            n_elements,
            time,
            time_step,
            content,
            variables,
        })
    }

    fn from_field(field: &SpectralField) -> Self {
        let content = field.content();
        let variables = [
            ('X', content.position),
            ('U', content.velocity),
            ('P', content.pressure),
            ('T', content.temperature),
        ]
        .iter()
        .filter(|(_, present)| *present)
        .map(|(code, _)| *code)
        .collect();
        Self {
            word_size: field.word_size,
            element_shape: field.element_shape,
            n_elements: field.n_elements(),
            time: field.time,
            time_step: field.time_step,
            content,
            variables,
        }
    }

    fn text(&self) -> String {
        let [nx, ny, nz] = self.element_shape;
        let variables: String = self.variables.iter().collect();
        let header = format!(
            "#std {:1} {:2} {:2} {:2} {:10} {:10} {:>20} {:9} {:6} {:6} {}",
            self.word_size,
            nx,
            ny,
            nz,
            self.n_elements,
            self.n_elements,
            format_exponential(self.time),
            self.time_step,
            0,
            1,
            variables
        );
        format!("{:<width$}", header, width = HEADER_LENGTH)
    }
}

/// Formats a float with 13 decimals and a signed two digit exponent.
fn format_exponential(value: fdt) -> String {
    let text = format!("{:.13E}", value);
    match text.split_once('E') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            format!(
                "{}E{}{:02}",
                mantissa,
                if exponent < 0 { '-' } else { '+' },
                exponent.abs()
            )
        }
        None => text,
    }
}

fn detect_endianness(path: &Path, bytes: &[u8]) -> ModalResult<Endianness> {
    let is_tag = |value: f32| (value - ENDIANNESS_TAG).abs() < 1e-5;
    if is_tag(LittleEndian::read_f32(bytes)) {
        Ok(Endianness::Little)
    } else if is_tag(BigEndian::read_f32(bytes)) {
        Ok(Endianness::Big)
    } else {
        Err(ModalError::invalid_data(path, "Could not determine byte order"))
    }
}

fn read_into<R: ReadBytesExt>(
    reader: &mut R,
    values: &mut [fdt],
    word_size: usize,
    endianness: Endianness,
) -> io::Result<()> {
    match (word_size, endianness) {
        (4, Endianness::Big) => {
            for value in values.iter_mut() {
                *value = reader.read_f32::<BigEndian>()? as fdt;
            }
        }
        (4, _) => {
            for value in values.iter_mut() {
                *value = reader.read_f32::<LittleEndian>()? as fdt;
            }
        }
        (_, Endianness::Big) => reader.read_f64_into::<BigEndian>(values)?,
        (_, _) => reader.read_f64_into::<LittleEndian>(values)?,
    }
    Ok(())
}

fn write_from<W: WriteBytesExt>(
    writer: &mut W,
    values: &Array4<fdt>,
    word_size: usize,
    endianness: Endianness,
) -> io::Result<()> {
    for &value in values.iter() {
        match (word_size, endianness) {
            (4, Endianness::Big) => writer.write_f32::<BigEndian>(value as f32)?,
            (4, _) => writer.write_f32::<LittleEndian>(value as f32)?,
            (_, Endianness::Big) => writer.write_f64::<BigEndian>(value)?,
            (_, _) => writer.write_f64::<LittleEndian>(value)?,
        }
    }
    Ok(())
}

fn variable_array(element: &mut SpectralElement, code: char) -> &mut Array4<fdt> {
    match code {
        'X' => &mut element.pos,
        'U' => &mut element.vel,
        'P' => &mut element.pres,
        _ => &mut element.temp,
    }
}

/// Reads the Nek5000 field file at the given path.
///
/// # Returns
///
/// A `Result` which is either:
///
/// - `Ok`: Contains the field, with elements ordered by element number.
/// - `Err`: `NotFound` if the file does not exist, otherwise an error
///   encountered while reading or interpreting the file.
pub fn read_field_file<P: AsRef<Path>>(file_path: P) -> ModalResult<SpectralField> {
    let file_path = file_path.as_ref();
    let bytes = fs::read(file_path).map_err(|err| ModalError::from_io(file_path, err))?;
    let truncated = |err: io::Error| ModalError::invalid_data(file_path, format!("Truncated file: {}", err));

    if bytes.len() < HEADER_LENGTH + 4 {
        return Err(ModalError::invalid_data(file_path, "File too short for header"));
    }
    let header = Header::parse(file_path, &bytes[..HEADER_LENGTH])?;
    let endianness = detect_endianness(file_path, &bytes[HEADER_LENGTH..HEADER_LENGTH + 4])?;

    let mut cursor = Cursor::new(&bytes[HEADER_LENGTH + 4..]);

    let mut element_map = vec![0_i32; header.n_elements];
    let map_read = match endianness {
        Endianness::Big => cursor.read_i32_into::<BigEndian>(&mut element_map),
        _ => cursor.read_i32_into::<LittleEndian>(&mut element_map),
    };
    map_read.map_err(truncated)?;

    let element_indices = element_map
        .iter()
        .map(|&number| {
            if number >= 1 && (number as usize) <= header.n_elements {
                Ok(number as usize - 1)
            } else {
                Err(ModalError::invalid_data(
                    file_path,
                    format!("Element number {} out of range", number),
                ))
            }
        })
        .collect::<ModalResult<Vec<_>>>()?;

    let n_dim = header.n_dim();
    let mut elements: Vec<_> = (0..header.n_elements)
        .map(|_| SpectralElement::zeros(n_dim, header.element_shape, &header.content))
        .collect();

    for &code in &header.variables {
        for &element_idx in &element_indices {
            let array = variable_array(&mut elements[element_idx], code);
            let values = array.as_slice_mut().ok_or_else(|| {
                ModalError::invalid_data(file_path, "Element arrays are not contiguous")
            })?;
            read_into(&mut cursor, values, header.word_size, endianness).map_err(truncated)?;
        }
    }

    Ok(SpectralField {
        n_dim,
        element_shape: header.element_shape,
        time: header.time,
        time_step: header.time_step,
        word_size: header.word_size,
        endianness,
        elements,
    })
}

/// Writes the given field as a Nek5000 field file, overwriting any
/// existing file at the path.
pub fn write_field_file<P: AsRef<Path>>(file_path: P, field: &SpectralField) -> ModalResult<()> {
    let file_path = file_path.as_ref();
    if field.word_size != 4 && field.word_size != 8 {
        return Err(ModalError::invalid_data(
            file_path,
            format!("Unsupported word size {}", field.word_size),
        ));
    }
    let header = Header::from_field(field);
    let endianness = field.endianness;

    let file = super::utils::create_file_and_required_directories(file_path)?;
    let mut writer = BufWriter::new(file);

    let write_all = |writer: &mut BufWriter<fs::File>| -> io::Result<()> {
        writer.write_all(header.text().as_bytes())?;
        match endianness {
            Endianness::Big => writer.write_f32::<BigEndian>(ENDIANNESS_TAG)?,
            _ => writer.write_f32::<LittleEndian>(ENDIANNESS_TAG)?,
        }
        for number in 1..=field.n_elements() as i32 {
            match endianness {
                Endianness::Big => writer.write_i32::<BigEndian>(number)?,
                _ => writer.write_i32::<LittleEndian>(number)?,
            }
        }
        for &code in &header.variables {
            for element in &field.elements {
                let array = match code {
                    'X' => &element.pos,
                    'U' => &element.vel,
                    'P' => &element.pres,
                    _ => &element.temp,
                };
                write_from(writer, array, field.word_size, endianness)?;
            }
        }
        writer.flush()
    };
    write_all(&mut writer).map_err(|err| ModalError::from_io(file_path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_field(word_size: usize, endianness: Endianness) -> SpectralField {
        let mut field = SpectralField::zeros_2d(3, 4, &FieldContent::all());
        field.word_size = word_size;
        field.endianness = endianness;
        field.time = 12.5;
        field.time_step = 250;
        for (element_idx, element) in field.elements.iter_mut().enumerate() {
            for ((component, _, row, column), value) in element.vel.indexed_iter_mut() {
                *value = (element_idx + 1) as fdt * 0.5 + component as fdt - 0.25 * (row * column) as fdt;
            }
            for ((component, _, row, column), value) in element.pos.indexed_iter_mut() {
                let coordinate = if component == 0 { column } else { row };
                *value = coordinate as fdt + element_idx as fdt * 3.0;
            }
            element.pres.fill(element_idx as fdt);
            element.temp.fill(-0.125);
        }
        field
    }

    #[test]
    fn header_text_has_fixed_length_and_parses_back() {
        let field = sample_field(4, Endianness::Little);
        let header = Header::from_field(&field);
        let text = header.text();
        assert_eq!(text.len(), HEADER_LENGTH);
        assert!(text.starts_with("#std 4  4  4  1          3          3  1.2500000000000E+01"));

        let parsed = Header::parse(Path::new("header"), text.as_bytes()).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.variables, vec!['X', 'U', 'P', 'T']);
    }

    #[test]
    fn exponential_format_matches_fortran_style() {
        assert_eq!(format_exponential(0.0), "0.0000000000000E+00");
        assert_eq!(format_exponential(-0.0125), "-1.2500000000000E-02");
    }

    #[test]
    fn field_files_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        for (idx, (word_size, endianness)) in [
            (4, Endianness::Little),
            (4, Endianness::Big),
            (8, Endianness::Little),
            (8, Endianness::Big),
        ]
        .into_iter()
        .enumerate()
        {
            let field = sample_field(word_size, endianness);
            let path = dir.path().join(format!("cav0.f{:05}", idx + 1));
            write_field_file(&path, &field).unwrap();
            let bytes = fs::read(&path).unwrap();
            assert_eq!(
                detect_endianness(&path, &bytes[HEADER_LENGTH..HEADER_LENGTH + 4]).unwrap(),
                endianness
            );

            let read = read_field_file(&path).unwrap();
            assert_eq!(read.element_shape, field.element_shape);
            assert_eq!(read.word_size, word_size);
            assert_eq!(read.endianness, endianness);
            assert_eq!(read.time_step, 250);
            assert_abs_diff_eq!(read.time, 12.5);
            for (a, b) in read.elements.iter().zip(field.elements.iter()) {
                for (x, y) in a.vel.iter().zip(b.vel.iter()) {
                    assert_abs_diff_eq!(*x, *y, epsilon = 1e-6);
                }
                assert_eq!(a.pres, b.pres);
                assert_eq!(a.temp, b.temp);
            }
        }
    }

    #[test]
    fn elements_are_placed_according_to_element_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapped");
        let field = sample_field(8, Endianness::Little);
        write_field_file(&path, &field).unwrap();

        // Swap the numbers of the first two elements in the map
        let mut bytes = fs::read(&path).unwrap();
        let map_start = HEADER_LENGTH + 4;
        LittleEndian::write_i32(&mut bytes[map_start..map_start + 4], 2);
        LittleEndian::write_i32(&mut bytes[map_start + 4..map_start + 8], 1);
        fs::write(&path, &bytes).unwrap();

        let read = read_field_file(&path).unwrap();
        assert_eq!(read.elements[0].pres, field.elements[1].pres);
        assert_eq!(read.elements[1].pres, field.elements[0].pres);
        assert_eq!(read.elements[2].pres, field.elements[2].pres);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_field_file(dir.path().join("cyl0.f00001")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn garbage_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage");
        fs::write(&path, vec![b'x'; 200]).unwrap();
        assert!(matches!(
            read_field_file(&path),
            Err(ModalError::InvalidData { .. })
        ));
    }
}
