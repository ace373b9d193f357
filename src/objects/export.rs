//! Delimited-text export shared by spectra and heatmaps.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::ObjectError;
use crate::array::DType;

/// Options of `to_csv`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CsvOptions {
    /// Column delimiter; chosen from the file extension when `None`
    pub delimiter: Option<u8>,
    /// Override the object's `remove_zeros` option
    pub remove_zeros: Option<bool>,
}

impl CsvOptions {
    /// Options with an explicit delimiter
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            delimiter: Some(delimiter),
            ..Self::default()
        }
    }
}

/// Final output path and delimiter.
///
/// `.csv` files default to `,`, `.txt`/`.tab` files to a tab. Any other extension
/// gets `.csv` or `.txt` appended depending on the delimiter.
pub fn resolve_output(path: &Path, delimiter: Option<u8>) -> (PathBuf, u8) {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("csv") => (path.to_path_buf(), delimiter.unwrap_or(b',')),
        Some("txt") | Some("tab") => (path.to_path_buf(), delimiter.unwrap_or(b'\t')),
        _ => {
            let delimiter = delimiter.unwrap_or(b',');
            let suffix = if delimiter == b',' { "csv" } else { "txt" };
            let mut name = path.as_os_str().to_os_string();
            name.push(".");
            name.push(suffix);
            (PathBuf::from(name), delimiter)
        }
    }
}

/// Write a `# `-prefixed header line followed by `rows`
pub(crate) fn write_rows<I>(
    path: &Path,
    delimiter: u8,
    header: &[String],
    rows: I,
) -> Result<(), ObjectError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(
        file,
        "# {}",
        header.join(&char::from(delimiter).to_string())
    )?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(file);
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write equally long columns, each formatted with the precision of its type
pub(crate) fn write_columns(
    path: &Path,
    delimiter: u8,
    header: &[String],
    columns: &[(DType, &[f64])],
) -> Result<(), ObjectError> {
    let len = columns.first().map_or(0, |(_, c)| c.len());
    let rows = (0..len).map(|i| {
        columns
            .iter()
            .map(|(dtype, values)| dtype.format_value(values[i]))
            .collect()
    });
    write_rows(path, delimiter, header, rows)
}
