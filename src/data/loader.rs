//! Row-limited loading of (optionally gzip-compressed) CSV samples

use super::Dataset;
use crate::error::{KolosalError, Result};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Labels must sit this close to an integer to be accepted
const LABEL_TOLERANCE: f64 = 1e-9;

/// Loads the first `row_limit` rows of a headerless numeric CSV
#[derive(Debug, Clone)]
pub struct SampleLoader {
    /// Index of the label column
    label_column: usize,
    /// Field separator
    delimiter: u8,
}

impl Default for SampleLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleLoader {
    /// Label in column 0, comma separated
    pub fn new() -> Self {
        Self {
            label_column: 0,
            delimiter: b',',
        }
    }

    /// Set the label column index
    pub fn with_label_column(mut self, column: usize) -> Self {
        self.label_column = column;
        self
    }

    /// Set the field separator
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read at most `row_limit` rows from `path`.
    ///
    /// Compression is detected from the file's magic bytes. Only the
    /// requested prefix of the file is decompressed.
    pub fn load_sample(&self, path: impl AsRef<Path>, row_limit: usize) -> Result<Dataset> {
        let path = path.as_ref();
        if row_limit == 0 {
            return Err(KolosalError::InvalidInput("row_limit must be positive".to_string()));
        }

        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => KolosalError::DataUnavailable {
                path: path.to_path_buf(),
            },
            _ => KolosalError::IoError(e),
        })?;

        let mut reader = BufReader::new(file);
        let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
        let source: Box<dyn BufRead> = if is_gzip {
            Box::new(BufReader::new(MultiGzDecoder::new(reader)))
        } else {
            Box::new(reader)
        };

        let (buffer, n_lines) = read_head(source, row_limit)?;
        debug!(path = %path.display(), is_gzip, rows = n_lines, "read sample prefix");
        if n_lines == 0 {
            return Err(KolosalError::DataError(format!(
                "{} contains no data rows",
                path.display()
            )));
        }

        // Every column is read as Float64; an inferred integer column would
        // reject a fractional value further down the file
        let schema = float_schema(&buffer, self.delimiter);
        let parse_opts = CsvParseOptions::default().with_separator(self.delimiter);
        let df = CsvReadOptions::default()
            .with_has_header(false)
            .with_schema(Some(Arc::new(schema)))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(Cursor::new(buffer))
            .finish()?;

        self.frame_to_dataset(&df)
    }

    fn frame_to_dataset(&self, df: &DataFrame) -> Result<Dataset> {
        let n_rows = df.height();
        let n_cols = df.width();

        if self.label_column >= n_cols {
            return Err(KolosalError::InvalidInput(format!(
                "label column {} out of range for {} columns",
                self.label_column, n_cols
            )));
        }
        if n_cols < 2 {
            return Err(KolosalError::DataError(
                "sample needs a label column and at least one feature".to_string(),
            ));
        }
        if n_cols == 2 {
            warn!("sample has a single feature column");
        }

        let mut features = Array2::<f32>::zeros((n_rows, n_cols - 1));
        let mut labels = Array1::<i64>::zeros(n_rows);
        let mut feature_idx = 0;

        for (col_idx, column) in df.get_columns().iter().enumerate() {
            let series = column.as_materialized_series().cast(&DataType::Float64)?;
            let values = series.f64()?;

            if col_idx == self.label_column {
                for (row, value) in values.into_iter().enumerate() {
                    labels[row] = parse_label(value, row)?;
                }
            } else {
                for (row, value) in values.into_iter().enumerate() {
                    let value = value.ok_or_else(|| {
                        KolosalError::DataError(format!(
                            "missing value at row {}, column {}",
                            row, col_idx
                        ))
                    })?;
                    features[[row, feature_idx]] = value as f32;
                }
                feature_idx += 1;
            }
        }

        Dataset::new(features, labels)
    }
}

/// All-Float64 schema sized from the first line of `buffer`
fn float_schema(buffer: &[u8], delimiter: u8) -> Schema {
    let first = buffer.split(|&b| b == b'\n').next().unwrap_or_default();
    let n_fields = first.split(|&b| b == delimiter).count();
    Schema::from_iter((1..=n_fields).map(|i| Field::new(format!("column_{}", i).into(), DataType::Float64)))
}

/// Load a row-limited sample with default options (label in column 0)
pub fn load_sample(path: impl AsRef<Path>, row_limit: usize) -> Result<Dataset> {
    SampleLoader::new().load_sample(path, row_limit)
}

fn parse_label(value: Option<f64>, row: usize) -> Result<i64> {
    let value = value
        .ok_or_else(|| KolosalError::DataError(format!("missing label at row {}", row)))?;
    let rounded = value.round();
    if (value - rounded).abs() > LABEL_TOLERANCE {
        return Err(KolosalError::DataError(format!(
            "non-integral label {} at row {}",
            value, row
        )));
    }
    Ok(rounded as i64)
}

/// Copy the first `limit` non-blank lines of `source` into a buffer
fn read_head(mut source: Box<dyn BufRead>, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buffer = Vec::new();
    let mut line = Vec::new();
    let mut n_lines = 0;

    while n_lines < limit {
        line.clear();
        if source.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if line.iter().all(|b| b.is_ascii_whitespace()) {
            continue;
        }
        buffer.extend_from_slice(&line);
        if !line.ends_with(b"\n") {
            buffer.push(b'\n');
        }
        n_lines += 1;
    }

    Ok((buffer, n_lines))
}

/// Write datasets back out in the loader's layout
pub struct DataSaver;

impl DataSaver {
    /// Save as a headerless CSV with the label first, gzip-compressed
    pub fn save_csv_gz(dataset: &Dataset, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        Self::write_rows(dataset, &mut encoder)?;
        encoder.finish()?.flush()?;
        Ok(())
    }

    /// Save as a plain headerless CSV with the label first
    pub fn save_csv(dataset: &Dataset, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        Self::write_rows(dataset, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn write_rows<W: Write>(dataset: &Dataset, out: &mut W) -> Result<()> {
        let features = dataset.features();
        for (row, label) in features.rows().into_iter().zip(dataset.labels().iter()) {
            write!(out, "{}", label)?;
            for value in row.iter() {
                write!(out, ",{}", value)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;

    fn write_plain(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_is_data_unavailable() {
        let err = load_sample("/nonexistent/HIGGS.csv.gz", 10).unwrap_err();
        assert!(matches!(err, KolosalError::DataUnavailable { .. }));
    }

    #[test]
    fn test_zero_row_limit_rejected() {
        let file = write_plain("1,0.5\n");
        let err = load_sample(file.path(), 0).unwrap_err();
        assert!(matches!(err, KolosalError::InvalidInput(_)));
    }

    #[test]
    fn test_plain_csv_with_float_labels() {
        let file = write_plain("1.000000e+00,0.5,1.5\n0.000000e+00,2.5,3.5\n");
        let dataset = load_sample(file.path(), 10).unwrap();

        assert_eq!(dataset.n_rows(), 2);
        assert_eq!(dataset.n_features(), 2);
        assert_eq!(dataset.labels().to_vec(), vec![1, 0]);
        assert_eq!(dataset.features()[[1, 0]], 2.5);
    }

    #[test]
    fn test_row_limit_truncates() {
        let file = write_plain("0,1\n1,2\n0,3\n1,4\n");
        let dataset = load_sample(file.path(), 3).unwrap();
        assert_eq!(dataset.n_rows(), 3);
    }

    #[test]
    fn test_label_column_override() {
        let file = write_plain("0.5,1\n1.5,0\n");
        let dataset = SampleLoader::new()
            .with_label_column(1)
            .load_sample(file.path(), 5)
            .unwrap();
        assert_eq!(dataset.labels().to_vec(), vec![1, 0]);
        assert_eq!(dataset.features()[[1, 0]], 1.5);
    }

    #[test]
    fn test_non_integral_label_rejected() {
        let file = write_plain("0.5,1.0\n1,2.0\n");
        let err = load_sample(file.path(), 5).unwrap_err();
        assert!(matches!(err, KolosalError::DataError(_)));
    }

    #[test]
    fn test_gzip_round_trip_through_saver() {
        let dataset = Dataset::new(
            array![[0.25f32, -1.0], [3.5, 4.0], [5.0, 6.5]],
            array![0, 1, 1],
        )
        .unwrap();
        let file = tempfile::Builder::new().suffix(".gz").tempfile().unwrap();
        DataSaver::save_csv_gz(&dataset, file.path()).unwrap();

        let loaded = load_sample(file.path(), 100).unwrap();
        assert_eq!(loaded, dataset);
    }
}
