//! Reading and writing payload tables.
//!
//! Tables are Arrow record batches. Parquet files go through the parquet
//! crate's Arrow reader/writer; CSV files are written with a header row and
//! read back with an inferred schema unless the caller supplies one.
//!
//! Inference only sees text: zero-padded codes such as `"001"` come back as
//! Int64 `1` and every integer width comes back as Int64. Use
//! [`read_table_with_schema`] when a CSV table must round-trip exactly.

use arrow::compute::concat_batches;
use arrow::csv::reader::Format as CsvFormat;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::fs::{self, File};
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use super::descriptor::Format;
use crate::error::{LcaError, Result};

/// Read a table, choosing the reader from the file's extension.
pub fn read_table(path: &Path) -> Result<RecordBatch> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    read_table_as(path, Format::from_extension(&extension)?)
}

/// Read a table in an explicit format.
pub fn read_table_as(path: &Path, format: Format) -> Result<RecordBatch> {
    match format {
        Format::Parquet => read_parquet(path),
        Format::Csv => read_csv(path, None),
    }
}

/// Read a table against a known schema.
///
/// CSV columns are parsed as the schema says instead of being inferred.
/// Parquet files carry their own schema, which must have the same fields.
pub fn read_table_with_schema(path: &Path, format: Format, schema: SchemaRef) -> Result<RecordBatch> {
    match format {
        Format::Parquet => {
            let table = read_parquet(path)?;
            if table.schema().fields() != schema.fields() {
                return Err(read_error(path, "schema does not match the expected fields"));
            }
            Ok(table)
        }
        Format::Csv => read_csv(path, Some(schema)),
    }
}

/// Write a table in the given format, replacing any existing file.
pub fn write_table(table: &RecordBatch, path: &Path, format: Format) -> Result<()> {
    match format {
        Format::Parquet => write_parquet(table, path),
        Format::Csv => write_csv(table, path),
    }
}

fn read_parquet(path: &Path) -> Result<RecordBatch> {
    let file = File::open(path).map_err(|e| read_error(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| read_error(path, e))?;
    let schema = builder.schema().clone();
    let reader = builder.build().map_err(|e| read_error(path, e))?;

    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| read_error(path, e))?;
    concat_batches(&schema, &batches).map_err(|e| read_error(path, e))
}

/// Parse CSV text with a header row, inferring the schema.
///
/// `origin` names the source in errors.
pub fn parse_csv(bytes: &[u8], origin: &Path) -> Result<RecordBatch> {
    csv_batches(Cursor::new(bytes), origin, None)
}

fn read_csv(path: &Path, schema: Option<SchemaRef>) -> Result<RecordBatch> {
    let file = File::open(path).map_err(|e| read_error(path, e))?;
    csv_batches(file, path, schema)
}

fn csv_batches<R: Read + Seek>(
    mut input: R,
    path: &Path,
    schema: Option<SchemaRef>,
) -> Result<RecordBatch> {
    let schema = match schema {
        Some(schema) => schema,
        None => {
            let (schema, _) = CsvFormat::default()
                .with_header(true)
                .infer_schema(&mut input, None)
                .map_err(|e| read_error(path, e))?;
            input.rewind().map_err(|e| read_error(path, e))?;
            Arc::new(schema)
        }
    };

    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .build(input)
        .map_err(|e| read_error(path, e))?;

    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| read_error(path, e))?;
    concat_batches(&schema, &batches).map_err(|e| read_error(path, e))
}

fn write_parquet(table: &RecordBatch, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| write_error(path, e))?;
    let mut writer =
        ArrowWriter::try_new(file, table.schema(), None).map_err(|e| write_error(path, e))?;
    writer.write(table).map_err(|e| write_error(path, e))?;
    writer.close().map_err(|e| write_error(path, e))?;
    Ok(())
}

fn write_csv(table: &RecordBatch, path: &Path) -> Result<()> {
    let mut buffer = Vec::new();
    {
        let mut writer = WriterBuilder::new().with_header(true).build(&mut buffer);
        writer.write(table).map_err(|e| write_error(path, e))?;
    }
    fs::write(path, buffer).map_err(|e| write_error(path, e))
}

fn read_error(path: &Path, err: impl std::fmt::Display) -> LcaError {
    LcaError::Deserialization {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn write_error(path: &Path, err: impl std::fmt::Display) -> LcaError {
    LcaError::Serialization {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
