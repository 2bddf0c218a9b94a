use std::fs::{self, File};
use std::path::Path;

use parquet::file::reader::{FileReader, SerializedFileReader};

use crate::error::{Error, Result};

/// Sums `num_rows` over every non-empty `*.parquet` file below `dir`.
///
/// Zero-byte files are skipped; any other unreadable file is an error.
pub fn count_parquet_rows(dir: &Path) -> Result<u64> {
    let mut total = 0u64;
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = fs::read_dir(&current).map_err(|e| Error::io(&current, e))?;
        for entry in entries {
            let path = entry.map_err(|e| Error::io(&current, e))?.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            if path.extension().is_none_or(|ext| ext != "parquet") {
                continue;
            }
            let file = File::open(&path).map_err(|e| Error::io(&path, e))?;
            let len = file.metadata().map_err(|e| Error::io(&path, e))?.len();
            if len == 0 {
                tracing::debug!(path = %path.display(), "Skipping empty parquet file");
                continue;
            }
            let reader = SerializedFileReader::new(file).map_err(|e| {
                Error::tool("parquet footer reader", format!("{}: {e}", path.display()))
            })?;
            let rows = reader.metadata().file_metadata().num_rows();
            total += u64::try_from(rows).map_err(|_| {
                Error::tool(
                    "parquet footer reader",
                    format!("{}: negative row count {rows}", path.display()),
                )
            })?;
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Int64Array};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;

    fn write_rows(path: &Path, rows: i64) {
        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, false)]));
        let ids: ArrayRef = Arc::new(Int64Array::from_iter_values(0..rows));
        let batch = RecordBatch::try_new(schema.clone(), vec![ids]).unwrap();
        let file = File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_sums_nested_files_and_skips_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("batch-1")).unwrap();
        write_rows(&dir.path().join("part-0.parquet"), 10);
        write_rows(&dir.path().join("batch-1/part-1.parquet"), 30);
        fs::write(dir.path().join("part-2.parquet"), "").unwrap();
        fs::write(dir.path().join("_SUCCESS"), "").unwrap();

        assert_eq!(count_parquet_rows(dir.path()).unwrap(), 40);
    }

    #[test]
    fn test_garbage_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.parquet"), "not parquet").unwrap();
        assert!(count_parquet_rows(dir.path()).is_err());
    }
}
