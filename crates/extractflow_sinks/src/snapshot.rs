//! CSV snapshot of a raw dataset, written before typing.

use std::path::Path;

use extractflow_protocol::Dataset;
use tracing::info;

use crate::error::{ExtractError, Result};
use crate::staging::StagedFile;

/// Write `dataset` as CSV with a header row; nulls are empty fields.
/// Returns the number of data rows written.
pub fn write_csv_snapshot(dataset: &Dataset, path: &Path) -> Result<usize> {
    let staged = StagedFile::new(path)?;
    let file = staged.create()?;
    let temp_path = staged.temp_path().to_path_buf();

    let mut writer = csv::Writer::from_writer(file);
    writer
        .write_record(dataset.columns())
        .map_err(|err| ExtractError::storage(&temp_path, "write CSV header to", err))?;
    for row in dataset.rows() {
        writer
            .write_record(row.iter().map(|value| value.to_string()))
            .map_err(|err| ExtractError::storage(&temp_path, "write CSV row to", err))?;
    }
    writer
        .flush()
        .map_err(|err| ExtractError::io(&temp_path, "flush", err))?;
    drop(writer);

    staged.commit()?;
    info!(
        "Wrote CSV snapshot: {} ({} rows)",
        path.display(),
        dataset.num_rows()
    );
    Ok(dataset.num_rows())
}

#[cfg(test)]
mod tests {
    use super::*;
    use extractflow_protocol::{Row, Value};
    use tempfile::tempdir;

    #[test]
    fn test_csv_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.csv");
        let dataset = Dataset::from_rows(vec![
            Row::new().with("id", 1i64).with("city", "New York, NY"),
            Row::new().with("id", 2i64).with("city", Value::Null),
        ])
        .unwrap();

        let rows = write_csv_snapshot(&dataset, &path).unwrap();
        assert_eq!(rows, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "id,city\n1,\"New York, NY\"\n2,\n");
    }

    #[test]
    fn test_empty_dataset_writes_header_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let dataset = Dataset::new(vec!["a".into(), "b".into()]);
        assert_eq!(write_csv_snapshot(&dataset, &path).unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n");
    }
}
