use crate::error::InputError;
use crate::models::ListingId;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

const TARGET_COLUMN: &str = "target";

/// Read listing identifiers from the `target` column of a CSV file, in file order
pub fn load_identifiers(path: impl AsRef<Path>) -> Result<Vec<ListingId>, InputError> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| InputError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let ids = read_identifiers(reader, path)?;
    info!(path = %path.display(), count = ids.len(), "Loaded identifier table");
    Ok(ids)
}

fn read_identifiers<R: Read>(
    mut reader: csv::Reader<R>,
    path: &Path,
) -> Result<Vec<ListingId>, InputError> {
    let csv_err = |source| InputError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let column = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .position(|h| h.eq_ignore_ascii_case(TARGET_COLUMN))
        .ok_or_else(|| InputError::MissingTargetColumn(path.to_path_buf()))?;

    let mut ids = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(csv_err)?;
        match record.get(column).and_then(ListingId::new) {
            Some(id) => ids.push(id),
            // +2: one for the header, one for 1-based line numbers
            None => warn!(line = row + 2, "Row without a target identifier, skipping"),
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &str) -> Result<Vec<ListingId>, InputError> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes());
        read_identifiers(reader, Path::new("inline.csv"))
    }

    #[test]
    fn reads_target_column_in_file_order() {
        let ids = parse("name,target,price\nA, 67890 ,10\nB,12345,20\n").unwrap();
        let ids: Vec<&str> = ids.iter().map(ListingId::as_str).collect();
        assert_eq!(ids, ["67890", "12345"]);
    }

    #[test]
    fn blank_targets_are_skipped() {
        let ids = parse("target\n1\n\"\"\n3\n").unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn missing_target_column_is_an_error() {
        assert!(matches!(
            parse("id,name\n1,a\n"),
            Err(InputError::MissingTargetColumn(_))
        ));
    }
}
