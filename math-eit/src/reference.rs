//! Persisted reference frames
//!
//! One record per line, `<label> : v1, v2, v3, ...`. Everything before the
//! first colon is the label; empty items between commas are ignored.

use crate::error::{EitError, Result};
use std::path::Path;

/// A labelled measurement frame
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub label: String,
    pub values: Vec<f64>,
}

/// Parse one record line, `None` when it has no colon or a value is not a
/// number
pub fn parse_record(line: &str) -> Option<Record> {
    let (label, data) = line.split_once(':')?;
    let values = data
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| item.parse::<f64>().ok())
        .collect::<Option<Vec<f64>>>()?;
    Some(Record {
        label: label.trim().to_string(),
        values,
    })
}

/// All well-formed records with at least one value, in file order
pub fn parse_records(text: &str) -> Vec<Record> {
    text.lines()
        .filter_map(parse_record)
        .filter(|r| !r.values.is_empty())
        .collect()
}

/// Load the record named `label`, or the first record when `label` is
/// `None`.
///
/// A missing file, or one without a matching record, is a configuration
/// error.
pub fn load_reference(path: &Path, label: Option<&str>) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        EitError::Configuration(format!(
            "cannot read reference file {}: {e}",
            path.display()
        ))
    })?;
    let records = parse_records(&text);
    let record = match label {
        Some(label) => records.into_iter().find(|r| r.label == label),
        None => records.into_iter().next(),
    };
    let record = record.ok_or_else(|| {
        EitError::Configuration(format!(
            "no {} record in {}",
            label.map_or("usable".to_string(), |l| format!("'{l}'")),
            path.display()
        ))
    })?;
    log::info!(
        "loaded reference '{}' ({} values) from {}",
        record.label,
        record.values.len(),
        path.display()
    );
    Ok(record.values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record() {
        let record = parse_record("tank 1 : 1.5, -2, 3e-2,").expect("record");
        assert_eq!(record.label, "tank 1");
        assert_eq!(record.values, vec![1.5, -2.0, 0.03]);

        assert!(parse_record("no colon here").is_none());
        assert!(parse_record("bad : 1.0, abc").is_none());
        let empty = parse_record("empty :").expect("record");
        assert!(empty.values.is_empty());
    }

    #[test]
    fn test_extra_colon_is_rejected() {
        let record = parse_record("a : 1, 2").expect("record");
        assert_eq!(record.values.len(), 2);
        assert!(parse_record("a : 1 : 2").is_none());
    }

    #[test]
    fn test_load_reference() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ref.txt");
        std::fs::write(&path, "header line\nair : 1, 2, 3\nsaline : 4, 5\n").expect("write");

        assert_eq!(load_reference(&path, None).expect("first"), vec![1.0, 2.0, 3.0]);
        assert_eq!(
            load_reference(&path, Some("saline")).expect("labelled"),
            vec![4.0, 5.0]
        );
        assert!(
            load_reference(&path, Some("gel"))
                .unwrap_err()
                .is_configuration_error()
        );
        assert!(
            load_reference(&dir.path().join("missing.txt"), None)
                .unwrap_err()
                .is_configuration_error()
        );
    }
}
