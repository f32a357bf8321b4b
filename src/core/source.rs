use crate::core::Record;
use crate::utils::error::{ImportError, Result};
use std::collections::HashSet;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parses CSV bytes into records, one per data row, in file order.
///
/// The first row is the header. Values are kept verbatim: no trimming and no
/// type coercion. A header-only file yields an empty vector.
pub fn parse(input: &[u8]) -> Result<Vec<Record>> {
    let input = input.strip_prefix(UTF8_BOM).unwrap_or(input);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(input);

    let headers = reader.headers().map_err(format_error)?.clone();
    if headers.is_empty() {
        return Err(ImportError::FormatError {
            message: "missing header row".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for name in headers.iter() {
        if !seen.insert(name) {
            return Err(ImportError::FormatError {
                message: format!("duplicate column '{}' in header", name),
            });
        }
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(format_error)?;
        records.push(Record::from_pairs(headers.iter().zip(row.iter())));
    }

    tracing::debug!(
        "Parsed {} records with columns {:?}",
        records.len(),
        headers.iter().collect::<Vec<_>>()
    );
    Ok(records)
}

fn format_error(error: csv::Error) -> ImportError {
    let message = match error.position() {
        Some(position) => format!("line {}: {}", position.line(), error),
        None => error.to_string(),
    };
    ImportError::FormatError { message }
}
