//! Normalization of the CSV lead export into records.
//!
//! # Design
//! The export endpoint is the one place the API answers with CSV instead of
//! JSON. Each data row becomes an ordered column → value map. `emailStatus`
//! is dropped and a `hash` column is added: the MD5 of the row's other values
//! serialized as a JSON list. Because `emailStatus` is excluded from the
//! hash, a lead keeps its fingerprint while its delivery status changes, so
//! exports can be diffed over time.
//!
//! The JSON list uses `", "` separators and escapes everything outside
//! printable ASCII as `\uXXXX`, the format existing stored fingerprints were
//! computed over.

use std::io;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use serde_json::ser::{CompactFormatter, Formatter, Serializer};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Column added to every record.
pub const HASH_COLUMN: &str = "hash";

/// Column removed from every record and ignored by the hash.
pub const EMAIL_STATUS_COLUMN: &str = "emailStatus";

/// One lead row from a CSV export, columns in export order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadExportRecord(Map<String, Value>);

impl LeadExportRecord {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).and_then(Value::as_str)
    }

    /// Fingerprint of the row's values, excluding `emailStatus`.
    pub fn content_hash(&self) -> &str {
        self.get(HASH_COLUMN).unwrap_or_default()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// Parse export text into records, preserving row order.
///
/// The first line is the header. Quoted fields may contain commas and line
/// breaks. A data row whose width differs from the header's is a
/// `MalformedResponse`. Blank input yields no records.
pub fn normalize_export(text: &str) -> Result<Vec<LeadExportRecord>, ApiError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.trim().as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ApiError::MalformedResponse(format!("invalid CSV header: {e}")))?
        .clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| ApiError::MalformedResponse(format!("invalid CSV row: {e}")))?;
        if row.len() != headers.len() {
            let line = row.position().map(|p| p.line()).unwrap_or_default();
            return Err(ApiError::MalformedResponse(format!(
                "CSV row on line {line} has {} fields, header has {}",
                row.len(),
                headers.len()
            )));
        }
        records.push(normalize_row(&headers, &row)?);
    }
    Ok(records)
}

fn normalize_row(
    headers: &csv::StringRecord,
    row: &csv::StringRecord,
) -> Result<LeadExportRecord, ApiError> {
    // Repeated column names keep the last value, at the first position.
    let mut fields = Map::new();
    for (column, value) in headers.iter().zip(row.iter()) {
        fields.insert(column.to_string(), Value::String(value.to_string()));
    }

    let hashed: Vec<&Value> = fields
        .iter()
        .filter(|(column, _)| *column != HASH_COLUMN && *column != EMAIL_STATUS_COLUMN)
        .map(|(_, value)| value)
        .collect();
    let hash = content_hash(&hashed)?;

    let mut record: Map<String, Value> = fields
        .into_iter()
        .filter(|(column, _)| column != EMAIL_STATUS_COLUMN)
        .collect();
    record.insert(HASH_COLUMN.to_string(), Value::String(hash));
    Ok(LeadExportRecord(record))
}

/// Lowercase hex MD5 of `values` serialized as a JSON list.
pub fn content_hash<T: Serialize + ?Sized>(values: &T) -> Result<String, ApiError> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, AsciiListFormatter);
    values
        .serialize(&mut serializer)
        .map_err(|e| ApiError::Serialization(e.to_string()))?;
    Ok(hex::encode(Md5::digest(&buf)))
}

/// Compact JSON with `", "` between list items and only printable ASCII in
/// strings.
struct AsciiListFormatter;

impl Formatter for AsciiListFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if fragment.bytes().all(|b| (0x20..0x7f).contains(&b)) {
            return CompactFormatter.write_string_fragment(writer, fragment);
        }
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if (' '..='~').contains(&ch) {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}
