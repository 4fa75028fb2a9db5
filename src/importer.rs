use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::HashMap;

use crate::models::{slug_id, CollegeProfile};
use crate::store::CollegeStore;

/// Standard field names accepted by the importer. A column map translates
/// these to the CSV's own header names; unmapped fields fall back to a
/// same-named column.
const STANDARD_FIELDS: [&str; 13] = [
    "college_id",
    "name",
    "location",
    "latitude",
    "longitude",
    "programs",
    "tuition",
    "enrollment",
    "acceptance_rate",
    "avg_gpa",
    "avg_sat",
    "avg_act",
    "source_url",
];

/// Import competitor rows from a CSV file with a header row. Returns the
/// number of imported records. Rows without a usable name are skipped with
/// a warning; missing numeric cells stay unknown, never zero.
pub fn import_from_csv(
    file_path: &str,
    column_map: &HashMap<String, String>,
    store: &mut CollegeStore,
) -> Result<usize> {
    let mut reader = csv::Reader::from_path(file_path)
        .with_context(|| format!("Failed to open CSV file: {}", file_path))?;

    let headers = reader.headers()?.clone();
    let column_index = |field: &str| -> Option<usize> {
        let column = column_map
            .get(field)
            .map(|s| s.as_str())
            .unwrap_or(field);
        headers.iter().position(|h| h == column)
    };

    let indexes: HashMap<&str, usize> = STANDARD_FIELDS
        .iter()
        .filter_map(|field| column_index(field).map(|i| (*field, i)))
        .collect();

    fn field_value<'r>(
        record: &'r csv::StringRecord,
        indexes: &HashMap<&str, usize>,
        field: &str,
    ) -> Option<&'r str> {
        indexes
            .get(field)
            .and_then(|i| record.get(*i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    let mut imported = 0;
    for (row_number, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV row {}", row_number + 1))?;
        let cell = |field: &str| field_value(&record, &indexes, field);

        let name = match cell("name") {
            Some(name) => name.to_string(),
            None => {
                warn!("Skipping CSV row {}: no college name", row_number + 1);
                continue;
            }
        };

        let id = cell("college_id")
            .map(|s| s.to_string())
            .unwrap_or_else(|| slug_id(&name));

        let profile = CollegeProfile {
            id,
            name,
            location: cell("location").unwrap_or_default().to_string(),
            programs: cell("programs").map(parse_programs).unwrap_or_default(),
            latitude: parse_number(cell("latitude")),
            longitude: parse_number(cell("longitude")),
            tuition: parse_number(cell("tuition")),
            enrollment: cell("enrollment").and_then(|s| s.parse().ok()),
            acceptance_rate: parse_number(cell("acceptance_rate")),
            avg_gpa: parse_number(cell("avg_gpa")),
            avg_sat: parse_number(cell("avg_sat")),
            avg_act: parse_number(cell("avg_act")),
            source_url: cell("source_url").map(|s| s.to_string()),
        };

        store.add_competitor(profile);
        imported += 1;
    }

    info!("Imported {} competitor record(s) from {}", imported, file_path);
    Ok(imported)
}

/// Parse a programs cell: a JSON array when it looks like one, otherwise a
/// comma- or semicolon-separated list. Blank entries are dropped.
pub fn parse_programs(value: &str) -> Vec<String> {
    let value = value.trim();
    if value.is_empty() {
        return Vec::new();
    }

    if value.starts_with('[') && value.ends_with(']') {
        if let Ok(list) = serde_json::from_str::<Vec<String>>(value) {
            return list
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }
    }

    let separator = if value.contains(';') { ';' } else { ',' };
    value
        .split(separator)
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    value.and_then(|s| s.parse().ok())
}
