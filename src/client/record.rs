//! Response record model for the frequency lookup service.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Population codes returned by the service, in output-column order.
pub const POPULATION_CODES: [&str; 12] = [
    "EUR", "AFO", "EAS", "AFA", "LAC", "LEN", "OAS", "SAS", "OTR", "AFR", "ASN", "TOT",
];

/// One successfully parsed lookup result: the echoed identifier (without the
/// chromosome prefix) plus one display-ready cell per population code,
/// aligned with [`POPULATION_CODES`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyRecord {
    key: String,
    cells: Vec<String>,
}

#[derive(Deserialize)]
struct RawRecord {
    chrom_pos_ref_alt: String,
    #[serde(flatten)]
    populations: HashMap<String, Value>,
}

impl FrequencyRecord {
    /// Parses one element of the service's JSON array body. Fails when the
    /// element is not an object carrying a string `chrom_pos_ref_alt` key.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let raw: RawRecord = serde_json::from_value(value)?;
        let cells = POPULATION_CODES
            .iter()
            .map(|code| {
                raw.populations
                    .get(*code)
                    .map(render_cell)
                    .unwrap_or_default()
            })
            .collect();
        Ok(Self {
            key: raw.chrom_pos_ref_alt,
            cells,
        })
    }

    #[cfg(test)]
    pub fn for_tests(key: impl Into<String>, cells: Vec<String>) -> Self {
        Self {
            key: key.into(),
            cells,
        }
    }

    /// Normalized identifier this record annotates.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Cells aligned with [`POPULATION_CODES`]; absent values are empty.
    pub fn cells(&self) -> &[String] {
        &self.cells
    }
}

// Passthrough rendering: the service mixes numbers, strings, and nulls, and
// the output table carries whatever it sent.
fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    }
}
