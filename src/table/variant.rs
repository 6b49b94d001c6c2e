//! Variant identifier normalization and extraction.
//!
//! Identifiers live in the `CHROM_POS_REF_ALT` column as
//! `chr<chrom>_<pos>_<ref>_<alt>`; the lookup service expects them without
//! the `chr` prefix. Normalization strips the prefix only when present so the
//! merge can re-derive the match key from any row value losslessly.

use crate::table::tsv::Table;
use anyhow::Result;
use std::collections::HashSet;

/// Header name of the identifier column. Fixed external contract.
pub const VARIANT_KEY_COLUMN: &str = "CHROM_POS_REF_ALT";

const CHROMOSOME_PREFIX: &str = "chr";

/// Strips the chromosome prefix when present; values without it pass through.
pub fn normalize_key(value: &str) -> &str {
    value.strip_prefix(CHROMOSOME_PREFIX).unwrap_or(value)
}

/// Distinct normalized identifiers in first-seen order. Empty cells are
/// skipped; a missing identifier column is a fatal input error.
pub fn extract_unique_keys(table: &Table) -> Result<Vec<String>> {
    let column = table.column_index(VARIANT_KEY_COLUMN)?;

    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for row in table.rows() {
        let value = row[column].trim();
        if value.is_empty() {
            continue;
        }
        let key = normalize_key(value);
        if seen.insert(key.to_owned()) {
            keys.push(key.to_owned());
        }
    }

    Ok(keys)
}
