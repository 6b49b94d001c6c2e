//! Left join of fetched frequency records onto the original table.

use crate::client::record::{FrequencyRecord, POPULATION_CODES};
use crate::table::tsv::Table;
use crate::table::variant::{normalize_key, VARIANT_KEY_COLUMN};
use anyhow::Result;
use std::collections::HashMap;

/// Prefix applied to every appended frequency column.
pub const OUTPUT_COLUMN_PREFIX: &str = "ALFA_";

/// Appends one `ALFA_<CODE>` column per population code, populating rows
/// whose normalized identifier matches a record and leaving the rest empty.
///
/// Every original row and column is preserved; zero records simply produces
/// all-empty frequency columns.
pub fn merge_records(table: &mut Table, records: &[FrequencyRecord]) -> Result<()> {
    let key_column = table.column_index(VARIANT_KEY_COLUMN)?;

    let by_key: HashMap<&str, &FrequencyRecord> = records
        .iter()
        .map(|record| (record.key(), record))
        .collect();

    let columns = POPULATION_CODES
        .iter()
        .map(|code| format!("{OUTPUT_COLUMN_PREFIX}{code}"))
        .collect();

    table.append_columns(columns, |row| {
        let key = normalize_key(row[key_column].trim());
        match by_key.get(key) {
            Some(record) => record.cells().to_vec(),
            None => vec![String::new(); POPULATION_CODES.len()],
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, fill: &str) -> FrequencyRecord {
        FrequencyRecord::for_tests(key, vec![fill.to_owned(); POPULATION_CODES.len()])
    }

    #[test]
    fn matched_rows_get_cells_and_unmatched_stay_empty() {
        let mut table = Table::parse(
            "ID\tCHROM_POS_REF_ALT\n\
             a\tchr1_100_A_T\n\
             b\tchr2_200_G_C\n\
             c\tchr1_100_A_T\n",
        )
        .unwrap();

        merge_records(&mut table, &[record("1_100_A_T", "0.5")]).unwrap();

        assert_eq!(table.row_count(), 3);
        assert_eq!(table.header().len(), 2 + POPULATION_CODES.len());
        assert_eq!(table.header()[2], "ALFA_EUR");
        assert_eq!(table.rows()[0][2], "0.5");
        assert_eq!(table.rows()[1][2], "");
        assert_eq!(table.rows()[2][2], "0.5");
        // original columns untouched
        assert_eq!(table.rows()[1][..2], ["b".to_owned(), "chr2_200_G_C".to_owned()]);
    }

    #[test]
    fn zero_records_still_appends_empty_columns() {
        let mut table = Table::parse("CHROM_POS_REF_ALT\nchr1_1_A_T\n").unwrap();
        merge_records(&mut table, &[]).unwrap();
        assert_eq!(table.header().len(), 1 + POPULATION_CODES.len());
        assert!(table.rows()[0][1..].iter().all(|cell| cell.is_empty()));
    }

    #[test]
    fn join_matches_rows_without_chromosome_prefix() {
        let mut table = Table::parse("CHROM_POS_REF_ALT\n1_100_A_T\n").unwrap();
        merge_records(&mut table, &[record("1_100_A_T", "0.1")]).unwrap();
        assert_eq!(table.rows()[0][1], "0.1");
    }

    #[test]
    fn missing_key_column_fails_before_mutating() {
        let mut table = Table::parse("A\n1\n").unwrap();
        assert!(merge_records(&mut table, &[]).is_err());
        assert_eq!(table.header().len(), 1);
    }
}
