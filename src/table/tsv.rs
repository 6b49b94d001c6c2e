//! In-memory model for tab-separated tables with a header row.

use anyhow::Result;

/// Errors raised while reading the input table. All of them are fatal and
/// surface before any network activity.
#[derive(Debug)]
pub enum TableError {
    Empty,
    RaggedRow { line: usize, expected: usize, found: usize },
    MissingColumn { name: &'static str },
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::Empty => write!(f, "input table has no header row"),
            TableError::RaggedRow {
                line,
                expected,
                found,
            } => write!(
                f,
                "row at line {line} has {found} fields, header has {expected}"
            ),
            TableError::MissingColumn { name } => {
                write!(f, "input table is missing required column {name}")
            }
        }
    }
}

impl std::error::Error for TableError {}

/// A parsed tab-separated table: one header row plus zero or more data rows,
/// all with the same field count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Parses tab-separated text. The first non-empty content is the header;
    /// a trailing newline is tolerated, interior blank lines are not rows.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        let header: Vec<String> = match lines.next() {
            Some(line) if !line.is_empty() => split_fields(line),
            _ => return Err(TableError::Empty.into()),
        };

        let mut rows = Vec::new();
        for (offset, line) in lines.enumerate() {
            if line.is_empty() {
                continue;
            }
            let fields = split_fields(line);
            if fields.len() != header.len() {
                return Err(TableError::RaggedRow {
                    line: offset + 2,
                    expected: header.len(),
                    found: fields.len(),
                }
                .into());
            }
            rows.push(fields);
        }

        Ok(Self { header, rows })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of a column by exact header name.
    pub fn column_index(&self, name: &'static str) -> Result<usize> {
        self.header
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| TableError::MissingColumn { name }.into())
    }

    /// Appends new columns, filling existing rows via `fill`, which receives
    /// the row and must return exactly `columns.len()` cells.
    pub fn append_columns<F>(&mut self, columns: Vec<String>, mut fill: F)
    where
        F: FnMut(&[String]) -> Vec<String>,
    {
        let added = columns.len();
        self.header.extend(columns);
        for row in &mut self.rows {
            let mut cells = fill(row);
            debug_assert_eq!(cells.len(), added);
            cells.resize(added, String::new());
            row.extend(cells);
        }
    }

    /// Serializes the table back to tab-separated text with a trailing newline.
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.header.join("\t"));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.join("\t"));
            out.push('\n');
        }
        out
    }
}

fn split_fields(line: &str) -> Vec<String> {
    line.split('\t').map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_rows() {
        let table = Table::parse("A\tB\n1\t2\n3\t4\n").unwrap();
        assert_eq!(table.header(), ["A", "B"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[1], ["3", "4"]);
    }

    #[test]
    fn round_trips_through_tsv() {
        let text = "A\tB\tC\nx\ty\tz\n";
        let table = Table::parse(text).unwrap();
        assert_eq!(table.to_tsv(), text);
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = Table::parse("").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TableError>(),
            Some(TableError::Empty)
        ));
    }

    #[test]
    fn ragged_row_reports_line_number() {
        let err = Table::parse("A\tB\n1\t2\n3\n").unwrap_err();
        match err.downcast_ref::<TableError>() {
            Some(TableError::RaggedRow {
                line,
                expected,
                found,
            }) => {
                assert_eq!(*line, 3);
                assert_eq!(*expected, 2);
                assert_eq!(*found, 1);
            }
            other => panic!("expected RaggedRow, got {other:?}"),
        }
    }

    #[test]
    fn missing_column_is_reported_by_name() {
        let table = Table::parse("A\tB\n1\t2\n").unwrap();
        let err = table.column_index("CHROM_POS_REF_ALT").unwrap_err();
        assert!(
            format!("{err}").contains("CHROM_POS_REF_ALT"),
            "error should name the missing column"
        );
    }

    #[test]
    fn append_columns_extends_header_and_rows() {
        let mut table = Table::parse("A\n1\n2\n").unwrap();
        table.append_columns(vec!["B".into(), "C".into()], |row| {
            vec![format!("{}b", row[0]), format!("{}c", row[0])]
        });
        assert_eq!(table.header(), ["A", "B", "C"]);
        assert_eq!(table.rows()[0], ["1", "1b", "1c"]);
        assert_eq!(table.rows()[1], ["2", "2b", "2c"]);
    }
}
