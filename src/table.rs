//! The in-memory case record table.
use qu::ick_use::*;
use std::{
    collections::{BTreeMap, HashSet},
    fmt, io,
    ops::Deref,
    sync::Arc,
};
use term_data_table as tdt;

use crate::{
    util::{self, RowWindow},
    ArcStr, DataSourceError, Error, Result,
};

/// A single value in the table.
///
/// Source text stays `Raw` until a code dictionary decodes it into a `Label`. Anything without
/// a value, or with a value no dictionary knows, is `Missing`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell {
    Raw(ArcStr),
    Label(&'static str),
    Missing,
}

impl Cell {
    /// Build a cell from CSV text, recognising the usual spellings of "no value".
    pub fn from_source(text: &str) -> Self {
        if util::is_null_token(text) {
            Cell::Missing
        } else {
            Cell::Raw(text.into())
        }
    }

    /// The text of the cell, whether decoded or not.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Raw(text) => Some(text),
            Cell::Label(label) => Some(label),
            Cell::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn is_label(&self, label: &str) -> bool {
        matches!(self, Cell::Label(l) if *l == label)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or(""))
    }
}

/// One case record. Cloning is cheap, so filtered tables share records with their source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record(Arc<[Cell]>);

impl Record {
    pub fn new(cells: impl IntoIterator<Item = Cell>) -> Self {
        Record(cells.into_iter().collect())
    }
}

impl Deref for Record {
    type Target = [Cell];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
struct Columns {
    names: Vec<ArcStr>,
    idx: BTreeMap<ArcStr, usize>,
}

/// The parsed case records, with a pre-built index of column names.
///
/// Column names are always upper case. Tables are immutable: filtering builds a new table
/// that shares column metadata and records with this one.
#[derive(Debug, Clone)]
pub struct Table {
    columns: Arc<Columns>,
    rows: Arc<Vec<Record>>,
}

impl Table {
    /// Build a table from column names and rows.
    ///
    /// # Panics
    ///
    /// Panics if a row doesn't have one cell per column, or if two columns share a name.
    pub fn new(names: impl IntoIterator<Item = impl AsRef<str>>, rows: Vec<Record>) -> Self {
        let names = names
            .into_iter()
            .map(|name| ArcStr::from(name.as_ref().trim().to_uppercase()))
            .collect::<Vec<_>>();
        let columns = match Columns::new(names) {
            Ok(columns) => columns,
            Err(e) => panic!("{}", e),
        };
        for row in rows.iter() {
            assert_eq!(row.len(), columns.names.len(), "row has the wrong number of cells");
        }
        Table {
            columns: Arc::new(columns),
            rows: Arc::new(rows),
        }
    }

    /// Read case records from CSV, with a header row.
    ///
    /// Header names are upper-cased so later lookups don't depend on the export's casing.
    pub fn from_csv(reader: impl io::Read) -> Result<Self, DataSourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let names = reader
            .headers()?
            .iter()
            .map(|name| ArcStr::from(name.to_uppercase()))
            .collect::<Vec<_>>();
        let columns = Columns::new(names)?;

        let mut rows = vec![];
        for record in reader.records() {
            let record = record?;
            rows.push(Record::new(record.iter().map(Cell::from_source)));
        }
        if rows.is_empty() {
            return Err(DataSourceError::Empty);
        }
        event!(
            Level::DEBUG,
            "read {} case records with {} columns",
            rows.len(),
            columns.names.len()
        );
        Ok(Table {
            columns: Arc::new(columns),
            rows: Arc::new(rows),
        })
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.names.iter().map(|name| &**name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.idx.contains_key(name)
    }

    /// The position of a column, or `UnknownColumn` if there isn't one with that name.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .idx
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownColumn(name.into()))
    }

    /// Iterate over the cells of a single column.
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Cell> + '_> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Distinct values in a column, in order of first appearance.
    ///
    /// Used to populate selectors, so missing values are left out.
    pub fn options(&self, name: &str) -> Result<Vec<&str>> {
        let mut seen = HashSet::new();
        Ok(self
            .column(name)?
            .filter_map(Cell::as_str)
            .filter(|value| seen.insert(*value))
            .collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        self.rows.iter()
    }

    /// A table with the same columns as this one and the given rows.
    pub(crate) fn with_rows(&self, rows: Vec<Record>) -> Self {
        Table {
            columns: self.columns.clone(),
            rows: Arc::new(rows),
        }
    }

    /// Do `self` and `other` share the same record storage.
    pub fn shares_rows(&self, other: &Table) -> bool {
        Arc::ptr_eq(&self.rows, &other.rows)
    }

    /// Show the table, leaving out the middle rows if there are more than `max_rows`.
    pub fn term_table(&self, max_rows: usize) -> tdt::Table {
        use tdt::{Cell, Row, Table};
        let mut header = Row::new().with_cell(Cell::from(""));
        for name in self.column_names() {
            header = header.with_cell(Cell::from(name.to_string()));
        }
        let mut table = Table::new().with_row(header);

        let window = RowWindow::new(self.len(), max_rows);
        let row = |idx: usize| {
            self.rows[idx].iter().fold(
                Row::new().with_cell(Cell::from(idx.to_string())),
                |row, cell| row.with_cell(Cell::from(cell.to_string())),
            )
        };
        for idx in window.head.clone() {
            table.add_row(row(idx));
        }
        if window.skipped() > 0 {
            let mut gap = Row::new();
            for _ in 0..=self.columns.names.len() {
                gap = gap.with_cell(Cell::from("..."));
            }
            table.add_row(gap);
        }
        for idx in window.tail.clone() {
            table.add_row(row(idx));
        }
        table
    }
}

impl Columns {
    fn new(names: Vec<ArcStr>) -> Result<Self, DataSourceError> {
        let mut idx = BTreeMap::new();
        for (i, name) in names.iter().enumerate() {
            if idx.insert(name.clone(), i).is_some() {
                return Err(DataSourceError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Columns { names, idx })
    }
}

impl Deref for Table {
    type Target = [Record];
    fn deref(&self) -> &Self::Target {
        &self.rows
    }
}

impl<'a> IntoIterator for &'a Table {
    type IntoIter = <&'a [Record] as IntoIterator>::IntoIter;
    type Item = &'a Record;
    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const CSV: &str = "\
sex,Age,nationality,outcome
1,34,1,1
2,,NA,2
99,71,1,97
";

    #[test]
    fn read_csv() {
        let table = Table::from_csv(CSV.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.column_names().collect::<Vec<_>>(),
            vec!["SEX", "AGE", "NATIONALITY", "OUTCOME"]
        );
        assert_eq!(table[0][1], Cell::Raw("34".into()));
        assert_eq!(table[1][1], Cell::Missing);
        assert_eq!(table[1][2], Cell::Missing);
    }

    #[test]
    fn malformed() {
        assert!(matches!(
            Table::from_csv("SEX,AGE\n".as_bytes()),
            Err(DataSourceError::Empty)
        ));
        assert!(matches!(
            Table::from_csv("".as_bytes()),
            Err(DataSourceError::Empty)
        ));
        assert!(matches!(
            Table::from_csv("SEX,AGE\n1,2,3\n".as_bytes()),
            Err(DataSourceError::Csv(_))
        ));
        assert!(matches!(
            Table::from_csv("sex,SEX\n1,2\n".as_bytes()),
            Err(DataSourceError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn columns() {
        let table = Table::from_csv(CSV.as_bytes()).unwrap();
        assert_eq!(table.column_index("OUTCOME").unwrap(), 3);
        assert!(matches!(
            table.column_index("ICU"),
            Err(Error::UnknownColumn(name)) if &*name == "ICU"
        ));
        assert_eq!(table.options("SEX").unwrap(), vec!["1", "2", "99"]);
        assert_eq!(table.options("NATIONALITY").unwrap(), vec!["1"]);
    }

    #[test]
    fn build() {
        let table = Table::new(
            [" sex", "icu "],
            vec![
                Record::new([Cell::Label("FEMALE"), Cell::Missing]),
                Record::new([Cell::Label("MALE"), Cell::Label("YES")]),
            ],
        );
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["SEX", "ICU"]);
        assert_eq!(table.options("ICU").unwrap(), vec!["YES"]);
        assert!(table.shares_rows(&table.clone()));
        assert!(!table.shares_rows(&table.with_rows(table.to_vec())));
    }

    #[test]
    #[should_panic]
    fn build_ragged() {
        Table::new(["SEX", "ICU"], vec![Record::new([Cell::Missing])]);
    }

    #[test]
    fn display_window() {
        let table = Table::from_csv(CSV.as_bytes()).unwrap();
        let text = table.term_table(2).to_string();
        assert!(text.contains("..."));
        assert!(text.contains("34"));
        assert!(text.contains("71"));
    }
}
