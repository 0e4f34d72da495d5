//! Loading, decoding, filtering and summarising epidemiological case records.
//!
//! The pipeline is: [`load`] the raw CSV, [`normalize`] coded columns into labels (both done by
//! [`Dataset::load`], and cached per file by [`load_cached`]), narrow the rows down with a
//! [`PredicateSet`], then summarise what's left with the functions in [`aggregate`].
pub mod aggregate;
pub mod cache;
pub mod cli;
pub mod codes;
mod config;
pub mod correlation;
mod error;
pub mod filter;
mod range;
mod table;
mod util;

use qu::ick_use::*;
use std::{fs, io, path::Path, sync::Arc};

pub use crate::{
    aggregate::{
        age_histogram, disease_prevalence, percentage, rate, time_series, value_counts,
        AgeHistogram, DiseaseCount, TimeSeries, ValueCounts,
    },
    cache::{load_cached, DatasetCache},
    codes::{normalize, CodeDictionary},
    config::Config,
    correlation::{
        correlation_features, correlation_matrix, CorrelationMatrix, CorrelationPair,
        CorrelationSummary, FeatureSelection, Strength,
    },
    error::{DataSourceError, Error},
    filter::{Predicate, PredicateSet},
    range::{Range, RangeSet, RangeSetCountsWithMissing},
    table::{Cell, Record, Table},
    util::{header, RowWindow, DEFAULT_MAX_ROWS},
};

pub type ArcStr = Arc<str>;
pub type Result<T = (), E = Error> = std::result::Result<T, E>;

pub const SEX: &str = "SEX";
pub const AGE: &str = "AGE";
pub const NATIONALITY: &str = "NATIONALITY";
pub const OUTCOME: &str = "OUTCOME";
pub const ICU: &str = "ICU";
pub const INTUBATED: &str = "INTUBATED";
pub const HOSPITALIZED: &str = "HOSPITALIZED";
pub const PREGNANCY: &str = "PREGNANCY";
pub const SPEAKS_NATIVE_LANGUAGE: &str = "SPEAKS_NATIVE_LANGUAGE";
pub const TOBACCO: &str = "TOBACCO";
/// Contact with another case.
pub const ANOTHER_CASE: &str = "ANOTHER CASE";
pub const ADMISSION_DATE: &str = "ADMISSION DATE";
pub const DATE_OF_DEATH: &str = "DATE_OF_DEATH";

pub const DIABETES: &str = "DIABETES";
pub const COPD: &str = "COPD";
pub const ASTHMA: &str = "ASTHMA";
/// Immunosuppression.
pub const INMUSUPR: &str = "INMUSUPR";
pub const HYPERTENSION: &str = "HYPERTENSION";
pub const PNEUMONIA: &str = "PNEUMONIA";
pub const CARDIOVASCULAR: &str = "CARDIOVASCULAR";
pub const OBESITY: &str = "OBESITY";
pub const CHRONIC_KIDNEY: &str = "CHRONIC_KIDNEY";
pub const OTHER_DISEASE: &str = "OTHER_DISEASE";

/// The disease indicator columns, in display order.
pub const DISEASE_COLUMNS: [&str; 11] = [
    DIABETES,
    COPD,
    ASTHMA,
    INMUSUPR,
    HYPERTENSION,
    PNEUMONIA,
    CARDIOVASCULAR,
    OBESITY,
    CHRONIC_KIDNEY,
    TOBACCO,
    OTHER_DISEASE,
];

/// Columns every data source must have.
pub const REQUIRED_COLUMNS: [&str; 4] = [SEX, AGE, NATIONALITY, OUTCOME];

/// Read the raw case records at `path`.
///
/// Returns the table as read (column names upper-cased, nothing decoded) and the disease
/// indicator columns.
pub fn load(path: impl AsRef<Path>) -> Result<(Table, &'static [&'static str])> {
    fn inner(path: &Path) -> Result<(Table, &'static [&'static str])> {
        event!(Level::INFO, "loading case records from \"{}\"", path.display());
        let file = fs::File::open(path).map_err(|source| DataSourceError::Io {
            path: path.to_owned(),
            source,
        })?;
        load_from_reader(io::BufReader::new(file))
    }
    inner(path.as_ref())
}

/// Like [`load`], from anything readable.
pub fn load_from_reader(reader: impl io::Read) -> Result<(Table, &'static [&'static str])> {
    let table = Table::from_csv(reader)?;
    if let Some(column) = REQUIRED_COLUMNS.iter().find(|c| !table.has_column(c)) {
        return Err(DataSourceError::MissingColumn(*column).into());
    }
    event!(
        Level::INFO,
        "loaded {} case records with {} columns",
        table.len(),
        table.column_names().count()
    );
    Ok((table, &DISEASE_COLUMNS))
}

/// The decoded case records, ready for filtering.
#[derive(Debug, Clone)]
pub struct Dataset {
    table: Table,
}

impl Dataset {
    /// Load and decode the case records at `path`. See also [`load_cached`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let (table, _) = load(path)?;
        Ok(Self::from_raw(&table))
    }

    pub fn from_reader(reader: impl io::Read) -> Result<Self> {
        let (table, _) = load_from_reader(reader)?;
        Ok(Self::from_raw(&table))
    }

    /// Decode a raw table.
    pub fn from_raw(table: &Table) -> Self {
        Dataset {
            table: normalize(table),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn disease_columns(&self) -> &'static [&'static str] {
        &DISEASE_COLUMNS
    }

    /// The disease columns this data source actually has, in display order.
    pub fn available_diseases(&self) -> Vec<&'static str> {
        DISEASE_COLUMNS
            .iter()
            .copied()
            .filter(|name| self.table.has_column(name))
            .collect()
    }

    /// Choices for a selector on `column`.
    pub fn options(&self, column: &str) -> Result<Vec<&str>> {
        self.table.options(column)
    }

    /// The rows matching every predicate. Shares records with the dataset.
    pub fn filter(&self, predicates: &PredicateSet) -> Result<Table> {
        let filtered = predicates.apply(&self.table)?;
        if filtered.is_empty() {
            event!(Level::INFO, "no case records match the selected filters");
        }
        Ok(filtered)
    }
}
