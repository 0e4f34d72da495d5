//! Summaries of a (possibly filtered) table.
//!
//! Everything here only reads the table it is given.
use chrono::{NaiveDateTime, Timelike};
use noisy_float::prelude::*;
use once_cell::sync::Lazy;
use qu::ick_use::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use term_data_table as tdt;

use crate::{
    codes::YES,
    filter::Predicate,
    range::{RangeSet, RangeSetCountsWithMissing},
    table::Table,
    util, ArcStr, DataSourceError, Error, Result, AGE,
};

/// Ten-year age groups from 0 to 100.
pub static AGE_GROUPS: Lazy<RangeSet<R64>> = Lazy::new(|| {
    let edges = (0..=100).step_by(10).map(|v| r64(v as f64)).collect::<Vec<_>>();
    RangeSet::from_edges(
        &edges,
        &[
            "0-10", "11-20", "21-30", "31-40", "41-50", "51-60", "61-70", "71-80", "81-90",
            "91-100",
        ],
    )
});

pub type AgeHistogram = RangeSetCountsWithMissing<R64>;

/// Count subjects per age group.
///
/// Ages that are missing, aren't numbers, or fall outside 0 to 100 are counted as missing data.
pub fn age_histogram(table: &Table) -> Result<AgeHistogram> {
    let ages = table
        .column(AGE)?
        .map(|cell| cell.as_str().and_then(util::parse_number));
    Ok(AGE_GROUPS.clone().bucket_values_with_missing(ages))
}

/// `100 * part / whole`, refusing an empty whole.
pub fn percentage(part: usize, whole: usize) -> Result<f64> {
    if whole == 0 {
        return Err(Error::UndefinedAggregation("percentage of an empty set"));
    }
    Ok(part as f64 / whole as f64 * 100.)
}

/// The percentage of rows where `column` is `label`.
pub fn rate(table: &Table, column: &str, label: &str) -> Result<f64> {
    let matching = table
        .column(column)?
        .filter(|cell| cell.as_str() == Some(label))
        .count();
    percentage(matching, table.len())
}

/// How often each label occurs in a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCounts {
    column: ArcStr,
    /// Number of rows, including ones where the column was missing.
    rows: usize,
    /// Sorted by count, most common first, then by label.
    counts: Vec<(ArcStr, usize)>,
}

/// Count the non-missing labels in `column`.
pub fn value_counts(table: &Table, column: &str) -> Result<ValueCounts> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in table.column(column)?.filter_map(|cell| cell.as_str()) {
        *counts.entry(value).or_default() += 1;
    }
    let mut counts = counts
        .into_iter()
        .map(|(label, count)| (ArcStr::from(label), count))
        .collect::<Vec<_>>();
    counts.sort_by(|(l1, c1), (l2, c2)| c2.cmp(c1).then_with(|| l1.cmp(l2)));
    Ok(ValueCounts {
        column: column.into(),
        rows: table.len(),
        counts,
    })
}

impl ValueCounts {
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.counts.iter().map(|(label, count)| (&**label, *count))
    }

    pub fn get(&self, label: &str) -> usize {
        self.iter()
            .find(|(l, _)| *l == label)
            .map(|(_, count)| count)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Each label's count as a percentage of all rows, missing ones included.
    pub fn shares(&self) -> Result<Vec<(&str, usize, f64)>> {
        self.iter()
            .map(|(label, count)| Ok((label, count, percentage(count, self.rows)?)))
            .collect()
    }

    pub fn term_table(&self) -> tdt::Table {
        use tdt::{Cell, Row, Table};
        let mut table = Table::new().with_row(
            Row::new()
                .with_cell(Cell::from(self.column.to_string()))
                .with_cell(Cell::from("Count")),
        );
        for (label, count) in self.iter() {
            table.add_row(
                Row::new()
                    .with_cell(Cell::from(label.to_string()))
                    .with_cell(Cell::from(count.to_string())),
            );
        }
        table
    }

    /// Like [`term_table`](Self::term_table), with each label's share of the rows.
    pub fn term_table_with_shares(&self) -> Result<tdt::Table> {
        use tdt::{Cell, Row, Table};
        let mut table = Table::new().with_row(
            Row::new()
                .with_cell(Cell::from(self.column.to_string()))
                .with_cell(Cell::from("Percentage"))
                .with_cell(Cell::from("Count")),
        );
        for (label, count, share) in self.shares()? {
            table.add_row(
                Row::new()
                    .with_cell(Cell::from(label.to_string()))
                    .with_cell(Cell::from(format!("{:.1}%", share)))
                    .with_cell(Cell::from(count.to_string())),
            );
        }
        Ok(table)
    }
}

/// The number of subjects with a disease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiseaseCount {
    pub disease: ArcStr,
    pub count: usize,
}

/// For each disease, the number of rows where it is "YES", in the order of `diseases`.
///
/// With `subset`, only rows matching it are counted (e.g. [`Predicate::deceased`]).
pub fn disease_prevalence(
    table: &Table,
    diseases: &[&str],
    subset: Option<&Predicate>,
) -> Result<Vec<DiseaseCount>> {
    let subset = subset.map(|p| p.bind(table)).transpose()?;
    let columns = diseases
        .iter()
        .map(|name| table.column_index(name))
        .collect::<Result<Vec<_>>>()?;

    let mut counts = vec![0usize; diseases.len()];
    for record in table.iter() {
        if let Some(subset) = &subset {
            if !subset.test(record)? {
                continue;
            }
        }
        for (count, idx) in counts.iter_mut().zip(columns.iter()) {
            if record[*idx].is_label(YES) {
                *count += 1;
            }
        }
    }
    Ok(diseases
        .iter()
        .zip(counts)
        .map(|(disease, count)| DiseaseCount {
            disease: (*disease).into(),
            count,
        })
        .collect())
}

/// Counts of a category per timestamp, e.g. pneumonia cases per admission date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeries {
    category: ArcStr,
    /// Every label seen, sorted.
    labels: Vec<ArcStr>,
    /// One count per label, sorted by timestamp.
    rows: Vec<(NaiveDateTime, Vec<usize>)>,
}

/// Group rows by the timestamp in `date_column` and count the labels of `category_column` at
/// each one.
///
/// Values are grouped exactly as recorded, so two times on the same day are separate rows and a
/// bare date is midnight. Rows with no date or no category are skipped. A date that can't be
/// parsed is an error.
pub fn time_series(table: &Table, date_column: &str, category_column: &str) -> Result<TimeSeries> {
    let date_idx = table.column_index(date_column)?;
    let category_idx = table.column_index(category_column)?;

    let mut by_date: BTreeMap<NaiveDateTime, BTreeMap<&str, usize>> = BTreeMap::new();
    let mut skipped = 0usize;
    for record in table.iter() {
        let (Some(date), Some(category)) =
            (record[date_idx].as_str(), record[category_idx].as_str())
        else {
            skipped += 1;
            continue;
        };
        let date = util::parse_timestamp(date).ok_or_else(|| DataSourceError::InvalidDate {
            column: date_column.into(),
            value: date.into(),
        })?;
        *by_date.entry(date).or_default().entry(category).or_default() += 1;
    }
    if skipped > 0 {
        event!(
            Level::DEBUG,
            "skipped {} rows without a {} or {}",
            skipped,
            date_column,
            category_column
        );
    }

    let labels = by_date
        .values()
        .flat_map(|counts| counts.keys().copied())
        .collect::<BTreeSet<_>>();
    let rows = by_date
        .iter()
        .map(|(date, counts)| {
            let counts = labels
                .iter()
                .map(|label| counts.get(label).copied().unwrap_or(0))
                .collect();
            (*date, counts)
        })
        .collect();
    Ok(TimeSeries {
        category: category_column.into(),
        labels: labels.into_iter().map(ArcStr::from).collect(),
        rows,
    })
}

impl TimeSeries {
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.labels.iter().map(|label| &**label)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.rows.iter().map(|(date, _)| *date)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The count for a label at a timestamp. Timestamps and labels that were never seen are
    /// `None`.
    pub fn get(&self, at: NaiveDateTime, label: &str) -> Option<usize> {
        let col = self.labels.iter().position(|l| &**l == label)?;
        let row = self.rows.binary_search_by_key(&at, |(t, _)| *t).ok()?;
        Some(self.rows[row].1[col])
    }

    pub fn term_table(&self) -> tdt::Table {
        use tdt::{Cell, Row, Table};
        let header = self.labels.iter().fold(
            Row::new().with_cell(Cell::from("Date")),
            |row, label| row.with_cell(Cell::from(label.to_string())),
        );
        let mut table = Table::new().with_row(header);
        for (at, counts) in self.rows.iter() {
            let at = if at.num_seconds_from_midnight() == 0 {
                at.date().to_string()
            } else {
                at.to_string()
            };
            table.add_row(counts.iter().fold(
                Row::new().with_cell(Cell::from(at)),
                |row, count| row.with_cell(Cell::from(count.to_string())),
            ));
        }
        table
    }
}
