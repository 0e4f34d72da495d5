//! Pairwise correlation between yes/no indicator columns.
use noisy_float::prelude::*;
use qu::ick_use::*;
use statrs::statistics::Statistics;
use std::{cmp::Reverse, fmt};
use term_data_table as tdt;

use crate::{
    codes::{NO, YES},
    table::{Cell, Table},
    ArcStr, Error, Result, DISEASE_COLUMNS, ICU,
};

/// |r| at or above this is a strong correlation.
pub const STRONG: f64 = 0.5;
/// |r| at or above this (and below [`STRONG`]) is a moderate correlation.
pub const MODERATE: f64 = 0.3;

/// The columns to correlate. There are always at least two, all different.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSelection {
    columns: Vec<ArcStr>,
}

impl FeatureSelection {
    pub fn new<I>(columns: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut selected: Vec<ArcStr> = vec![];
        for column in columns {
            let column = column.as_ref();
            if !selected.iter().any(|c| &**c == column) {
                selected.push(column.into());
            }
        }
        if selected.len() < 2 {
            return Err(Error::UndefinedAggregation(
                "correlation needs at least 2 columns",
            ));
        }
        Ok(FeatureSelection { columns: selected })
    }

    /// Like [`FeatureSelection::new`], but every column must be one of
    /// [`correlation_features`].
    pub fn correlatable<I>(columns: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let columns = columns.into_iter().collect::<Vec<_>>();
        if let Some(column) = columns
            .iter()
            .map(|c| c.as_ref())
            .find(|c| !correlation_features().any(|f| f == *c))
        {
            return Err(Error::UnknownColumn(column.into()));
        }
        Self::new(columns)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|c| &**c)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }
}

/// Columns that can be picked for the correlation matrix: every disease, plus ICU.
pub fn correlation_features() -> impl Iterator<Item = &'static str> {
    DISEASE_COLUMNS.iter().copied().chain([ICU])
}

fn binary(cell: &Cell) -> Option<f64> {
    if cell.is_label(YES) {
        Some(1.)
    } else if cell.is_label(NO) {
        Some(0.)
    } else {
        None
    }
}

/// Pearson's r over the rows where both values are present.
///
/// `None` when there are fewer than 2 such rows or either side doesn't vary.
fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<R64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = xs
        .iter()
        .zip(ys.iter())
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip();
    if xs.len() < 2 {
        return None;
    }
    let (sx, sy) = (xs.iter().std_dev(), ys.iter().std_dev());
    if !(sx > 0. && sy > 0.) {
        return None;
    }
    let r = xs.iter().covariance(ys.iter()) / (sx * sy);
    R64::try_new(r.clamp(-1., 1.))
}

/// A symmetric matrix of correlation coefficients.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    features: FeatureSelection,
    /// Row-major, `None` where the coefficient is undefined.
    coefficients: Vec<Option<R64>>,
    threshold: f64,
}

/// Correlate every pair of `features`, reading "YES" as 1 and "NO" as 0.
///
/// Other values are left out, pair by pair. Coefficients with a magnitude below `threshold`
/// are hidden when reporting (see [`CorrelationMatrix::reported`]).
pub fn correlation_matrix(
    table: &Table,
    features: &FeatureSelection,
    threshold: f64,
) -> Result<CorrelationMatrix> {
    if !(0. ..=1.).contains(&threshold) {
        return Err(Error::UndefinedAggregation(
            "correlation threshold must be between 0 and 1",
        ));
    }
    let encoded = features
        .iter()
        .map(|name| Ok(table.column(name)?.map(binary).collect::<Vec<_>>()))
        .collect::<Result<Vec<_>>>()?;

    let n = features.len();
    let mut coefficients = vec![None; n * n];
    for i in 0..n {
        for j in i..n {
            let r = if i == j {
                // a column always correlates perfectly with itself, if it varies
                pearson(&encoded[i], &encoded[i]).map(|_| r64(1.))
            } else {
                pearson(&encoded[i], &encoded[j])
            };
            coefficients[i * n + j] = r;
            coefficients[j * n + i] = r;
        }
    }
    event!(
        Level::DEBUG,
        "correlated {} features over {} rows",
        n,
        table.len()
    );
    Ok(CorrelationMatrix {
        features: features.clone(),
        coefficients,
        threshold,
    })
}

impl CorrelationMatrix {
    pub fn features(&self) -> &FeatureSelection {
        &self.features
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// The coefficient between features `i` and `j`, regardless of the threshold.
    pub fn coefficient(&self, i: usize, j: usize) -> Option<f64> {
        let n = self.features.len();
        assert!(i < n && j < n, "feature index out of range");
        self.coefficients[i * n + j].map(|r| r.raw())
    }

    /// The coefficient as shown: off the diagonal, anything weaker than the threshold is hidden.
    pub fn reported(&self, i: usize, j: usize) -> Option<f64> {
        let r = self.coefficient(i, j)?;
        (i == j || r.abs() >= self.threshold).then_some(r)
    }

    /// Pairs that survive the threshold, strongest first.
    pub fn strongest_pairs(&self) -> Vec<CorrelationPair> {
        let names = self.features.columns.as_slice();
        let n = names.len();
        let mut pairs = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .filter_map(|(i, j)| {
                let r = self.reported(i, j)?;
                Some(CorrelationPair {
                    first: names[i].clone(),
                    second: names[j].clone(),
                    coefficient: r,
                })
            })
            .collect::<Vec<_>>();
        pairs.sort_by_key(|pair| Reverse(r64(pair.coefficient.abs())));
        pairs
    }

    /// How many pairs are strong or moderate.
    pub fn summary(&self) -> CorrelationSummary {
        let mut summary = CorrelationSummary::default();
        for pair in self.strongest_pairs() {
            let r = pair.coefficient.abs();
            if r >= STRONG {
                summary.strong += 1;
            } else if r >= MODERATE {
                summary.moderate += 1;
            }
        }
        summary
    }

    pub fn term_table(&self) -> tdt::Table {
        use tdt::{Cell, Row, Table};
        let header = self
            .features
            .iter()
            .fold(Row::new().with_cell(Cell::from("")), |row, name| {
                row.with_cell(Cell::from(name.to_string()))
            });
        let mut table = Table::new().with_row(header);
        for (i, name) in self.features.iter().enumerate() {
            let mut row = Row::new().with_cell(Cell::from(name.to_string()));
            for j in 0..self.features.len() {
                let text = match self.reported(i, j) {
                    Some(r) => format!("{:.2}", r),
                    None => String::new(),
                };
                row = row.with_cell(Cell::from(text));
            }
            table.add_row(row);
        }
        table
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Strength {
    Strong,
    Moderate,
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Strength::Strong => "Strong",
            Strength::Moderate => "Moderate",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationPair {
    pub first: ArcStr,
    pub second: ArcStr,
    pub coefficient: f64,
}

impl CorrelationPair {
    pub fn strength(&self) -> Strength {
        if self.coefficient.abs() >= STRONG {
            Strength::Strong
        } else {
            Strength::Moderate
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CorrelationSummary {
    pub strong: usize,
    pub moderate: usize,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{codes::normalize, ASTHMA, COPD, DIABETES, OBESITY, PNEUMONIA};

    fn table(csv: &str) -> Table {
        normalize(&Table::from_csv(csv.as_bytes()).unwrap())
    }

    fn cases() -> Table {
        table(
            "DIABETES,PNEUMONIA,ICU,ASTHMA\n\
             1,1,2,2\n\
             1,1,1,2\n\
             2,2,2,2\n\
             2,2,1,2\n\
             1,2,98,2\n\
             2,1,2,2\n",
        )
    }

    #[test]
    fn needs_two_features() {
        assert!(matches!(
            FeatureSelection::new([DIABETES]),
            Err(Error::UndefinedAggregation(_))
        ));
        assert!(matches!(
            FeatureSelection::new([DIABETES, DIABETES]),
            Err(Error::UndefinedAggregation(_))
        ));
        assert!(FeatureSelection::new(Vec::<String>::new()).is_err());
        assert_eq!(FeatureSelection::new([DIABETES, ICU]).unwrap().len(), 2);
    }

    #[test]
    fn only_indicator_columns() {
        assert!(matches!(
            FeatureSelection::correlatable([DIABETES, "AGE"]),
            Err(Error::UnknownColumn(name)) if &*name == "AGE"
        ));
        assert!(matches!(
            FeatureSelection::correlatable([ICU]),
            Err(Error::UndefinedAggregation(_))
        ));
        let features = FeatureSelection::correlatable([DIABETES, ICU]).unwrap();
        assert_eq!(features.iter().collect::<Vec<_>>(), vec![DIABETES, ICU]);
    }

    #[test]
    fn symmetric_with_unit_diagonal() {
        let features = FeatureSelection::new([DIABETES, PNEUMONIA, ICU, ASTHMA]).unwrap();
        let m = correlation_matrix(&cases(), &features, 0.).unwrap();
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(m.coefficient(i, j), m.coefficient(j, i));
            }
        }
        assert_eq!(m.coefficient(0, 0), Some(1.));
        assert_eq!(m.coefficient(2, 2), Some(1.));
        // ASTHMA never varies
        assert_eq!(m.coefficient(3, 3), None);
        assert_eq!(m.coefficient(0, 3), None);

        // DIABETES vs PNEUMONIA: 1,1,0,0,1,0 against 1,1,0,0,0,1
        let r = m.coefficient(0, 1).unwrap();
        assert!((r - 1. / 3.).abs() < 1e-9, "r = {}", r);
    }

    #[test]
    fn threshold_masks_off_diagonal() {
        let features = FeatureSelection::new([DIABETES, PNEUMONIA, ICU]).unwrap();
        let m = correlation_matrix(&cases(), &features, 0.5).unwrap();
        assert_eq!(m.reported(0, 1), None);
        assert!(m.coefficient(0, 1).is_some());
        assert_eq!(m.reported(1, 1), Some(1.));
        assert!(m.strongest_pairs().is_empty());
        assert_eq!(m.summary(), CorrelationSummary::default());

        assert!(correlation_matrix(&cases(), &features, 1.5).is_err());
    }

    #[test]
    fn pairs_sorted_by_magnitude() {
        let t = table(
            "COPD,OBESITY,ASTHMA\n\
             1,1,2\n\
             1,1,1\n\
             2,2,1\n\
             2,2,2\n\
             1,2,1\n",
        );
        let features = FeatureSelection::new([COPD, OBESITY, ASTHMA]).unwrap();
        let m = correlation_matrix(&t, &features, 0.1).unwrap();
        let pairs = m.strongest_pairs();
        assert!(!pairs.is_empty());
        for w in pairs.windows(2) {
            assert!(w[0].coefficient.abs() >= w[1].coefficient.abs());
        }
        assert_eq!((&*pairs[0].first, &*pairs[0].second), (COPD, OBESITY));
        assert_eq!(pairs[0].strength(), Strength::Strong);
        assert!(m.summary().strong >= 1);
    }

    #[test]
    fn unknown_feature() {
        let features = FeatureSelection::new([DIABETES, "HEART"]).unwrap();
        assert!(matches!(
            correlation_matrix(&cases(), &features, 0.1),
            Err(Error::UnknownColumn(_))
        ));
    }
}
