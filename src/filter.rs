//! Narrowing the case records down to a selection.
use chrono::NaiveDate;
use qu::ick_use::*;

use crate::{
    codes::YES,
    table::{Record, Table},
    util, ArcStr, DataSourceError, Result, DATE_OF_DEATH,
};

/// A single constraint on a decoded column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// The column has exactly this label.
    Equals { column: ArcStr, label: ArcStr },
    /// The disease column is "YES".
    HasCondition(ArcStr),
    /// The column has any value.
    Present(ArcStr),
    /// The column holds a date inside the range (both ends inclusive, open if `None`).
    ///
    /// Rows with no date are excluded. A value that isn't a date is a data error.
    DateRange {
        column: ArcStr,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

impl Predicate {
    pub fn equals(column: impl Into<ArcStr>, label: impl Into<ArcStr>) -> Self {
        Predicate::Equals {
            column: column.into(),
            label: label.into(),
        }
    }

    pub fn has_condition(column: impl Into<ArcStr>) -> Self {
        Predicate::HasCondition(column.into())
    }

    pub fn present(column: impl Into<ArcStr>) -> Self {
        Predicate::Present(column.into())
    }

    pub fn date_range(
        column: impl Into<ArcStr>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Self {
        Predicate::DateRange {
            column: column.into(),
            from,
            to,
        }
    }

    /// Subjects with a recorded date of death.
    pub fn deceased() -> Self {
        Predicate::present(DATE_OF_DEATH)
    }

    pub fn column(&self) -> &str {
        match self {
            Predicate::Equals { column, .. }
            | Predicate::HasCondition(column)
            | Predicate::Present(column)
            | Predicate::DateRange { column, .. } => column,
        }
    }

    /// Resolve the column name against `table`, failing if the column doesn't exist.
    pub(crate) fn bind(&self, table: &Table) -> Result<BoundPredicate<'_>> {
        Ok(BoundPredicate {
            idx: table.column_index(self.column())?,
            predicate: self,
        })
    }
}

/// A predicate with its column already looked up.
pub(crate) struct BoundPredicate<'a> {
    idx: usize,
    predicate: &'a Predicate,
}

impl BoundPredicate<'_> {
    pub(crate) fn test(&self, record: &Record) -> Result<bool> {
        let cell = &record[self.idx];
        Ok(match self.predicate {
            Predicate::Equals { label, .. } => cell.as_str() == Some(&**label),
            Predicate::HasCondition(_) => cell.is_label(YES),
            Predicate::Present(_) => !cell.is_missing(),
            Predicate::DateRange { column, from, to } => {
                let Some(text) = cell.as_str() else {
                    return Ok(false);
                };
                let date = util::parse_date(text).ok_or_else(|| DataSourceError::InvalidDate {
                    column: column.clone(),
                    value: text.into(),
                })?;
                from.map_or(true, |from| from <= date) && to.map_or(true, |to| date <= to)
            }
        })
    }
}

/// A set of predicates that must all hold.
///
/// Built fresh from the current selection for each view, and thrown away afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredicateSet {
    predicates: Vec<Predicate>,
}

impl PredicateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.push(predicate);
        self
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Predicate> + '_ {
        self.predicates.iter()
    }

    /// Keep the rows of `table` that satisfy every predicate, in their original order.
    ///
    /// Every column is checked before any row is, so a bad column name is reported even when
    /// the table is empty. No rows matching is not an error: check `is_empty` on the result.
    pub fn apply(&self, table: &Table) -> Result<Table> {
        if self.is_empty() {
            return Ok(table.clone());
        }
        let bound = self
            .predicates
            .iter()
            .map(|p| p.bind(table))
            .collect::<Result<Vec<_>>>()?;

        let mut rows = vec![];
        'rows: for record in table.iter() {
            for predicate in bound.iter() {
                if !predicate.test(record)? {
                    continue 'rows;
                }
            }
            rows.push(record.clone());
        }

        event!(
            Level::DEBUG,
            "{} of {} rows match {} predicates",
            rows.len(),
            table.len(),
            self.len()
        );
        Ok(table.with_rows(rows))
    }
}

impl FromIterator<Predicate> for PredicateSet {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Predicate>,
    {
        PredicateSet {
            predicates: iter.into_iter().collect(),
        }
    }
}

impl Extend<Predicate> for PredicateSet {
    fn extend<T: IntoIterator<Item = Predicate>>(&mut self, iter: T) {
        self.predicates.extend(iter)
    }
}

/// Apply `predicates` to `table`. See [`PredicateSet::apply`].
pub fn apply(table: &Table, predicates: &PredicateSet) -> Result<Table> {
    predicates.apply(table)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{codes::normalize, Error, DIABETES, SEX};

    /// Ten subjects: four female, two of whom are diabetic.
    fn cases() -> Table {
        normalize(
            &Table::from_csv(
                "ID,SEX,DIABETES,NATIONALITY,ADMISSION DATE,DATE_OF_DEATH\n\
                 0,2,1,1,2020-04-01,\n\
                 1,1,2,1,2020-04-02,\n\
                 2,1,1,2,2020-04-02,2020-05-01\n\
                 3,2,2,1,2020-04-03,\n\
                 4,2,1,1,,\n\
                 5,1,98,1,2020-04-05,\n\
                 6,2,2,2,2020-04-05,2020-04-20\n\
                 7,1,1,1,2020-04-06,\n\
                 8,2,1,97,2020-04-07,\n\
                 9,99,1,1,2020-04-07,\n"
                    .as_bytes(),
            )
            .unwrap(),
        )
    }

    fn ids(table: &Table) -> Vec<String> {
        table
            .column("ID")
            .unwrap()
            .map(|cell| cell.to_string())
            .collect()
    }

    #[test]
    fn female_diabetics() {
        let cases = cases();
        let female = PredicateSet::new().with(Predicate::equals(SEX, "FEMALE"));
        assert_eq!(female.apply(&cases).unwrap().len(), 4);

        let both = female.with(Predicate::has_condition(DIABETES));
        assert_eq!(ids(&both.apply(&cases).unwrap()), vec!["2", "7"]);
    }

    #[test]
    fn order_doesnt_matter() {
        let cases = cases();
        let p1 = Predicate::equals(SEX, "MALE");
        let p2 = Predicate::has_condition(DIABETES);
        let a = PredicateSet::from_iter([p1.clone(), p2.clone()]).apply(&cases).unwrap();
        let b = PredicateSet::from_iter([p2, p1]).apply(&cases).unwrap();
        assert_eq!(&*a, &*b);
        assert_eq!(ids(&a), vec!["0", "4", "8"]);
    }

    #[test]
    fn empty_set_is_identity() {
        let cases = cases();
        let all = PredicateSet::new().apply(&cases).unwrap();
        assert!(all.shares_rows(&cases));
        assert_eq!(&*all, &*cases);
    }

    #[test]
    fn no_matches_is_ok() {
        let cases = cases();
        let none = PredicateSet::new()
            .with(Predicate::equals(SEX, "FEMALE"))
            .with(Predicate::equals("NATIONALITY", "UNKNOWN"))
            .apply(&cases)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn labels_not_codes() {
        let cases = cases();
        let by_code = PredicateSet::new()
            .with(Predicate::equals(SEX, "1"))
            .apply(&cases)
            .unwrap();
        assert!(by_code.is_empty());
    }

    #[test]
    fn unknown_column() {
        let cases = cases();
        let err = PredicateSet::new()
            .with(Predicate::has_condition("ASTHMA"))
            .apply(&cases)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownColumn(name) if &*name == "ASTHMA"));
    }

    #[test]
    fn deceased_and_dates() {
        let cases = cases();
        let dead = PredicateSet::new().with(Predicate::deceased()).apply(&cases).unwrap();
        assert_eq!(ids(&dead), vec!["2", "6"]);

        let early = PredicateSet::new()
            .with(Predicate::date_range(
                "ADMISSION DATE",
                NaiveDate::from_ymd_opt(2020, 4, 2),
                NaiveDate::from_ymd_opt(2020, 4, 5),
            ))
            .apply(&cases)
            .unwrap();
        assert_eq!(ids(&early), vec!["1", "2", "3", "5", "6"]);
    }

    #[test]
    fn bad_date() {
        let cases = normalize(&Table::from_csv("ADMISSION DATE\nyesterday\n".as_bytes()).unwrap());
        let err = PredicateSet::new()
            .with(Predicate::date_range("ADMISSION DATE", None, None))
            .apply(&cases)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DataSource(DataSourceError::InvalidDate { .. })
        ));
    }
}
