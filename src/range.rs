use itertools::{EitherOrBoth, Itertools};
use std::{borrow::Borrow, fmt};
use term_data_table as tdt;

use crate::ArcStr;

/// Range where the upper bound is inclusive and the lower bound exclusive, unless the range is
/// the first in its set, where both bounds are inclusive.
#[derive(Debug, Clone)]
pub struct Range<T> {
    low: T,
    high: T,
    include_low: bool,
    label: ArcStr,
}

impl<T> Range<T>
where
    T: Ord,
{
    fn new(low: T, high: T, include_low: bool, label: ArcStr) -> Self {
        if low >= high {
            panic!("ranges must go from low to high")
        }
        Range {
            low,
            high,
            include_low,
            label,
        }
    }

    pub fn contains(&self, val: &T) -> bool {
        let above_low = if self.include_low {
            val >= &self.low
        } else {
            val > &self.low
        };
        above_low && val <= &self.high
    }
}

impl<T> Range<T> {
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<T> fmt::Display for Range<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Contiguous ranges sharing their edges, e.g. age groups.
#[derive(Debug, Clone)]
pub struct RangeSet<T> {
    ranges: Vec<Range<T>>,
}

impl<T> RangeSet<T>
where
    T: Ord + Clone,
{
    /// Build ranges between consecutive `edges`, so `n + 1` edges need `n` labels.
    ///
    /// A value on an edge belongs to the range below it. The lowest edge belongs to the first
    /// range.
    pub fn from_edges(edges: &[T], labels: &[&str]) -> Self {
        assert_eq!(
            edges.len(),
            labels.len() + 1,
            "need one more edge than labels"
        );
        let ranges = edges
            .iter()
            .tuple_windows()
            .zip_eq(labels.iter())
            .enumerate()
            .map(|(idx, ((low, high), label))| {
                Range::new(low.clone(), high.clone(), idx == 0, (*label).into())
            })
            .collect();
        RangeSet { ranges }
    }
}

impl<T> RangeSet<T> {
    pub fn iter(&self) -> impl Iterator<Item = &Range<T>> + '_ {
        self.ranges.iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }
}

impl<T> RangeSet<T>
where
    T: Ord,
{
    /// The range containing `val`, if any.
    pub fn find(&self, val: &T) -> Option<usize> {
        self.ranges.iter().position(|range| range.contains(val))
    }

    /// Count values per range. Values that are `None` or that fall outside every range are
    /// counted as missing.
    pub fn bucket_values_with_missing<I, B>(self, values: I) -> RangeSetCountsWithMissing<T>
    where
        I: Iterator<Item = Option<B>>,
        B: Borrow<T>,
    {
        let mut buckets = vec![0usize; self.ranges.len() + 1];
        let last = self.ranges.len();
        for value in values {
            let idx = value
                .and_then(|value| self.find(value.borrow()))
                .unwrap_or(last);
            buckets[idx] += 1;
        }
        RangeSetCountsWithMissing {
            set: self,
            counts: buckets,
        }
    }
}

/// A range set with values bucketed, and bucket sizes recorded.
///
/// The last count is for values that didn't fit any range.
#[derive(Debug, Clone)]
pub struct RangeSetCountsWithMissing<T> {
    set: RangeSet<T>,
    counts: Vec<usize>,
}

impl<T> RangeSetCountsWithMissing<T> {
    pub fn iter(&self) -> impl Iterator<Item = (Option<&Range<T>>, usize)> {
        self.set
            .iter()
            .zip_longest(self.counts.iter().copied())
            .map(|el| match el {
                EitherOrBoth::Left(_) => unreachable!(),
                EitherOrBoth::Right(count) => (None, count),
                EitherOrBoth::Both(range, count) => (Some(range), count),
            })
    }

    /// Counts for each range in order, zero counts included, without the missing count.
    pub fn in_range(&self) -> impl Iterator<Item = (&Range<T>, usize)> {
        self.set.iter().zip(self.counts.iter().copied())
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.in_range()
            .find(|(range, _)| range.label() == label)
            .map(|(_, count)| count)
    }

    pub fn missing(&self) -> usize {
        self.counts.last().copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn for_display(&self) -> impl Iterator<Item = (&dyn fmt::Display, usize)> {
        self.iter().map(|(range, count)| {
            let range = match range {
                Some(range) => range as &dyn fmt::Display,
                None => &"missing data" as &dyn fmt::Display,
            };
            (range, count)
        })
    }

    pub fn term_table(&self, title: &str) -> tdt::Table {
        use tdt::{Cell, Row, Table};
        let mut table = Table::new().with_row(
            Row::new()
                .with_cell(Cell::from(title.to_string()))
                .with_cell(Cell::from("Count")),
        );
        for (label, count) in self.for_display() {
            table.add_row(
                Row::new()
                    .with_cell(Cell::from(label.to_string()))
                    .with_cell(Cell::from(count.to_string())),
            );
        }
        table
    }
}
