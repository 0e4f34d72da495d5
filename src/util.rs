use chrono::{NaiveDate, NaiveDateTime};
use noisy_float::prelude::*;
use std::{fs, io, ops::Range, path::Path};

/// The default maximum number of rows displayed.
pub const DEFAULT_MAX_ROWS: usize = 100;

/// Text that reads as "no value" in a CSV cell.
///
/// Matches what spreadsheet exports and dataframe libraries write for missing values.
const NULL_TOKENS: [&str; 14] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
    "#NA",
];

/// Converts a not found error to Ok(false)
pub fn path_exists(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound) => Ok(false),
        Err(e) => Err(e),
    }
}

pub fn is_null_token(s: &str) -> bool {
    NULL_TOKENS.contains(&s)
}

/// Parse a numeric cell as an integer code.
///
/// `"2"`, `" 2 "` and `"2.0"` are all code 2. Anything with a fractional part, or that isn't a
/// number, is `None`.
pub fn parse_code(s: &str) -> Option<i64> {
    let v = parse_number(s)?.raw();
    if v.fract() != 0. || v < i64::MIN as f64 || v > i64::MAX as f64 {
        return None;
    }
    Some(v as i64)
}

/// Parse a finite number, mapping anything else to `None`.
pub fn parse_number(s: &str) -> Option<R64> {
    let v = s.trim().parse::<f64>().ok()?;
    R64::try_new(v)
}

/// Parse a timestamp in any of the layouts seen in case-record exports.
///
/// Slashed and dashed dates are month first (`01/04/2020` is 4 January). A date without a time
/// is midnight.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%m-%d-%Y"];
    const DATETIME_FORMATS: [&str; 5] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// The day part of [`parse_timestamp`].
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    parse_timestamp(s).map(|t| t.date())
}

/// Which rows of a long table to show.
///
/// With more than `max_rows` rows we show the first and last `max_rows / 2`, and leave a gap in
/// between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowWindow {
    pub head: Range<usize>,
    pub tail: Range<usize>,
}

impl RowWindow {
    pub fn new(len: usize, max_rows: usize) -> Self {
        let max_rows = constrain_max_rows(max_rows);
        if max_rows == 0 || max_rows >= len {
            return RowWindow {
                head: 0..len,
                tail: len..len,
            };
        }
        let window_len = max_rows / 2;
        RowWindow {
            head: 0..window_len,
            tail: len - window_len..len,
        }
    }

    /// Number of rows left out between head and tail.
    pub fn skipped(&self) -> usize {
        self.tail.start - self.head.end
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> {
        self.head.clone().chain(self.tail.clone())
    }
}

pub fn constrain_max_rows(mut max_rows: usize) -> usize {
    // make sure 0 -> 0, true since we only touch odd numbers
    if max_rows % 2 == 1 {
        if max_rows == 1 {
            max_rows = 2;
        } else {
            max_rows -= 1;
        }
    }
    max_rows
}

pub fn header(header: &str) {
    let len = header.len();
    print!("\n{}\n", header);
    for _ in 0..len {
        print!("=");
    }
    println!("\n")
}
