use std::{io, path::PathBuf};

use crate::ArcStr;

/// Everything that can go wrong between reading the case records and producing a view.
///
/// An empty filter result is not in here: it is a normal outcome that callers check for
/// themselves.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
    /// A caller asked for a column the table doesn't have.
    #[error("no column named \"{0}\" in the case records")]
    UnknownColumn(ArcStr),
    /// The aggregation has no meaningful answer for its input (e.g. a percentage of nothing).
    #[error("undefined aggregation: {0}")]
    UndefinedAggregation(&'static str),
}

/// The case records could not be read.
#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("could not read \"{}\"", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed case records")]
    Csv(#[from] csv::Error),
    #[error("the data source contains no case records")]
    Empty,
    #[error("column \"{0}\" appears more than once")]
    DuplicateColumn(ArcStr),
    #[error("required column \"{0}\" is missing")]
    MissingColumn(&'static str),
    #[error("\"{value}\" in column \"{column}\" is not a date")]
    InvalidDate { column: ArcStr, value: ArcStr },
}
