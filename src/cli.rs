//! Command line options shared by the report binaries.
use chrono::NaiveDate;
use clap::Args;
use qu::ick_use::*;
use std::{path::PathBuf, sync::Arc};

use crate::{
    cache, Config, Dataset, Predicate, PredicateSet, ADMISSION_DATE, NATIONALITY, SEX,
};

/// Selecting this for a selector means "don't filter".
pub const ALL: &str = "All";

/// Where the case records and settings come from.
#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// The case records (overrides the config file)
    #[clap(short, long)]
    pub dataset: Option<PathBuf>,
    /// Settings file
    #[clap(short, long, default_value = Config::DEFAULT_PATH)]
    pub config: PathBuf,
}

impl SourceArgs {
    pub fn config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load_or_default(&self.config)?;
        if let Some(dataset) = &self.dataset {
            config.dataset = dataset.clone();
        }
        Ok(config)
    }

    /// Load the settings, then the (cached) dataset they point at.
    pub fn load(&self) -> anyhow::Result<(Config, Arc<Dataset>)> {
        let config = self.config()?;
        let dataset = cache::load_cached(&config.dataset)
            .with_context(|| format!("loading case records \"{}\"", config.dataset.display()))?;
        Ok((config, dataset))
    }
}

/// The filters shown on every page.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Only show subjects of this sex, e.g. FEMALE
    #[clap(long)]
    pub sex: Option<String>,
    /// Only show subjects of this nationality, e.g. MEXICAN ("All" for everyone)
    #[clap(long)]
    pub nationality: Option<String>,
    /// Only show subjects with this disease. Can be given more than once.
    #[clap(long = "disease")]
    pub diseases: Vec<String>,
    /// Earliest admission date, e.g. 2020-04-01
    #[clap(long)]
    pub admitted_from: Option<NaiveDate>,
    /// Latest admission date
    #[clap(long)]
    pub admitted_to: Option<NaiveDate>,
}

impl FilterArgs {
    /// The predicates for the current selection. Column and label names are upper-cased to
    /// match the decoded table.
    pub fn predicates(&self) -> PredicateSet {
        let selected = |value: &Option<String>| {
            value
                .as_deref()
                .filter(|v| !v.eq_ignore_ascii_case(ALL))
                .map(|v| v.trim().to_uppercase())
        };
        let mut predicates = PredicateSet::new();
        if let Some(sex) = selected(&self.sex) {
            predicates.push(Predicate::equals(SEX, sex));
        }
        if let Some(nationality) = selected(&self.nationality) {
            predicates.push(Predicate::equals(NATIONALITY, nationality));
        }
        predicates.extend(
            self.diseases
                .iter()
                .map(|d| Predicate::has_condition(d.trim().to_uppercase())),
        );
        if self.admitted_from.is_some() || self.admitted_to.is_some() {
            predicates.push(Predicate::date_range(
                ADMISSION_DATE,
                self.admitted_from,
                self.admitted_to,
            ));
        }
        predicates
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::DIABETES;

    #[test]
    fn no_filters() {
        assert!(FilterArgs::default().predicates().is_empty());
        let all = FilterArgs {
            sex: Some("all".into()),
            nationality: Some(ALL.into()),
            ..FilterArgs::default()
        };
        assert!(all.predicates().is_empty());
    }

    #[test]
    fn selection() {
        let args = FilterArgs {
            sex: Some("female".into()),
            nationality: None,
            diseases: vec!["diabetes".into()],
            admitted_from: NaiveDate::from_ymd_opt(2020, 4, 1),
            admitted_to: None,
        };
        let predicates = args.predicates().iter().cloned().collect::<Vec<_>>();
        assert_eq!(
            predicates,
            vec![
                Predicate::equals(SEX, "FEMALE"),
                Predicate::has_condition(DIABETES),
                Predicate::date_range(ADMISSION_DATE, NaiveDate::from_ymd_opt(2020, 4, 1), None),
            ]
        );
    }
}
