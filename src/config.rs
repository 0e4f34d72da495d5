use qu::ick_use::*;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    util, FeatureSelection, CARDIOVASCULAR, DIABETES,
    HOSPITALIZED, ICU, INTUBATED, PNEUMONIA, SEX,
};

/// Settings shared by the report binaries, usually read from `dashboard.toml`.
///
/// Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// The case records.
    pub dataset: PathBuf,
    /// How many rows of a filtered table to print. Odd numbers are rounded down.
    pub max_rows: usize,
    /// Correlations weaker than this aren't reported.
    pub correlation_threshold: f64,
    /// Columns correlated when none are given on the command line.
    pub correlation_features: Vec<String>,
    /// The categories a time series can be drawn for.
    pub time_series_categories: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dataset: "dataset.csv".into(),
            max_rows: util::DEFAULT_MAX_ROWS,
            correlation_threshold: 0.1,
            correlation_features: [DIABETES, PNEUMONIA, ICU, CARDIOVASCULAR]
                .map(String::from)
                .into(),
            time_series_categories: [PNEUMONIA, SEX, HOSPITALIZED, INTUBATED]
                .map(String::from)
                .into(),
        }
    }
}

impl Config {
    pub const DEFAULT_PATH: &'static str = "dashboard.toml";

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        fn inner(path: &Path) -> Result<Config> {
            let text = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&text)?;
            config.validate()?;
            Ok(config)
        }
        let path = path.as_ref();
        inner(path).with_context(|| format!("loading config \"{}\"", path.display()))
    }

    /// Load the config at `path` if there is one, otherwise use the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if util::path_exists(path)? {
            Self::load(path)
        } else {
            event!(
                Level::DEBUG,
                "no config at \"{}\", using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result {
        ensure!(
            (0. ..=1.).contains(&self.correlation_threshold),
            "correlation threshold must be between 0 and 1 (found {})",
            self.correlation_threshold
        );
        self.feature_selection()?;
        ensure!(
            !self.time_series_categories.is_empty(),
            "at least one time series category is needed"
        );
        Ok(())
    }

    pub fn feature_selection(&self) -> Result<FeatureSelection> {
        FeatureSelection::correlatable(self.correlation_features.iter())
            .context("invalid correlation features")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.dataset, Path::new("dataset.csv"));
        assert_eq!(config.max_rows, 100);
        assert_eq!(config.correlation_threshold, 0.1);
        assert_eq!(config.feature_selection().unwrap().len(), 4);
        config.validate().unwrap();
    }

    #[test]
    fn partial_file() {
        let config: Config = toml::from_str(
            "dataset = \"data/cases.csv\"\n\
             correlation-threshold = 0.3\n\
             time-series-categories = [\"OUTCOME\"]\n",
        )
        .unwrap();
        assert_eq!(config.dataset, Path::new("data/cases.csv"));
        assert_eq!(config.correlation_threshold, 0.3);
        assert_eq!(config.time_series_categories, vec!["OUTCOME"]);
        assert_eq!(config.max_rows, 100);
    }

    #[test]
    fn invalid() {
        let mut config = Config::default();
        config.correlation_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.correlation_features = vec![DIABETES.into()];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.correlation_features = vec![DIABETES.into(), "AGE".into()];
        assert!(config.validate().is_err());
        assert!(config.feature_selection().is_err());

        assert!(toml::from_str::<Config>("colour = \"red\"").is_err());
    }

    #[test]
    fn from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(Config::DEFAULT_PATH);
        assert_eq!(Config::load_or_default(&path).unwrap(), Config::default());

        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "max-rows = 10").unwrap();
        drop(file);
        assert_eq!(Config::load_or_default(&path).unwrap().max_rows, 10);

        fs::write(&path, "correlation-threshold = -1").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
