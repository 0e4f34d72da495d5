use case_dashboard::{
    cli::{FilterArgs, SourceArgs},
    correlation_features, correlation_matrix, header, FeatureSelection,
};
use clap::Parser;
use qu::ick_use::*;
use term_data_table::{Cell, Row, Table};

/// Correlation between diseases and ICU admission.
#[derive(Parser)]
struct Opt {
    #[clap(flatten)]
    source: SourceArgs,
    #[clap(flatten)]
    filters: FilterArgs,
    /// A column to correlate. Give at least two (defaults come from the config file)
    #[clap(short, long = "feature")]
    features: Vec<String>,
    /// Hide correlations weaker than this (overrides the config file)
    #[clap(short, long)]
    threshold: Option<f64>,
    /// List the columns that can be correlated, then exit
    #[clap(long)]
    list_features: bool,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    if opt.list_features {
        for feature in correlation_features() {
            println!("{}", feature);
        }
        return Ok(());
    }
    let (config, dataset) = opt.source.load()?;
    let features = if opt.features.is_empty() {
        config.feature_selection()?
    } else {
        FeatureSelection::correlatable(opt.features.iter().map(|f| f.trim().to_uppercase()))
            .context("please select at least two of the features from --list-features")?
    };
    let threshold = opt.threshold.unwrap_or(config.correlation_threshold);

    let cases = dataset.filter(&opt.filters.predicates())?;
    if cases.is_empty() {
        println!("No data found for the selected filters.");
        return Ok(());
    }
    let matrix = correlation_matrix(&cases, &features, threshold)?;

    header("Correlation Matrix");
    println!("{}", matrix.term_table());

    header("Key Insights");
    let pairs = matrix.strongest_pairs();
    if pairs.is_empty() {
        println!("No correlations meet the threshold criteria.");
        return Ok(());
    }
    let mut table = Table::new().with_row(
        Row::new()
            .with_cell(Cell::from("Features"))
            .with_cell(Cell::from("Correlation"))
            .with_cell(Cell::from("Strength")),
    );
    for pair in pairs.iter() {
        table.add_row(
            Row::new()
                .with_cell(Cell::from(format!("{} - {}", pair.first, pair.second)))
                .with_cell(Cell::from(format!("{:.2}", pair.coefficient)))
                .with_cell(Cell::from(pair.strength().to_string())),
        );
    }
    println!("{}", table);

    let summary = matrix.summary();
    println!("Strong correlations (|r| >= 0.5): {}", summary.strong);
    println!("Moderate correlations (0.3 <= |r| < 0.5): {}", summary.moderate);
    Ok(())
}
