use case_dashboard::{
    cli::{FilterArgs, SourceArgs},
    header, time_series, ADMISSION_DATE,
};
use clap::Parser;
use qu::ick_use::*;

/// Admissions over time, split by a category.
#[derive(Parser)]
struct Opt {
    #[clap(flatten)]
    source: SourceArgs,
    #[clap(flatten)]
    filters: FilterArgs,
    /// The category to split admissions by. Must be one of those in the config file (defaults
    /// to the first).
    #[clap(long)]
    category: Option<String>,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let (config, dataset) = opt.source.load()?;
    let category = match &opt.category {
        Some(category) => {
            let category = category.trim().to_uppercase();
            ensure!(
                config.time_series_categories.contains(&category),
                "\"{}\" is not one of the time series categories ({})",
                category,
                config.time_series_categories.join(", ")
            );
            category
        }
        None => config
            .time_series_categories
            .first()
            .cloned()
            .ok_or_else(|| format_err!("no time series categories configured"))?,
    };

    let cases = dataset.filter(&opt.filters.predicates())?;
    if cases.is_empty() {
        println!("No data found for the selected filters.");
        return Ok(());
    }
    let series = time_series(&cases, ADMISSION_DATE, &category)?;

    header(&format!("Admissions by {}", category));
    if series.is_empty() {
        println!("No admissions with a {} recorded.", category);
        return Ok(());
    }
    println!("{}", series.term_table());
    Ok(())
}
