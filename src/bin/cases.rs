use case_dashboard::{
    cli::{FilterArgs, SourceArgs},
    header, value_counts, NATIONALITY, OUTCOME, SEX,
};
use clap::Parser;
use qu::ick_use::*;

/// Browse the case records, optionally narrowed down by filters.
#[derive(Parser)]
struct Opt {
    #[clap(flatten)]
    source: SourceArgs,
    #[clap(flatten)]
    filters: FilterArgs,
    /// Maximum number of rows to print (overrides the config file)
    #[clap(long)]
    max_rows: Option<usize>,
    /// List the choices for the sex and nationality filters, then exit
    #[clap(long)]
    list_options: bool,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let (config, dataset) = opt.source.load()?;

    if opt.list_options {
        for column in [SEX, NATIONALITY] {
            header(&format!("{} options", column));
            for option in dataset.options(column)? {
                println!("{}", option);
            }
        }
        header("Disease options");
        for disease in dataset.available_diseases() {
            println!("{}", disease);
        }
        return Ok(());
    }

    let filtered = dataset.filter(&opt.filters.predicates())?;

    header("Filtered Data");
    if filtered.is_empty() {
        println!("No data found for the selected filters.");
        return Ok(());
    }
    println!(
        "{} of {} case records match",
        filtered.len(),
        dataset.len()
    );
    let max_rows = opt.max_rows.unwrap_or(config.max_rows);
    println!("{}", filtered.term_table(max_rows));

    header("Outcome Counts");
    println!("{}", value_counts(&filtered, OUTCOME)?.term_table());

    header("Sex Counts");
    println!("{}", value_counts(&filtered, SEX)?.term_table());
    Ok(())
}
