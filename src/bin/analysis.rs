use case_dashboard::{
    age_histogram,
    cli::{FilterArgs, SourceArgs},
    codes::YES,
    disease_prevalence, header, percentage, rate, value_counts, Predicate, ICU, INTUBATED,
    NATIONALITY, OUTCOME, SEX,
};
use clap::Parser;
use qu::ick_use::*;
use term_data_table::{Cell, Row, Table};

/// Distributions of age, disease, demographics and hospital resources.
#[derive(Parser)]
struct Opt {
    #[clap(flatten)]
    source: SourceArgs,
    #[clap(flatten)]
    filters: FilterArgs,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let (_, dataset) = opt.source.load()?;
    let cases = dataset.filter(&opt.filters.predicates())?;
    if cases.is_empty() {
        println!("No data found for the selected filters.");
        return Ok(());
    }
    let total = cases.len();
    println!("{} case records selected", total);

    header("Age Distribution");
    let ages = age_histogram(&cases)?;
    let mut table = Table::new().with_row(
        Row::new()
            .with_cell(Cell::from("Age group"))
            .with_cell(Cell::from("Count"))
            .with_cell(Cell::from("Percentage")),
    );
    for (label, count) in ages.for_display() {
        table.add_row(
            Row::new()
                .with_cell(Cell::from(label.to_string()))
                .with_cell(Cell::from(count.to_string()))
                .with_cell(Cell::from(format!("{:.1}%", percentage(count, total)?))),
        );
    }
    println!("{}", table);

    header("Deaths per Disease");
    let mut deaths = disease_prevalence(
        &cases,
        &dataset.available_diseases(),
        Some(&Predicate::deceased()),
    )?;
    deaths.sort_by_key(|d| d.count);
    let mut table = Table::new().with_row(
        Row::new()
            .with_cell(Cell::from("Disease"))
            .with_cell(Cell::from("Deaths")),
    );
    for death in deaths {
        table.add_row(
            Row::new()
                .with_cell(Cell::from(death.disease.to_string()))
                .with_cell(Cell::from(death.count.to_string())),
        );
    }
    println!("{}", table);

    header("Sex Distribution");
    println!("{}", value_counts(&cases, SEX)?.term_table_with_shares()?);

    header("Nationality Distribution");
    println!("{}", value_counts(&cases, NATIONALITY)?.term_table_with_shares()?);

    header("Intubation");
    println!("{}", value_counts(&cases, INTUBATED)?.term_table());
    println!("ICU: {:.1}%", rate(&cases, ICU, YES)?);
    println!("Intubated: {:.1}%", rate(&cases, INTUBATED, YES)?);

    header("Outcome Distribution");
    println!("{}", value_counts(&cases, OUTCOME)?.term_table_with_shares()?);
    Ok(())
}
