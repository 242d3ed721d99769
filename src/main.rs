use std::path::PathBuf;

use capital_gain_statement_xml::{build_xml, get_records, write_xml, DateOfSale, Result};
use clap::Parser;
use env_logger::{Env, Target};

/// Converts a broker capital gain statement (CSV) into the XML accepted by the
/// tax filing service.
///
/// e.g. capital_gain_statement_xml CapitalGain_2016-2017.csv BA123XFQ 2017-18 hnr_2017_18.xml
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Capital gain statement exported by the broker
    input: PathBuf,
    /// Taxpayer PAN, written verbatim
    pan: String,
    /// Assessment year, e.g. 2017-18
    assessment_year: String,
    /// Destination XML file, overwritten if present
    output: PathBuf,
    /// Value written into the DateOfSale element
    #[arg(long, value_enum, default_value_t = DateOfSale::SaleValue)]
    date_of_sale: DateOfSale,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stdout)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let statement = get_records(&cli.input)?;
    let xml = build_xml(
        &statement.records,
        &cli.pan,
        &cli.assessment_year,
        cli.date_of_sale,
    )?;
    write_xml(&xml, &cli.output)?;

    Ok(())
}
