#[macro_use]
extern crate clap;
use clap::{App, Arg, SubCommand};

use failure::Error;

use log::{error, info};
use simplelog;
use std::path::Path;

mod cli_utils;
mod comparables;
mod file_processor;
mod normalizer;
mod stats_utils;
mod table;

use chrono::offset::Local;
use comparables::{ComparableRules, HOTEL_CLASS_LABELS, STATE_TAX_RATES};
use table::TableFormat;

const DEFAULT_OUTPUT_FILE: &str = "comparison_results_final.xlsx";

fn main() {
    let local_time = Local::now();
    let time_offset = local_time.offset();
    // Configure logging
    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config {
            offset: time_offset.clone(),
            ..simplelog::Config::default()
        },
        simplelog::TerminalMode::Stderr,
    )
    .ok();

    match do_main() {
        Ok(_) => info!("Process finished OK"),
        Err(err) => {
            error!("Process finished with an error: {}", err);
            std::process::exit(1);
        }
    };
}

fn compare_command(
    input_path: &Path,
    output_path: &Path,
    delimiter: u8,
    sheet: Option<&str>,
    rules: ComparableRules,
    summary_path: Option<&Path>,
    quiet: bool,
) -> Result<(), Error> {
    info!(
        "Comparing properties from {} into {}",
        input_path.display(),
        output_path.display()
    );

    let stats = file_processor::compare_properties(
        input_path,
        TableFormat::from_path(input_path, delimiter),
        sheet,
        output_path,
        TableFormat::from_path(output_path, delimiter),
        rules,
        quiet,
    )?;

    info!("Stats: {:?}", stats);

    if let Some(path) = summary_path {
        file_processor::write_summary(&stats, path)?;
    }

    Ok(())
}

fn rates_command() -> Result<(), Error> {
    for (rank, label) in HOTEL_CLASS_LABELS.iter().enumerate() {
        info!("Hotel class {}: {}", rank + 1, label);
    }

    for (state, rate) in STATE_TAX_RATES.iter() {
        info!("State tax rate {}: {}", state, rate);
    }

    Ok(())
}

fn do_main() -> Result<(), Error> {
    let matches = App::new("hotel_comps")
                    .version("0.1.0")
                    .author("Gustavo Ajzenman")
                    .about("Finds comparable hotels and estimates property tax overpayment")
                    .subcommand(
                        SubCommand::with_name("compare")
                            .about("Select comparables for every hotel of a table")
                            .arg(Arg::with_name("input")
                                .short("i")
                                .long("input")
                                .help("Input table (xlsx, xls, xlsb, ods or delimited text).")
                                .takes_value(true)
                                .required(true)
                            )
                            .arg(Arg::with_name("output")
                                .short("o")
                                .long("output")
                                .help("Output file. xlsx unless another extension is given.")
                                .takes_value(true)
                                .default_value(DEFAULT_OUTPUT_FILE)
                            )
                            .arg(Arg::with_name("delimiter")
                                .short("d")
                                .long("delimiter")
                                .help("Delimiter for delimited text input and output")
                                .takes_value(true)
                                .default_value(",")
                            )
                            .arg(Arg::with_name("sheet")
                                .short("s")
                                .long("sheet")
                                .help("Worksheet to read. The first one if omitted.")
                                .takes_value(true)
                            )
                            .arg(Arg::with_name("tolerance")
                                .short("t")
                                .long("tolerance")
                                .help("Market value band around each hotel, as a fraction.")
                                .takes_value(true)
                                .default_value("0.20")
                            )
                            .arg(Arg::with_name("summary")
                                .long("summary")
                                .help("Also write the run statistics as json into this file.")
                                .takes_value(true)
                            )
                            .arg(Arg::with_name("quiet")
                                .short("q")
                                .long("quiet")
                                .help("Hide progress bars")
                            )
                    )
                    .subcommand(
                        SubCommand::with_name("rates")
                            .about("Show the hotel classes and state tax rates in use")
                    )
                    .get_matches();

    if let Some(compare_matches) = matches.subcommand_matches("compare") {
        let input_path = Path::new(compare_matches.value_of("input").unwrap_or_default());
        let output_path =
            Path::new(compare_matches.value_of("output").unwrap_or(DEFAULT_OUTPUT_FILE));

        // Parse the delimiter. Should be exactly one character.
        let delimiter = compare_matches
            .value_of("delimiter")
            .unwrap_or_default()
            .replace("\\t", "\t");
        let char_delimiter: u8 = match delimiter.as_bytes() {
            [single] => *single,
            _ => {
                return Err(failure::format_err!(
                    "Delimiter must be a single character: {:?}",
                    delimiter
                ))
            }
        };
        info!("Using the following delimiter: {:?}", char_delimiter as char);

        let tolerance = value_t!(compare_matches, "tolerance", f64)?;
        let rules = ComparableRules {
            market_value_tolerance: tolerance,
            ..ComparableRules::default()
        };

        return compare_command(
            input_path,
            output_path,
            char_delimiter,
            compare_matches.value_of("sheet"),
            rules,
            compare_matches.value_of("summary").map(Path::new),
            compare_matches.is_present("quiet"),
        );
    }

    if matches.subcommand_matches("rates").is_some() {
        return rates_command();
    }

    return Ok(());
}
