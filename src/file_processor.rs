use super::cli_utils;
use super::comparables::{
    ComparableFinder, ComparableRules, ComparableSet, MatchStatus, OverpaymentResult,
    PropertyRecord,
};
use super::normalizer;
use super::table::{self, CellValue, Table, TableError, TableFormat};

use indicatif::ProgressBar;
use serde::Serialize;
use std::io;
use std::path::Path;
use std::time;

use log::info;

use failure::Fail;

pub const CLASS_NUMBER_COLUMN: &str = "Hotel Class Number";
pub const STATUS_COLUMN: &str = "Matching Results Count / Status";
pub const OVERPAID_COLUMN: &str = "OverPaid";

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProcessStats {
    pub total_rows: usize,
    pub dropped_rows: usize,
    pub dropped_non_numeric: usize,
    pub dropped_unknown_class: usize,
    pub subjects: usize,
    pub matched: usize,
    pub no_match: usize,
    pub total_overpaid: f64,
}

#[derive(Debug, Fail)]
pub enum FileProcessorError {
    #[fail(display = "Table error: {}", _0)]
    Table(TableError),
    #[fail(display = "Invalid market value tolerance: {}", _0)]
    InvalidTolerance(f64),
    #[fail(display = "I/O error: {}", _0)]
    Io(io::Error),
    #[fail(display = "Json error: {}", _0)]
    Json(serde_json::Error),
}

impl From<TableError> for FileProcessorError {
    fn from(err: TableError) -> FileProcessorError {
        FileProcessorError::Table(err)
    }
}

impl From<io::Error> for FileProcessorError {
    fn from(err: io::Error) -> FileProcessorError {
        FileProcessorError::Io(err)
    }
}

impl From<serde_json::Error> for FileProcessorError {
    fn from(err: serde_json::Error) -> FileProcessorError {
        FileProcessorError::Json(err)
    }
}

/// Every comparable repeats the subject's fields: the input columns plus the class number.
#[inline]
fn record_fields(headers: &[String]) -> impl Iterator<Item = &str> {
    headers
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(CLASS_NUMBER_COLUMN))
}

pub fn output_headers(input_headers: &[String], max_comparables: usize) -> Vec<String> {
    let mut headers: Vec<String> = record_fields(input_headers).map(String::from).collect();
    headers.push(STATUS_COLUMN.to_owned());
    headers.push(OVERPAID_COLUMN.to_owned());

    for result_idx in 1..=max_comparables {
        for field in record_fields(input_headers) {
            headers.push(format!("Result{}_{}", result_idx, field));
        }
    }

    headers
}

#[inline]
fn push_record_fields(record: &PropertyRecord, row: &mut Vec<CellValue>) {
    row.extend(record.cells.iter().map(CellValue::sanitized));
    row.push(CellValue::Number(f64::from(record.hotel_class_rank)));
}

#[inline]
fn fill_empty_fields(width: usize, row: &mut Vec<CellValue>) {
    row.extend(std::iter::repeat(CellValue::Empty).take(width));
}

fn output_row(
    subject: &PropertyRecord,
    comparables: &ComparableSet,
    result: &OverpaymentResult,
    record_width: usize,
    max_comparables: usize,
) -> Vec<CellValue> {
    let mut row = Vec::with_capacity(record_width * (max_comparables + 1) + 2);

    push_record_fields(subject, &mut row);
    row.push(CellValue::Text(result.status_label(comparables.len())));
    row.push(CellValue::from(result.overpaid_amount).sanitized());

    let mut records = comparables.records();
    for _ in 0..max_comparables {
        match records.next() {
            Some(record) => push_record_fields(record, &mut row),
            None => fill_empty_fields(record_width, &mut row),
        }
    }

    row
}

/**
 * Evaluates every normalized row against the rest of the table and returns
 * the result table, one row per normalized subject in input order.
 */
pub fn compare_table(
    input: &Table,
    rules: ComparableRules,
    progress_bar: &ProgressBar,
) -> Result<(Table, ProcessStats), FileProcessorError> {
    if !rules.market_value_tolerance.is_finite() || rules.market_value_tolerance < 0.0 {
        return Err(FileProcessorError::InvalidTolerance(rules.market_value_tolerance));
    }

    let (records, normalize_stats) = normalizer::normalize(input)?;

    let mut stats = ProcessStats {
        total_rows: normalize_stats.total_rows,
        dropped_rows: normalize_stats.dropped(),
        dropped_non_numeric: normalize_stats.non_numeric,
        dropped_unknown_class: normalize_stats.unknown_class,
        subjects: records.len(),
        ..ProcessStats::default()
    };

    let finder = ComparableFinder::new(records, rules);
    let record_width = input.headers.len() + 1;
    let mut output = Table::new(output_headers(&input.headers, rules.max_comparables));

    progress_bar.set_length(finder.records().len() as u64);

    for subject in finder.records() {
        let (comparables, result) = finder.evaluate(subject);

        match result.status {
            MatchStatus::Matched => stats.matched += 1,
            MatchStatus::NoMatch => stats.no_match += 1,
        }
        if let Some(overpaid) = result.overpaid_amount {
            stats.total_overpaid += overpaid;
        }

        output.push_row(output_row(
            subject,
            &comparables,
            &result,
            record_width,
            rules.max_comparables,
        ));
        progress_bar.inc(1);
    }

    Ok((output, stats))
}

pub fn compare_properties(
    input_path: &Path,
    input_format: TableFormat,
    sheet: Option<&str>,
    output_path: &Path,
    output_format: TableFormat,
    rules: ComparableRules,
    quiet: bool,
) -> Result<ProcessStats, FileProcessorError> {
    let start_instant = time::Instant::now();

    let input = table::read_table(input_path, input_format, sheet)?;

    let progress_bar =
        cli_utils::create_progress_bar_count(quiet, "Comparing...", Some(input.len() as u64));
    let (output, stats) = compare_table(&input, rules, &progress_bar)?;
    progress_bar.finish();

    table::write_table(&output, output_path, output_format)?;

    let elapsed_secs = start_instant.elapsed().as_millis() as f32 / 1000.0f32;
    info!(
        "Compared {} properties in {} seconds. Avg: {} rows/sec",
        stats.subjects,
        elapsed_secs,
        (stats.subjects as f32) / elapsed_secs
    );
    info!(
        "{} matched, {} without comparables, total overpaid {:.2}",
        stats.matched, stats.no_match, stats.total_overpaid
    );

    Ok(stats)
}

pub fn write_summary(stats: &ProcessStats, summary_path: &Path) -> Result<(), FileProcessorError> {
    let file_writer = std::fs::File::create(summary_path)?;
    let buf_writer = io::BufWriter::new(file_writer);
    serde_json::to_writer_pretty(buf_writer, stats)?;

    info!("Summary written into {}", summary_path.display());
    Ok(())
}
