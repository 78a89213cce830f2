use log::info;
use rust_xlsxwriter::Workbook;
use std::io;
use std::path::Path;

use super::table_reader::TableFormat;
use super::table_types::{CellValue, Table};
use super::TableError;

const RESULT_SHEET_NAME: &str = "Comparison Results";

pub fn write_table<P: AsRef<Path>>(
    table: &Table,
    path: P,
    format: TableFormat,
) -> Result<(), TableError> {
    info!("Writing {} rows into {}", table.len(), path.as_ref().display());

    match format {
        TableFormat::Spreadsheet => write_spreadsheet(table, path.as_ref()),
        TableFormat::Delimited(delimiter) => {
            let file = std::fs::File::create(path.as_ref())?;
            write_delimited(table, file, delimiter)
        }
    }
}

fn write_spreadsheet(table: &Table, path: &Path) -> Result<(), TableError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet().set_name(RESULT_SHEET_NAME)?;

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, header.as_str())?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row32 = (row_idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let col16 = col as u16;
            match cell.sanitized() {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    worksheet.write_string(row32, col16, s.as_str())?;
                }
                CellValue::Number(n) => {
                    worksheet.write_number(row32, col16, n)?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

pub(crate) fn write_delimited<W: io::Write>(
    table: &Table,
    output: W,
    delimiter: u8,
) -> Result<(), TableError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(output);

    csv_writer.write_record(&table.headers)?;
    for row in &table.rows {
        csv_writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }

    csv_writer.flush()?;
    Ok(())
}
