use calamine::{open_workbook_auto, Data, Reader};
use log::{debug, info};
use std::path::Path;

use super::table_types::{CellValue, Table};
use super::TableError;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TableFormat {
    Spreadsheet,
    Delimited(u8),
}

impl TableFormat {
    /// Spreadsheet extensions go through calamine, anything else is delimited text.
    pub fn from_path<P: AsRef<Path>>(path: P, delimiter: u8) -> TableFormat {
        let is_spreadsheet = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| SPREADSHEET_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);

        if is_spreadsheet {
            TableFormat::Spreadsheet
        } else {
            TableFormat::Delimited(delimiter)
        }
    }
}

pub fn read_table<P: AsRef<Path>>(
    path: P,
    format: TableFormat,
    sheet: Option<&str>,
) -> Result<Table, TableError> {
    info!("Reading table from {:?}", path.as_ref());

    let table = match format {
        TableFormat::Spreadsheet => read_spreadsheet(path.as_ref(), sheet)?,
        TableFormat::Delimited(delimiter) => {
            let file = std::fs::File::open(path.as_ref())?;
            read_delimited(file, delimiter)?
        }
    };

    info!("Read {} rows and {} columns", table.len(), table.headers.len());
    Ok(table)
}

fn read_spreadsheet(path: &Path, sheet: Option<&str>) -> Result<Table, TableError> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_name = match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|s| s == name) {
                return Err(TableError::SheetNotFound(name.to_owned()));
            }
            name.to_owned()
        }
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(TableError::NoSheets)?,
    };
    debug!("Using sheet '{}'", sheet_name);

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows = range.rows();

    let header = rows.next().ok_or(TableError::EmptyTable)?;
    let mut table = Table::new(header.iter().map(|c| header_name(&c.to_string())).collect());

    for row in rows {
        let cells: Vec<CellValue> = row.iter().map(cell_from_data).collect();
        if cells.iter().all(|c| *c == CellValue::Empty) {
            continue;
        }
        table.push_row(cells);
    }

    Ok(table)
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        // Dates stay as serial numbers.
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        _ => CellValue::Empty,
    }
}

pub(crate) fn read_delimited<R: std::io::Read>(
    input: R,
    delimiter: u8,
) -> Result<Table, TableError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let headers = csv_reader.headers()?.clone();
    if headers.is_empty() {
        return Err(TableError::EmptyTable);
    }
    let mut table = Table::new(headers.iter().map(header_name).collect());

    for record in csv_reader.records() {
        let record = record?;
        let cells: Vec<CellValue> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(field.to_owned())
                }
            })
            .collect();
        table.push_row(cells);
    }

    Ok(table)
}

#[inline]
fn header_name(raw: &str) -> String {
    raw.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOTELS_CSV: &str = " State ,Property County,No. of Rooms\n\
                              Texas,Harris,120\n\
                              Texas,,80\n";

    #[test]
    fn it_should_trim_header_names() {
        let table = read_delimited(HOTELS_CSV.as_bytes(), b',').unwrap();

        assert_eq!(table.headers, vec!["State", "Property County", "No. of Rooms"]);
        assert_eq!(table.column_index("State"), Some(0));
    }

    #[test]
    fn it_should_read_empty_fields_as_empty_cells() {
        let table = read_delimited(HOTELS_CSV.as_bytes(), b',').unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1][1], CellValue::Empty);
        assert_eq!(table.rows[0][2], CellValue::from("120"));
    }

    #[test]
    fn it_should_read_tab_delimited_input() {
        let input = "State\tNo. of Rooms\nOhio\t40\n";
        let table = read_delimited(input.as_bytes(), b'\t').unwrap();

        assert_eq!(table.headers, vec!["State", "No. of Rooms"]);
        assert_eq!(table.rows[0][0], CellValue::from("Ohio"));
    }

    #[test]
    fn it_should_pick_the_format_from_the_extension() {
        assert_eq!(TableFormat::from_path("hotels.xlsx", b','), TableFormat::Spreadsheet);
        assert_eq!(TableFormat::from_path("hotels.XLS", b','), TableFormat::Spreadsheet);
        assert_eq!(TableFormat::from_path("hotels.tsv", b'\t'), TableFormat::Delimited(b'\t'));
        assert_eq!(TableFormat::from_path("hotels", b','), TableFormat::Delimited(b','));
    }

    #[test]
    fn it_should_fail_with_a_missing_file() {
        let result = read_table("does/not/exist.csv", TableFormat::Delimited(b','), None);
        assert_matches::assert_matches!(result, Err(TableError::Io(_)));
    }
}
