mod table_reader;
mod table_types;
mod table_writer;

pub use self::table_reader::{read_table, TableFormat};
pub use self::table_types::{CellValue, Table};
pub use self::table_writer::write_table;

#[cfg(test)]
pub(crate) use self::table_reader::read_delimited;

use failure::Fail;
use std::io;

#[derive(Debug, Fail)]
pub enum TableError {
    #[fail(display = "I/O error: {}", _0)]
    Io(io::Error),
    #[fail(display = "Csv error: {}", _0)]
    Csv(csv::Error),
    #[fail(display = "Spreadsheet error: {}", _0)]
    Spreadsheet(calamine::Error),
    #[fail(display = "Xlsx writer error: {}", _0)]
    Xlsx(rust_xlsxwriter::XlsxError),
    #[fail(display = "Workbook contains no sheets")]
    NoSheets,
    #[fail(display = "Sheet not found: {}", _0)]
    SheetNotFound(String),
    #[fail(display = "Table has no header row")]
    EmptyTable,
    #[fail(display = "Missing required columns: {}", _0)]
    MissingColumns(String),
}

impl From<io::Error> for TableError {
    fn from(err: io::Error) -> TableError {
        TableError::Io(err)
    }
}

impl From<csv::Error> for TableError {
    fn from(err: csv::Error) -> TableError {
        TableError::Csv(err)
    }
}

impl From<calamine::Error> for TableError {
    fn from(err: calamine::Error) -> TableError {
        TableError::Spreadsheet(err)
    }
}

impl From<rust_xlsxwriter::XlsxError> for TableError {
    fn from(err: rust_xlsxwriter::XlsxError) -> TableError {
        TableError::Xlsx(err)
    }
}
