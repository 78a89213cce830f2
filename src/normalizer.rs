use log::{debug, info, warn};

use super::comparables::{HotelClassTable, PropertyRecord};
use super::table::{CellValue, Table, TableError};

pub const ADDRESS_COLUMN: &str = "Property Address";
pub const STATE_COLUMN: &str = "State";
pub const COUNTY_COLUMN: &str = "Property County";
pub const HOTEL_NAME_COLUMN: &str = "Project / Hotel Name";
pub const OWNER_NAME_COLUMN: &str = "Owner Name/ LLC Name";
pub const ROOMS_COLUMN: &str = "No. of Rooms";
pub const MARKET_VALUE_COLUMN: &str = "Market Value-2024";
pub const VPR_COLUMN: &str = "2024 VPR";
pub const HOTEL_CLASS_COLUMN: &str = "Hotel Class";

pub const REQUIRED_COLUMNS: [&str; 9] = [
    ADDRESS_COLUMN,
    STATE_COLUMN,
    COUNTY_COLUMN,
    HOTEL_NAME_COLUMN,
    OWNER_NAME_COLUMN,
    ROOMS_COLUMN,
    MARKET_VALUE_COLUMN,
    VPR_COLUMN,
    HOTEL_CLASS_COLUMN,
];

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NormalizeStats {
    pub total_rows: usize,
    pub non_numeric: usize,
    pub unknown_class: usize,
}

impl NormalizeStats {
    pub fn dropped(&self) -> usize {
        self.non_numeric + self.unknown_class
    }
}

/// Positions of the required columns in the input table.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ColumnLayout {
    address: usize,
    state: usize,
    county: usize,
    hotel_name: usize,
    owner_name: usize,
    rooms: usize,
    market_value: usize,
    vpr: usize,
    hotel_class: usize,
}

impl ColumnLayout {
    fn resolve(table: &Table) -> Result<ColumnLayout, TableError> {
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| table.column_index(name).is_none())
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(TableError::MissingColumns(missing.join(", ")));
        }

        let column = |name: &str| table.column_index(name).unwrap_or_default();
        Ok(ColumnLayout {
            address: column(ADDRESS_COLUMN),
            state: column(STATE_COLUMN),
            county: column(COUNTY_COLUMN),
            hotel_name: column(HOTEL_NAME_COLUMN),
            owner_name: column(OWNER_NAME_COLUMN),
            rooms: column(ROOMS_COLUMN),
            market_value: column(MARKET_VALUE_COLUMN),
            vpr: column(VPR_COLUMN),
            hotel_class: column(HOTEL_CLASS_COLUMN),
        })
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

#[inline]
fn cell(row: &[CellValue], idx: usize) -> &CellValue {
    row.get(idx).unwrap_or(&EMPTY_CELL)
}

#[inline]
fn text(row: &[CellValue], idx: usize) -> String {
    cell(row, idx).to_string()
}

/**
 * Turns table rows into property records. Rows with a non-numeric room count,
 * market value or vpr, or with an unknown hotel class, are dropped and counted.
 * Missing required columns fail before any row is looked at.
 */
pub fn normalize(table: &Table) -> Result<(Vec<PropertyRecord>, NormalizeStats), TableError> {
    let layout = ColumnLayout::resolve(table)?;
    let classes = HotelClassTable::new();

    let mut stats = NormalizeStats {
        total_rows: table.len(),
        ..NormalizeStats::default()
    };
    let mut records = Vec::with_capacity(table.len());

    for (row_idx, row) in table.rows.iter().enumerate() {
        let source_row = row_idx + 1;

        let numbers = (
            cell(row, layout.rooms).to_number(),
            cell(row, layout.market_value).to_number(),
            cell(row, layout.vpr).to_number(),
        );
        let (room_count, market_value, vpr) = match numbers {
            (Some(rooms), Some(mv), Some(vpr)) => (rooms, mv, vpr),
            _ => {
                debug!("Row {}: non-numeric quantities {:?}", source_row, numbers);
                stats.non_numeric += 1;
                continue;
            }
        };

        let hotel_class_label = text(row, layout.hotel_class);
        let hotel_class_rank = match classes.rank(&hotel_class_label) {
            Some(rank) => rank,
            None => {
                debug!("Row {}: unknown hotel class {:?}", source_row, hotel_class_label);
                stats.unknown_class += 1;
                continue;
            }
        };

        let mut cells: Vec<CellValue> = (0..table.headers.len())
            .map(|idx| cell(row, idx).clone())
            .collect();
        cells[layout.rooms] = CellValue::Number(room_count);
        cells[layout.market_value] = CellValue::Number(market_value);
        cells[layout.vpr] = CellValue::Number(vpr);

        records.push(PropertyRecord {
            id: records.len(),
            source_row,
            state: text(row, layout.state),
            county: text(row, layout.county),
            address: text(row, layout.address),
            owner_name: text(row, layout.owner_name),
            hotel_name: text(row, layout.hotel_name),
            room_count,
            market_value,
            vpr,
            hotel_class_label,
            hotel_class_rank,
            cells,
        });
    }

    info!("Normalized {} of {} rows", records.len(), stats.total_rows);
    if stats.dropped() > 0 {
        warn!(
            "Dropped {} rows ({} non-numeric, {} unknown hotel class)",
            stats.dropped(),
            stats.non_numeric,
            stats.unknown_class
        );
    }

    Ok((records, stats))
}
