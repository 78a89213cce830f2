use crate::table::CellValue;

/// One normalized row of the input table.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyRecord {
    /// Position among normalized records. This is the pool order.
    pub id: usize,
    /// 1-based data row number in the source table.
    pub source_row: usize,
    pub state: String,
    pub county: String,
    pub address: String,
    pub owner_name: String,
    pub hotel_name: String,
    pub room_count: f64,
    pub market_value: f64,
    pub vpr: f64,
    pub hotel_class_label: String,
    pub hotel_class_rank: u8,
    /// Source cells, with the numeric fields replaced by their coerced values.
    pub cells: Vec<CellValue>,
}

impl PropertyRecord {
    /// Two records with the same key are the same property listed twice.
    #[inline]
    pub fn identity_key(&self) -> (&str, &str, &str) {
        (
            self.hotel_name.as_str(),
            self.address.as_str(),
            self.owner_name.as_str(),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionReason {
    Nearest,
    Floor,
    Ceiling,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Comparable<'a> {
    pub record: &'a PropertyRecord,
    pub reason: SelectionReason,
}

/// Up to five comparables, nearest group first, then floor, then ceiling.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComparableSet<'a> {
    pub comparables: Vec<Comparable<'a>>,
}

impl<'a> ComparableSet<'a> {
    pub fn len(&self) -> usize {
        self.comparables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comparables.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &'a PropertyRecord> + '_ {
        self.comparables.iter().map(|c| c.record)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchStatus {
    Matched,
    NoMatch,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverpaymentResult {
    pub status: MatchStatus,
    /// Size of the deduplicated eligible set, not of the selection.
    pub match_count: usize,
    pub overpaid_amount: Option<f64>,
}

impl OverpaymentResult {
    pub fn no_match() -> OverpaymentResult {
        OverpaymentResult {
            status: MatchStatus::NoMatch,
            match_count: 0,
            overpaid_amount: None,
        }
    }

    /// `Total: {matches} | Selected: {selected}` or `No_Match_Case`.
    pub fn status_label(&self, selected_count: usize) -> String {
        match self.status {
            MatchStatus::Matched => format!(
                "Total: {} | Selected: {}",
                self.match_count, selected_count
            ),
            MatchStatus::NoMatch => "No_Match_Case".to_owned(),
        }
    }
}
