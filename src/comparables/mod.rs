mod comparable_finder;
mod comparable_types;
mod lookup_tables;

pub use self::comparable_finder::{ComparableFinder, ComparableRules};
pub use self::comparable_types::{ComparableSet, MatchStatus, OverpaymentResult, PropertyRecord};
pub use self::lookup_tables::{HotelClassTable, HOTEL_CLASS_LABELS, STATE_TAX_RATES};
