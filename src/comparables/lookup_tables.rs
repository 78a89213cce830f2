use std::collections::HashMap;

pub const MIN_CLASS_RANK: u8 = 1;

/// Hotel class labels in ordinal order, rank 1 first.
pub const HOTEL_CLASS_LABELS: [&str; 8] = [
    "Budget (Low End)",
    "Economy (Name Brand)",
    "Midscale",
    "Upper Midscale",
    "Upscale",
    "Upper Upscale First Class",
    "Luxury Class",
    "Independent Hotel",
];

pub const STATE_TAX_RATES: [(&str, f64); 37] = [
    ("Alabama", 0.0039),
    ("Arkansas", 0.0062),
    ("Arizona", 0.0066),
    ("California", 0.0076),
    ("Colorado", 0.0051),
    ("Connecticut", 0.0214),
    ("Florida", 0.0089),
    ("Georgia", 0.0083),
    ("Iowa", 0.0157),
    ("Idaho", 0.0069),
    ("Illinois", 0.0210),
    ("Indiana", 0.0085),
    ("Kansas", 0.0133),
    ("Kentucky", 0.0080),
    ("Louisiana", 0.0000),
    ("Massachusetts", 0.0112),
    ("Maryland", 0.0109),
    ("Michigan", 0.0154),
    ("Missouri", 0.0097),
    ("Mississippi", 0.0075),
    ("Montana", 0.0084),
    ("North Carolina", 0.0077),
    ("Nebraska", 0.0173),
    ("New Jersey", 0.0249),
    ("New Mexico", 0.0080),
    ("Nevada", 0.0060),
    ("Newyork", 0.0172),
    ("Ohio", 0.0157),
    ("Oklahoma", 0.0090),
    ("Oregon", 0.0097),
    ("Pennsylvania", 0.0158),
    ("South Carolina", 0.0057),
    ("Tennessee", 0.0071),
    ("Texas", 0.0250),
    ("Utah", 0.0057),
    ("Virginia", 0.0082),
    ("Washington", 0.0098),
];

#[inline]
fn label_key(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Case and whitespace insensitive lookup of a hotel class label.
#[derive(Debug)]
pub struct HotelClassTable {
    ranks: HashMap<String, u8>,
}

impl HotelClassTable {
    pub fn new() -> HotelClassTable {
        let ranks = HOTEL_CLASS_LABELS
            .iter()
            .enumerate()
            .map(|(idx, label)| (label_key(label), idx as u8 + MIN_CLASS_RANK))
            .collect();

        HotelClassTable { ranks }
    }

    pub fn rank(&self, label: &str) -> Option<u8> {
        self.ranks.get(&label_key(label)).cloned()
    }
}

impl Default for HotelClassTable {
    fn default() -> Self {
        HotelClassTable::new()
    }
}

/**
 * One-step neighbour band, clamped at the edges. Rank 1 additionally admits
 * rank 3. Ranks outside [1, 8] admit nothing.
 */
pub fn adjacent_class_ranks(rank: u8) -> &'static [u8] {
    match rank {
        1 => &[1, 2, 3],
        2 => &[1, 2, 3],
        3 => &[2, 3, 4],
        4 => &[3, 4, 5],
        5 => &[4, 5, 6],
        6 => &[5, 6, 7],
        7 => &[6, 7, 8],
        8 => &[7, 8],
        _ => &[],
    }
}

#[inline]
pub fn is_adjacent_class(subject_rank: u8, candidate_rank: u8) -> bool {
    adjacent_class_ranks(subject_rank).contains(&candidate_rank)
}

#[derive(Debug)]
pub struct StateTaxRates {
    rates: HashMap<&'static str, f64>,
}

impl StateTaxRates {
    pub fn new() -> StateTaxRates {
        StateTaxRates::from_entries(STATE_TAX_RATES.iter().cloned())
    }

    pub fn from_entries<I>(entries: I) -> StateTaxRates
    where
        I: IntoIterator<Item = (&'static str, f64)>,
    {
        StateTaxRates {
            rates: entries.into_iter().collect(),
        }
    }

    /// Unknown states have a zero rate.
    pub fn rate(&self, state: &str) -> f64 {
        self.rates.get(state).cloned().unwrap_or(0.0)
    }
}

impl Default for StateTaxRates {
    fn default() -> Self {
        StateTaxRates::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_rank_every_class_label() {
        let table = HotelClassTable::new();

        assert_eq!(table.rank("Budget (Low End)"), Some(1));
        assert_eq!(table.rank("Upper Upscale First Class"), Some(6));
        assert_eq!(table.rank("Independent Hotel"), Some(8));
    }

    #[test]
    fn it_should_ignore_case_and_whitespace_in_labels() {
        let table = HotelClassTable::new();

        assert_eq!(table.rank("  upper   MIDSCALE "), Some(4));
        assert_eq!(table.rank("luxury class"), Some(7));
        assert_eq!(table.rank("Motel"), None);
        assert_eq!(table.rank(""), None);
    }

    #[test]
    fn it_should_clamp_the_class_band_at_the_edges() {
        assert_eq!(adjacent_class_ranks(1), &[1u8, 2, 3][..]);
        assert_eq!(adjacent_class_ranks(8), &[7u8, 8][..]);
        assert!(!is_adjacent_class(8, 6));
        assert!(!is_adjacent_class(1, 4));
    }

    #[test]
    fn it_should_admit_only_one_step_neighbours_in_the_middle() {
        assert!(is_adjacent_class(4, 3));
        assert!(is_adjacent_class(4, 4));
        assert!(is_adjacent_class(4, 5));
        assert!(!is_adjacent_class(4, 2));
        assert!(!is_adjacent_class(4, 7));
        assert!(!is_adjacent_class(0, 0));
    }

    #[test]
    fn it_should_default_unknown_states_to_zero() {
        let rates = StateTaxRates::new();

        assert_eq!(rates.rate("Texas"), 0.0250);
        assert_eq!(rates.rate("Newyork"), 0.0172);
        assert_eq!(rates.rate("Atlantis"), 0.0);
    }
}
