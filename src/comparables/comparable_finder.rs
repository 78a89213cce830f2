use log::debug;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use super::comparable_types::{
    Comparable, ComparableSet, MatchStatus, OverpaymentResult, PropertyRecord, SelectionReason,
};
use super::lookup_tables::{is_adjacent_class, StateTaxRates};
use crate::stats_utils::{euclidean_distance, median};

pub const DEFAULT_MARKET_VALUE_TOLERANCE: f64 = 0.20;
pub const DEFAULT_NEAREST_COUNT: usize = 3;
pub const DEFAULT_MAX_COMPARABLES: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComparableRules {
    /// Half-width of the market value band, as a fraction of the subject's value.
    pub market_value_tolerance: f64,
    pub nearest_count: usize,
    pub max_comparables: usize,
}

impl Default for ComparableRules {
    fn default() -> Self {
        ComparableRules {
            market_value_tolerance: DEFAULT_MARKET_VALUE_TOLERANCE,
            nearest_count: DEFAULT_NEAREST_COUNT,
            max_comparables: DEFAULT_MAX_COMPARABLES,
        }
    }
}

impl ComparableRules {
    #[inline]
    fn market_value_band(&self, market_value: f64) -> (f64, f64) {
        (
            market_value * (1.0 - self.market_value_tolerance),
            market_value * (1.0 + self.market_value_tolerance),
        )
    }

    pub fn is_eligible(&self, subject: &PropertyRecord, candidate: &PropertyRecord) -> bool {
        let (mv_min, mv_max) = self.market_value_band(subject.market_value);

        candidate.state == subject.state
            && candidate.county == subject.county
            && candidate.room_count < subject.room_count
            && candidate.market_value >= mv_min
            && candidate.market_value <= mv_max
            && candidate.vpr < subject.vpr
            && is_adjacent_class(subject.hotel_class_rank, candidate.hotel_class_rank)
    }
}

/// Eligible candidates in pool order, first occurrence of each property kept.
pub fn eligible_candidates<'a, I>(
    subject: &PropertyRecord,
    pool: I,
    rules: &ComparableRules,
) -> Vec<&'a PropertyRecord>
where
    I: IntoIterator<Item = &'a PropertyRecord>,
{
    let mut seen = HashSet::new();
    let mut eligible = Vec::new();

    for candidate in pool {
        if !rules.is_eligible(subject, candidate) {
            continue;
        }
        if seen.insert(candidate.identity_key()) {
            eligible.push(candidate);
        }
    }

    eligible
}

#[inline]
fn value_order(a: &PropertyRecord, b: &PropertyRecord) -> Ordering {
    a.market_value
        .partial_cmp(&b.market_value)
        .unwrap_or(Ordering::Equal)
        .then(a.vpr.partial_cmp(&b.vpr).unwrap_or(Ordering::Equal))
}

/**
 * Nearest group by (market value, vpr) distance, then the lowest and the
 * highest of what is left. Every tie goes to the earlier candidate.
 */
pub fn select_diversified<'a>(
    subject: &PropertyRecord,
    candidates: &[&'a PropertyRecord],
    rules: &ComparableRules,
) -> ComparableSet<'a> {
    let subject_point = (subject.market_value, subject.vpr);

    let mut by_distance: Vec<(usize, f64)> = candidates
        .iter()
        .enumerate()
        .map(|(idx, c)| (idx, euclidean_distance(subject_point, (c.market_value, c.vpr))))
        .collect();
    // Stable, so equal distances keep pool order.
    by_distance.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let nearest: Vec<usize> = by_distance
        .iter()
        .take(rules.nearest_count)
        .map(|(idx, _)| *idx)
        .collect();

    let mut comparables: Vec<Comparable<'a>> = nearest
        .iter()
        .map(|idx| Comparable {
            record: candidates[*idx],
            reason: SelectionReason::Nearest,
        })
        .collect();

    let mut remaining: Vec<&'a PropertyRecord> = candidates
        .iter()
        .enumerate()
        .filter(|(idx, _)| !nearest.contains(idx))
        .map(|(_, c)| *c)
        .collect();

    // min_by keeps the first of equal elements.
    let floor = remaining
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| value_order(a, b))
        .map(|(idx, _)| idx);

    if let Some(idx) = floor {
        comparables.push(Comparable {
            record: remaining.remove(idx),
            reason: SelectionReason::Floor,
        });
    }

    let ceiling = remaining
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| value_order(b, a))
        .map(|(idx, _)| idx);

    if let Some(idx) = ceiling {
        comparables.push(Comparable {
            record: remaining.remove(idx),
            reason: SelectionReason::Ceiling,
        });
    }

    comparables.truncate(rules.max_comparables);
    ComparableSet { comparables }
}

/// Signed difference between the subject's tax and the tax implied by its comparables.
pub fn estimate_overpayment(
    subject: &PropertyRecord,
    comparables: &ComparableSet,
    rules: &ComparableRules,
    tax_rates: &StateTaxRates,
) -> Option<f64> {
    if comparables.is_empty() {
        return None;
    }

    let top_vprs: Vec<f64> = comparables
        .records()
        .take(rules.nearest_count)
        .map(|r| r.vpr)
        .collect();
    let median_vpr = median(&top_vprs)?;

    let state_rate = tax_rates.rate(&subject.state);
    let assessed_tax = median_vpr * subject.room_count * state_rate;
    let subject_tax = subject.market_value * state_rate;

    Some(subject_tax - assessed_tax)
}

/// Selects comparables for one subject out of a pool that does not contain it.
pub fn evaluate<'a, I>(
    subject: &PropertyRecord,
    pool: I,
    rules: &ComparableRules,
    tax_rates: &StateTaxRates,
) -> (ComparableSet<'a>, OverpaymentResult)
where
    I: IntoIterator<Item = &'a PropertyRecord>,
{
    let candidates = eligible_candidates(subject, pool, rules);

    if candidates.is_empty() {
        return (ComparableSet::default(), OverpaymentResult::no_match());
    }

    let selected = select_diversified(subject, &candidates, rules);
    let overpaid_amount = estimate_overpayment(subject, &selected, rules, tax_rates);

    let result = OverpaymentResult {
        status: MatchStatus::Matched,
        match_count: candidates.len(),
        overpaid_amount,
    };

    (selected, result)
}

/**
 * Read-only pool of normalized records with a (state, county) index, so each
 * subject only scans its own county.
 */
#[derive(Debug)]
pub struct ComparableFinder {
    records: Vec<PropertyRecord>,
    index: HashMap<String, HashMap<String, Vec<usize>>>,
    rules: ComparableRules,
    tax_rates: StateTaxRates,
}

impl ComparableFinder {
    pub fn new(records: Vec<PropertyRecord>, rules: ComparableRules) -> ComparableFinder {
        let mut index: HashMap<String, HashMap<String, Vec<usize>>> = HashMap::new();

        for (position, record) in records.iter().enumerate() {
            index
                .entry(record.state.clone())
                .or_insert_with(HashMap::new)
                .entry(record.county.clone())
                .or_insert_with(Vec::new)
                .push(position);
        }

        debug!("Indexed {} records in {} states", records.len(), index.len());

        ComparableFinder {
            records,
            index,
            rules,
            tax_rates: StateTaxRates::new(),
        }
    }

    pub fn records(&self) -> &[PropertyRecord] {
        &self.records
    }

    /// Records sharing the subject's state and county, in pool order, without the subject.
    fn county_pool<'s>(
        &'s self,
        subject: &'s PropertyRecord,
    ) -> impl Iterator<Item = &'s PropertyRecord> + 's {
        self.index
            .get(&subject.state)
            .and_then(|counties| counties.get(&subject.county))
            .map(|positions| positions.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |position| &self.records[*position])
            .filter(move |candidate| candidate.id != subject.id)
    }

    pub fn evaluate<'s>(
        &'s self,
        subject: &'s PropertyRecord,
    ) -> (ComparableSet<'s>, OverpaymentResult) {
        let (selected, result) = evaluate(
            subject,
            self.county_pool(subject),
            &self.rules,
            &self.tax_rates,
        );

        debug!(
            "Row {}: {} eligible, {} selected",
            subject.source_row,
            result.match_count,
            selected.len()
        );

        (selected, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CellValue;

    fn record(
        id: usize,
        name: &str,
        rooms: f64,
        market_value: f64,
        vpr: f64,
        rank: u8,
    ) -> PropertyRecord {
        PropertyRecord {
            id,
            source_row: id + 1,
            state: "Texas".to_owned(),
            county: "Harris".to_owned(),
            address: format!("{} Main St", id),
            owner_name: "Owner LLC".to_owned(),
            hotel_name: name.to_owned(),
            room_count: rooms,
            market_value,
            vpr,
            hotel_class_label: String::new(),
            hotel_class_rank: rank,
            cells: vec![CellValue::from(name)],
        }
    }

    fn subject() -> PropertyRecord {
        record(0, "Subject", 100.0, 1_000_000.0, 10_000.0, 4)
    }

    fn names(set: &ComparableSet) -> Vec<String> {
        set.records().map(|r| r.hotel_name.clone()).collect()
    }

    #[test]
    fn it_should_include_the_edges_of_the_market_value_band() {
        let rules = ComparableRules::default();
        let s = subject();

        assert!(rules.is_eligible(&s, &record(1, "Low", 50.0, 800_000.0, 5_000.0, 4)));
        assert!(rules.is_eligible(&s, &record(2, "High", 50.0, 1_200_000.0, 5_000.0, 4)));
        assert!(!rules.is_eligible(&s, &record(3, "Below", 50.0, 799_999.0, 5_000.0, 4)));
        assert!(!rules.is_eligible(&s, &record(4, "Above", 50.0, 1_200_001.0, 5_000.0, 4)));
    }

    #[test]
    fn it_should_exclude_equal_rooms_and_vpr() {
        let rules = ComparableRules::default();
        let s = subject();

        assert!(!rules.is_eligible(&s, &record(1, "SameRooms", 100.0, 1_000_000.0, 5_000.0, 4)));
        assert!(!rules.is_eligible(&s, &record(2, "SameVpr", 50.0, 1_000_000.0, 10_000.0, 4)));
        assert!(rules.is_eligible(&s, &record(3, "Smaller", 99.0, 1_000_000.0, 9_999.0, 4)));
    }

    #[test]
    fn it_should_require_the_same_state_and_county() {
        let rules = ComparableRules::default();
        let s = subject();

        let mut other_state = record(1, "Elsewhere", 50.0, 1_000_000.0, 5_000.0, 4);
        other_state.state = "Ohio".to_owned();
        let mut other_county = record(2, "Nearby", 50.0, 1_000_000.0, 5_000.0, 4);
        other_county.county = "Dallas".to_owned();

        assert!(!rules.is_eligible(&s, &other_state));
        assert!(!rules.is_eligible(&s, &other_county));
    }

    #[test]
    fn it_should_respect_the_class_band() {
        let rules = ComparableRules::default();
        let s = subject();

        assert!(!rules.is_eligible(&s, &record(1, "Economy", 50.0, 1_000_000.0, 5_000.0, 2)));
        assert!(!rules.is_eligible(&s, &record(2, "Luxury", 50.0, 1_000_000.0, 5_000.0, 7)));
        assert!(rules.is_eligible(&s, &record(3, "Midscale", 50.0, 1_000_000.0, 5_000.0, 3)));

        let mut budget = subject();
        budget.hotel_class_rank = 1;
        assert!(rules.is_eligible(&budget, &record(4, "Mid", 50.0, 1_000_000.0, 5_000.0, 3)));
        assert!(!rules.is_eligible(&budget, &record(5, "UpperMid", 50.0, 1_000_000.0, 5_000.0, 4)));

        let mut independent = subject();
        independent.hotel_class_rank = 8;
        assert!(rules.is_eligible(&independent, &record(6, "Lux", 50.0, 1_000_000.0, 5_000.0, 7)));
        let upper = record(7, "Upper", 50.0, 1_000_000.0, 5_000.0, 6);
        assert!(!rules.is_eligible(&independent, &upper));
    }

    #[test]
    fn it_should_collapse_duplicate_properties() {
        let rules = ComparableRules::default();
        let s = subject();

        let first = record(1, "Twin", 50.0, 1_000_000.0, 5_000.0, 4);
        let mut second = record(2, "Twin", 60.0, 1_100_000.0, 6_000.0, 4);
        second.address = first.address.clone();
        let pool = vec![first, second];

        let candidates = eligible_candidates(&s, &pool, &rules);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, 1);
    }

    #[test]
    fn it_should_pick_nearest_then_floor_then_ceiling() {
        let rules = ComparableRules::default();
        let s = subject();
        let pool = vec![
            record(1, "Far low", 50.0, 800_000.0, 1_000.0, 4),
            record(2, "Near a", 50.0, 1_000_000.0, 9_000.0, 4),
            record(3, "Far high", 50.0, 1_200_000.0, 1_000.0, 4),
            record(4, "Near b", 50.0, 990_000.0, 9_500.0, 4),
            record(5, "Middle", 50.0, 900_000.0, 2_000.0, 4),
            record(6, "Near c", 50.0, 1_010_000.0, 9_000.0, 4),
            record(7, "Lowest", 50.0, 800_000.0, 500.0, 4),
        ];

        let candidates = eligible_candidates(&s, &pool, &rules);
        let set = select_diversified(&s, &candidates, &rules);

        assert_eq!(names(&set), vec!["Near a", "Near b", "Near c", "Lowest", "Far high"]);
        let reasons: Vec<SelectionReason> = set.comparables.iter().map(|c| c.reason).collect();
        assert_eq!(
            reasons,
            vec![
                SelectionReason::Nearest,
                SelectionReason::Nearest,
                SelectionReason::Nearest,
                SelectionReason::Floor,
                SelectionReason::Ceiling
            ]
        );
    }

    #[test]
    fn it_should_break_distance_ties_by_pool_order() {
        let rules = ComparableRules::default();
        let s = subject();
        let pool = vec![
            record(1, "First", 50.0, 1_000_000.0, 9_000.0, 4),
            record(2, "Second", 50.0, 1_000_000.0, 9_000.0, 4),
            record(3, "Third", 50.0, 1_000_000.0, 9_000.0, 4),
            record(4, "Fourth", 50.0, 1_000_000.0, 9_000.0, 4),
        ];

        let candidates = eligible_candidates(&s, &pool, &rules);
        let set = select_diversified(&s, &candidates, &rules);

        assert_eq!(names(&set), vec!["First", "Second", "Third", "Fourth"]);
        assert_eq!(set.comparables[3].reason, SelectionReason::Floor);
    }

    #[test]
    fn it_should_break_ceiling_ties_by_vpr_then_pool_order() {
        let rules = ComparableRules::default();
        let s = subject();
        let pool = vec![
            record(1, "Near a", 50.0, 1_000_000.0, 9_000.0, 4),
            record(2, "Near b", 50.0, 1_000_000.0, 8_900.0, 4),
            record(3, "Near c", 50.0, 1_000_000.0, 8_800.0, 4),
            record(4, "Low", 50.0, 800_000.0, 50.0, 4),
            record(5, "High 50", 50.0, 1_200_000.0, 50.0, 4),
            record(6, "High 60 first", 50.0, 1_200_000.0, 60.0, 4),
            record(7, "High 60 second", 50.0, 1_200_000.0, 60.0, 4),
        ];

        let candidates = eligible_candidates(&s, &pool, &rules);
        let set = select_diversified(&s, &candidates, &rules);

        assert_eq!(names(&set), vec!["Near a", "Near b", "Near c", "Low", "High 60 first"]);
        assert_eq!(set.comparables[4].reason, SelectionReason::Ceiling);
    }

    #[test]
    fn it_should_not_estimate_without_comparables() {
        let rules = ComparableRules::default();
        let empty = ComparableSet::default();

        let overpaid = estimate_overpayment(&subject(), &empty, &rules, &StateTaxRates::new());

        assert_eq!(overpaid, None);
    }

    #[test]
    fn it_should_take_every_candidate_when_few_are_eligible() {
        let rules = ComparableRules::default();
        let s = subject();
        let pool = vec![
            record(1, "Only a", 50.0, 1_000_000.0, 9_000.0, 4),
            record(2, "Only b", 50.0, 900_000.0, 8_000.0, 4),
        ];

        let (set, result) = evaluate(&s, &pool, &rules, &StateTaxRates::new());

        assert_eq!(set.len(), 2);
        assert_eq!(result.match_count, 2);
        assert_eq!(result.status_label(set.len()), "Total: 2 | Selected: 2");
    }

    #[test]
    fn it_should_cap_the_selection_but_count_every_match() {
        let rules = ComparableRules::default();
        let s = subject();
        let pool: Vec<PropertyRecord> = (1..=9)
            .map(|i| {
                let market_value = 900_000.0 + i as f64 * 10_000.0;
                record(i, &format!("Hotel {}", i), 50.0, market_value, 5_000.0, 4)
            })
            .collect();

        let (set, result) = evaluate(&s, &pool, &rules, &StateTaxRates::new());

        assert_eq!(set.len(), 5);
        assert_eq!(result.match_count, 9);
        assert_eq!(result.status_label(set.len()), "Total: 9 | Selected: 5");
    }

    #[test]
    fn it_should_estimate_the_overpaid_amount_from_the_nearest_median() {
        let rules = ComparableRules::default();
        let rates = StateTaxRates::new();
        let mut s = subject();
        s.state = "Arizona".to_owned();
        let pool: Vec<PropertyRecord> = [5_000.0, 6_000.0, 7_000.0, 1.0]
            .iter()
            .enumerate()
            .map(|(i, vpr)| record(i + 1, "Comp", 50.0, 1_000_000.0, *vpr, 4))
            .collect();
        let set = ComparableSet {
            comparables: pool
                .iter()
                .map(|record| Comparable { record, reason: SelectionReason::Nearest })
                .collect(),
        };

        let overpaid = estimate_overpayment(&s, &set, &rules, &rates).unwrap();

        // median 6000, rate 0.0066: 6600 - 3960
        assert!((overpaid - 2_640.0).abs() < 1e-6);
    }

    #[test]
    fn it_should_compute_the_overpaid_amount_with_a_one_percent_rate() {
        let rules = ComparableRules::default();
        let rates = StateTaxRates::from_entries(vec![("Texas", 0.01)]);
        let s = subject();
        let pool = vec![
            record(1, "Comp a", 50.0, 1_000_000.0, 5_000.0, 4),
            record(2, "Comp b", 50.0, 1_000_000.0, 6_000.0, 4),
            record(3, "Comp c", 50.0, 1_000_000.0, 7_000.0, 4),
        ];

        let (set, result) = evaluate(&s, &pool, &rules, &rates);

        assert_eq!(set.len(), 3);
        // 1_000_000 * 0.01 - 6_000 * 100 * 0.01
        assert!((result.overpaid_amount.unwrap() - 4_000.0).abs() < 1e-6);
    }

    #[test]
    fn it_should_report_a_signed_underpayment() {
        let rules = ComparableRules::default();
        let rates = StateTaxRates::new();
        let s = subject();
        let pool = vec![record(1, "Pricey", 50.0, 1_000_000.0, 9_000.0, 4)];

        let (_, result) = evaluate(&s, &pool, &rules, &rates);

        // 1_000_000 * 0.025 - 9_000 * 100 * 0.025
        let overpaid = result.overpaid_amount.unwrap();
        assert!((overpaid - 2_500.0).abs() < 1e-6);

        let mut small = subject();
        small.room_count = 200.0;
        let pool = vec![record(1, "Pricey", 50.0, 1_000_000.0, 9_000.0, 4)];
        let (_, result) = evaluate(&small, &pool, &rules, &rates);
        assert!(result.overpaid_amount.unwrap() < 0.0);
    }

    #[test]
    fn it_should_default_to_zero_for_unknown_states() {
        let rules = ComparableRules::default();
        let rates = StateTaxRates::new();
        let mut s = subject();
        s.state = "Atlantis".to_owned();
        let mut candidate = record(1, "Comp", 50.0, 1_000_000.0, 9_000.0, 4);
        candidate.state = "Atlantis".to_owned();
        let pool = vec![candidate];

        let (_, result) = evaluate(&s, &pool, &rules, &rates);

        assert_eq!(result.status, MatchStatus::Matched);
        assert_eq!(result.overpaid_amount, Some(0.0));
    }

    #[test]
    fn it_should_report_no_match_without_candidates() {
        let finder = ComparableFinder::new(vec![subject()], ComparableRules::default());

        let (set, result) = finder.evaluate(&finder.records()[0]);

        assert!(set.is_empty());
        assert_eq!(result, OverpaymentResult::no_match());
        assert_eq!(result.status_label(0), "No_Match_Case");
    }

    #[test]
    fn it_should_only_scan_the_subject_county() {
        let mut other = record(1, "Other county", 50.0, 1_000_000.0, 9_000.0, 4);
        other.county = "Travis".to_owned();
        let records = vec![
            subject(),
            other,
            record(2, "Same county", 50.0, 1_000_000.0, 9_000.0, 4),
        ];
        let finder = ComparableFinder::new(records, ComparableRules::default());

        let (set, result) = finder.evaluate(&finder.records()[0]);

        assert_eq!(names(&set), vec!["Same county"]);
        assert_eq!(result.match_count, 1);
    }

    #[test]
    fn it_should_be_deterministic() {
        let records: Vec<PropertyRecord> = (0..12)
            .map(|i| {
                let name = format!("Hotel {}", i % 4);
                let rooms = 40.0 + i as f64 * 10.0;
                let market_value = 950_000.0 + (i % 3) as f64 * 50_000.0;
                record(i, &name, rooms, market_value, 1_000.0 * i as f64, 4)
            })
            .collect();
        let finder = ComparableFinder::new(records, ComparableRules::default());

        let first: Vec<_> = finder.records().iter().map(|s| finder.evaluate(s)).collect();
        let second: Vec<_> = finder.records().iter().map(|s| finder.evaluate(s)).collect();

        assert_eq!(first, second);
    }
}
