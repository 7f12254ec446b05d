use crate::domain::model::{EventRecord, YearOrdinalPair};
use serde::Serialize;
use std::collections::BTreeSet;

fn sorted(pairs: &[YearOrdinalPair]) -> Vec<YearOrdinalPair> {
    let mut sorted = pairs.to_vec();
    sorted.sort();
    sorted
}

/// 取出所有同時有年份與序數的觀測值，去重後依 (year, ordinal) 排序
pub fn observed_pairs(records: &[EventRecord]) -> Vec<YearOrdinalPair> {
    records
        .iter()
        .filter_map(EventRecord::year_ordinal)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Years between consecutive editions, or 0 if the series has no single frequency.
///
/// Requires at least two pairs, strictly increasing ordinals and the same whole
/// number of years per ordinal step between every consecutive pair.
pub fn frequency(pairs: &[YearOrdinalPair]) -> i64 {
    if pairs.len() < 2 {
        return 0;
    }
    let mut spacing = None;
    for window in sorted(pairs).windows(2) {
        let (prev, next) = (window[0], window[1]);
        let (Some(ordinal_delta), Some(year_delta)) = (
            next.ordinal.checked_sub(prev.ordinal),
            next.year.checked_sub(prev.year),
        ) else {
            return 0;
        };
        if ordinal_delta <= 0 || year_delta <= 0 || year_delta % ordinal_delta != 0 {
            return 0;
        }
        let step = year_delta / ordinal_delta;
        match spacing {
            None => spacing = Some(step),
            Some(known) if known != step => return 0,
            Some(_) => {}
        }
    }
    spacing.unwrap_or(0)
}

/// Weaker check on the first/last pair only: whole years per edition, at least one.
pub fn is_frequency_consistent(pairs: &[YearOrdinalPair]) -> bool {
    let sorted = sorted(pairs);
    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return true;
    };
    if sorted.len() == 1 {
        return true;
    }
    let (Some(ordinal_delta), Some(year_delta)) = (
        last.ordinal.checked_sub(first.ordinal),
        last.year.checked_sub(first.year),
    ) else {
        return false;
    };
    if year_delta < 1 || ordinal_delta < 1 {
        return false;
    }
    year_delta % ordinal_delta == 0 && year_delta / ordinal_delta >= 1
}

/// A run of editions sharing the same spacing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencySegment {
    pub start_year: i64,
    pub end_year: i64,
    /// 0.0 marks several editions within one year
    pub years_per_edition: f64,
    pub editions: usize,
}

/// Piecewise description of the spacing, used to explain why a series was rejected.
///
/// Returns an empty list for fewer than two pairs or non-increasing ordinals.
pub fn frequency_segments(pairs: &[YearOrdinalPair]) -> Vec<FrequencySegment> {
    let distinct: Vec<YearOrdinalPair> = pairs
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let mut segments: Vec<FrequencySegment> = Vec::new();
    for window in distinct.windows(2) {
        let (prev, next) = (window[0], window[1]);
        if next.ordinal <= prev.ordinal {
            return Vec::new();
        }
        let years = next.year as f64 - prev.year as f64;
        let rate = years / (next.ordinal as f64 - prev.ordinal as f64);
        match segments.last_mut() {
            Some(segment) if (segment.years_per_edition - rate).abs() < f64::EPSILON => {
                segment.end_year = next.year;
                segment.editions += 1;
            }
            _ => segments.push(FrequencySegment {
                start_year: prev.year,
                end_year: next.year,
                years_per_edition: rate,
                editions: 2,
            }),
        }
    }
    segments
}

pub fn is_considerable(pairs: &[YearOrdinalPair]) -> bool {
    pairs.len() > 1
}

/// Distinct observations sorted by (year, ordinal) have strictly increasing ordinals.
pub fn is_ordinal_consistent(pairs: &[YearOrdinalPair]) -> bool {
    let distinct: BTreeSet<YearOrdinalPair> = pairs.iter().copied().collect();
    distinct
        .into_iter()
        .collect::<Vec<_>>()
        .windows(2)
        .all(|window| window[0].ordinal < window[1].ordinal)
}

/// True when the known ordinals leave gaps in 1..=max.
pub fn has_missing_events(pairs: &[YearOrdinalPair]) -> bool {
    let ordinals: BTreeSet<i64> = pairs.iter().map(|p| p.ordinal).filter(|o| *o > 0).collect();
    match ordinals.last() {
        Some(max) => (ordinals.len() as i64) < *max,
        None => false,
    }
}
