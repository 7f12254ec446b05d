use crate::core::title_quality::best_first;
use crate::domain::model::{EventRecord, SeriesTimeline, TimelineSlot, YearOrdinalPair};
use std::collections::BTreeMap;

pub const DEFAULT_MAX_EDITIONS: u64 = 1_000;

/// 補齊後的時間軸與重新掛回的孤兒紀錄數
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub timeline: SeriesTimeline,
    pub reattached: usize,
}

/// Splits resolved records by ordinal; records missing a year or ordinal come back separately.
fn group_by_ordinal(
    confirmed: Vec<EventRecord>,
) -> (BTreeMap<i64, Vec<EventRecord>>, Vec<EventRecord>) {
    let mut by_ordinal: BTreeMap<i64, Vec<EventRecord>> = BTreeMap::new();
    let mut leftovers = Vec::new();
    for record in confirmed {
        match (record.year, record.ordinal) {
            (Some(_), Some(ordinal)) => by_ordinal.entry(ordinal).or_default().push(record),
            _ => leftovers.push(record),
        }
    }
    (by_ordinal, leftovers)
}

fn fill_slot(ordinal: i64, year: i64, mut records: Vec<EventRecord>) -> Option<TimelineSlot> {
    best_first(&mut records);
    let mut records = records.into_iter();
    let primary = records.next()?;
    Some(TimelineSlot {
        ordinal,
        year,
        primary,
        duplicates: records.collect(),
    })
}

/// `year - ordinal * frequency` for the anchor edition, i.e. the year before edition 1.
///
/// `None` when the frequency or ordinal is not positive, the timeline would need more than
/// `max_editions` slots, or the arithmetic overflows. Every slot year
/// `inception + k * frequency` with `k <= anchor.ordinal` then stays within
/// `inception..=anchor.year`.
pub fn inception_year(anchor: YearOrdinalPair, frequency: i64, max_editions: u64) -> Option<i64> {
    if frequency < 1 || anchor.ordinal < 1 || anchor.ordinal as u64 > max_editions {
        return None;
    }
    anchor.year.checked_sub(anchor.ordinal.checked_mul(frequency)?)
}

/// Timeline of the confirmed records only, one slot per ordinal. Orphans stay unmatched.
pub fn passthrough(confirmed: Vec<EventRecord>, orphans: Vec<EventRecord>) -> SeriesTimeline {
    let (by_ordinal, mut unmatched) = group_by_ordinal(confirmed);
    let slots = by_ordinal
        .into_iter()
        .filter_map(|(ordinal, records)| {
            let year = records.first()?.year?;
            fill_slot(ordinal, year, records)
        })
        .collect();
    unmatched.extend(orphans);
    SeriesTimeline { slots, unmatched }
}

/// Builds the gap-free timeline 1..=max ordinal for a series with `frequency` years per edition.
///
/// The record with the highest ordinal anchors the series:
/// `inception = year - ordinal * frequency`, and edition k falls in `inception + k * frequency`.
/// Editions without a record get a ghost. Falls back to [`passthrough`] when nothing is
/// confirmed or [`inception_year`] rejects the anchor.
pub fn synthesize(
    confirmed: Vec<EventRecord>,
    orphans: Vec<EventRecord>,
    frequency: i64,
    reattach: bool,
    max_editions: u64,
) -> Synthesis {
    let (mut by_ordinal, mut unmatched) = group_by_ordinal(confirmed);
    let anchor = by_ordinal
        .iter()
        .next_back()
        .and_then(|(ordinal, records)| Some(YearOrdinalPair::new(records.first()?.year?, *ordinal)));

    let start = anchor.and_then(|anchor| {
        Some((anchor, inception_year(anchor, frequency, max_editions)?))
    });
    let Some((anchor, inception)) = start else {
        let confirmed: Vec<EventRecord> = by_ordinal.into_values().flatten().chain(unmatched).collect();
        return Synthesis {
            timeline: passthrough(confirmed, orphans),
            reattached: 0,
        };
    };

    let mut slots = Vec::with_capacity(anchor.ordinal as usize);
    for ordinal in 1..=anchor.ordinal {
        let year = inception + ordinal * frequency;
        let slot = by_ordinal
            .remove(&ordinal)
            .and_then(|records| fill_slot(ordinal, year, records))
            .unwrap_or_else(|| TimelineSlot::ghost(year, ordinal));
        slots.push(slot);
    }
    // 序數 < 1 的紀錄無法放進時間軸
    unmatched.extend(by_ordinal.into_values().flatten());

    let mut timeline = SeriesTimeline { slots, unmatched };
    let reattached = if reattach {
        reattach_orphans(&mut timeline, orphans)
    } else {
        timeline.unmatched.extend(orphans);
        0
    };
    Synthesis {
        timeline,
        reattached,
    }
}

/// Fills ghosts with orphans of the same year, then attaches leftovers to filled slots of their year.
///
/// For each ghost the orphan with the earliest start date wins (no start date sorts first,
/// ties keep input order). Returns how many orphans found a slot.
fn reattach_orphans(timeline: &mut SeriesTimeline, orphans: Vec<EventRecord>) -> usize {
    let mut pool = orphans;
    let mut reattached = 0;

    for slot in timeline.slots.iter_mut().filter(|slot| slot.is_ghost()) {
        let earliest = pool
            .iter()
            .enumerate()
            .filter(|(_, orphan)| orphan.year == Some(slot.year))
            .min_by_key(|(_, orphan)| orphan.start_date())
            .map(|(index, _)| index);
        if let Some(index) = earliest {
            let orphan = pool.remove(index);
            slot.primary = orphan.merged_into(&slot.primary);
            reattached += 1;
        }
    }

    for orphan in pool {
        let slot = orphan
            .year
            .and_then(|year| timeline.slots.iter_mut().find(|slot| slot.year == year));
        match slot {
            Some(slot) => {
                slot.absorb(orphan);
                reattached += 1;
            }
            None => timeline.unmatched.push(orphan),
        }
    }
    reattached
}

/// Ghost-only skeleton 1..=max ordinal, derived from `(year, ordinal)` observations alone.
pub fn blank_timeline(
    pairs: &[YearOrdinalPair],
    frequency: i64,
    max_editions: u64,
) -> Vec<YearOrdinalPair> {
    let Some(anchor) = pairs.iter().max_by_key(|pair| pair.ordinal) else {
        return Vec::new();
    };
    let Some(inception) = inception_year(*anchor, frequency, max_editions) else {
        return Vec::new();
    };
    (1..=anchor.ordinal)
        .map(|ordinal| YearOrdinalPair::new(inception + ordinal * frequency, ordinal))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn confirmed(source: &str, title: &str, year: i64, ordinal: i64) -> EventRecord {
        EventRecord::new(source)
            .with_title(title)
            .with_year(year)
            .with_ordinal(ordinal)
    }

    #[test]
    fn test_fills_gaps_with_ghosts() {
        let records = vec![
            confirmed("dblp", "1st Workshop", 2006, 1),
            confirmed("dblp", "2nd Workshop", 2007, 2),
            confirmed("dblp", "5th Workshop", 2010, 5),
        ];
        let synthesis = synthesize(records, Vec::new(), 1, true, DEFAULT_MAX_EDITIONS);
        let timeline = synthesis.timeline;

        assert_eq!(
            timeline.pairs(),
            (1..=5).map(|k| YearOrdinalPair::new(2005 + k, k)).collect::<Vec<_>>()
        );
        assert_eq!(timeline.ghost_count(), 2);
        assert!(timeline.slots[2].is_ghost());
        assert!(timeline.slots[3].is_ghost());
        assert_eq!(synthesis.reattached, 0);
    }

    #[test]
    fn test_biennial_series_inception() {
        let records = vec![
            confirmed("dblp", "3rd Symposium", 2004, 3),
            confirmed("dblp", "5th Symposium", 2008, 5),
        ];
        let timeline = synthesize(records, Vec::new(), 2, true, DEFAULT_MAX_EDITIONS).timeline;
        assert_eq!(timeline.slots[0].year, 2000);
        assert_eq!(timeline.slots[1].year, 2002);
        assert_eq!(timeline.slots.len(), 5);
    }

    #[test]
    fn test_same_edition_records_share_a_slot() {
        let records = vec![
            confirmed("tibkat", "AAAI-08 ; Vol. 2", 2008, 23),
            confirmed("tibkat", "Proceedings of the Twenty-Third AAAI Conference ; Vol. 1", 2008, 23),
            confirmed("dblp", "AAAI 2009", 2009, 24),
        ];
        let timeline = synthesize(records, Vec::new(), 1, true, DEFAULT_MAX_EDITIONS).timeline;

        let slot = &timeline.slots[22];
        assert_eq!(slot.ordinal, 23);
        assert_eq!(
            slot.primary.title.as_deref(),
            Some("Proceedings of the Twenty-Third AAAI Conference ; Vol. 1")
        );
        assert_eq!(slot.duplicates.len(), 1);
        assert_eq!(timeline.record_count(), 3 + 22);
    }

    #[test]
    fn test_orphan_with_earliest_start_date_fills_ghost() {
        let records = vec![
            confirmed("dblp", "1st Workshop", 2001, 1),
            confirmed("dblp", "3rd Workshop", 2003, 3),
        ];
        let orphans = vec![
            EventRecord::new("wikicfp")
                .with_title("Workshop 2002 (late)")
                .with_year(2002)
                .with_attribute("startDate", json!("2002-10-01")),
            EventRecord::new("crossref")
                .with_title("Workshop 2002")
                .with_year(2002)
                .with_attribute("startDate", json!("2002-05-01")),
            EventRecord::new("gnd").with_title("Workshop 1999").with_year(1999),
        ];

        let synthesis = synthesize(records, orphans, 1, true, DEFAULT_MAX_EDITIONS);
        let timeline = synthesis.timeline;
        assert_eq!(synthesis.reattached, 2);

        let filled = &timeline.slots[1];
        assert_eq!(filled.primary.title.as_deref(), Some("Workshop 2002"));
        assert_eq!(filled.primary.ordinal, Some(2));
        assert_eq!(filled.duplicates.len(), 1);
        assert_eq!(filled.duplicates[0].ordinal, Some(2));

        assert_eq!(timeline.unmatched.len(), 1);
        assert_eq!(timeline.unmatched[0].year, Some(1999));
        assert_eq!(timeline.ghost_count(), 0);
    }

    #[test]
    fn test_orphan_joins_confirmed_slot_of_its_year() {
        let records = vec![
            confirmed("dblp", "1st Workshop", 2001, 1),
            confirmed("dblp", "2nd Workshop", 2002, 2),
        ];
        let orphans = vec![EventRecord::new("gnd").with_title("Workshop").with_year(2002)];
        let synthesis = synthesize(records, orphans, 1, true, DEFAULT_MAX_EDITIONS);

        assert_eq!(synthesis.reattached, 1);
        assert_eq!(synthesis.timeline.slots[1].duplicates[0].source.as_deref(), Some("gnd"));
        assert!(synthesis.timeline.unmatched.is_empty());
    }

    #[test]
    fn test_reattach_disabled_keeps_orphans_unmatched() {
        let records = vec![
            confirmed("dblp", "1st Workshop", 2001, 1),
            confirmed("dblp", "3rd Workshop", 2003, 3),
        ];
        let orphans = vec![EventRecord::new("gnd").with_year(2002)];
        let synthesis = synthesize(records, orphans, 1, false, DEFAULT_MAX_EDITIONS);
        assert_eq!(synthesis.reattached, 0);
        assert_eq!(synthesis.timeline.unmatched.len(), 1);
        assert_eq!(synthesis.timeline.ghost_count(), 1);
    }

    #[test]
    fn test_zero_frequency_passes_through() {
        let records = vec![
            confirmed("dblp", "2nd Workshop", 2002, 2),
            confirmed("dblp", "1st Workshop", 2000, 1),
            confirmed("gnd", "1st Workshop", 2000, 1),
        ];
        let orphans = vec![EventRecord::new("gnd").with_year(2001)];
        let synthesis = synthesize(records, orphans, 0, true, DEFAULT_MAX_EDITIONS);
        let timeline = synthesis.timeline;

        assert_eq!(timeline.pairs(), vec![YearOrdinalPair::new(2000, 1), YearOrdinalPair::new(2002, 2)]);
        assert_eq!(timeline.ghost_count(), 0);
        assert_eq!(timeline.unmatched.len(), 1);
        assert_eq!(timeline.record_count(), 4);
    }

    #[test]
    fn test_blank_timeline() {
        let pairs = vec![
            YearOrdinalPair::new(2006, 1),
            YearOrdinalPair::new(2007, 2),
            YearOrdinalPair::new(2017, 12),
        ];
        let blank = blank_timeline(&pairs, 1, DEFAULT_MAX_EDITIONS);
        assert_eq!(blank.len(), 12);
        assert_eq!(blank.first(), Some(&YearOrdinalPair::new(2006, 1)));
        assert_eq!(blank.last(), Some(&YearOrdinalPair::new(2017, 12)));

        assert!(blank_timeline(&pairs, 0, DEFAULT_MAX_EDITIONS).is_empty());
        assert!(blank_timeline(&[], 1, DEFAULT_MAX_EDITIONS).is_empty());
    }

    #[test]
    fn test_inception_limits() {
        let anchor = YearOrdinalPair::new(2017, 12);
        assert_eq!(inception_year(anchor, 1, DEFAULT_MAX_EDITIONS), Some(2005));
        assert_eq!(inception_year(anchor, 1, 11), None);
        assert_eq!(inception_year(anchor, 0, DEFAULT_MAX_EDITIONS), None);
        assert_eq!(inception_year(YearOrdinalPair::new(2000, 1 << 62), 2, u64::MAX), None);
        assert_eq!(inception_year(YearOrdinalPair::new(i64::MIN, 1), 1, DEFAULT_MAX_EDITIONS), None);
    }

    #[test]
    fn test_oversized_timeline_passes_through() {
        let records = vec![
            confirmed("dblp", "Workshop", 2000, 1 << 62),
            confirmed("dblp", "Workshop", 2002, (1 << 62) + 1),
        ];
        let orphans = vec![EventRecord::new("gnd").with_year(2001)];
        let synthesis = synthesize(records, orphans, 2, true, DEFAULT_MAX_EDITIONS);
        assert_eq!(synthesis.reattached, 0);
        assert_eq!(synthesis.timeline.slots.len(), 2);
        assert_eq!(synthesis.timeline.unmatched.len(), 1);

        let records = vec![
            confirmed("dblp", "Workshop", 2000, 5_000),
            confirmed("dblp", "Workshop", 2001, 5_001),
        ];
        let timeline = synthesize(records, Vec::new(), 1, true, DEFAULT_MAX_EDITIONS).timeline;
        assert_eq!(timeline.ghost_count(), 0);
        assert_eq!(timeline.slots.len(), 2);

        let pairs = vec![
            YearOrdinalPair::new(2000, 1 << 62),
            YearOrdinalPair::new(2002, (1 << 62) + 1),
        ];
        assert!(blank_timeline(&pairs, 2, DEFAULT_MAX_EDITIONS).is_empty());
    }
}
