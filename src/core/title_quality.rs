use crate::core::ordinal::volume_number;
use crate::domain::model::EventRecord;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static RE_VOLUME_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:volume|vol|part|pt)(?:\.\s*|\s+)([0-9]+|[a-z]+)\b").unwrap()
});

/// 找出 "Vol. 2"、"Part III"、"Pt. A" 之類的分冊標記，回傳分冊號
pub fn volume_marker(title: &str) -> Option<i64> {
    RE_VOLUME_MARKER
        .captures_iter(title)
        .find_map(|caps| volume_number(caps.get(1)?.as_str()))
}

fn special_character_count(title: &str) -> usize {
    title
        .chars()
        .filter(|c| !c.is_alphanumeric() && *c != ' ')
        .count()
}

/// How likely `title` is the canonical description of an edition.
///
/// Additive and bounded per signal: "proceeding" (+1), "conference" (+1), a volume
/// marker (+1/volume, so volume 1 beats volume 2) and few special characters
/// (+1/(2·max(1, count))).
pub fn score(title: Option<&str>) -> f64 {
    let Some(title) = title else {
        return 0.0;
    };
    let lowered = title.to_lowercase();
    let mut score = 0.0;
    if lowered.contains("proceeding") {
        score += 1.0;
    }
    if lowered.contains("conference") {
        score += 1.0;
    }
    if let Some(volume) = volume_marker(title) {
        score += 1.0 / volume as f64;
    }
    score += 1.0 / (2.0 * special_character_count(title).max(1) as f64);
    score
}

pub fn record_score(record: &EventRecord) -> f64 {
    score(record.title.as_deref())
}

/// Stable reorder putting the best-titled record first.
pub fn best_first(records: &mut [EventRecord]) {
    records.sort_by(|a, b| record_score(b).total_cmp(&record_score(a)));
}

/// Keeps only the best-titled record(s) per source and year.
///
/// Records of different sources never compete with each other; records without a
/// year are kept. Input order is preserved.
pub fn filter_duplicates_by_title(records: Vec<EventRecord>) -> Vec<EventRecord> {
    let scores: Vec<f64> = records.iter().map(record_score).collect();

    let mut best: HashMap<(Option<&str>, i64), f64> = HashMap::new();
    for (record, score) in records.iter().zip(&scores) {
        if let Some(year) = record.year {
            let entry = best
                .entry((record.source.as_deref(), year))
                .or_insert(f64::MIN);
            if *score > *entry {
                *entry = *score;
            }
        }
    }

    let keep: Vec<bool> = records
        .iter()
        .zip(&scores)
        .map(|(record, score)| match record.year {
            Some(year) => best
                .get(&(record.source.as_deref(), year))
                .is_some_and(|max| (score - max).abs() < f64::EPSILON),
            None => true,
        })
        .collect();

    let before = records.len();
    let kept: Vec<EventRecord> = records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, keep)| keep.then_some(record))
        .collect();

    if kept.len() < before {
        tracing::debug!(
            "Title filter dropped {} of {} records",
            before - kept.len(),
            before
        );
    }
    kept
}
