use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 來源端的原始屬性集合，未知欄位原封不動保留
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

/// One observed instance of an event, as delivered by an ingestion adapter.
///
/// `title`, `year`, `ordinal` and `source` are lifted out of the attribute bag;
/// every other attribute stays in `extra` and is written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Record", into = "Record")]
pub struct EventRecord {
    pub title: Option<String>,
    pub year: Option<i64>,
    pub ordinal: Option<i64>,
    pub source: Option<String>,
    pub extra: HashMap<String, serde_json::Value>,
}

const START_DATE_KEYS: [&str; 2] = ["startDate", "start_date"];

impl EventRecord {
    pub fn new(source: &str) -> Self {
        Self {
            source: Some(source.to_string()),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_year(mut self, year: i64) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_ordinal(mut self, ordinal: i64) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    pub fn with_attribute(mut self, key: &str, value: serde_json::Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// 建立只有年份與序數的佔位紀錄 (ghost event)
    pub fn ghost(year: i64, ordinal: i64) -> Self {
        Self {
            year: Some(year),
            ordinal: Some(ordinal),
            ..Default::default()
        }
    }

    pub fn is_ghost(&self) -> bool {
        self.title.is_none()
            && self.source.is_none()
            && self.extra.is_empty()
            && self.year.is_some()
            && self.ordinal.is_some()
    }

    pub fn year_ordinal(&self) -> Option<YearOrdinalPair> {
        Some(YearOrdinalPair::new(self.year?, self.ordinal?))
    }

    /// 讀取開始日期，支援 `2020-05-01` 以及帶時間的 ISO 字串
    pub fn start_date(&self) -> Option<NaiveDate> {
        START_DATE_KEYS
            .iter()
            .filter_map(|key| self.extra.get(*key))
            .filter_map(|value| value.as_str())
            .find_map(|raw| {
                let date_part = raw.get(..10).unwrap_or(raw);
                NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
            })
    }

    /// Overlays this record's attributes onto a ghost slot; the slot keeps its year and ordinal.
    pub fn merged_into(self, ghost: &EventRecord) -> EventRecord {
        let mut merged = self;
        merged.year = ghost.year.or(merged.year);
        merged.ordinal = ghost.ordinal.or(merged.ordinal);
        merged
    }
}

/// 解析整數或數字字串
fn int_from_value(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn take_int(data: &mut HashMap<String, serde_json::Value>, key: &str) -> Option<i64> {
    let parsed = match data.get(key)? {
        serde_json::Value::Null => None,
        value => Some(int_from_value(value)),
    };
    match parsed {
        // 無法解析的值留在 extra，輸出時原樣寫回
        Some(None) => None,
        Some(Some(n)) => {
            data.remove(key);
            Some(n)
        }
        None => {
            data.remove(key);
            None
        }
    }
}

fn take_string(data: &mut HashMap<String, serde_json::Value>, key: &str) -> Option<String> {
    match data.get(key)? {
        serde_json::Value::String(_) => match data.remove(key) {
            Some(serde_json::Value::String(s)) => Some(s),
            _ => None,
        },
        serde_json::Value::Null => {
            data.remove(key);
            None
        }
        _ => None,
    }
}

impl From<Record> for EventRecord {
    fn from(record: Record) -> Self {
        let mut data = record.data;
        let title = take_string(&mut data, "title");
        let source = take_string(&mut data, "source");
        let year = take_int(&mut data, "year");
        let ordinal = take_int(&mut data, "ordinal");
        Self {
            title,
            year,
            ordinal,
            source,
            extra: data,
        }
    }
}

impl From<EventRecord> for Record {
    fn from(event: EventRecord) -> Self {
        let mut data = event.extra;
        if let Some(title) = event.title {
            data.insert("title".to_string(), serde_json::Value::String(title));
        }
        if let Some(source) = event.source {
            data.insert("source".to_string(), serde_json::Value::String(source));
        }
        if let Some(year) = event.year {
            data.insert("year".to_string(), serde_json::Value::from(year));
        }
        if let Some(ordinal) = event.ordinal {
            data.insert("ordinal".to_string(), serde_json::Value::from(ordinal));
        }
        Record { data }
    }
}

/// `(year, ordinal)`，系列時間軸的最小單位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearOrdinalPair {
    pub year: i64,
    pub ordinal: i64,
}

impl YearOrdinalPair {
    pub fn new(year: i64, ordinal: i64) -> Self {
        Self { year, ordinal }
    }
}

impl From<(i64, i64)> for YearOrdinalPair {
    fn from((year, ordinal): (i64, i64)) -> Self {
        Self::new(year, ordinal)
    }
}

impl fmt::Display for YearOrdinalPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.year, self.ordinal)
    }
}

/// One edition of the completed timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSlot {
    pub ordinal: i64,
    pub year: i64,
    /// Best-scoring record for this edition, or the ghost placeholder.
    pub primary: EventRecord,
    /// Further records describing the same edition (split volumes, other sources).
    pub duplicates: Vec<EventRecord>,
}

impl TimelineSlot {
    pub fn ghost(year: i64, ordinal: i64) -> Self {
        Self {
            ordinal,
            year,
            primary: EventRecord::ghost(year, ordinal),
            duplicates: Vec::new(),
        }
    }

    pub fn is_ghost(&self) -> bool {
        self.primary.is_ghost() && self.duplicates.is_empty()
    }

    /// Attaches a record to this edition, rewriting its ordinal to the slot's.
    pub fn absorb(&mut self, mut record: EventRecord) {
        record.ordinal = Some(self.ordinal);
        self.duplicates.push(record);
    }

    pub fn record_count(&self) -> usize {
        1 + self.duplicates.len()
    }
}

/// 依序數排列的完整時間軸，加上無法對應的紀錄
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesTimeline {
    pub slots: Vec<TimelineSlot>,
    pub unmatched: Vec<EventRecord>,
}

impl SeriesTimeline {
    pub fn ghost_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_ghost()).count()
    }

    pub fn pairs(&self) -> Vec<YearOrdinalPair> {
        self.slots
            .iter()
            .map(|slot| YearOrdinalPair::new(slot.year, slot.ordinal))
            .collect()
    }

    pub fn record_count(&self) -> usize {
        self.slots.iter().map(TimelineSlot::record_count).sum::<usize>() + self.unmatched.len()
    }

    /// 攤平成輸出格式：各版次 (主紀錄在前)，最後附上未對應紀錄
    pub fn into_records(self) -> Vec<EventRecord> {
        let mut records = Vec::with_capacity(self.record_count());
        for slot in self.slots {
            records.push(slot.primary);
            records.extend(slot.duplicates);
        }
        records.extend(self.unmatched);
        records
    }
}

/// How a completion run ended; logged per series and returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum CompletionOutcome {
    /// Nothing with ordinal evidence to work with.
    Empty,
    /// Ordinals resolved and the timeline completed with ghosts.
    Completed {
        frequency: i64,
        ghosts: usize,
        reattached: usize,
    },
    /// Ordinals resolved but no single frequency; no ghosts were added.
    UnsupportedFrequency,
    /// The candidate ordinals contradict the chronology; input returned unchanged.
    Infeasible,
    /// Processing the series aborted; input returned unchanged.
    Failed,
}

impl CompletionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CompletionOutcome::Empty => "empty",
            CompletionOutcome::Completed { .. } => "completed",
            CompletionOutcome::UnsupportedFrequency => "unsupported_frequency",
            CompletionOutcome::Infeasible => "infeasible",
            CompletionOutcome::Failed => "failed",
        }
    }
}

/// 一個系列的原始紀錄 (批次輸入)
#[derive(Debug, Clone)]
pub struct SeriesRecords {
    pub name: String,
    pub records: Vec<EventRecord>,
}

/// 一個系列的處理結果
#[derive(Debug, Clone)]
pub struct SeriesResult {
    pub name: String,
    pub records: Vec<EventRecord>,
    pub blank_timeline: Vec<YearOrdinalPair>,
    /// `None` when only the blank timeline was requested
    pub outcome: Option<CompletionOutcome>,
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub series: Vec<SeriesResult>,
}

impl TransformResult {
    pub fn outcome_counts(&self) -> HashMap<&'static str, usize> {
        let mut counts = HashMap::new();
        for result in &self.series {
            let label = result
                .outcome
                .as_ref()
                .map_or("blank_only", CompletionOutcome::label);
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }
}
