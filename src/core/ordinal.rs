//! Ordinal evidence in free-text event titles.
//!
//! Two independent scans run over a title and their results are unioned: a numeric
//! scan ("36th", "2ND") and a scan for spelled-out English ordinals ("Twenty-Third",
//! "twenty third") in the range 1..=99.

use crate::domain::model::EventRecord;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Highest ordinal recognised in spelled-out form.
pub const MAX_WORD_ORDINAL: i64 = 99;

static RE_NUMERIC_ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)(?:st|nd|rd|th)\b").unwrap());

const UNIT_ORDINALS: [&str; 10] = [
    "", "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth",
];

const TEEN_ORDINALS: [&str; 10] = [
    "tenth",
    "eleventh",
    "twelfth",
    "thirteenth",
    "fourteenth",
    "fifteenth",
    "sixteenth",
    "seventeenth",
    "eighteenth",
    "nineteenth",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const TENS_ORDINALS: [&str; 10] = [
    "",
    "",
    "twentieth",
    "thirtieth",
    "fortieth",
    "fiftieth",
    "sixtieth",
    "seventieth",
    "eightieth",
    "ninetieth",
];

/// A spelled-out ordinal and the forms it is searched under.
#[derive(Debug, Clone)]
pub struct OrdinalWord {
    pub value: i64,
    /// "twenty-third"
    pub hyphenated: String,
    /// "twenty third"
    pub spaced: String,
}

/// Renders `n` (1..=99) as an English ordinal word, e.g. `23 -> "twenty-third"`.
pub fn ordinal_word(n: i64) -> Option<String> {
    if !(1..=MAX_WORD_ORDINAL).contains(&n) {
        return None;
    }
    let n = n as usize;
    let word = match n {
        1..=9 => UNIT_ORDINALS[n].to_string(),
        10..=19 => TEEN_ORDINALS[n - 10].to_string(),
        _ if n % 10 == 0 => TENS_ORDINALS[n / 10].to_string(),
        _ => format!("{}-{}", TENS[n / 10], UNIT_ORDINALS[n % 10]),
    };
    Some(word)
}

/// 序數單字表，第一次使用時建立，之後唯讀共用
static ORDINAL_WORDS: LazyLock<Vec<OrdinalWord>> = LazyLock::new(|| {
    (1..=MAX_WORD_ORDINAL)
        .filter_map(|value| {
            let hyphenated = ordinal_word(value)?;
            let spaced = hyphenated.replace('-', " ");
            Some(OrdinalWord {
                value,
                hyphenated,
                spaced,
            })
        })
        .collect()
});

pub fn ordinal_words() -> &'static [OrdinalWord] {
    &ORDINAL_WORDS
}

fn numeric_ordinals(title: &str) -> impl Iterator<Item = i64> + '_ {
    RE_NUMERIC_ORDINAL
        .captures_iter(title)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<i64>().ok())
}

#[derive(Debug, Clone, Copy)]
struct WordMatch {
    start: usize,
    end: usize,
    value: i64,
}

impl WordMatch {
    fn is_inside(&self, other: &WordMatch) -> bool {
        other.start <= self.start
            && self.end <= other.end
            && (other.end - other.start) > (self.end - self.start)
    }
}

fn spelled_ordinals(title: &str) -> Vec<i64> {
    let lowered = title.to_lowercase();
    let mut matches = Vec::new();
    for word in ordinal_words() {
        let mut forms = vec![word.hyphenated.as_str()];
        if word.spaced != word.hyphenated {
            forms.push(word.spaced.as_str());
        }
        for form in forms {
            for (start, _) in lowered.match_indices(form) {
                matches.push(WordMatch {
                    start,
                    end: start + form.len(),
                    value: word.value,
                });
            }
        }
    }

    // "first" inside "twenty-first" is part of the longer word, not a second ordinal
    matches
        .iter()
        .filter(|m| !matches.iter().any(|other| m.is_inside(other)))
        .map(|m| m.value)
        .collect()
}

/// Every plausible ordinal mentioned in `title`.
pub fn candidate_ordinals(title: Option<&str>) -> BTreeSet<i64> {
    let Some(title) = title.filter(|t| !t.trim().is_empty()) else {
        return BTreeSet::new();
    };
    numeric_ordinals(title)
        .chain(spelled_ordinals(title))
        .filter(|n| *n > 0)
        .collect()
}

/// 標題候選序數，加上紀錄本身已有的序數 (信任但不排他)
pub fn candidates_for(record: &EventRecord) -> BTreeSet<i64> {
    let mut candidates = candidate_ordinals(record.title.as_deref());
    if let Some(stated) = record.ordinal.filter(|n| *n > 0) {
        candidates.insert(stated);
    }
    candidates
}

/// Sets the record's ordinal when it has none and its title names exactly one.
///
/// Returns `true` if the record was changed.
pub fn annotate(record: &mut EventRecord) -> bool {
    if record.ordinal.is_some() {
        return false;
    }
    let candidates = candidate_ordinals(record.title.as_deref());
    if candidates.len() != 1 {
        return false;
    }
    record.ordinal = candidates.into_iter().next();
    record.ordinal.is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrdinalStyle {
    /// "12th"
    Numeric,
    /// "Twelfth"
    Spelled,
    /// both forms in one title
    Mixed,
}

pub fn ordinal_style(title: &str) -> Option<OrdinalStyle> {
    let numeric = RE_NUMERIC_ORDINAL.is_match(title);
    let spelled = !spelled_ordinals(title).is_empty();
    match (numeric, spelled) {
        (true, true) => Some(OrdinalStyle::Mixed),
        (true, false) => Some(OrdinalStyle::Numeric),
        (false, true) => Some(OrdinalStyle::Spelled),
        (false, false) => None,
    }
}

/// True when the titles of a series do not mix "12th" with "Twelfth".
pub fn is_ordinal_style_consistent(records: &[EventRecord]) -> bool {
    let mut numeric = 0;
    let mut spelled = 0;
    for title in records.iter().filter_map(|r| r.title.as_deref()) {
        match ordinal_style(title) {
            Some(OrdinalStyle::Numeric) => numeric += 1,
            Some(OrdinalStyle::Spelled) => spelled += 1,
            Some(OrdinalStyle::Mixed) => {
                numeric += 1;
                spelled += 1;
            }
            None => {}
        }
    }
    numeric == 0 || spelled == 0
}

const ROMAN_DIGITS: [(i64, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

pub fn to_roman(mut number: i64) -> String {
    let mut roman = String::new();
    for (value, digits) in ROMAN_DIGITS {
        while number >= value {
            roman.push_str(digits);
            number -= value;
        }
    }
    roman
}

/// Parses a canonical roman numeral ("XIV"); non-canonical spellings are rejected.
pub fn roman_value(token: &str) -> Option<i64> {
    let upper = token.to_ascii_uppercase();
    let mut total = 0;
    let mut previous = 0;
    for c in upper.chars().rev() {
        let value = match c {
            'I' => 1,
            'V' => 5,
            'X' => 10,
            'L' => 50,
            'C' => 100,
            'D' => 500,
            'M' => 1000,
            _ => return None,
        };
        if value < previous {
            total -= value;
        } else {
            total += value;
            previous = value;
        }
    }
    (total > 0 && to_roman(total) == upper).then_some(total)
}

/// Volume/part value normalised to an integer: `"2"`, `"II"`, `"B"` all give 2.
///
/// Arabic values have at most two digits, roman numerals stay below 100 and single
/// letters cover A..=H.
pub fn volume_number(token: &str) -> Option<i64> {
    let token = token.trim().trim_end_matches('.');
    if token.is_empty() {
        return None;
    }
    if token.chars().all(|c| c.is_ascii_digit()) {
        return if token.len() <= 2 {
            token.parse().ok().filter(|n: &i64| *n > 0)
        } else {
            None
        };
    }
    if let Some(value) = roman_value(token).filter(|n| *n < 100) {
        return Some(value);
    }
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => {
            let c = c.to_ascii_lowercase();
            ('a'..='h')
                .contains(&c)
                .then(|| c as i64 - 'a' as i64 + 1)
        }
        _ => None,
    }
}
