//! Deadline normalisation for forward-looking statements.
//!
//! Finds time expressions in a sentence ("Q4 2024", "by March 2025",
//! "in the coming months") and maps each to a concrete calendar date, or
//! leaves it unparsed when the phrase is too vague to pin down.
//!
//! # Rules
//!
//! - Quarter (`Q3 2025`, `third quarter of 2025`): last calendar day of the quarter
//! - Half (`H1 2025`, `second half of 2025`): 30 June or 31 December
//! - Month (`March 2025`, `Mar. 2025`): last day of the month
//! - Exact date (`2025-03-15`, `03/15/2025`, `March 15, 2025`): that date
//! - Year (`end of 2025`, `year-end 2025`, `in 2026`): 31 December
//! - Vague (`in the coming months`, `later this year`, `in due course`): unresolved
//!
//! Quarter ends are calendar days, not business days. Relative phrases are
//! never resolved against the statement date.

use chrono::{Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

const MONTHS: &str = "january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec";

/// Outcome of normalising one time expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "date", rename_all = "snake_case")]
pub enum DeadlineParse {
    Resolved(NaiveDate),
    /// Recognised as a deadline phrase but too vague to date.
    Unresolved,
}

impl DeadlineParse {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            DeadlineParse::Resolved(d) => Some(*d),
            DeadlineParse::Unresolved => None,
        }
    }
}

/// A time expression found in text, with its byte span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlineMatch {
    pub start: usize,
    pub end: usize,
    pub expression: String,
    pub parse: DeadlineParse,
}

type Builder = fn(&Captures) -> Option<DeadlineParse>;

/// Patterns in priority order. A later pattern never claims text an earlier one matched.
static PATTERNS: Lazy<Vec<(Regex, Builder)>> = Lazy::new(|| {
    let table: Vec<(String, Builder)> = vec![
        (r"\b(\d{4})-(\d{2})-(\d{2})\b".to_string(), iso_date),
        (r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b".to_string(), us_date),
        (
            format!(r"\b({MONTHS})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b"),
            month_day_year,
        ),
        (r"\bQ([1-4])(?:\s+of)?\s*'?(\d{4})\b".to_string(), quarter),
        (
            r"\b(first|second|third|fourth|1st|2nd|3rd|4th)\s+quarter\s+(?:of\s+)?(\d{4})\b"
                .to_string(),
            ordinal_quarter,
        ),
        (r"\bH([12])\s*(\d{4})\b".to_string(), half),
        (
            r"\b(first|second|1st|2nd)\s+half\s+(?:of\s+)?(\d{4})\b".to_string(),
            ordinal_half,
        ),
        (format!(r"\b({MONTHS})\.?\s+(?:of\s+)?(\d{{4}})\b"), month_year),
        (
            r"\b(?:(?:the\s+)?end\s+of\s+|year[-\s]?end\s+)(\d{4})\b".to_string(),
            year_end,
        ),
        (r"\b(?:in|by|during|within)\s+(\d{4})\b".to_string(), year_end),
        (
            r"\b(?:in\s+the\s+coming\s+(?:weeks|months|quarters)|later\s+this\s+year|in\s+due\s+course|in\s+the\s+near\s+future|near[-\s]term|next\s+year|shortly|soon)\b"
                .to_string(),
            vague,
        ),
    ];
    table
        .into_iter()
        .map(|(pattern, build)| {
            let re = Regex::new(&format!("(?i){pattern}")).expect("deadline pattern compiles");
            (re, build)
        })
        .collect()
});

/// Find every time expression in `text`, ordered by position.
///
/// Matches never overlap: where two patterns cover the same text, the one
/// listed first in the rule table wins.
pub fn find_deadlines(text: &str) -> Vec<DeadlineMatch> {
    let mut found: Vec<DeadlineMatch> = Vec::new();
    for (re, build) in PATTERNS.iter() {
        for caps in re.captures_iter(text) {
            let Some(m) = caps.get(0) else { continue };
            if found.iter().any(|f| m.start() < f.end && f.start < m.end()) {
                continue;
            }
            // A pattern that matches but yields an impossible date (month 13,
            // 31 February) is not a deadline phrase.
            let Some(parse) = build(&caps) else { continue };
            found.push(DeadlineMatch {
                start: m.start(),
                end: m.end(),
                expression: m.as_str().to_string(),
                parse,
            });
        }
    }
    found.sort_by_key(|f| f.start);
    found
}

/// Normalise a single expression. Text with no recognisable deadline is unresolved.
pub fn normalize_deadline(expression: &str) -> DeadlineParse {
    find_deadlines(expression)
        .into_iter()
        .next()
        .map(|m| m.parse)
        .unwrap_or(DeadlineParse::Unresolved)
}

/// Last calendar day of `month` in `year`.
pub fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

/// Last calendar day of quarter `q` (1–4).
pub fn quarter_end(year: i32, q: u32) -> Option<NaiveDate> {
    if !(1..=4).contains(&q) {
        return None;
    }
    month_end(year, q * 3)
}

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    let n = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}

fn ordinal(word: &str) -> Option<u32> {
    match word.to_ascii_lowercase().as_str() {
        "first" | "1st" => Some(1),
        "second" | "2nd" => Some(2),
        "third" | "3rd" => Some(3),
        "fourth" | "4th" => Some(4),
        _ => None,
    }
}

fn num<T: std::str::FromStr>(caps: &Captures, i: usize) -> Option<T> {
    caps.get(i)?.as_str().parse().ok()
}

fn year(caps: &Captures, i: usize) -> Option<i32> {
    num::<i32>(caps, i).filter(|y| (1900..=2199).contains(y))
}

fn iso_date(caps: &Captures) -> Option<DeadlineParse> {
    let d = NaiveDate::from_ymd_opt(year(caps, 1)?, num(caps, 2)?, num(caps, 3)?)?;
    Some(DeadlineParse::Resolved(d))
}

fn us_date(caps: &Captures) -> Option<DeadlineParse> {
    let d = NaiveDate::from_ymd_opt(year(caps, 3)?, num(caps, 1)?, num(caps, 2)?)?;
    Some(DeadlineParse::Resolved(d))
}

fn month_day_year(caps: &Captures) -> Option<DeadlineParse> {
    let month = month_number(caps.get(1)?.as_str())?;
    let d = NaiveDate::from_ymd_opt(year(caps, 3)?, month, num(caps, 2)?)?;
    Some(DeadlineParse::Resolved(d))
}

fn quarter(caps: &Captures) -> Option<DeadlineParse> {
    quarter_end(year(caps, 2)?, num(caps, 1)?).map(DeadlineParse::Resolved)
}

fn ordinal_quarter(caps: &Captures) -> Option<DeadlineParse> {
    quarter_end(year(caps, 2)?, ordinal(caps.get(1)?.as_str())?).map(DeadlineParse::Resolved)
}

fn half_end(year: i32, h: u32) -> Option<NaiveDate> {
    match h {
        1 => month_end(year, 6),
        2 => month_end(year, 12),
        _ => None,
    }
}

fn half(caps: &Captures) -> Option<DeadlineParse> {
    half_end(year(caps, 2)?, num(caps, 1)?).map(DeadlineParse::Resolved)
}

fn ordinal_half(caps: &Captures) -> Option<DeadlineParse> {
    half_end(year(caps, 2)?, ordinal(caps.get(1)?.as_str())?).map(DeadlineParse::Resolved)
}

fn month_year(caps: &Captures) -> Option<DeadlineParse> {
    let month = month_number(caps.get(1)?.as_str())?;
    month_end(year(caps, 2)?, month).map(DeadlineParse::Resolved)
}

fn year_end(caps: &Captures) -> Option<DeadlineParse> {
    month_end(year(caps, 1)?, 12).map(DeadlineParse::Resolved)
}

fn vague(_caps: &Captures) -> Option<DeadlineParse> {
    Some(DeadlineParse::Unresolved)
}

/// Whole days from `from` to `to` (negative when `to` is earlier).
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// True when `date` falls within `[from, from + days]`.
pub fn within_days(from: NaiveDate, date: NaiveDate, days: u32) -> bool {
    let delta = days_between(from, date);
    (0..=i64::from(days)).contains(&delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn resolved(expr: &str) -> Option<NaiveDate> {
        normalize_deadline(expr).date()
    }

    #[test]
    fn quarter_maps_to_last_calendar_day() {
        assert_eq!(resolved("Q4 2024"), Some(date(2024, 12, 31)));
        assert_eq!(resolved("Q1 2025"), Some(date(2025, 3, 31)));
        assert_eq!(resolved("q2 of 2025"), Some(date(2025, 6, 30)));
        assert_eq!(resolved("third quarter of 2025"), Some(date(2025, 9, 30)));
    }

    #[test]
    fn month_maps_to_month_end() {
        assert_eq!(resolved("March 2025"), Some(date(2025, 3, 31)));
        assert_eq!(resolved("by Feb. 2024"), Some(date(2024, 2, 29)));
        assert_eq!(resolved("September 2025"), Some(date(2025, 9, 30)));
        assert_eq!(resolved("Sept 2025"), Some(date(2025, 9, 30)));
    }

    #[test]
    fn halves_map_to_half_end() {
        assert_eq!(resolved("H1 2025"), Some(date(2025, 6, 30)));
        assert_eq!(resolved("second half of 2025"), Some(date(2025, 12, 31)));
    }

    #[test]
    fn exact_dates() {
        assert_eq!(resolved("2025-03-15"), Some(date(2025, 3, 15)));
        assert_eq!(resolved("03/15/2025"), Some(date(2025, 3, 15)));
        assert_eq!(resolved("March 15, 2025"), Some(date(2025, 3, 15)));
        assert_eq!(resolved("March 15th 2025"), Some(date(2025, 3, 15)));
    }

    #[test]
    fn year_forms_map_to_december_31() {
        assert_eq!(resolved("by the end of 2025"), Some(date(2025, 12, 31)));
        assert_eq!(resolved("year-end 2025"), Some(date(2025, 12, 31)));
        assert_eq!(resolved("in 2026"), Some(date(2026, 12, 31)));
    }

    #[test]
    fn vague_phrases_stay_unresolved() {
        for phrase in [
            "in the coming months",
            "later this year",
            "in due course",
            "in the near future",
            "next year",
        ] {
            let found = find_deadlines(phrase);
            assert_eq!(found.len(), 1, "{phrase}");
            assert_eq!(found[0].parse, DeadlineParse::Unresolved, "{phrase}");
        }
    }

    #[test]
    fn no_phrase_is_unresolved_and_not_found() {
        assert!(find_deadlines("We remain committed to patients.").is_empty());
        assert_eq!(normalize_deadline("whenever"), DeadlineParse::Unresolved);
    }

    #[test]
    fn impossible_dates_are_ignored() {
        assert!(find_deadlines("on 2025-02-30").is_empty());
        assert!(find_deadlines("on 13/01/2025").is_empty());
    }

    #[test]
    fn specific_form_wins_over_month_year() {
        let found = find_deadlines("The PDUFA date is March 15, 2025.");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].expression, "March 15, 2025");
        assert_eq!(found[0].parse, DeadlineParse::Resolved(date(2025, 3, 15)));
    }

    #[test]
    fn multiple_expressions_in_order() {
        let found = find_deadlines("Enrollment by Q2 2025 and topline data in H2 2025.");
        let dates: Vec<_> = found.iter().map(|m| m.parse.date()).collect();
        assert_eq!(dates, vec![Some(date(2025, 6, 30)), Some(date(2025, 12, 31))]);
    }

    #[test]
    fn deterministic() {
        for _ in 0..3 {
            assert_eq!(resolved("Q4 2024"), Some(date(2024, 12, 31)));
        }
    }

    #[test]
    fn month_end_handles_december_and_leap_years() {
        assert_eq!(month_end(2024, 12), Some(date(2024, 12, 31)));
        assert_eq!(month_end(2023, 2), Some(date(2023, 2, 28)));
        assert_eq!(quarter_end(2024, 5), None);
    }

    #[test]
    fn within_days_window() {
        let from = date(2025, 1, 1);
        assert!(within_days(from, date(2025, 1, 31), 30));
        assert!(!within_days(from, date(2025, 2, 1), 30));
        assert!(!within_days(from, date(2024, 12, 31), 30));
    }
}
