//! Human-readable date descriptions for event occasions and weekly recurrence rules.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Deserializer};

/// Single entry returned when a record carries no usable dates.
pub const DATE_NOT_SPECIFIED: &str = "Date not specified";

const WEEKEND_TERMS: [&str; 4] = ["helgen", "weekend", "helg", "veckoslut"];

/// A discrete occasion with an optional end.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Occasion {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// A weekly recurrence with explicitly excluded dates.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecurrenceRule {
    #[serde(rename = "rcrWeekDay")]
    pub weekday: Option<String>,
    #[serde(rename = "rcrStartDate")]
    pub start_date: Option<String>,
    #[serde(rename = "rcrEndDate")]
    pub end_date: Option<String>,
    #[serde(rename = "rcrStartTime")]
    pub start_time: Option<String>,
    #[serde(rename = "rcrEndTime")]
    pub end_time: Option<String>,
    #[serde(rename = "rcrWeeklyInterval", deserialize_with = "lenient_interval")]
    pub weekly_interval: Option<u32>,
    #[serde(rename = "rcrExceptions", deserialize_with = "null_as_empty")]
    pub exceptions: Vec<RecurrenceException>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecurrenceException {
    #[serde(rename = "rcrExcDate")]
    pub date: Option<String>,
}

/// Expand occasions and recurrence rules into display strings.
///
/// Occasion entries come first, in input order, followed by one entry per
/// complete rule, each immediately followed by its `Except:` entry when the
/// rule has exception dates. Never returns an empty list.
pub fn format_dates(occasions: &[Occasion], rules: &[RecurrenceRule]) -> Vec<String> {
    let mut formatted = Vec::new();

    for occasion in occasions {
        let start = non_empty(&occasion.start_date);
        let end = non_empty(&occasion.end_date);
        match (start, end) {
            (Some(s), Some(e)) if s != e => formatted.push(format!("{} to {}", s, e)),
            (Some(s), _) => formatted.push(s.to_string()),
            (None, _) => {}
        }
    }

    for rule in rules {
        let (Some(weekday), Some(start), Some(end)) = (
            non_empty(&rule.weekday),
            non_empty(&rule.start_date),
            non_empty(&rule.end_date),
        ) else {
            continue;
        };

        let mut line = format!("Every {}", weekday);
        if let Some(time) = non_empty(&rule.start_time) {
            line.push_str(&format!(" at {}", time));
        }
        line.push_str(&format!(", {} - {}", month_day(start), month_day(end)));
        if let Some((year, _, _)) = split_ymd(start) {
            line.push_str(&format!(", {}", year));
        }
        let interval = rule.weekly_interval.unwrap_or(1);
        if interval > 1 {
            line.push_str(&format!(" (every {} weeks)", interval));
        }
        formatted.push(line);

        let excluded: Vec<String> = rule
            .exceptions
            .iter()
            .filter_map(|exc| non_empty(&exc.date))
            .map(month_day)
            .collect();
        if !excluded.is_empty() {
            formatted.push(format!("Except: {}", excluded.join(", ")));
        }
    }

    if formatted.is_empty() {
        formatted.push(DATE_NOT_SPECIFIED.to_string());
    }
    formatted
}

/// Next Saturday and Sunday on or after `today`.
pub fn upcoming_weekend(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let from_monday = today.weekday().num_days_from_monday() as i64;
    let until_saturday = (5 - from_monday).rem_euclid(7);
    let saturday = today + Duration::days(until_saturday);
    (saturday, saturday + Duration::days(1))
}

/// Append explicit weekend dates to a query that mentions "the weekend".
pub fn with_weekend_hint(query: &str, today: NaiveDate) -> String {
    let lowered = query.to_lowercase();
    if !WEEKEND_TERMS.iter().any(|term| lowered.contains(term)) {
        return query.to_string();
    }
    let (saturday, sunday) = upcoming_weekend(today);
    format!(
        "{} (referring to dates {} to {})",
        query,
        saturday.format("%Y-%m-%d"),
        sunday.format("%Y-%m-%d")
    )
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn split_ymd(date: &str) -> Option<(&str, &str, &str)> {
    let mut parts = date.splitn(3, '-');
    let year = parts.next()?;
    let month = parts.next()?;
    let day = parts.next()?;
    // Tolerate a trailing time component ("2025-07-01T00:00:00").
    let day = day.split(|c: char| !c.is_ascii_digit()).next()?;
    if year.len() != 4 || month.is_empty() || day.is_empty() {
        return None;
    }
    Some((year, month, day))
}

/// `MM/DD` for ISO dates; anything else is passed through unchanged.
fn month_day(date: &str) -> String {
    match split_ymd(date) {
        Some((_, month, day)) => format!("{}/{}", month, day),
        None => date.to_string(),
    }
}

fn lenient_interval<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
