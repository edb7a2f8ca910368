//! Last-resort regex extraction
//!
//! Used only when the oracle is unreachable or returns garbage. A date is
//! mandatory: a title and keywords alone are not enough to create a
//! calendar commitment, so text without a recognizable date yields no
//! event.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use satchel_domain::constants::{DEFAULT_DURATION_MINUTES, DEFAULT_ORG_LABEL, DEFAULT_START_HOUR};
use satchel_domain::{ExtractedEvent, RawItem};

use crate::classify::subjects::{SubjectMatcher, SubjectOutcome};

static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("style regex"));
static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("script regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// `15 December`, `3rd March 26`, `1 May 2027`
static NAMED_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+(january|february|march|april|may|june|july|august|september|october|november|december)(?:\s+(\d{2,4}))?\b",
    )
    .expect("named date regex")
});

/// `11/03/2026`, `11/3`, `5/6/26`
static NUMERIC_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?\b").expect("numeric date regex"));

/// `9:30`, `14:05` - the colon keeps times-with-dots ("9.45") out
static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").expect("time regex"));

/// Aggressively reduce markup to plain text: style/script contents go
/// first, then remaining tags, then whitespace collapses.
pub fn strip_markup(input: &str) -> String {
    let text = STYLE_RE.replace_all(input, " ");
    let text = SCRIPT_RE.replace_all(&text, " ");
    let text = TAG_RE.replace_all(&text, " ");
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

/// Extract an event from raw text without the oracle.
///
/// Returns `None` when no date can be located (propagates upstream as
/// "no event detected"). `today` anchors year resolution so the function
/// stays pure.
pub fn extract_fallback(
    item: &RawItem,
    matcher: &SubjectMatcher,
    today: NaiveDate,
) -> Option<ExtractedEvent> {
    let text = strip_markup(&format!("{} {}", item.title, item.body));

    let date = find_named_date(&text, today).or_else(|| find_numeric_date(&text, today))?;
    let time = find_time(&text)
        .unwrap_or_else(|| NaiveTime::from_hms_opt(DEFAULT_START_HOUR, 0, 0).expect("default time"));

    let start = NaiveDateTime::new(date, time);
    let end = start + Duration::minutes(DEFAULT_DURATION_MINUTES);

    let subjects = match matcher.identify(&text) {
        SubjectOutcome::Labels(labels) => labels,
        // A date was found, so the item is worth keeping even unlabeled.
        SubjectOutcome::Ignore => vec![DEFAULT_ORG_LABEL.to_string()],
    };

    let title = item.title.trim();
    let title =
        if title.is_empty() { "School Event".to_string() } else { title.to_string() };

    Some(ExtractedEvent {
        title,
        start_time: start,
        end_time: Some(end),
        location: None,
        description: strip_markup(&item.body),
        subjects,
        source_url: None,
    })
}

/// `D Month [Year]` with day validation via the calendar itself.
fn find_named_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    for caps in NAMED_DATE_RE.captures_iter(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year = resolve_year(caps.get(3).map(|m| m.as_str()), today);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }
    None
}

/// `D/M[/Y]` with explicit day/month range checks so a time-of-day or a
/// fraction never reads as a date.
fn find_numeric_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    for caps in NUMERIC_DATE_RE.captures_iter(text) {
        let day: u32 = match caps[1].parse() {
            Ok(d) => d,
            Err(_) => continue,
        };
        let month: u32 = match caps[2].parse() {
            Ok(m) => m,
            Err(_) => continue,
        };
        if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
            continue;
        }
        let year = resolve_year(caps.get(3).map(|m| m.as_str()), today);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }
    None
}

fn find_time(text: &str) -> Option<NaiveTime> {
    for caps in TIME_RE.captures_iter(text) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        if let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) {
            return Some(time);
        }
    }
    None
}

/// 2-digit years resolve to `20YY`; a missing year resolves to the
/// current year.
fn resolve_year(raw: Option<&str>, today: NaiveDate) -> i32 {
    match raw.and_then(|y| y.parse::<i32>().ok()) {
        Some(year) if year < 100 => 2000 + year,
        Some(year) => year,
        None => today.year(),
    }
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "january" => 1,
        "february" => 2,
        "march" => 3,
        "april" => 4,
        "may" => 5,
        "june" => 6,
        "july" => 7,
        "august" => 8,
        "september" => 9,
        "october" => 10,
        "november" => 11,
        "december" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use satchel_domain::{PipelineConfig, SourceKind};

    use super::*;

    fn item(title: &str, body: &str) -> RawItem {
        RawItem {
            id: Some("msg-1".to_string()),
            title: title.to_string(),
            body: body.to_string(),
            source: SourceKind::Email,
        }
    }

    fn matcher() -> SubjectMatcher {
        SubjectMatcher::new(&PipelineConfig::default())
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 10).unwrap()
    }

    #[test]
    fn no_date_yields_no_event() {
        let result = extract_fallback(&item("Reminder", "meeting at 9.45"), &matcher(), today());
        assert!(result.is_none());
    }

    #[test]
    fn numeric_date_parses_day_month_year() {
        let event = extract_fallback(&item("PTA meeting", "Join us on 11/03/2026"), &matcher(), today())
            .expect("date should be found");
        assert_eq!(event.start_time.date(), NaiveDate::from_ymd_opt(2026, 3, 11).unwrap());
    }

    #[test]
    fn named_month_resolves_missing_year_to_current() {
        let event = extract_fallback(
            &item("Carol concert", "Carols by candlelight, 25 December"),
            &matcher(),
            today(),
        )
        .expect("date should be found");
        assert_eq!(event.start_time.date(), NaiveDate::from_ymd_opt(2026, 12, 25).unwrap());
    }

    #[test]
    fn two_digit_year_resolves_to_current_century() {
        let event = extract_fallback(&item("Sports day", "save the date: 5/6/26"), &matcher(), today())
            .expect("date should be found");
        assert_eq!(event.start_time.date(), NaiveDate::from_ymd_opt(2026, 6, 5).unwrap());
    }

    #[test]
    fn time_defaults_to_nine_when_absent() {
        let event = extract_fallback(&item("Fair", "Summer fair 14 June"), &matcher(), today())
            .expect("date should be found");
        assert_eq!(event.start_time.time(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(event.end_time.unwrap() - event.start_time, Duration::minutes(60));
    }

    #[test]
    fn explicit_time_is_used() {
        let event = extract_fallback(
            &item("Assembly", "Year 3 assembly on 14 June at 10:30"),
            &matcher(),
            today(),
        )
        .expect("date should be found");
        assert_eq!(event.start_time.time(), NaiveTime::from_hms_opt(10, 30, 0).unwrap());
        assert_eq!(event.subjects, vec!["Tristan"]);
    }

    #[test]
    fn unlabeled_item_with_date_keeps_org_label() {
        let event = extract_fallback(
            &item("Village fete", "The fete is on 20 September"),
            &matcher(),
            today(),
        )
        .expect("date should be found");
        assert_eq!(event.subjects, vec![DEFAULT_ORG_LABEL]);
    }

    #[test]
    fn invalid_numeric_dates_are_skipped() {
        // 45 is not a month; no other date follows
        assert!(extract_fallback(&item("Odd", "ratio 9/45 only"), &matcher(), today()).is_none());
    }

    #[test]
    fn markup_is_stripped_before_matching() {
        let body = "<style>p { color: red }</style><p>Trip on <b>12 May</b></p>";
        let event = extract_fallback(&item("Trip", body), &matcher(), today())
            .expect("date should survive markup stripping");
        assert_eq!(event.start_time.date(), NaiveDate::from_ymd_opt(2026, 5, 12).unwrap());
        assert!(!event.description.contains('<'));
        assert!(!event.description.contains("color"));
    }
}
