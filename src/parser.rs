use crate::model::Priority;
use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};
use regex::Regex;
use std::sync::LazyLock;

static FULL_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid full date pattern")
});
static MONTH_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}-\d{2}$").expect("valid month-day pattern"));

/// Result of parsing `title #tag @date !priority` input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTask {
    /// Empty when the input held only sigil tokens; callers must not save it.
    pub title: String,
    pub tags: Vec<String>,
    pub due_date: String,
    pub priority: Priority,
}

pub fn parse_task_input(input: &str) -> ParsedTask {
    parse_task_input_on(input, Local::now().date_naive())
}

/// Sigils are recognised anywhere in the input. Tags accumulate;
/// the last date and the last recognised priority win.
pub fn parse_task_input_on(input: &str, today: NaiveDate) -> ParsedTask {
    let mut parsed = ParsedTask::default();
    let mut title_parts = Vec::new();

    for word in input.split_whitespace() {
        if let Some(tag) = word.strip_prefix('#') {
            if !tag.is_empty() {
                parsed.tags.push(tag.to_string());
            }
        } else if let Some(keyword) = word.strip_prefix('!') {
            if let Some(priority) = Priority::from_keyword(keyword) {
                parsed.priority = priority;
            }
        } else if let Some(date) = word.strip_prefix('@') {
            parsed.due_date = resolve_due_date_on(date, today);
        } else {
            title_parts.push(word);
        }
    }

    parsed.title = title_parts.join(" ");
    parsed
}

pub fn resolve_due_date(token: &str) -> String {
    resolve_due_date_on(token, Local::now().date_naive())
}

/// Relative words and weekdays resolve against `today`; anything unrecognised
/// is kept verbatim.
pub fn resolve_due_date_on(token: &str, today: NaiveDate) -> String {
    let lower = token.to_lowercase();
    let resolved = match lower.as_str() {
        "today" => Some(today),
        "tomorrow" | "tmr" => Some(today + Duration::days(1)),
        "week" | "nextweek" => Some(today + Duration::days(7)),
        other => match parse_weekday(other) {
            Some(weekday) => Some(next_weekday(today, weekday)),
            None => parse_explicit_date(other, today.year()),
        },
    };

    match resolved {
        Some(date) => format_date(date),
        None => token.to_string(),
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_weekday(word: &str) -> Option<Weekday> {
    match word {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Next occurrence strictly after `from`; the same weekday means a week later.
fn next_weekday(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    let current = from.weekday().num_days_from_monday() as i64;
    let target = weekday.num_days_from_monday() as i64;
    let mut days = target - current;
    if days <= 0 {
        days += 7;
    }
    from + Duration::days(days)
}

fn parse_explicit_date(word: &str, year: i32) -> Option<NaiveDate> {
    if FULL_DATE.is_match(word) {
        return NaiveDate::parse_from_str(word, "%Y-%m-%d").ok();
    }
    if MONTH_DAY.is_match(word) {
        return NaiveDate::parse_from_str(&format!("{year}-{word}"), "%Y-%m-%d").ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // 2026-10-16 is a Friday.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date")
    }

    #[test]
    fn parses_full_inline_syntax() {
        let parsed = parse_task_input_on("Buy milk #grocery #urgent @tomorrow !high", today());
        assert_eq!(
            parsed,
            ParsedTask {
                title: "Buy milk".to_string(),
                tags: vec!["grocery".to_string(), "urgent".to_string()],
                due_date: "2026-10-17".to_string(),
                priority: Priority::High,
            }
        );
    }

    #[test]
    fn unknown_priority_keeps_default_and_empty_title() {
        let parsed = parse_task_input_on("   #a !bogus", today());
        assert_eq!(parsed.title, "");
        assert_eq!(parsed.tags, vec!["a".to_string()]);
        assert_eq!(parsed.priority, Priority::Normal);
        assert_eq!(parsed.due_date, "");
    }

    #[test]
    fn sigils_anywhere_and_last_one_wins() {
        let parsed = parse_task_input_on("!low call @today mom # !B @mon", today());
        assert_eq!(parsed.title, "call mom");
        assert!(parsed.tags.is_empty());
        assert_eq!(parsed.priority, Priority::Blocked);
        assert_eq!(parsed.due_date, "2026-10-19");
    }

    #[test]
    fn relative_dates() {
        assert_eq!(resolve_due_date_on("TODAY", today()), "2026-10-16");
        assert_eq!(resolve_due_date_on("tmr", today()), "2026-10-17");
        assert_eq!(resolve_due_date_on("nextweek", today()), "2026-10-23");
        assert_eq!(resolve_due_date_on("week", today()), "2026-10-23");
    }

    #[test]
    fn weekday_never_means_today() {
        assert_eq!(resolve_due_date_on("fri", today()), "2026-10-23");
        assert_eq!(resolve_due_date_on("Friday", today()), "2026-10-23");
        assert_eq!(resolve_due_date_on("sat", today()), "2026-10-17");
        assert_eq!(resolve_due_date_on("thu", today()), "2026-10-22");
    }

    #[test]
    fn explicit_dates_and_passthrough() {
        assert_eq!(resolve_due_date_on("2027-01-05", today()), "2027-01-05");
        assert_eq!(resolve_due_date_on("12-25", today()), "2026-12-25");
        assert_eq!(resolve_due_date_on("13-45", today()), "13-45");
        assert_eq!(resolve_due_date_on("someday!?", today()), "someday!?");
        assert_eq!(resolve_due_date_on("Q4", today()), "Q4");
    }
}
