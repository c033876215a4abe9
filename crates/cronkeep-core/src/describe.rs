//! Human-readable descriptions of cron expressions.
//!
//! Works field by field on the six-field format
//! `second minute hour day_of_month month day_of_week` with an optional
//! trailing year:
//!
//! - `"0 */5 * * * *"` - "Every 5 minutes"
//! - `"0 30 9 * * MON-FRI"` - "At 09:30, only on Monday through Friday"
//! - `"0 0 0 1 1-3 *"` - "At 00:00, on day 1 of the month, only in January through March"

use cronkeep_protocols::JobError;

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

// 1 = Sunday, matching the cron parser.
const WEEKDAYS: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];

#[derive(Clone, Copy)]
enum Field {
    Second,
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
    Year,
}

impl Field {
    fn unit(self) -> (&'static str, &'static str) {
        match self {
            Field::Second => ("second", "seconds"),
            Field::Minute => ("minute", "minutes"),
            Field::Hour => ("hour", "hours"),
            Field::DayOfMonth => ("day", "days"),
            Field::Month => ("month", "months"),
            Field::DayOfWeek => ("day of the week", "days of the week"),
            Field::Year => ("year", "years"),
        }
    }

    fn render(self, value: &str) -> String {
        match self {
            Field::Month => month_name(value).unwrap_or_else(|| value.to_string()),
            Field::DayOfWeek => weekday_name(value).unwrap_or_else(|| value.to_string()),
            _ => value.to_string(),
        }
    }
}

/// Describe a cron expression in English.
///
/// Only the field layout is checked here; callers that need a full syntax
/// check parse the expression with the scheduler first.
pub fn describe(expression: &str) -> Result<String, JobError> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 6 && fields.len() != 7 {
        return Err(JobError::schedule(
            expression,
            format!("expected 6 or 7 fields, found {}", fields.len()),
        ));
    }

    let mut parts = vec![describe_time(fields[0], fields[1], fields[2])];

    if let Some(days) = describe_day_of_month(fields[3]) {
        parts.push(days);
    }
    if !is_any(fields[5]) {
        parts.push(format!("only on {}", describe_field(fields[5], Field::DayOfWeek)));
    }
    if !is_any(fields[4]) {
        parts.push(format!("only in {}", describe_field(fields[4], Field::Month)));
    }
    if let Some(year) = fields.get(6).filter(|y| !is_any(y)) {
        parts.push(format!("in {}", describe_field(year, Field::Year)));
    }

    Ok(parts.join(", "))
}

fn describe_time(second: &str, minute: &str, hour: &str) -> String {
    let (s, m, h) = (number(second), number(minute), number(hour));

    match (s, m, h) {
        (Some(0), Some(m), Some(h)) => return format!("At {:02}:{:02}", h, m),
        (Some(s), Some(m), Some(h)) => return format!("At {:02}:{:02}:{:02}", h, m, s),
        _ => {}
    }

    if is_any(minute) && is_any(hour) {
        if is_any(second) {
            return "Every second".to_string();
        }
        if let Some(n) = step(second) {
            return every(n, Field::Second);
        }
        if s == Some(0) {
            return "Every minute".to_string();
        }
    }

    if s == Some(0) && is_any(hour) {
        if is_any(minute) {
            return "Every minute".to_string();
        }
        if let Some(n) = step(minute) {
            return every(n, Field::Minute);
        }
        if m == Some(0) {
            return "Every hour".to_string();
        }
    }

    if s == Some(0) && m == Some(0) {
        if let Some(n) = step(hour) {
            return every(n, Field::Hour);
        }
    }

    let mut parts = Vec::new();
    parts.push(time_part(second, Field::Second, "at"));
    parts.push(time_part(minute, Field::Minute, "at"));
    parts.push(time_part(hour, Field::Hour, "past"));
    capitalize(&parts.join(", "))
}

fn time_part(raw: &str, field: Field, preposition: &str) -> String {
    let (singular, plural) = field.unit();
    if is_any(raw) {
        return format!("every {}", singular);
    }
    let text = describe_field(raw, field);
    if text.starts_with("every ") {
        return text;
    }
    let unit = if raw.contains(',') || raw.contains('-') {
        plural
    } else {
        singular
    };
    format!("{} {} {}", preposition, unit, text)
}

fn describe_day_of_month(raw: &str) -> Option<String> {
    if is_any(raw) {
        return None;
    }
    if raw.eq_ignore_ascii_case("L") {
        return Some("on the last day of the month".to_string());
    }
    let text = describe_field(raw, Field::DayOfMonth);
    if text.starts_with("every ") {
        Some(text)
    } else {
        Some(format!("on day {} of the month", text))
    }
}

/// Describe a single field: lists, ranges, steps and plain values.
fn describe_field(raw: &str, field: Field) -> String {
    let items: Vec<String> = raw.split(',').map(|item| describe_item(item, field)).collect();
    join_list(&items)
}

fn describe_item(item: &str, field: Field) -> String {
    if let Some((base, interval)) = item.split_once('/') {
        let interval = interval.parse::<u32>().unwrap_or(1);
        let head = every(interval, field).to_lowercase();
        return if is_any(base) {
            head
        } else if let Some((from, to)) = base.split_once('-') {
            format!("{}, {} through {}", head, field.render(from), field.render(to))
        } else {
            format!("{} starting at {}", head, field.render(base))
        };
    }
    if let Some((from, to)) = item.split_once('-') {
        return format!("{} through {}", field.render(from), field.render(to));
    }
    field.render(item)
}

fn every(n: u32, field: Field) -> String {
    let (singular, plural) = field.unit();
    if n <= 1 {
        format!("Every {}", singular)
    } else {
        format!("Every {} {}", n, plural)
    }
}

fn join_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_any(raw: &str) -> bool {
    raw == "*" || raw == "?"
}

fn number(raw: &str) -> Option<u32> {
    raw.parse().ok()
}

/// `*/n` or `0/n` as a plain step.
fn step(raw: &str) -> Option<u32> {
    let (base, interval) = raw.split_once('/')?;
    if is_any(base) || base == "0" {
        interval.parse().ok()
    } else {
        None
    }
}

fn month_name(raw: &str) -> Option<String> {
    if let Ok(n) = raw.parse::<usize>() {
        return MONTHS.get(n.checked_sub(1)?).map(|m| m.to_string());
    }
    MONTHS
        .iter()
        .find(|m| raw.len() >= 3 && m.to_ascii_lowercase().starts_with(&raw.to_ascii_lowercase()))
        .map(|m| m.to_string())
}

fn weekday_name(raw: &str) -> Option<String> {
    if let Ok(n) = raw.parse::<usize>() {
        return WEEKDAYS.get(n.checked_sub(1)?).map(|d| d.to_string());
    }
    WEEKDAYS
        .iter()
        .find(|d| raw.len() >= 3 && d.to_ascii_lowercase().starts_with(&raw.to_ascii_lowercase()))
        .map(|d| d.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_second() {
        assert_eq!(describe("* * * * * *").unwrap(), "Every second");
    }

    #[test]
    fn test_step_patterns() {
        assert_eq!(describe("*/10 * * * * *").unwrap(), "Every 10 seconds");
        assert_eq!(describe("0 */5 * * * *").unwrap(), "Every 5 minutes");
        assert_eq!(describe("0 0 */2 * * *").unwrap(), "Every 2 hours");
    }

    #[test]
    fn test_every_minute_and_hour() {
        assert_eq!(describe("0 * * * * *").unwrap(), "Every minute");
        assert_eq!(describe("0 0 * * * *").unwrap(), "Every hour");
    }

    #[test]
    fn test_fixed_time() {
        assert_eq!(describe("0 30 9 * * *").unwrap(), "At 09:30");
        assert_eq!(describe("15 30 9 * * *").unwrap(), "At 09:30:15");
    }

    #[test]
    fn test_weekdays() {
        assert_eq!(
            describe("0 30 9 * * MON-FRI").unwrap(),
            "At 09:30, only on Monday through Friday"
        );
        assert_eq!(describe("0 0 12 * * 1").unwrap(), "At 12:00, only on Sunday");
    }

    #[test]
    fn test_day_of_month_and_months() {
        assert_eq!(
            describe("0 0 0 1 1-3 *").unwrap(),
            "At 00:00, on day 1 of the month, only in January through March"
        );
        assert_eq!(
            describe("0 0 0 L * *").unwrap(),
            "At 00:00, on the last day of the month"
        );
    }

    #[test]
    fn test_lists_and_ranges() {
        assert_eq!(
            describe("0 0 9-17 * * *").unwrap(),
            "At second 0, at minute 0, past hours 9 through 17"
        );
        assert_eq!(
            describe("0 0,30 * * * *").unwrap(),
            "At second 0, at minutes 0 and 30, every hour"
        );
    }

    #[test]
    fn test_year_field() {
        assert_eq!(describe("0 0 0 1 1 * 2030").unwrap(), "At 00:00, on day 1 of the month, only in January, in 2030");
    }

    #[test]
    fn test_wrong_field_count() {
        let err = describe("* * * * *").unwrap_err();
        assert!(matches!(err, JobError::Schedule { .. }));
        assert!(describe("").is_err());
    }
}
