//! Standard five-field cron expressions on top of the `cron` crate.
//!
//! The `cron` crate expects a leading seconds field and numbers weekdays 1-7
//! starting at Sunday, where the standard format numbers them 0-6 (or 7 for
//! Sunday again). Expressions are rewritten before parsing. The crate also
//! requires day-of-month and day-of-week to both match, where the standard
//! format fires on either once both are restricted.

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use cron::Schedule;
use std::collections::BTreeSet;
use std::str::FromStr;

const WEEKDAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// A parsed five-field expression.
///
/// When both day-of-month and day-of-week are restricted the expression is
/// due on a day matching either of them, so it is held as two schedules.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    schedules: Vec<Schedule>,
}

/// Parses a standard five-field cron expression.
pub fn parse(expression: &str) -> Result<CronSchedule, String> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    let [minute, hour, day_of_month, month, day_of_week] = fields.as_slice() else {
        return Err(format!(
            "cron expression {expression:?} must have 5 fields, found {}",
            fields.len()
        ));
    };

    let day_of_week = translate_day_of_week(day_of_week)
        .ok_or_else(|| format!("cron expression {expression:?} has an invalid day of week"))?;

    let day_fields = if is_restricted(day_of_month) && is_restricted(&day_of_week) {
        vec![(*day_of_month, "*"), ("*", day_of_week.as_str())]
    } else {
        vec![(*day_of_month, day_of_week.as_str())]
    };

    let schedules = day_fields
        .into_iter()
        .map(|(day_of_month, day_of_week)| {
            Schedule::from_str(&format!(
                "0 {minute} {hour} {day_of_month} {month} {day_of_week}"
            ))
            .map_err(|e| format!("cron expression {expression:?} is invalid: {e}"))
        })
        .collect::<Result<Vec<_>, String>>()?;

    Ok(CronSchedule { schedules })
}

/// Whether the schedule is due in the minute `at` falls in.
pub fn is_due(schedule: &CronSchedule, at: DateTime<Utc>) -> bool {
    let Some(minute) = at.with_second(0).and_then(|t| t.with_nanosecond(0)) else {
        return false;
    };
    // `after` excludes its reference instant, so start one minute earlier.
    let previous = minute - TimeDelta::minutes(1);
    schedule
        .schedules
        .iter()
        .any(|s| s.after(&previous).next().is_some_and(|next| next == minute))
}

fn is_restricted(field: &str) -> bool {
    field != "*" && field != "?"
}

fn translate_day_of_week(field: &str) -> Option<String> {
    if field == "*" || field == "?" {
        return Some(field.to_string());
    }

    let mut days = BTreeSet::new();
    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, Some(step.parse::<usize>().ok().filter(|s| *s > 0)?)),
            None => (item, None),
        };

        let (start, end) = if range == "*" {
            (0, 6)
        } else if let Some((start, end)) = range.split_once('-') {
            (weekday(start)?, weekday(end)?)
        } else {
            let day = weekday(range)?;
            (day, if step.is_some() { 6 } else { day })
        };
        if start > end {
            return None;
        }

        days.extend((start..=end).step_by(step.unwrap_or(1)).map(|day| day % 7));
    }

    Some(
        days.iter()
            .map(|day| (day + 1).to_string())
            .collect::<Vec<_>>()
            .join(","),
    )
}

fn weekday(token: &str) -> Option<u32> {
    let upper = token.trim().to_ascii_uppercase();
    if let Some(index) = WEEKDAY_NAMES.iter().position(|name| *name == upper) {
        return u32::try_from(index).ok();
    }
    upper.parse::<u32>().ok().filter(|day| *day <= 7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 4, 5, hour, minute, second).unwrap()
    }

    #[test]
    fn test_every_five_minutes() {
        let schedule = parse("*/5 * * * *").unwrap();
        assert!(is_due(&schedule, at(11, 10, 0)));
        assert!(is_due(&schedule, at(11, 10, 42)));
        assert!(!is_due(&schedule, at(11, 12, 1)));
    }

    #[test]
    fn test_daily_schedule() {
        let schedule = parse("0 10 */1 * *").unwrap();
        assert!(is_due(&schedule, at(10, 0, 0)));
        assert!(!is_due(&schedule, at(10, 1, 0)));
    }

    #[test]
    fn test_weekday_numbers_follow_standard_cron() {
        // 2019-04-05 is a Friday.
        assert!(is_due(&parse("0 9 * * 5").unwrap(), at(9, 0, 0)));
        assert!(!is_due(&parse("0 9 * * 0").unwrap(), at(9, 0, 0)));
        assert!(is_due(&parse("0 9 * * 1-5").unwrap(), at(9, 0, 0)));
        assert!(!is_due(&parse("0 9 * * 6,7").unwrap(), at(9, 0, 0)));
        assert!(is_due(&parse("0 9 * * fri").unwrap(), at(9, 0, 0)));
    }

    #[test]
    fn test_day_of_month_or_day_of_week() {
        // 09:00 on the 1st and on every Monday.
        let schedule = parse("0 9 1 * 1").unwrap();
        let monday = Utc.with_ymd_and_hms(2019, 4, 15, 9, 0, 0).unwrap();
        let wednesday_first = Utc.with_ymd_and_hms(2019, 5, 1, 9, 0, 0).unwrap();
        let tuesday = Utc.with_ymd_and_hms(2019, 4, 16, 9, 0, 0).unwrap();

        assert!(is_due(&schedule, monday));
        assert!(is_due(&schedule, wednesday_first));
        assert!(!is_due(&schedule, tuesday));
    }

    #[test]
    fn test_unrestricted_day_of_week_keeps_day_of_month() {
        let schedule = parse("0 9 1 * *").unwrap();
        assert!(is_due(&schedule, Utc.with_ymd_and_hms(2019, 5, 1, 9, 0, 0).unwrap()));
        assert!(!is_due(&schedule, Utc.with_ymd_and_hms(2019, 4, 15, 9, 0, 0).unwrap()));
    }

    #[test]
    fn test_translate_day_of_week() {
        assert_eq!(translate_day_of_week("*").as_deref(), Some("*"));
        assert_eq!(translate_day_of_week("0").as_deref(), Some("1"));
        assert_eq!(translate_day_of_week("7").as_deref(), Some("1"));
        assert_eq!(translate_day_of_week("1-5").as_deref(), Some("2,3,4,5,6"));
        assert_eq!(translate_day_of_week("5-7").as_deref(), Some("1,6,7"));
        assert_eq!(translate_day_of_week("*/2").as_deref(), Some("1,3,5,7"));
        assert_eq!(translate_day_of_week("8"), None);
        assert_eq!(translate_day_of_week("5-1"), None);
    }

    #[test]
    fn test_rejects_wrong_field_count() {
        assert!(parse("0 0 * * * *").is_err());
        assert!(parse("").is_err());
        assert!(parse("61 * * * *").is_err());
    }
}
