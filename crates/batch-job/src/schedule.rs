//! Cron-like gate deciding whether a job is "due" at a given instant.

use chrono::{DateTime, Datelike, NaiveTime, Utc};

use crate::error::BatchJobError;

/// Evaluates a single cron-style field expression against a number.
///
/// Recognizes `"*"` (always matches), comma-separated segments, and within
/// each segment: a literal integer, an inclusive range `a-b`, or a step
/// `*/k` (matches when `n % k == 0`, regardless of what precedes the `/`).
/// Segments are ORed together.
pub fn check_cron(expression: &str, number: i64) -> bool {
    if expression == "*" {
        return true;
    }
    expression.split(',').any(|segment| match_segment(segment, number))
}

fn match_segment(segment: &str, number: i64) -> bool {
    if let Some((start, end)) = segment.split_once('-') {
        return match (start.parse::<i64>(), end.parse::<i64>()) {
            (Ok(start), Ok(end)) => start <= number && number <= end,
            _ => false,
        };
    }
    if let Some((_, step)) = segment.split_once('/') {
        return match step.parse::<i64>() {
            Ok(step) if step != 0 => number % step == 0,
            _ => false,
        };
    }
    segment.parse::<i64>().map(|literal| literal == number).unwrap_or(false)
}

/// A conjunction of four independent predicates over a UTC timestamp.
#[derive(Debug, Clone, Default)]
pub struct JobSchedule {
    in_months: Option<String>,
    on_days: Option<String>,
    on_weekdays: Option<String>,
    after_time: Option<NaiveTime>,
}

impl JobSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_months(mut self, months: impl Into<String>) -> Self {
        self.in_months = Some(months.into());
        self
    }

    pub fn for_days(mut self, days: impl Into<String>) -> Self {
        self.on_days = Some(days.into());
        self
    }

    pub fn for_weekdays(mut self, weekdays: impl Into<String>) -> Self {
        self.on_weekdays = Some(weekdays.into());
        self
    }

    /// Sets a wall-clock lower bound: the schedule only fires at or after
    /// this time of day. Only exact hour/minute/second is supported.
    pub fn after(mut self, hour: u32, minute: u32, second: u32) -> Self {
        self.after_time = NaiveTime::from_hms_opt(hour, minute, second);
        self
    }

    /// Evaluates the schedule against a UTC instant. An unconstrained
    /// schedule (no predicates set) always fires.
    pub fn check(&self, base_time: DateTime<Utc>) -> bool {
        if let Some(months) = &self.in_months {
            if !check_cron(months, base_time.month() as i64) {
                return false;
            }
        }
        if let Some(days) = &self.on_days {
            if !check_cron(days, base_time.day() as i64) {
                return false;
            }
        }
        if let Some(weekdays) = &self.on_weekdays {
            // ISO weekday: Monday = 1 ... Sunday = 7.
            if !check_cron(weekdays, base_time.weekday().number_from_monday() as i64) {
                return false;
            }
        }
        if let Some(after_time) = self.after_time {
            if base_time.time() < after_time {
                return false;
            }
        }
        true
    }
}

/// Parses a 5-field crontab-style expression `"MM HH DoM Mon DoW"` into a
/// [`JobSchedule`]. The minute and hour fields must each be a single
/// integer (they become the `after` lower bound); ranges, lists, and steps
/// in those two fields are rejected. An empty or absent expression yields
/// an unconstrained schedule.
pub fn schedule_from_crontab(expression: Option<&str>) -> Result<JobSchedule, BatchJobError> {
    let expression = match expression {
        None => return Ok(JobSchedule::new()),
        Some(expr) if expr.is_empty() => return Ok(JobSchedule::new()),
        Some(expr) => expr,
    };

    let segments: Vec<&str> = expression.split(' ').collect();
    if segments.len() != 5 {
        return Err(BatchJobError::InvalidCrontab {
            expression: expression.to_string(),
            reason: format!("expected 5 space-separated fields, found {}", segments.len()),
        });
    }

    let parse_exact = |field: &str, name: &str| -> Result<u32, BatchJobError> {
        field.parse::<u32>().map_err(|_| BatchJobError::InvalidCrontab {
            expression: expression.to_string(),
            reason: format!("{name} field {field:?} must be a single integer"),
        })
    };

    let minute = parse_exact(segments[0], "minute")?;
    let hour = parse_exact(segments[1], "hour")?;
    if hour > 23 {
        return Err(BatchJobError::InvalidCrontab {
            expression: expression.to_string(),
            reason: format!("hour {hour} out of range 0-23"),
        });
    }
    if minute > 59 {
        return Err(BatchJobError::InvalidCrontab {
            expression: expression.to_string(),
            reason: format!("minute {minute} out of range 0-59"),
        });
    }

    Ok(JobSchedule::new()
        .for_months(segments[3])
        .for_days(segments[2])
        .for_weekdays(segments[4])
        .after(hour, minute, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn check_cron_star_always_matches() {
        assert!(check_cron("*", 5));
    }

    #[test]
    fn check_cron_single_value() {
        assert!(check_cron("10", 10));
        assert!(!check_cron("10", 5));
    }

    #[test]
    fn check_cron_range() {
        assert!(check_cron("1-5", 3));
        assert!(!check_cron("1-5", 7));
    }

    #[test]
    fn check_cron_step() {
        assert!(check_cron("*/2", 4));
        assert!(!check_cron("*/2", 5));
    }

    #[test]
    fn check_cron_multiple_segments() {
        assert!(check_cron("1,3,5", 3));
        assert!(!check_cron("1,3,5", 2));
        assert!(!check_cron("1,3-5,9", 7));
        assert!(check_cron("1,4-6,8", 5));
    }

    #[test]
    fn schedule_with_no_constraints_always_fires() {
        let schedule = JobSchedule::new();
        assert!(schedule.check(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn schedule_all_conditions_met() {
        let schedule = JobSchedule::new()
            .for_months("*")
            .for_days("*/3")
            .for_weekdays("1,3-6")
            .after(8, 59, 59);
        assert!(schedule.check(Utc.with_ymd_and_hms(2022, 1, 3, 9, 0, 0).unwrap()));
    }

    #[test]
    fn schedule_month_mismatch_fails() {
        let schedule = JobSchedule::new()
            .for_months("1,2,3")
            .for_days("1-5")
            .for_weekdays("1-3")
            .after(8, 0, 30);
        assert!(!schedule.check(Utc.with_ymd_and_hms(2022, 4, 3, 9, 0, 0).unwrap()));
    }

    #[test]
    fn schedule_day_mismatch_fails() {
        let schedule = JobSchedule::new()
            .for_days("1-5")
            .for_weekdays("1,2,3")
            .after(8, 0, 30);
        assert!(!schedule.check(Utc.with_ymd_and_hms(2022, 1, 6, 9, 0, 0).unwrap()));
    }

    #[test]
    fn schedule_weekday_mismatch_fails() {
        let schedule = JobSchedule::new().for_weekdays("*/3").after(8, 0, 0);
        assert!(!schedule.check(Utc.with_ymd_and_hms(2022, 1, 3, 9, 0, 0).unwrap()));
    }

    #[test]
    fn schedule_after_time_not_met_fails() {
        let schedule = JobSchedule::new().after(8, 0, 0);
        assert!(!schedule.check(Utc.with_ymd_and_hms(2022, 1, 3, 7, 0, 0).unwrap()));
    }

    #[test]
    fn schedule_from_crontab_none_or_empty_is_unconstrained() {
        assert!(schedule_from_crontab(None)
            .unwrap()
            .check(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()));
        assert!(schedule_from_crontab(Some(""))
            .unwrap()
            .check(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn schedule_from_crontab_single_value() {
        let schedule = schedule_from_crontab(Some("10 10 10 10 *")).unwrap();
        assert!(schedule.check(Utc.with_ymd_and_hms(2023, 10, 10, 10, 10, 0).unwrap()));
        assert!(!schedule.check(Utc.with_ymd_and_hms(2023, 10, 10, 10, 9, 0).unwrap()));
    }

    #[test]
    fn schedule_from_crontab_range() {
        let schedule = schedule_from_crontab(Some("15 2 1-5 1-5 1-5")).unwrap();
        // 2023-03-03 is a Friday.
        assert!(schedule.check(Utc.with_ymd_and_hms(2023, 3, 3, 3, 3, 0).unwrap()));
        // 2023-03-04 is a Saturday.
        assert!(!schedule.check(Utc.with_ymd_and_hms(2023, 3, 4, 3, 3, 0).unwrap()));
    }

    #[test]
    fn schedule_from_crontab_step() {
        let schedule = schedule_from_crontab(Some("2 2 */2 */2 *")).unwrap();
        assert!(schedule.check(Utc.with_ymd_and_hms(2023, 6, 4, 3, 3, 0).unwrap()));
        assert!(!schedule.check(Utc.with_ymd_and_hms(2023, 6, 3, 3, 3, 0).unwrap()));
    }

    #[test]
    fn schedule_from_crontab_multiple_segments() {
        let schedule = schedule_from_crontab(Some("35 12 1,3,5 1,3,5 1,3,5")).unwrap();
        assert!(schedule.check(Utc.with_ymd_and_hms(2023, 3, 3, 13, 35, 0).unwrap()));
        assert!(!schedule.check(Utc.with_ymd_and_hms(2023, 7, 3, 13, 35, 0).unwrap()));
    }

    #[test]
    fn schedule_from_crontab_rejects_invalid_hour() {
        assert!(schedule_from_crontab(Some("35 25 1,3,5 1,3,5 1,3,5")).is_err());
    }

    #[test]
    fn schedule_from_crontab_rejects_wrong_field_count() {
        assert!(schedule_from_crontab(Some("35 12 1,3,5 1,3,5")).is_err());
    }

    #[test]
    fn schedule_from_crontab_rejects_compound_minute() {
        assert!(schedule_from_crontab(Some("35-40,45 12 1,3,5 1,3,5 1,3,5")).is_err());
    }

    #[test]
    fn schedule_from_crontab_rejects_compound_hour() {
        assert!(schedule_from_crontab(Some("35 12,13 1,3,5 1,3,5 1,3,5")).is_err());
    }
}
