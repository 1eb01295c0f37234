use crate::config::ConfigError;
use chrono::Local;
use cron::Schedule;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression: {expr}")]
    InvalidExpression { expr: String },

    #[error("cron expression never fires: {expr}")]
    NeverFires { expr: String },
}

/// Operator-facing schedules use the classic 5-field form
/// (minute hour day-of-month month day-of-week); the `cron` crate wants a
/// leading seconds field, so a literal `0` is prepended.
pub fn normalize_cron(expr: &str) -> String {
    format!("0 {}", expr.trim())
}

/// Validate a 5-field expression, field ranges included.
pub fn validate_five_field_cron(expr: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidSchedule {
        expr: expr.to_string(),
    };
    if expr.trim().split_whitespace().count() != 5 {
        return Err(invalid());
    }
    Schedule::from_str(&normalize_cron(expr)).map_err(|_| invalid())?;
    Ok(())
}

/// Next fire time of a 5-field expression as a local unix timestamp.
pub fn next_run_timestamp(expr: &str) -> Result<i64, ScheduleError> {
    let schedule =
        Schedule::from_str(&normalize_cron(expr)).map_err(|_| ScheduleError::InvalidExpression {
            expr: expr.to_string(),
        })?;
    schedule
        .upcoming(Local)
        .next()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| ScheduleError::NeverFires {
            expr: expr.to_string(),
        })
}

/// If the expression means "every day at a fixed time", render it as an
/// `HH:MM` token. Hour and minute are always zero-padded to two digits.
pub fn fixed_daily_time(expr: &str) -> Option<String> {
    let fields: Vec<&str> = expr.trim().split_whitespace().collect();
    if fields.len() != 5 {
        return None;
    }
    let (minute, hour, dom, month, dow) = (fields[0], fields[1], fields[2], fields[3], fields[4]);
    if dom != "*" || month != "*" || dow != "*" {
        return None;
    }
    let minute: u8 = minute.parse().ok().filter(|m| *m < 60)?;
    let hour: u8 = hour.parse().ok().filter(|h| *h < 24)?;
    Some(format!("{hour:02}:{minute:02}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_field_expression_validates() {
        assert!(validate_five_field_cron("0 4 * * *").is_ok());
        assert!(validate_five_field_cron("*/15 * * * *").is_ok());
    }

    #[test]
    fn out_of_range_field_rejected() {
        assert!(validate_five_field_cron("99 4 * * *").is_err());
        assert!(validate_five_field_cron("0 25 * * *").is_err());
    }

    #[test]
    fn wrong_field_count_rejected() {
        assert!(validate_five_field_cron("0 4 * *").is_err());
        assert!(validate_five_field_cron("0 0 4 * * *").is_err());
    }

    #[test]
    fn daily_time_token_zero_pads_hour() {
        assert_eq!(fixed_daily_time("0 4 * * *").as_deref(), Some("04:00"));
        assert_eq!(fixed_daily_time("5 23 * * *").as_deref(), Some("23:05"));
    }

    #[test]
    fn non_daily_expressions_have_no_fixed_time() {
        assert_eq!(fixed_daily_time("0 4 * * 1"), None);
        assert_eq!(fixed_daily_time("*/5 * * * *"), None);
    }

    #[test]
    fn next_run_is_in_the_future() {
        let now = chrono::Local::now().timestamp();
        let next = next_run_timestamp("0 4 * * *").unwrap();
        assert!(next > now);
    }
}
