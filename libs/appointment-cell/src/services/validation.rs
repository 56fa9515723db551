// libs/appointment-cell/src/services/validation.rs
//
// Write-boundary checks that run before the conflict checker.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::models::AppointmentError;

/// `end` must be strictly after `start`.
pub fn validate_time_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppointmentError> {
    if end <= start {
        return Err(AppointmentError::InvalidTimeRange(
            "End time must be after start time".to_string(),
        ));
    }
    Ok(())
}

/// Start/duration form of [`validate_time_range`].
pub fn validate_duration(duration_minutes: i32) -> Result<(), AppointmentError> {
    if duration_minutes <= 0 {
        return Err(AppointmentError::InvalidTimeRange(format!(
            "Duration must be a positive number of minutes, got {}",
            duration_minutes
        )));
    }
    Ok(())
}

/// End of a slot of `duration_minutes` starting at `start`. Fails with
/// `InvalidTimeRange` for empty slots and for ends chrono cannot represent.
pub fn slot_end(start: DateTime<Utc>, duration_minutes: i32) -> Result<DateTime<Utc>, AppointmentError> {
    validate_duration(duration_minutes)?;

    let end = start
        .checked_add_signed(Duration::minutes(duration_minutes as i64))
        .ok_or_else(|| AppointmentError::InvalidTimeRange(format!(
            "Appointment starting at {} ends outside the supported calendar",
            start
        )))?;

    validate_time_range(start, end)?;
    Ok(end)
}

/// Rejects instants strictly before `now`. Starting exactly at `now` is allowed.
pub fn validate_future_date(instant: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), AppointmentError> {
    if instant < now {
        return Err(AppointmentError::PastScheduling);
    }
    Ok(())
}

/// Inclusive date filters; a single-day range (`from == to`) is valid.
pub fn validate_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<(), AppointmentError> {
    if let (Some(from), Some(to)) = (from, to) {
        if to < from {
            return Err(AppointmentError::InvalidDateRange(
                "End date must be after start date".to_string(),
            ));
        }
    }
    Ok(())
}
