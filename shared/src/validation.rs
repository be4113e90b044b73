//! Input validation for activity and measurement records
//!
//! Every check reports the offending field so the API can surface a
//! field-level message. Nothing is coerced: invalid input is rejected.

use crate::errors::FieldError;
use crate::models::ActivityPayload;
use chrono::{DateTime, Utc};

/// Highest plausible body temperature accepted (°C)
pub const MAX_TEMPERATURE_CELSIUS: f64 = 45.0;

const MAX_FEEDING_AMOUNT_ML: f64 = 1000.0;
const MAX_NOTE_LENGTH: usize = 1000;

/// Validate an activity before it is persisted
///
/// `now` is passed in so the future-timestamp rule is testable.
pub fn validate_activity(
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    payload: &ActivityPayload,
    note: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), FieldError> {
    if started_at > now {
        return Err(FieldError::new("started_at", "Start time cannot be in the future"));
    }
    if let Some(end) = ended_at {
        if end < started_at {
            return Err(FieldError::new("ended_at", "End time must not be before start time"));
        }
    }
    if note.map(|n| n.chars().count() > MAX_NOTE_LENGTH).unwrap_or(false) {
        return Err(FieldError::new("note", "Note must be at most 1000 characters"));
    }

    validate_payload(payload)
}

fn validate_payload(payload: &ActivityPayload) -> Result<(), FieldError> {
    match payload {
        ActivityPayload::Feeding {
            amount_ml,
            duration_minutes,
            ..
        } => {
            if let Some(amount) = amount_ml {
                if !amount.is_finite() || *amount < 0.0 || *amount > MAX_FEEDING_AMOUNT_ML {
                    return Err(FieldError::new("amount_ml", "Amount must be between 0 and 1000 ml"));
                }
            }
            if let Some(minutes) = duration_minutes {
                if *minutes < 0 || *minutes > 240 {
                    return Err(FieldError::new(
                        "duration_minutes",
                        "Duration must be between 0 and 240 minutes",
                    ));
                }
            }
            Ok(())
        }
        ActivityPayload::Temperature { celsius } => validate_temperature(*celsius),
        ActivityPayload::Medicine { name, amount, .. } => {
            if name.trim().is_empty() {
                return Err(FieldError::new("name", "Medicine name is required"));
            }
            if name.chars().count() > 100 {
                return Err(FieldError::new("name", "Medicine name must be at most 100 characters"));
            }
            if !amount.is_finite() || *amount <= 0.0 {
                return Err(FieldError::new("amount", "Medicine amount must be greater than 0"));
            }
            Ok(())
        }
        ActivityPayload::Sleep { .. }
        | ActivityPayload::Diaper { .. }
        | ActivityPayload::Bath
        | ActivityPayload::Play => Ok(()),
    }
}

/// Temperature must be in (0, 45] °C
pub fn validate_temperature(celsius: f64) -> Result<(), FieldError> {
    if !celsius.is_finite() || celsius <= 0.0 || celsius > MAX_TEMPERATURE_CELSIUS {
        return Err(FieldError::new(
            "celsius",
            "Temperature must be greater than 0 and at most 45 °C",
        ));
    }
    Ok(())
}

/// Validate a growth measurement; at least one value is required
pub fn validate_measurement(
    weight_kg: Option<f64>,
    height_cm: Option<f64>,
    head_circumference_cm: Option<f64>,
) -> Result<(), FieldError> {
    if weight_kg.is_none() && height_cm.is_none() && head_circumference_cm.is_none() {
        return Err(FieldError::new("weight_kg", "At least one measurement is required"));
    }
    check_range("weight_kg", weight_kg, 0.3, 40.0)?;
    check_range("height_cm", height_cm, 20.0, 150.0)?;
    check_range("head_circumference_cm", head_circumference_cm, 20.0, 70.0)?;
    Ok(())
}

fn check_range(field: &str, value: Option<f64>, min: f64, max: f64) -> Result<(), FieldError> {
    match value {
        Some(v) if !v.is_finite() || v < min || v > max => Err(FieldError::new(
            field,
            format!("Value must be between {} and {}", min, max),
        )),
        _ => Ok(()),
    }
}
