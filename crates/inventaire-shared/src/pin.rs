//! PIN rules.

use crate::constants::MIN_PIN_LENGTH;
use crate::error::ValidationError;

/// Whether a PIN is being created for the first time or replaced.
/// Only the wording of the error messages differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinChange {
    Setup,
    Update,
}

fn is_numeric(pin: &str) -> bool {
    !pin.is_empty() && pin.chars().all(|c| c.is_ascii_digit())
}

/// Validate a new PIN and its confirmation.
///
/// Rules are checked in order: length, confirmation match, digits only.
/// Length is counted in characters.
pub fn validate_new_pin(pin: &str, confirm: &str, change: PinChange) -> Result<(), ValidationError> {
    if pin.chars().count() < MIN_PIN_LENGTH {
        return Err(match change {
            PinChange::Setup => ValidationError::PinTooShort,
            PinChange::Update => ValidationError::NewPinTooShort,
        });
    }
    if pin != confirm {
        return Err(match change {
            PinChange::Setup => ValidationError::PinMismatch,
            PinChange::Update => ValidationError::NewPinMismatch,
        });
    }
    if !is_numeric(pin) {
        return Err(ValidationError::PinNotNumeric);
    }
    Ok(())
}

/// Validate the inputs of a PIN login.
pub fn validate_login_pin(cp: &str, pin: &str) -> Result<(), ValidationError> {
    if cp.trim().is_empty() {
        return Err(ValidationError::MissingIdentifier);
    }
    if pin.chars().count() < MIN_PIN_LENGTH {
        return Err(ValidationError::MissingPin);
    }
    if !is_numeric(pin) {
        return Err(ValidationError::PinNotNumeric);
    }
    Ok(())
}
