use garde::Validate;
use lazy_static::lazy_static;
use regex::Regex;
use common_types::Contact::{ContactPayload, LocationType};

use crate::Response::RelayError;

pub const MAX_SANITIZED_CHARS: usize = 2000;

lazy_static!{
    static ref EMAIL_PATTERN: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Failed to compile EMAIL_PATTERN");
}

// Strips angle brackets, trims and caps the length. The trailing trim after the
// cap keeps sanitize(sanitize(x)) == sanitize(x)
pub fn sanitize(input: &str) -> String {
    let stripped: String = input.chars().filter(|c| *c != '<' && *c != '>').collect();
    let capped: String = stripped.trim().chars().take(MAX_SANITIZED_CHARS).collect();
    capped.trim_end().to_string()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Coordinates {
        latitude: f64,
        longitude: f64,
        kind: Option<LocationType>,
    },
    Unavailable(String),
    NotProvided,
}

// Lengths are checked on the raw input, before sanitizing
#[derive(Debug, Validate)]
struct BoundedFields {
    #[garde(length(max=100))]
    name: String,
    #[garde(length(max=100))]
    email: String,
    #[garde(length(max=200))]
    subject: String,
    #[garde(length(max=2000))]
    message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub location: Location,
}

// Absent, null, blank and values that sanitize down to nothing all count as missing
fn required(field: Option<String>) -> Result<String, RelayError> {
    match field {
        Some(value) if !sanitize(&value).is_empty() => Ok(value),
        _ => Err(RelayError::MissingField),
    }
}

// Zero and NaN coordinates count as absent
fn coordinate(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && !v.is_nan())
}

impl Submission {
    pub fn try_from_payload(payload: ContactPayload) -> Result<Self, RelayError> {
        let name = required(payload.name)?;
        let email = required(payload.email)?;
        let subject = required(payload.subject)?;
        let message = required(payload.message)?;

        if !is_valid_email(&email) {
            return Err(RelayError::InvalidEmail);
        }

        let bounded = BoundedFields {
            name,
            email,
            subject,
            message,
        };
        if let Err(err) = bounded.validate(&()) {
            tracing::debug!("Length check failed, {err}");
            return Err(RelayError::InputTooLong);
        }

        let location = match (coordinate(payload.latitude), coordinate(payload.longitude), payload.location_error) {
            (Some(latitude), Some(longitude), _) => Location::Coordinates {
                latitude,
                longitude,
                kind: payload.location_type,
            },
            (_, _, Some(reason)) if !reason.trim().is_empty() => Location::Unavailable(sanitize(&reason)),
            _ => Location::NotProvided,
        };

        Ok(Submission {
            name: sanitize(&bounded.name),
            email: sanitize(&bounded.email),
            subject: sanitize(&bounded.subject),
            message: sanitize(&bounded.message),
            location,
        })
    }
}
