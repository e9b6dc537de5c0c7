use std::sync::OnceLock;

use regex::Regex;

/// Leading digit shared by every serviceable postal code. Applications from
/// other regions are rejected at the first keystroke.
pub const REGION_LEADING_DIGIT: char = '6';

pub const PHONE_DIGITS: usize = 10;
pub const POSTAL_DIGITS: usize = 6;
pub const TAX_ID_LEN: usize = 10;

/// Result of normalizing one raw field input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCheck {
    pub normalized: String,
    pub complete: bool,
}

/// Hard rejections raised while the user is still typing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("we currently operate only in postal codes starting with {REGION_LEADING_DIGIT}")]
    OutOfServiceRegion,
}

fn tax_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^[A-Z]{5}[0-9]{4}[A-Z]$").expect("valid tax id pattern"))
}

/// Strip non-digits and truncate to ten; complete iff exactly ten digits remain.
pub fn phone(raw: &str) -> FieldCheck {
    let normalized: String = raw
        .chars()
        .filter(char::is_ascii_digit)
        .take(PHONE_DIGITS)
        .collect();
    let complete = normalized.len() == PHONE_DIGITS;
    FieldCheck {
        normalized,
        complete,
    }
}

/// Strip non-digits and truncate to six. The first accepted digit must be the
/// serviceable-region digit; anything else is rejected immediately rather than
/// deferred to a length check.
pub fn postal_code(raw: &str) -> Result<FieldCheck, ValidationError> {
    let normalized: String = raw
        .chars()
        .filter(char::is_ascii_digit)
        .take(POSTAL_DIGITS)
        .collect();

    if let Some(first) = normalized.chars().next() {
        if first != REGION_LEADING_DIGIT {
            return Err(ValidationError::OutOfServiceRegion);
        }
    }

    let complete = normalized.len() == POSTAL_DIGITS;
    Ok(FieldCheck {
        normalized,
        complete,
    })
}

/// Uppercase and truncate to ten characters; complete iff the result matches
/// the five-letter, four-digit, one-letter pattern.
pub fn tax_id(raw: &str) -> FieldCheck {
    let normalized: String = raw
        .trim()
        .chars()
        .take(TAX_ID_LEN)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let complete = tax_id_pattern().is_match(&normalized);
    FieldCheck {
        normalized,
        complete,
    }
}

/// Strip everything but digits; complete iff anything remains.
pub fn amount(raw: &str) -> FieldCheck {
    let normalized: String = raw.chars().filter(char::is_ascii_digit).collect();
    let complete = !normalized.is_empty();
    FieldCheck {
        normalized,
        complete,
    }
}

/// Trim surrounding whitespace; complete iff non-blank.
pub fn free_text(raw: &str) -> FieldCheck {
    let normalized = raw.trim().to_string();
    let complete = !normalized.is_empty();
    FieldCheck {
        normalized,
        complete,
    }
}
