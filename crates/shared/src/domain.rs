use serde::{Deserialize, Serialize};

use crate::protocol::ItineraryRequest;

/// Raw form input, exactly as typed. Nothing here is validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormState {
    pub destination: String,
    pub budget: String,
    pub interests: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Destination,
    Budget,
    Interests,
}

impl FormField {
    pub fn placeholder(self) -> &'static str {
        match self {
            FormField::Destination => "Enter destination",
            FormField::Budget => "Enter budget",
            FormField::Interests => "Enter interests (comma separated)",
        }
    }
}

impl FormState {
    pub fn new(
        destination: impl Into<String>,
        budget: impl Into<String>,
        interests: impl Into<String>,
    ) -> Self {
        Self {
            destination: destination.into(),
            budget: budget.into(),
            interests: interests.into(),
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        match field {
            FormField::Destination => self.destination = value,
            FormField::Budget => self.budget = value,
            FormField::Interests => self.interests = value,
        }
    }

    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Destination => &self.destination,
            FormField::Budget => &self.budget,
            FormField::Interests => &self.interests,
        }
    }

    pub fn to_request(&self) -> ItineraryRequest {
        ItineraryRequest {
            destination: self.destination.clone(),
            budget: parse_budget(&self.budget),
            interests: split_interests(&self.interests),
        }
    }
}

/// Parses the longest numeric prefix after leading whitespace.
///
/// Trailing garbage is ignored (`"40abc"` is 40). Input with no numeric
/// prefix yields `NaN`, which is passed through to the request unchanged.
pub fn parse_budget(raw: &str) -> f64 {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().unwrap_or(f64::NAN)
}

/// Splits on `,` and trims each segment. Empty segments are kept.
pub fn split_interests(raw: &str) -> Vec<String> {
    raw.split(',').map(|part| part.trim().to_string()).collect()
}
