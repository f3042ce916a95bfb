use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt::Display;
use std::ops::RangeInclusive;

use crate::error::{Result, StudioError};

pub fn in_range<T>(name: &str, value: T, range: RangeInclusive<T>) -> Result<T>
where
    T: PartialOrd + Display + Copy,
{
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(StudioError::invalid(format!(
            "{} must be within [{}, {}], got {}",
            name,
            range.start(),
            range.end(),
            value
        )))
    }
}

pub fn unit_interval(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(StudioError::invalid(format!("{} must be within [0, 1], got {}", name, value)))
    }
}

/// `#RRGGBB`, returned upper-cased.
pub fn hex_color(name: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    let valid = trimmed.len() == 7
        && trimmed.starts_with('#')
        && trimmed[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(trimmed.to_uppercase())
    } else {
        Err(StudioError::invalid(format!(
            "{} must be a #RRGGBB color, got '{}'",
            name, value
        )))
    }
}

pub fn non_empty(name: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(StudioError::invalid(format!("{} is required", name)))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Blank optional text counts as absent.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn encode_image(name: &str, bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        return Err(StudioError::invalid(format!("{} data is required", name)));
    }
    Ok(STANDARD.encode(bytes))
}

pub fn http_url(name: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Err(StudioError::invalid(format!(
            "{} must be an http(s) URL, got '{}'",
            name, value
        )))
    }
}
