//! Input checks shared by the registry and the console API.
//!
//! Every helper returns an error naming the offending field so the message
//! can be shown next to the form input that produced it.

use anyhow::{anyhow, Result};
use chrono::NaiveTime;

/// Maximum length for record ids
pub const MAX_ID_LENGTH: usize = 256;

/// Maximum length for stream URLs
pub const MAX_URI_LENGTH: usize = 4096;

/// Maximum length for names, addresses and free-text values
pub const MAX_NAME_LENGTH: usize = 512;

/// URL schemes a camera may be configured with.
const ALLOWED_SCHEMES: [&str; 4] = ["http://", "https://", "rtsp://", "rtsps://"];

pub fn validate_length(value: &str, max_length: usize, field_name: &str) -> Result<()> {
    if value.len() > max_length {
        return Err(anyhow!(
            "{} exceeds maximum length of {} bytes (got {})",
            field_name,
            max_length,
            value.len()
        ));
    }
    Ok(())
}

pub fn validate_non_empty(value: &str, field_name: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("{} cannot be empty", field_name));
    }
    Ok(())
}

/// Required display text (camera name, address, schedule name).
pub fn validate_name(name: &str, field_name: &str) -> Result<()> {
    validate_non_empty(name, field_name)?;
    validate_length(name, MAX_NAME_LENGTH, field_name)?;
    Ok(())
}

/// Ids arrive in URL paths, so separators are rejected outright.
pub fn validate_id(id: &str, field_name: &str) -> Result<()> {
    validate_non_empty(id, field_name)?;
    validate_length(id, MAX_ID_LENGTH, field_name)?;

    if id.contains("..") || id.contains('/') || id.contains('\\') {
        return Err(anyhow!(
            "{} contains invalid characters (no path separators or '..' allowed)",
            field_name
        ));
    }
    Ok(())
}

/// Custom stream URLs: bounded, known scheme, no control characters.
pub fn validate_uri(uri: &str, field_name: &str) -> Result<()> {
    validate_non_empty(uri, field_name)?;
    validate_length(uri, MAX_URI_LENGTH, field_name)?;

    if uri.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(anyhow!("{} contains whitespace or control characters", field_name));
    }

    let lower = uri.to_ascii_lowercase();
    if !ALLOWED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return Err(anyhow!(
            "{} must start with one of {}",
            field_name,
            ALLOWED_SCHEMES.join(", ")
        ));
    }
    Ok(())
}

/// 24-hour `HH:MM`, as entered by the schedule form.
pub fn validate_time_of_day(value: &str, field_name: &str) -> Result<NaiveTime> {
    if value.len() != 5 {
        return Err(anyhow!("{} must be in HH:MM format, got '{}'", field_name, value));
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| anyhow!("{} must be in HH:MM format, got '{}'", field_name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Front door", "name").is_ok());
        assert!(validate_name("   ", "name").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH + 1), "name").is_err());
    }

    #[test]
    fn test_validate_id_rejects_traversal() {
        assert!(validate_id("ipcam_42", "id").is_ok());
        assert!(validate_id("../etc", "id").is_err());
        assert!(validate_id("a/b", "id").is_err());
    }

    #[test]
    fn test_validate_uri() {
        assert!(validate_uri("https://cdn.example/live.m3u8", "url").is_ok());
        assert!(validate_uri("rtsp://10.0.0.2:554/stream", "url").is_ok());
        assert!(validate_uri("ftp://10.0.0.2/stream", "url").is_err());
        assert!(validate_uri("https://cdn.example/a b", "url").is_err());

        let err = validate_uri("", "customStreamUrl").unwrap_err().to_string();
        assert!(err.contains("customStreamUrl"));
    }

    #[test]
    fn test_validate_time_of_day() {
        assert!(validate_time_of_day("07:30", "time").is_ok());
        assert!(validate_time_of_day("23:59", "time").is_ok());
        assert!(validate_time_of_day("24:00", "time").is_err());
        assert!(validate_time_of_day("7:30", "time").is_err());
        assert!(validate_time_of_day("07:30:00", "time").is_err());
    }
}
