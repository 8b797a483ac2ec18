//! Configuration helpers shared by the feeder and relay command lines.

/// Spellings accepted as `true`.
const TRUTHY: [&str; 6] = ["1", "true", "t", "yes", "y", "on"];
/// Spellings accepted as `false`.
const FALSY: [&str; 6] = ["0", "false", "f", "no", "n", "off"];

/// Parse a boolean toggle, case-insensitively and ignoring surrounding whitespace.
///
/// An empty value yields `None` so the caller can fall back to its default; an
/// unrecognized spelling is an error.
pub fn parse_toggle(raw: &str) -> Result<Option<bool>, String> {
    let value = raw.trim().to_ascii_lowercase();
    if value.is_empty() {
        return Ok(None);
    }
    if TRUTHY.contains(&value.as_str()) {
        Ok(Some(true))
    } else if FALSY.contains(&value.as_str()) {
        Ok(Some(false))
    } else {
        Err(format!(
            "unrecognized boolean '{}', expected one of {} or {}",
            raw.trim(),
            TRUTHY.join("/"),
            FALSY.join("/")
        ))
    }
}

/// `clap` value parser for toggles that default to off.
pub fn flag_default_off(raw: &str) -> Result<bool, String> {
    parse_toggle(raw).map(|v| v.unwrap_or(false))
}
