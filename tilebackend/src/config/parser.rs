//! INI parsing: `Ini` → [`ConfigFile`].
//!
//! The single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("max_age_ms") {
            config.cache.max_age_ms = parse_u64(v).ok_or_else(|| ConfigFileError::InvalidValue {
                section: "cache".to_string(),
                key: "max_age_ms".to_string(),
                value: v.to_string(),
                reason: "must be a non-negative integer (milliseconds)".to_string(),
            })?;
        }
        if let Some(v) = section.get("reap_interval_ms") {
            let ms = parse_u64(v)
                .filter(|ms| *ms > 0)
                .ok_or_else(|| ConfigFileError::InvalidValue {
                    section: "cache".to_string(),
                    key: "reap_interval_ms".to_string(),
                    value: v.to_string(),
                    reason: "must be a positive integer (milliseconds)".to_string(),
                })?;
            config.cache.reap_interval_ms = Some(ms);
        }
        if let Some(v) = section.get("deflate_upstream") {
            config.cache.deflate_upstream =
                parse_bool(v).ok_or_else(|| ConfigFileError::InvalidValue {
                    section: "cache".to_string(),
                    key: "deflate_upstream".to_string(),
                    value: v.to_string(),
                    reason: "must be true or false".to_string(),
                })?;
        }
    }

    // [source] section
    if let Some(section) = ini.section(Some("source")) {
        if let Some(v) = section.get("uri") {
            let v = v.trim();
            if !v.is_empty() {
                config.source.uri = Some(v.to_string());
            }
        }
        if let Some(v) = section.get("scale") {
            config.source.scale = v
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|s| s.is_finite() && *s >= 1.0)
                .ok_or_else(|| ConfigFileError::InvalidValue {
                    section: "source".to_string(),
                    key: "scale".to_string(),
                    value: v.to_string(),
                    reason: "must be a number >= 1".to_string(),
                })?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse().ok()
}

/// Parse a boolean; `None` if the value is not recognised.
pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand ~ to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
