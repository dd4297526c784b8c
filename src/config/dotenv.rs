//! `.env` file loading.
//!
//! One `key=value` or `key="value"` pair per line. Lines starting with `#`,
//! blank lines and lines that are not pairs are skipped. Whitespace around
//! `=` and at the ends of unquoted values is ASCII whitespace only.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use super::env::Env;
use super::warning::Warning;
use super::ConfigError;

static LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([A-Za-z0-9_]+)(?-u:\s)*=(?-u:\s)*(?:"(.*)"|(.*?))(?-u:\s)*$"#)
        .expect("dotenv line pattern is valid")
});

/// Parses a single line into a key/value pair.
///
/// Quoted values are returned without the quotes and with their content
/// untouched; unquoted values are trimmed. Returns `None` for comments and
/// anything else that is not a pair.
pub fn parse_line(line: &str) -> Option<(&str, &str)> {
    if line.starts_with('#') {
        return None;
    }

    let caps = LINE.captures(line)?;
    let key = caps.get(1)?.as_str();
    let value = caps.get(2).or_else(|| caps.get(3))?.as_str();
    Some((key, value))
}

/// Loads the pairs from a dotenv file into `env`, overwriting existing keys.
///
/// Later lines win over earlier ones with the same key. Only failing to read
/// the file is an error; lines that are not pairs come back as warnings.
pub fn load_dotenv(path: &Path, env: &mut Env) -> Result<Vec<Warning>, ConfigError> {
    let contents = std::fs::read(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!(path = %path.display(), "loading env vars from dotenv file");

    let mut warnings = Vec::new();
    let mut loaded = 0usize;

    for (index, raw) in contents.split(|&b| b == b'\n').enumerate() {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line,
            // Comments may be in any encoding
            Err(_) if raw.starts_with(b"#") => continue,
            Err(_) => {
                debug!(path = %path.display(), line_number = index + 1, "skipping non UTF-8 dotenv line");
                warnings.push(Warning::MalformedLine {
                    path: path.to_path_buf(),
                    line_number: index + 1,
                    line: String::from_utf8_lossy(raw).into_owned(),
                });
                continue;
            }
        };

        match parse_line(line) {
            Some((key, value)) => {
                env.set(key, value);
                loaded += 1;
            }
            None if is_ignorable(line) => {}
            None => {
                debug!(path = %path.display(), line_number = index + 1, "skipping malformed dotenv line");
                warnings.push(Warning::MalformedLine {
                    path: path.to_path_buf(),
                    line_number: index + 1,
                    line: line.to_string(),
                });
            }
        }
    }

    debug!(path = %path.display(), loaded, skipped = warnings.len(), "dotenv file applied");
    Ok(warnings)
}

fn is_ignorable(line: &str) -> bool {
    line.starts_with('#') || line.trim().is_empty()
}
