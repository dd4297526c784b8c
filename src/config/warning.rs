//! Non-fatal problems found while loading.

use std::fmt;
use std::path::PathBuf;

use super::schema::ScalarKind;

/// Something the loader skipped instead of failing on.
///
/// Collected into [`LoadReport::warnings`](super::LoadReport::warnings) in
/// lenient mode; in strict mode the first one aborts the load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A dotenv line that is neither blank, a comment, nor a `key=value` pair.
    MalformedLine {
        path: PathBuf,
        line_number: usize,
        line: String,
    },

    /// An environment value that does not parse as the field's scalar kind.
    /// The field keeps the value it had before binding.
    UnparsableValue {
        key: String,
        value: String,
        kind: ScalarKind,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MalformedLine {
                path,
                line_number,
                line,
            } => write!(
                f,
                "{}:{}: not a key=value pair: {:?}",
                path.display(),
                line_number,
                line
            ),
            Warning::UnparsableValue { key, value, kind } => {
                write!(f, "{key}={value:?} is not a valid {kind}")
            }
        }
    }
}
