//! TOML file stage.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use super::ConfigError;

/// Decodes the TOML file at `path` into `root`.
///
/// Values already in `root` survive unless the file sets them: the current
/// tree is snapshotted, the file is merged over it and the result is written
/// back. Nested tables merge recursively; other values (including arrays) are
/// replaced.
///
/// Returns `Ok(false)` if the file doesn't exist and `required` is false.
pub fn load_toml<T>(root: &mut T, path: &Path, required: bool) -> Result<bool, ConfigError>
where
    T: Serialize + DeserializeOwned,
{
    let Some(table) = load_config_file(path, required)? else {
        return Ok(false);
    };

    info!(path = %path.display(), "loading config from TOML file");

    let mut merged = match toml::Value::try_from(&*root)? {
        toml::Value::Table(table) => table,
        _ => toml::Table::new(),
    };
    deep_merge(&mut merged, table);

    *root = toml::Value::Table(merged).try_into()?;
    Ok(true)
}

/// Returns the path of `name` in the running executable's directory, if such
/// a file exists there.
///
/// The loader uses this for the dotenv file when
/// [`Rules::dotenv_beside_executable`](super::Rules::dotenv_beside_executable)
/// is set.
pub fn locate_beside_executable(name: impl AsRef<Path>) -> Result<Option<PathBuf>, ConfigError> {
    let exe = std::env::current_exe().map_err(|e| ConfigError::ReadError {
        path: PathBuf::from(name.as_ref()),
        source: e,
    })?;
    Ok(locate_in(exe.parent().unwrap_or(Path::new("")), name))
}

fn locate_in(dir: &Path, name: impl AsRef<Path>) -> Option<PathBuf> {
    let candidate = dir.join(name);
    candidate.is_file().then_some(candidate)
}

/// Loads and parses a TOML config file.
///
/// Returns `Ok(None)` if the file doesn't exist and `required` is false.
fn load_config_file(path: &Path, required: bool) -> Result<Option<toml::Table>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let table = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
            Ok(Some(table))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                Err(ConfigError::FileNotFound(path.to_path_buf()))
            } else {
                Ok(None)
            }
        }
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn deep_merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
