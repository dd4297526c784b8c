use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::args::option_value;
use super::bind::bind_env;
use super::dotenv::load_dotenv;
use super::env::Env;
use super::error::Stage;
use super::file::{load_toml, locate_beside_executable};
use super::rules::Rules;
use super::schema::Section;
use super::validate::validate;
use super::warning::Warning;
use super::ConfigError;

/// Loads a configuration tree from layered sources according to [`Rules`].
///
/// Stages run in a fixed order, each one switchable through the rules:
///
/// 1. the TOML file is decoded into the tree,
/// 2. the dotenv file is read into the environment snapshot, overwriting
///    variables from the process environment,
/// 3. environment variables are bound onto the tagged fields of the tree,
/// 4. the tree is validated.
///
/// The first failing stage aborts the load. Because later stages write over
/// earlier ones, a dotenv value beats the same process variable, and any
/// environment value beats the TOML file.
///
/// ## Example
///
/// ```no_run
/// use envlayer::{section, Loader, Rules, Validate};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Default, Serialize, Deserialize)]
/// #[serde(default)]
/// struct MyConfig {
///     name: String,
///     port: u16,
/// }
///
/// section! {
///     MyConfig {
///         name: scalar "NAME",
///         port: scalar "PORT",
///     }
/// }
///
/// impl Validate for MyConfig {}
///
/// let mut config = MyConfig::default();
/// let report = Loader::new(Rules::default()).load(&mut config)?;
/// for warning in &report.warnings {
///     eprintln!("config warning: {warning}");
/// }
/// # Ok::<(), envlayer::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "loaders do nothing until .load() is called"]
pub struct Loader {
    rules: Rules,
    env: Option<Env>,
    args: Option<Vec<String>>,
}

/// What a successful load did.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// The TOML file that was decoded, if any.
    pub toml_file: Option<PathBuf>,
    /// The dotenv file that was applied, if any.
    pub dotenv_file: Option<PathBuf>,
    /// The environment after the dotenv stage, as seen by the binder.
    pub env: Env,
    /// Problems that were skipped over.
    pub warnings: Vec<Warning>,
}

impl Loader {
    /// Creates a loader that reads the process environment and arguments.
    pub fn new(rules: Rules) -> Self {
        Self {
            rules,
            env: None,
            args: None,
        }
    }

    /// Uses `env` instead of a snapshot of the process environment.
    pub fn with_env(mut self, env: Env) -> Self {
        self.env = Some(env);
        self
    }

    /// Uses `args` instead of the process arguments when looking for file
    /// path overrides. The program name must not be included.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Runs the enabled stages against `root`.
    pub fn load<T>(self, root: &mut T) -> Result<LoadReport, ConfigError>
    where
        T: Section + Serialize + DeserializeOwned,
    {
        let Loader { rules, env, mut args } = self;

        let mut report = LoadReport {
            env: env.unwrap_or_else(Env::from_process),
            ..Default::default()
        };

        if rules.toml {
            let toml_path =
                resolve_path(&rules.toml_file, rules.toml_args_option.as_deref(), &mut args)?;
            if let Some(path) = required_file(Stage::Toml, &toml_path, rules.toml_required)? {
                if load_toml(root, path, rules.toml_required)? {
                    report.toml_file = Some(path.to_path_buf());
                } else {
                    debug!(path = %path.display(), "optional TOML file not found, skipping");
                }
            }
        } else {
            debug!("TOML stage disabled");
        }

        if rules.dotenv {
            let dotenv_path =
                resolve_path(&rules.dotenv_file, rules.dotenv_args_option.as_deref(), &mut args)?;
            if let Some(path) = required_file(Stage::DotEnv, &dotenv_path, rules.dotenv_required)? {
                let located;
                let path = if rules.dotenv_beside_executable && path.is_relative() {
                    located = locate_beside_executable(path)?;
                    located.as_deref().unwrap_or(path)
                } else {
                    path
                };

                if path.exists() {
                    let warnings = load_dotenv(path, &mut report.env)?;
                    report.dotenv_file = Some(path.to_path_buf());
                    accept(&rules, &mut report.warnings, warnings)?;
                } else if rules.dotenv_required {
                    return Err(ConfigError::FileNotFound(path.to_path_buf()));
                } else {
                    debug!(path = %path.display(), "optional dotenv file not found, skipping");
                }
            }
        } else {
            debug!("dotenv stage disabled");
        }

        if rules.env {
            let warnings = bind_env(root, &report.env);
            accept(&rules, &mut report.warnings, warnings)?;
        } else {
            debug!("environment stage disabled");
        }

        if rules.validate {
            validate(root)?;
        } else {
            debug!("validation stage disabled");
        }

        Ok(report)
    }
}

/// Loads `root` with `rules` from the process environment and arguments.
pub fn load<T>(root: &mut T, rules: &Rules) -> Result<LoadReport, ConfigError>
where
    T: Section + Serialize + DeserializeOwned,
{
    Loader::new(rules.clone()).load(root)
}

/// Picks the command-line override for a file path, falling back to the
/// configured default.
///
/// The process arguments are only read when an option name is set.
fn resolve_path(
    default: &Path,
    option: Option<&str>,
    args: &mut Option<Vec<String>>,
) -> Result<PathBuf, ConfigError> {
    let overridden = match option {
        Some(option) if !option.is_empty() => {
            let args = args.get_or_insert_with(|| lossy_args(std::env::args_os().skip(1)));
            option_value(args.iter(), option)?
        }
        _ => None,
    };
    Ok(overridden.map_or_else(|| default.to_path_buf(), PathBuf::from))
}

/// Converts raw arguments, replacing invalid Unicode instead of panicking.
fn lossy_args(args: impl IntoIterator<Item = OsString>) -> Vec<String> {
    args.into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

/// Checks a stage's file path before loading it.
///
/// Returns `Ok(None)` when an optional stage has no path configured.
fn required_file(stage: Stage, path: &Path, required: bool) -> Result<Option<&Path>, ConfigError> {
    if !path.as_os_str().is_empty() {
        return Ok(Some(path));
    }
    if required {
        return Err(ConfigError::RequiredPathEmpty(stage));
    }
    debug!(%stage, "no file configured, skipping");
    Ok(None)
}

/// Adds a stage's warnings to the report, or fails on the first one in
/// strict mode.
fn accept(rules: &Rules, collected: &mut Vec<Warning>, warnings: Vec<Warning>) -> Result<(), ConfigError> {
    if rules.strict {
        if let Some(first) = warnings.into_iter().next() {
            return Err(ConfigError::Rejected(first));
        }
        return Ok(());
    }
    collected.extend(warnings);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{section, ValidationError, Validate};
    use serde::Deserialize;
    use std::io::Write;
    use tempfile::TempDir;

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct Database {
        host: String,
        port: u16,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct AppConfig {
        name: String,
        port: u16,
        debug: bool,
        database: Database,
    }

    section! {
        Database {
            host: scalar "HOST",
            port: scalar "PORT",
        }
    }

    section! {
        AppConfig {
            name: scalar "NAME",
            port: scalar "PORT",
            debug: scalar "DEBUG",
            database: section "DB",
        }
    }

    impl Validate for Database {
        fn validate(&self) -> Result<(), ValidationError> {
            if self.host.is_empty() {
                return Err(ValidationError::new("host", "must not be empty"));
            }
            Ok(())
        }
    }

    impl Validate for AppConfig {}

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{contents}").unwrap();
        path
    }

    fn rules_for(dir: &TempDir) -> Rules {
        Rules::default()
            .with_toml_file(dir.path().join("config.toml"), false)
            .with_dotenv_file(dir.path().join(".env"), false)
    }

    fn loader(rules: Rules, env: &[(&str, &str)]) -> Loader {
        Loader::new(rules)
            .with_env(env.iter().copied().collect())
            .with_args(Vec::<String>::new())
    }

    #[test]
    fn test_dotenv_beats_shell_environment() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "config.toml", "port = 7070\n[database]\nhost = \"db\"\n");
        write_file(&dir, ".env", "PORT=9090\n");

        let mut cfg = AppConfig::default();
        let report = loader(rules_for(&dir), &[("PORT", "8080")])
            .load(&mut cfg)
            .unwrap();

        assert_eq!(cfg.port, 9090);
        assert_eq!(report.env.get("PORT"), Some("9090"));
        assert_eq!(report.toml_file, Some(dir.path().join("config.toml")));
        assert_eq!(report.dotenv_file, Some(dir.path().join(".env")));
    }

    #[test]
    fn test_environment_beats_toml() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "config.toml",
            "name = \"from-toml\"\nport = 7070\n[database]\nhost = \"db\"\nport = 5432\n",
        );

        let mut cfg = AppConfig::default();
        loader(rules_for(&dir), &[("NAME", "from-env"), ("DB_PORT", "6543")])
            .load(&mut cfg)
            .unwrap();

        assert_eq!(cfg.name, "from-env");
        assert_eq!(cfg.port, 7070);
        assert_eq!(cfg.database.host, "db");
        assert_eq!(cfg.database.port, 6543);
    }

    #[test]
    fn test_required_toml_with_empty_path_stops_before_later_stages() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, ".env", "NAME=from-dotenv\n");

        let rules = rules_for(&dir).with_toml_file("", true);
        let mut cfg = AppConfig::default();
        let result = loader(rules, &[("DEBUG", "true")]).load(&mut cfg);

        assert!(matches!(result, Err(ConfigError::RequiredPathEmpty(Stage::Toml))));
        assert_eq!(cfg.name, "");
        assert!(!cfg.debug);
    }

    #[test]
    fn test_required_toml_missing_file() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, ".env", "NAME=from-dotenv\n");

        let rules = rules_for(&dir).with_toml_file(dir.path().join("missing.toml"), true);
        let mut cfg = AppConfig::default();
        let result = loader(rules, &[("DEBUG", "true")]).load(&mut cfg);

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
        assert!(!cfg.debug);
    }

    #[test]
    fn test_optional_files_missing_are_skipped() {
        let dir = TempDir::new().unwrap();

        let rules = rules_for(&dir).with_validate(false);
        let mut cfg = AppConfig::default();
        let report = loader(rules, &[("DEBUG", "1")]).load(&mut cfg).unwrap();

        assert!(cfg.debug);
        assert_eq!(report.toml_file, None);
        assert_eq!(report.dotenv_file, None);
    }

    #[test]
    fn test_required_dotenv_missing_file() {
        let dir = TempDir::new().unwrap();

        let rules = rules_for(&dir).with_dotenv_file(dir.path().join(".env.prod"), true);
        let mut cfg = AppConfig::default();
        let result = loader(rules, &[]).load(&mut cfg);

        assert!(matches!(result, Err(ConfigError::FileNotFound(path)) if path.ends_with(".env.prod")));
    }

    #[test]
    fn test_empty_optional_paths_are_skipped() {
        let rules = Rules::default()
            .with_toml_file("", false)
            .with_dotenv_file("", false)
            .with_validate(false);
        let mut cfg = AppConfig::default();
        let report = loader(rules, &[("NAME", "x")]).load(&mut cfg).unwrap();

        assert_eq!(cfg.name, "x");
        assert_eq!(report.toml_file, None);
    }

    #[test]
    fn test_validation_error_carries_path() {
        let mut cfg = AppConfig::default();
        let result = loader(Rules::none().with_validate(true), &[]).load(&mut cfg);

        match result {
            Err(ConfigError::Validation(err)) => {
                assert_eq!(err.to_string(), "database.host: must not be empty");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_disabled_stages_do_nothing() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "config.toml", "name = \"from-toml\"\n");
        write_file(&dir, ".env", "NAME=from-dotenv\n");

        let mut rules = rules_for(&dir);
        rules.toml = false;
        rules.dotenv = false;
        rules.env = false;
        rules.validate = false;

        let mut cfg = AppConfig::default();
        let report = loader(rules, &[("NAME", "from-env")]).load(&mut cfg).unwrap();

        assert_eq!(cfg.name, "");
        assert_eq!(report.env.get("NAME"), Some("from-env"));
        assert_eq!(report.toml_file, None);
        assert_eq!(report.dotenv_file, None);
    }

    #[test]
    fn test_args_override_file_paths() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "config.toml", "name = \"default\"\n");
        let other = write_file(&dir, "other.toml", "name = \"override\"\n");
        let env_file = write_file(&dir, "dev.env", "DEBUG=true\n");

        let rules = rules_for(&dir).with_validate(false);
        let mut cfg = AppConfig::default();
        let report = Loader::new(rules)
            .with_env(Env::new())
            .with_args([
                "--verbose".to_string(),
                "--config".to_string(),
                other.display().to_string(),
                format!("--env={}", env_file.display()),
            ])
            .load(&mut cfg)
            .unwrap();

        assert_eq!(cfg.name, "override");
        assert!(cfg.debug);
        assert_eq!(report.toml_file, Some(other));
        assert_eq!(report.dotenv_file, Some(env_file));
    }

    #[test]
    fn test_args_ignored_without_option_name() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "config.toml", "name = \"default\"\n");
        let other = write_file(&dir, "other.toml", "name = \"override\"\n");

        let rules = rules_for(&dir).with_toml_args_option(None).with_validate(false);
        let mut cfg = AppConfig::default();
        Loader::new(rules)
            .with_env(Env::new())
            .with_args(["--config".to_string(), other.display().to_string()])
            .load(&mut cfg)
            .unwrap();

        assert_eq!(cfg.name, "default");
    }

    #[test]
    fn test_lenient_mode_collects_warnings() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, ".env", "garbage line\nPORT=lots\n");

        let rules = rules_for(&dir).with_validate(false);
        let mut cfg = AppConfig {
            port: 3000,
            ..Default::default()
        };
        let report = loader(rules, &[]).load(&mut cfg).unwrap();

        assert_eq!(cfg.port, 3000);
        assert_eq!(report.warnings.len(), 2);
        assert!(matches!(report.warnings[0], Warning::MalformedLine { line_number: 1, .. }));
        assert!(matches!(&report.warnings[1], Warning::UnparsableValue { key, .. } if key == "PORT"));
    }

    #[test]
    fn test_strict_mode_rejects_unparsable_values() {
        let rules = Rules::none().with_env(true).with_strict(true);
        let mut cfg = AppConfig::default();
        let result = loader(rules, &[("DEBUG", "maybe")]).load(&mut cfg);

        assert!(matches!(
            result,
            Err(ConfigError::Rejected(Warning::UnparsableValue { .. }))
        ));
    }

    #[test]
    fn test_strict_mode_rejects_malformed_dotenv_before_binding() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, ".env", "NAME=ok\nnot a pair\n");

        let rules = rules_for(&dir).with_strict(true);
        let mut cfg = AppConfig::default();
        let result = loader(rules, &[]).load(&mut cfg);

        assert!(matches!(
            result,
            Err(ConfigError::Rejected(Warning::MalformedLine { .. }))
        ));
        assert_eq!(cfg.name, "");
    }

    #[test]
    fn test_malformed_toml_aborts() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "config.toml", "name = \n");
        write_file(&dir, ".env", "NAME=x\n");

        let mut cfg = AppConfig::default();
        let result = loader(rules_for(&dir), &[]).load(&mut cfg);

        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
        assert_eq!(cfg.name, "");
    }

    #[test]
    fn test_dotenv_with_non_utf8_comment() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".env"), b"# caf\xe9\nPORT=9090\n").unwrap();

        let rules = rules_for(&dir).with_validate(false);
        let mut cfg = AppConfig::default();
        let report = loader(rules, &[]).load(&mut cfg).unwrap();

        assert_eq!(cfg.port, 9090);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_disabled_stage_ignores_its_args_option() {
        let rules = Rules::none()
            .with_env(true)
            .with_toml_args_option(Some("config"))
            .with_dotenv_args_option(Some("env"));
        let mut cfg = AppConfig::default();
        let report = Loader::new(rules)
            .with_env([("NAME", "x")].into_iter().collect())
            .with_args(["--config", "--env"])
            .load(&mut cfg)
            .unwrap();

        assert_eq!(cfg.name, "x");
        assert_eq!(report.dotenv_file, None);
    }

    #[test]
    fn test_enabled_stage_reports_missing_arg_value() {
        let dir = TempDir::new().unwrap();
        let rules = rules_for(&dir).with_validate(false);
        let mut cfg = AppConfig::default();
        let result = Loader::new(rules)
            .with_env(Env::new())
            .with_args(["--env"])
            .load(&mut cfg);

        assert!(matches!(result, Err(ConfigError::MissingArgValue(flag)) if flag == "--env"));
    }

    #[test]
    fn test_resolve_path_without_option_leaves_args_unread() {
        let mut args = None;
        let path = resolve_path(Path::new(".env"), None, &mut args).unwrap();
        assert_eq!(path, PathBuf::from(".env"));
        assert!(args.is_none());

        let path = resolve_path(Path::new(".env"), Some(""), &mut args).unwrap();
        assert_eq!(path, PathBuf::from(".env"));
        assert!(args.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_unicode_args_are_replaced() {
        use std::os::unix::ffi::OsStringExt;

        let args = lossy_args([
            OsString::from("--config"),
            OsString::from_vec(b"caf\xe9.toml".to_vec()),
        ]);
        assert_eq!(args, vec!["--config".to_string(), "caf\u{fffd}.toml".to_string()]);

        let mut args = Some(args);
        let path = resolve_path(Path::new("config.toml"), Some("config"), &mut args).unwrap();
        assert_eq!(path, PathBuf::from("caf\u{fffd}.toml"));
    }

    #[test]
    fn test_dotenv_beside_executable() {
        let exe_dir = std::env::current_exe().unwrap().parent().unwrap().to_path_buf();
        let name = format!("envlayer-test-{}.env", std::process::id());
        let beside = exe_dir.join(&name);
        std::fs::write(&beside, "NAME=beside-exe\n").unwrap();

        let rules = Rules::none()
            .with_dotenv_file(&name, true)
            .with_dotenv_beside_executable(true)
            .with_env(true);
        let mut cfg = AppConfig::default();
        let result = loader(rules, &[]).load(&mut cfg);
        std::fs::remove_file(&beside).unwrap();

        let report = result.unwrap();
        assert_eq!(cfg.name, "beside-exe");
        assert_eq!(report.dotenv_file, Some(beside));
    }

    #[test]
    fn test_dotenv_beside_executable_falls_back_to_given_path() {
        let dir = TempDir::new().unwrap();
        let env_file = write_file(&dir, ".env", "NAME=from-dir\n");

        // Absolute paths are used as is
        let rules = Rules::none()
            .with_dotenv_file(&env_file, true)
            .with_dotenv_beside_executable(true)
            .with_env(true);
        let mut cfg = AppConfig::default();
        let report = loader(rules, &[]).load(&mut cfg).unwrap();
        assert_eq!(cfg.name, "from-dir");
        assert_eq!(report.dotenv_file, Some(env_file));

        let rules = Rules::none()
            .with_dotenv_file("envlayer-nowhere.env", false)
            .with_dotenv_beside_executable(true);
        let report = loader(rules, &[]).load(&mut AppConfig::default()).unwrap();
        assert_eq!(report.dotenv_file, None);
    }

    #[test]
    fn test_load_uses_process_environment() {
        let dir = TempDir::new().unwrap();
        let rules = Rules::none()
            .with_toml_file(dir.path().join("config.toml"), false)
            .with_toml_args_option(None)
            .with_env(true);

        temp_env::with_var("DB_HOST", Some("process-host"), || {
            let mut cfg = AppConfig::default();
            load(&mut cfg, &rules).unwrap();
            assert_eq!(cfg.database.host, "process-host");
        });
    }
}
