use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Describes which loading stages run and where their files come from.
///
/// The stages always run in the same order: TOML file, dotenv file,
/// environment overlay, validation. Each can be switched off on its own.
///
/// ## Example
///
/// ```
/// use envlayer::Rules;
///
/// let rules = Rules::default()
///     .with_toml_file("/etc/service/config.toml", true)
///     .with_dotenv_file(".env.dev", false)
///     .with_toml_args_option(None);
///
/// assert!(rules.toml_required);
/// assert_eq!(rules.dotenv_args_option.as_deref(), Some("env"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Load the TOML config file.
    pub toml: bool,
    /// Default TOML file, absolute or relative to the working directory.
    pub toml_file: PathBuf,
    /// Fail when the TOML file is missing instead of skipping it.
    pub toml_required: bool,
    /// Command-line option that overrides `toml_file` (e.g. `config` for
    /// `--config path`). `None` or an empty name disables the override.
    pub toml_args_option: Option<String>,

    /// Load the dotenv file into the environment snapshot.
    pub dotenv: bool,
    /// Default dotenv file (e.g. `.env.dev`).
    pub dotenv_file: PathBuf,
    /// Fail when the dotenv file is missing instead of skipping it.
    pub dotenv_required: bool,
    /// Command-line option that overrides `dotenv_file`.
    pub dotenv_args_option: Option<String>,
    /// Look for a relative dotenv file in the executable's directory first,
    /// falling back to the working directory when it is not there.
    pub dotenv_beside_executable: bool,

    /// Overlay environment variables onto the config.
    pub env: bool,

    /// Run validation after everything else has loaded.
    pub validate: bool,

    /// Treat warnings (malformed dotenv lines, unparsable values) as errors.
    pub strict: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            toml: true,
            toml_file: PathBuf::from("config.toml"),
            toml_required: false,
            toml_args_option: Some("config".to_string()),

            dotenv: true,
            dotenv_file: PathBuf::from(".env"),
            dotenv_required: false,
            dotenv_args_option: Some("env".to_string()),
            dotenv_beside_executable: false,

            env: true,
            validate: true,
            strict: false,
        }
    }
}

impl Rules {
    /// Rules with every stage switched off.
    pub fn none() -> Self {
        Self {
            toml: false,
            toml_file: PathBuf::new(),
            toml_required: false,
            toml_args_option: None,
            dotenv: false,
            dotenv_file: PathBuf::new(),
            dotenv_required: false,
            dotenv_args_option: None,
            dotenv_beside_executable: false,
            env: false,
            validate: false,
            strict: false,
        }
    }

    /// Enables the TOML stage with the given default file.
    #[must_use]
    pub fn with_toml_file(mut self, path: impl Into<PathBuf>, required: bool) -> Self {
        self.toml = true;
        self.toml_file = path.into();
        self.toml_required = required;
        self
    }

    #[must_use]
    pub fn with_toml_args_option(mut self, option: Option<&str>) -> Self {
        self.toml_args_option = option.map(str::to_string);
        self
    }

    /// Enables the dotenv stage with the given default file.
    #[must_use]
    pub fn with_dotenv_file(mut self, path: impl Into<PathBuf>, required: bool) -> Self {
        self.dotenv = true;
        self.dotenv_file = path.into();
        self.dotenv_required = required;
        self
    }

    #[must_use]
    pub fn with_dotenv_args_option(mut self, option: Option<&str>) -> Self {
        self.dotenv_args_option = option.map(str::to_string);
        self
    }

    #[must_use]
    pub fn with_dotenv_beside_executable(mut self, enabled: bool) -> Self {
        self.dotenv_beside_executable = enabled;
        self
    }

    #[must_use]
    pub fn with_env(mut self, enabled: bool) -> Self {
        self.env = enabled;
        self
    }

    #[must_use]
    pub fn with_validate(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}
