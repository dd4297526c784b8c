//! Command-line overrides for file paths.

use super::ConfigError;

/// Finds the value of `option` in `args`.
///
/// The option name may be given with or without leading dashes; `-name value`,
/// `--name value`, `-name=value` and `--name=value` are all accepted. When the
/// option appears more than once the last occurrence wins. Other arguments
/// are ignored.
pub fn option_value<I, S>(args: I, option: &str) -> Result<Option<String>, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let name = option.trim_start_matches('-');
    if name.is_empty() {
        return Ok(None);
    }

    let mut found = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let arg = arg.as_ref();
        if arg == "--" {
            break;
        }
        let Some(flag) = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')) else {
            continue;
        };

        if flag == name {
            let value = args
                .next()
                .ok_or_else(|| ConfigError::MissingArgValue(format!("--{name}")))?;
            found = Some(value.as_ref().to_string());
        } else if let Some(value) = flag.strip_prefix(name).and_then(|rest| rest.strip_prefix('=')) {
            found = Some(value.to_string());
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separate_value() {
        let args = ["--config", "/etc/app.toml"];
        assert_eq!(
            option_value(args, "config").unwrap().as_deref(),
            Some("/etc/app.toml")
        );
        assert_eq!(
            option_value(["-config", "a.toml"], "-config").unwrap().as_deref(),
            Some("a.toml")
        );
    }

    #[test]
    fn test_inline_value() {
        assert_eq!(
            option_value(["-v", "--env=.env.dev"], "env").unwrap().as_deref(),
            Some(".env.dev")
        );
        assert_eq!(
            option_value(["-env=prod.env"], "--env").unwrap().as_deref(),
            Some("prod.env")
        );
    }

    #[test]
    fn test_last_occurrence_wins() {
        let args = ["--config", "a.toml", "--config=b.toml"];
        assert_eq!(option_value(args, "config").unwrap().as_deref(), Some("b.toml"));
    }

    #[test]
    fn test_absent_or_similar_names() {
        assert_eq!(option_value(["--configs", "x"], "config").unwrap(), None);
        assert_eq!(option_value(["--configx=y"], "config").unwrap(), None);
        assert_eq!(option_value(["config", "x"], "config").unwrap(), None);
        assert_eq!(option_value(Vec::<String>::new(), "config").unwrap(), None);
    }

    #[test]
    fn test_empty_option_name_matches_nothing() {
        assert_eq!(option_value(["--", "x"], "").unwrap(), None);
        assert_eq!(option_value(["-x"], "--").unwrap(), None);
    }

    #[test]
    fn test_stops_at_double_dash() {
        assert_eq!(option_value(["--", "--config", "x"], "config").unwrap(), None);
    }

    #[test]
    fn test_missing_value() {
        let result = option_value(["--config"], "config");
        assert!(matches!(result, Err(ConfigError::MissingArgValue(flag)) if flag == "--config"));
    }
}
