use envlayer::{section, Loader, Rules, ServerConfig, Validate};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Config {
    server: ServerConfig,
}

section! {
    Config {
        server: section "HTTP",
    }
}

impl Validate for Config {}

fn main() -> Result<(), envlayer::ConfigError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    // Run with `--config other.toml` or `--env .env.dev` to override the files
    let mut config = Config::default();
    let report = Loader::new(Rules::default().with_toml_file("demos/server.toml", false)).load(&mut config)?;

    for warning in &report.warnings {
        tracing::warn!(%warning, "config warning");
    }

    println!("Listening on {}", config.server.bind_address());
    if let Some(timeout) = config.server.timeout() {
        println!("Timeout: {timeout:?}");
    }

    Ok(())
}
