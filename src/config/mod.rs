//! Layered configuration loading.

mod args;
mod bind;
mod builder;
mod dotenv;
mod env;
mod error;
mod file;
mod rules;
mod schema;
mod validate;
mod warning;

pub use args::option_value;
pub use bind::{bind_env, bind_env_with_prefix};
pub use builder::{load, LoadReport, Loader};
pub use dotenv::{load_dotenv, parse_line};
pub use env::Env;
pub use error::{ConfigError, Stage};
pub use file::{load_toml, locate_beside_executable};
pub use rules::Rules;
pub use schema::{Field, FieldVisitor, Scalar, ScalarKind, Section, SectionVisitor};
pub use validate::{validate, Validate, ValidationError};
pub use warning::Warning;
