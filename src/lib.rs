pub mod config;
pub mod server;

pub use config::{
    bind_env, load, validate, ConfigError, Env, Field, FieldVisitor, LoadReport, Loader, Rules,
    Scalar, ScalarKind, Section, SectionVisitor, Stage, Validate, ValidationError, Warning,
};
pub use server::ServerConfig;
