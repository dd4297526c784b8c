//! Environment overlay onto a configuration tree.
//!
//! Each tagged field is read from the key formed by joining the enclosing
//! tagged sections' tags and its own tag with `_`. With
//!
//! ```text
//! Config { server: section "SERVER" }
//! Server { port: scalar "PORT", limits: section }
//! Limits { max: scalar "MAX" }
//! ```
//!
//! `port` binds from `SERVER_PORT` and `max` from `SERVER_MAX`, since the
//! untagged `limits` section passes its prefix through unchanged.
//!
//! Binding only ever overwrites: a missing key leaves the field alone, and a
//! value that does not parse is reported as a [`Warning`] while the field keeps
//! its previous value.

use tracing::{debug, warn};

use super::env::Env;
use super::schema::{Field, FieldVisitor, Scalar, Section};
use super::warning::Warning;

/// Binds `root` from `env` starting with an empty prefix.
pub fn bind_env<T: Section>(root: &mut T, env: &Env) -> Vec<Warning> {
    bind_env_with_prefix(root, env, "")
}

/// Binds `root` from `env` as if it were a section tagged `prefix`.
pub fn bind_env_with_prefix<T: Section>(root: &mut T, env: &Env, prefix: &str) -> Vec<Warning> {
    let mut binder = Binder {
        env,
        prefix: prefix.to_string(),
        warnings: Vec::new(),
    };
    root.visit_fields(&mut binder);
    binder.warnings
}

struct Binder<'a> {
    env: &'a Env,
    prefix: String,
    warnings: Vec<Warning>,
}

impl Binder<'_> {
    /// The key a tagged field binds from, or `None` for an untagged field.
    fn key(&self, field: Field) -> Option<String> {
        let tag = field.tag()?;
        if self.prefix.is_empty() {
            Some(tag.to_string())
        } else {
            Some(format!("{}_{}", self.prefix, tag))
        }
    }

    fn parse<T: Scalar>(&mut self, key: &str, raw: &str) -> Option<T> {
        let parsed = T::parse_env(raw);
        if parsed.is_none() {
            warn!(key, kind = %T::KIND, "ignoring unparsable environment value");
            self.warnings.push(Warning::UnparsableValue {
                key: key.to_string(),
                value: raw.to_string(),
                kind: T::KIND,
            });
        }
        parsed
    }

    fn descend<S: Section>(&mut self, prefix: String, value: &mut S) {
        let parent = std::mem::replace(&mut self.prefix, prefix);
        value.visit_fields(self);
        self.prefix = parent;
    }
}

impl FieldVisitor for Binder<'_> {
    fn scalar<T: Scalar>(&mut self, field: Field, value: &mut T) {
        let Some(key) = self.key(field) else {
            return;
        };
        let env = self.env;
        let Some(raw) = env.get(&key) else {
            return;
        };
        if let Some(parsed) = self.parse(&key, raw) {
            *value = parsed;
        }
    }

    fn optional_scalar<T: Scalar>(&mut self, field: Field, value: &mut Option<T>) {
        let Some(key) = self.key(field) else {
            return;
        };
        let env = self.env;
        let Some(raw) = env.get(&key) else {
            return;
        };
        if value.is_some() {
            debug!(key = %key, "field already set, not re-binding");
            return;
        }
        *value = self.parse(&key, raw);
    }

    fn section<S: Section>(&mut self, field: Field, value: &mut S) {
        let prefix = self.key(field).unwrap_or_else(|| self.prefix.clone());
        self.descend(prefix, value);
    }

    fn optional_section<S: Section + Default>(&mut self, field: Field, value: &mut Option<S>) {
        let Some(key) = self.key(field) else {
            return;
        };
        if !self.env.contains(&key) {
            return;
        }
        if value.is_some() {
            debug!(key = %key, "section already set, not re-binding");
            return;
        }
        let mut section = S::default();
        self.descend(key, &mut section);
        *value = Some(section);
    }
}
