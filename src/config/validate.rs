//! Recursive validation of a configuration tree.

use std::fmt;

use super::schema::{Section, SectionVisitor};

/// A failed validation, tagged with the dotted path of the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    path: String,
    message: String,
}

impl ValidationError {
    /// Creates an error for `field` of the section being validated.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: field.into(),
            message: message.into(),
        }
    }

    /// Creates an error about the section as a whole.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(String::new(), message)
    }

    /// Prepends `segment` to the path.
    pub fn within(mut self, segment: &str) -> Self {
        self.path = if self.path.is_empty() {
            segment.to_string()
        } else {
            format!("{}.{}", segment, self.path)
        };
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn reason(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// A section's own validation rules.
///
/// The default implementation accepts everything, so sections without rules
/// only need an empty `impl Validate for T {}`.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Validates `root` depth-first and returns the first error found.
///
/// Inline nested sections are validated before their parent, in declaration
/// order; an error from a child is returned with the child's field name
/// prepended and the remaining siblings and the parent are not checked.
/// Optional sections are skipped even when they are set.
pub fn validate<T: Section>(root: &T) -> Result<(), ValidationError> {
    root.visit_sections(&mut Walker)?;
    root.validate()
}

struct Walker;

impl SectionVisitor for Walker {
    type Error = ValidationError;

    fn section<S: Section>(&mut self, name: &'static str, value: &S) -> Result<(), ValidationError> {
        validate(value).map_err(|e| e.within(name))
    }
}
