//! Static field tables for configuration types.
//!
//! A configuration type describes its own shape by implementing [`Section`]:
//! it hands each bindable field to a [`FieldVisitor`] together with a
//! [`Field`] descriptor, and each inline nested section to a
//! [`SectionVisitor`]. The binder and the validator are just visitors, so no
//! runtime reflection is involved.
//!
//! Most types should use the [`section!`](crate::section) macro instead of
//! writing the impl by hand.

use std::fmt;
use std::path::PathBuf;

use super::validate::Validate;

/// Describes one field of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Rust field name, used for validation error paths.
    pub name: &'static str,
    /// Binding key tag. `None` (or an empty tag) means the field has no key
    /// of its own.
    pub tag: Option<&'static str>,
}

impl Field {
    pub const fn new(name: &'static str, tag: Option<&'static str>) -> Self {
        Self { name, tag }
    }

    /// Returns the tag, treating an empty tag as absent.
    pub fn tag(&self) -> Option<&'static str> {
        self.tag.filter(|t| !t.is_empty())
    }
}

/// The closed set of scalar kinds the binder knows how to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Signed,
    Unsigned,
    Float,
    Bool,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::String => "string",
            ScalarKind::Signed => "signed integer",
            ScalarKind::Unsigned => "unsigned integer",
            ScalarKind::Float => "float",
            ScalarKind::Bool => "boolean",
        };
        f.write_str(name)
    }
}

/// A leaf value that can be read from an environment string.
pub trait Scalar: Sized {
    const KIND: ScalarKind;

    /// Parses a raw environment value, or returns `None` if it is not a
    /// valid literal for this type.
    fn parse_env(raw: &str) -> Option<Self>;
}

impl Scalar for String {
    const KIND: ScalarKind = ScalarKind::String;

    fn parse_env(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl Scalar for PathBuf {
    const KIND: ScalarKind = ScalarKind::String;

    fn parse_env(raw: &str) -> Option<Self> {
        Some(PathBuf::from(raw))
    }
}

impl Scalar for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn parse_env(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("true") || raw == "1" {
            Some(true)
        } else if raw.eq_ignore_ascii_case("false") || raw == "0" {
            Some(false)
        } else {
            None
        }
    }
}

macro_rules! impl_scalar {
    ($kind:ident: $($ty:ty),+) => {
        $(
            impl Scalar for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;

                // Parsed at the declared width, so out-of-range literals are
                // rejected rather than truncated.
                fn parse_env(raw: &str) -> Option<Self> {
                    raw.parse().ok()
                }
            }
        )+
    };
}

impl_scalar!(Signed: i8, i16, i32, i64, i128, isize);
impl_scalar!(Unsigned: u8, u16, u32, u64, u128, usize);
impl_scalar!(Float: f32, f64);

/// Receives every bindable field of a section, in declaration order.
pub trait FieldVisitor {
    fn scalar<T: Scalar>(&mut self, field: Field, value: &mut T);

    fn optional_scalar<T: Scalar>(&mut self, field: Field, value: &mut Option<T>);

    fn section<S: Section>(&mut self, field: Field, value: &mut S);

    fn optional_section<S: Section + Default>(&mut self, field: Field, value: &mut Option<S>);
}

/// Receives the inline nested sections of a section, in declaration order.
///
/// Optional sections are not part of this walk.
pub trait SectionVisitor {
    type Error;

    fn section<S: Section>(&mut self, name: &'static str, value: &S) -> Result<(), Self::Error>;
}

/// A record in the configuration tree.
pub trait Section: Validate {
    fn visit_fields<V: FieldVisitor>(&mut self, visitor: &mut V);

    fn visit_sections<V: SectionVisitor>(&self, visitor: &mut V) -> Result<(), V::Error>;
}

/// Implements [`Section`] for a struct from a list of its fields.
///
/// Each entry is `field: kind` or `field: kind "TAG"`, where `kind` is one of
/// `scalar`, `optional_scalar`, `section` or `optional_section`. Fields that
/// are not listed are never bound. The type must also implement
/// [`Validate`](crate::Validate), usually with an empty impl.
///
/// ```
/// use envlayer::{section, Validate};
///
/// #[derive(Default)]
/// struct Database {
///     host: String,
///     port: u16,
/// }
///
/// #[derive(Default)]
/// struct AppConfig {
///     name: String,
///     database: Database,
///     token: Option<String>,
/// }
///
/// section! {
///     Database {
///         host: scalar "HOST",
///         port: scalar "PORT",
///     }
/// }
///
/// section! {
///     AppConfig {
///         name: scalar "NAME",
///         database: section "DB",
///         token: optional_scalar "TOKEN",
///     }
/// }
///
/// impl Validate for Database {}
/// impl Validate for AppConfig {}
/// ```
#[macro_export]
macro_rules! section {
    ($ty:ty { $($field:ident : $kind:ident $($tag:literal)?),* $(,)? }) => {
        impl $crate::Section for $ty {
            #[allow(unused_variables)]
            fn visit_fields<V: $crate::FieldVisitor>(&mut self, visitor: &mut V) {
                $(
                    visitor.$kind(
                        $crate::Field::new(::std::stringify!($field), $crate::__tag!($($tag)?)),
                        &mut self.$field,
                    );
                )*
            }

            #[allow(unused_variables)]
            fn visit_sections<V: $crate::SectionVisitor>(
                &self,
                visitor: &mut V,
            ) -> ::std::result::Result<(), V::Error> {
                $(
                    $crate::__visit_section!($kind, visitor, ::std::stringify!($field), &self.$field);
                )*
                ::std::result::Result::Ok(())
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __tag {
    () => {
        ::std::option::Option::None
    };
    ($tag:literal) => {
        ::std::option::Option::Some($tag)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __visit_section {
    (section, $visitor:ident, $name:expr, $value:expr) => {
        $visitor.section($name, $value)?;
    };
    ($other:ident, $visitor:ident, $name:expr, $value:expr) => {};
}
