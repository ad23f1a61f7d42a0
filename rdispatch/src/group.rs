//! Group generics.
//!
//! A group generic is a fallback family: when no `generic.class` method
//! exists, `Group.class` is tried at the same position of the class vector.
//! Membership is fixed by the language and never changes at runtime.

use std::fmt;
use std::str::FromStr;

/// A group generic family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    /// Arithmetic, comparison and logical operators.
    Ops,
    /// Elementwise mathematical functions.
    Math,
    /// Reductions.
    Summary,
    /// Complex-number accessors.
    Complex,
}

const OPS: &[&str] = &[
    "+", "-", "*", "/", "^", "%%", "%/%", "&", "|", "!", "==", "!=", "<", "<=", ">=", ">",
];

const MATH: &[&str] = &[
    "abs", "sign", "sqrt", "floor", "ceiling", "trunc", "round", "signif", "exp", "log", "expm1",
    "log1p", "cos", "sin", "tan", "cospi", "sinpi", "tanpi", "acos", "asin", "atan", "cosh",
    "sinh", "tanh", "acosh", "asinh", "atanh", "lgamma", "gamma", "digamma", "trigamma",
    "cumsum", "cumprod", "cummax", "cummin",
];

const SUMMARY: &[&str] = &["all", "any", "sum", "prod", "min", "max", "range"];

const COMPLEX: &[&str] = &["Arg", "Conj", "Im", "Mod", "Re"];

impl Group {
    /// All groups, in lookup-table order.
    pub const ALL: [Group; 4] = [Group::Ops, Group::Math, Group::Summary, Group::Complex];

    /// The group `generic` belongs to, if any.
    pub fn of_generic(generic: &str) -> Option<Group> {
        Self::ALL
            .into_iter()
            .find(|group| group.members().contains(&generic))
    }

    /// The name used to build `Group.class` method names.
    pub fn name(self) -> &'static str {
        match self {
            Group::Ops => "Ops",
            Group::Math => "Math",
            Group::Summary => "Summary",
            Group::Complex => "Complex",
        }
    }

    /// The generics that belong to this group.
    pub fn members(self) -> &'static [&'static str] {
        match self {
            Group::Ops => OPS,
            Group::Math => MATH,
            Group::Summary => SUMMARY,
            Group::Complex => COMPLEX,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown group name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownGroup(pub String);

impl fmt::Display for UnknownGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown group generic '{}'", self.0)
    }
}

impl std::error::Error for UnknownGroup {}

impl FromStr for Group {
    type Err = UnknownGroup;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|group| group.name() == s)
            .ok_or_else(|| UnknownGroup(s.to_string()))
    }
}
