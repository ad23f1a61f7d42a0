//! Dispatch result types.

use std::fmt;
use std::ptr;

use crate::class::ClassVector;
use crate::group::Group;

/// Where a method was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSource {
    /// The lexical scope chain of the call.
    Scope,
    /// The registered-methods table of the generic's defining scope.
    Registered,
}

/// A resolved method.
pub struct MethodMatch<'t, C> {
    /// The name the method was found under (`generic.class`,
    /// `Group.class` or `generic.default`).
    pub method_name: String,
    /// The method itself, borrowed from the table.
    pub target: &'t C,
    /// The classes after the matched one; `["default"]` once exhausted.
    pub remaining: ClassVector,
    /// The group whose method matched, `None` for a generic-named method.
    pub matched_group: Option<Group>,
    /// The match was at index 0 of the class vector.
    pub matched_at_head: bool,
    pub source: LookupSource,
}

impl<C> Clone for MethodMatch<'_, C> {
    fn clone(&self) -> Self {
        Self {
            method_name: self.method_name.clone(),
            target: self.target,
            remaining: self.remaining.clone(),
            matched_group: self.matched_group,
            matched_at_head: self.matched_at_head,
            source: self.source,
        }
    }
}

/// Two matches are equal when they name the same method, point at the same
/// callable and carry the same remaining chain.
impl<C> PartialEq for MethodMatch<'_, C> {
    fn eq(&self, other: &Self) -> bool {
        self.method_name == other.method_name
            && ptr::eq(self.target, other.target)
            && self.remaining == other.remaining
            && self.matched_group == other.matched_group
            && self.matched_at_head == other.matched_at_head
            && self.source == other.source
    }
}

impl<C: fmt::Debug> fmt::Debug for MethodMatch<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodMatch")
            .field("method_name", &self.method_name)
            .field("target", self.target)
            .field("remaining", &self.remaining)
            .field("matched_group", &self.matched_group)
            .field("matched_at_head", &self.matched_at_head)
            .field("source", &self.source)
            .finish()
    }
}

/// Result of dispatch resolution.
#[derive(Debug)]
pub enum DispatchResult<'t, C> {
    /// A method was found.
    Match(MethodMatch<'t, C>),
    /// No class method, group method or default exists; the caller falls
    /// back to the builtin.
    NotFound,
}

impl<'t, C> DispatchResult<'t, C> {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match(_))
    }

    /// The match, if any.
    pub fn into_match(self) -> Option<MethodMatch<'t, C>> {
        match self {
            Self::Match(m) => Some(m),
            Self::NotFound => None,
        }
    }

    pub fn as_match(&self) -> Option<&MethodMatch<'t, C>> {
        match self {
            Self::Match(m) => Some(m),
            Self::NotFound => None,
        }
    }
}

impl<C> Clone for DispatchResult<'_, C> {
    fn clone(&self) -> Self {
        match self {
            Self::Match(m) => Self::Match(m.clone()),
            Self::NotFound => Self::NotFound,
        }
    }
}

impl<C> PartialEq for DispatchResult<'_, C> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Match(a), Self::Match(b)) => a == b,
            (Self::NotFound, Self::NotFound) => true,
            _ => false,
        }
    }
}
