//! Class vectors and their resolution from runtime values.
//!
//! Every value has a class vector: either the explicit, user-assigned class
//! attribute, or an implicit chain derived from the value's shape and base
//! type. Dispatch walks this vector from the most specific entry to the
//! least specific one.

use std::fmt;
use std::rc::Rc;

use tracing::warn;

use crate::error::{DispatchError, Result};

/// Class name appended to every exhausted chain so that a further
/// `NextMethod` still reaches `generic.default`.
pub const DEFAULT_CLASS: &str = "default";

/// An ordered, non-empty sequence of class names.
///
/// Cloning is cheap: entries are shared. A vector cut from a longer one by
/// a non-head match keeps a reference to that longer vector in
/// [`previous`](ClassVector::previous).
#[derive(Clone, PartialEq, Eq)]
pub struct ClassVector {
    classes: Rc<[String]>,
    previous: Option<Rc<ClassVector>>,
}

impl ClassVector {
    /// Create a class vector. Fails with `MalformedClassVector` when
    /// `classes` is empty.
    pub fn new<I, S>(classes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let classes: Vec<String> = classes.into_iter().map(Into::into).collect();
        if classes.is_empty() {
            return Err(DispatchError::MalformedClassVector);
        }
        Ok(Self {
            classes: classes.into(),
            previous: None,
        })
    }

    /// A class vector with one entry.
    pub fn single(class: impl Into<String>) -> Self {
        Self {
            classes: Rc::from(vec![class.into()]),
            previous: None,
        }
    }

    /// The `["default"]` vector used once a chain is exhausted.
    pub fn default_sentinel() -> Self {
        Self::single(DEFAULT_CLASS)
    }

    /// The first (most specific) class.
    pub fn head(&self) -> &str {
        &self.classes[0]
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Always false; kept for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.classes
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }

    /// The vector this one was cut from, if any.
    pub fn previous(&self) -> Option<&ClassVector> {
        self.previous.as_deref()
    }

    /// True if this is exactly the `["default"]` sentinel.
    pub fn is_default_sentinel(&self) -> bool {
        self.classes.len() == 1 && self.classes[0] == DEFAULT_CLASS
    }

    /// Element-wise comparison of the entries, ignoring `previous`.
    pub fn same_classes(&self, other: &ClassVector) -> bool {
        Rc::ptr_eq(&self.classes, &other.classes) || self.classes == other.classes
    }

    /// The entries after `index`, remembering `self` as the previous step.
    ///
    /// An empty suffix becomes the `["default"]` sentinel.
    pub fn remaining_after(&self, index: usize) -> ClassVector {
        let rest = self.classes.get(index + 1..).unwrap_or_default();
        if rest.is_empty() {
            return Self {
                previous: Some(Rc::new(self.clone())),
                ..Self::default_sentinel()
            };
        }
        Self {
            classes: Rc::from(rest.to_vec()),
            previous: Some(Rc::new(self.clone())),
        }
    }
}

impl fmt::Debug for ClassVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.classes.iter()).finish()
    }
}

impl fmt::Display for ClassVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.classes.join(", "))
    }
}

/// The storage type of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Null,
    Logical,
    Integer,
    Double,
    Complex,
    Character,
    Raw,
    List,
    Closure,
    Builtin,
    Environment,
}

impl BaseType {
    /// The implicit class entries contributed by the base type.
    fn implicit_classes(self) -> &'static [&'static str] {
        match self {
            BaseType::Null => &["NULL"],
            BaseType::Logical => &["logical"],
            BaseType::Integer => &["integer", "numeric"],
            BaseType::Double => &["double", "numeric"],
            BaseType::Complex => &["complex"],
            BaseType::Character => &["character"],
            BaseType::Raw => &["raw"],
            BaseType::List => &["list"],
            BaseType::Closure | BaseType::Builtin => &["function"],
            BaseType::Environment => &["environment"],
        }
    }
}

/// Read-only view of the value attributes dispatch depends on.
pub trait ClassSource {
    /// The explicit class attribute, if one was assigned.
    fn class_attribute(&self) -> Option<&[String]>;

    /// The `dim` attribute, if any.
    fn dims(&self) -> Option<&[usize]>;

    fn base_type(&self) -> BaseType;
}

/// A minimal runtime value carrying only what dispatch inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    base_type: BaseType,
    class: Option<Vec<String>>,
    dims: Option<Vec<usize>>,
}

impl Value {
    pub fn new(base_type: BaseType) -> Self {
        Self {
            base_type,
            class: None,
            dims: None,
        }
    }

    /// Set the explicit class attribute.
    pub fn with_class<I, S>(mut self, class: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.class = Some(class.into_iter().map(Into::into).collect());
        self
    }

    /// Set the `dim` attribute.
    pub fn with_dims(mut self, dims: impl Into<Vec<usize>>) -> Self {
        self.dims = Some(dims.into());
        self
    }
}

impl ClassSource for Value {
    fn class_attribute(&self) -> Option<&[String]> {
        self.class.as_deref()
    }

    fn dims(&self) -> Option<&[usize]> {
        self.dims.as_deref()
    }

    fn base_type(&self) -> BaseType {
        self.base_type
    }
}

/// Computes class vectors for values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassResolver;

impl ClassResolver {
    /// The class vector of `value`.
    ///
    /// An explicit class attribute is returned verbatim. An empty one is an
    /// invariant violation and falls back to the implicit chain.
    pub fn resolve<V: ClassSource + ?Sized>(value: &V) -> ClassVector {
        match Self::explicit(value) {
            Some(Ok(classes)) => classes,
            Some(Err(err)) => {
                warn!(%err, "falling back to implicit class vector");
                Self::implicit(value)
            }
            None => Self::implicit(value),
        }
    }

    /// The explicit class vector, if the value carries a class attribute.
    pub fn explicit<V: ClassSource + ?Sized>(value: &V) -> Option<Result<ClassVector>> {
        value
            .class_attribute()
            .map(|class| ClassVector::new(class.iter().cloned()))
    }

    /// The class vector derived from the value's shape and base type.
    pub fn implicit<V: ClassSource + ?Sized>(value: &V) -> ClassVector {
        let mut classes: Vec<&str> = Vec::with_capacity(4);
        match value.dims().map(<[usize]>::len) {
            Some(2) => classes.extend(["matrix", "array"]),
            Some(_) => classes.push("array"),
            None => {}
        }
        classes.extend_from_slice(value.base_type().implicit_classes());
        ClassVector {
            classes: classes.into_iter().map(String::from).collect(),
            previous: None,
        }
    }
}
