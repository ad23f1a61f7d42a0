//! Execution contexts for dispatched methods.
//!
//! A method reached through dispatch sees a handful of hidden bindings
//! describing how it was reached. They live in a context object created per
//! invocation and chained in front of the method's own defining scope, so
//! nothing leaks into the caller or into other activations of the same
//! method.

use indexmap::IndexMap;

use crate::args::CallArgs;
use crate::class::ClassVector;
use crate::dispatch::{DispatchScope, MethodMatch};
use crate::group::Group;
use crate::table::GenericTable;

pub const DOT_GENERIC: &str = ".Generic";
pub const DOT_METHOD: &str = ".Method";
pub const DOT_CLASS: &str = ".Class";
pub const DOT_GROUP: &str = ".Group";
pub const DOT_GENERIC_CALL_ENV: &str = ".GenericCallEnv";
pub const DOT_GENERIC_DEF_ENV: &str = ".GenericDefEnv";

/// Value of a hidden binding.
#[derive(Debug, Clone, PartialEq)]
pub enum HiddenValue<S> {
    Name(String),
    Class(ClassVector),
    Group(Group),
    Scope(S),
}

/// Hidden bindings and arguments of one method activation.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCallContext<S, V> {
    enclosing_scope: S,
    bindings: IndexMap<&'static str, HiddenValue<S>>,
    args: CallArgs<V>,
}

impl<S, V> MethodCallContext<S, V> {
    /// The method's own defining scope; the context sits in front of it.
    pub fn enclosing_scope(&self) -> &S {
        &self.enclosing_scope
    }

    /// Look up a hidden binding by name.
    pub fn get(&self, name: &str) -> Option<&HiddenValue<S>> {
        self.bindings.get(name)
    }

    /// Hidden binding names in installation order.
    pub fn binding_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.bindings.keys().copied()
    }

    pub fn generic(&self) -> Option<&str> {
        match self.bindings.get(DOT_GENERIC) {
            Some(HiddenValue::Name(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn method(&self) -> Option<&str> {
        match self.bindings.get(DOT_METHOD) {
            Some(HiddenValue::Name(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn class(&self) -> Option<&ClassVector> {
        match self.bindings.get(DOT_CLASS) {
            Some(HiddenValue::Class(class)) => Some(class),
            _ => None,
        }
    }

    pub fn group(&self) -> Option<Group> {
        match self.bindings.get(DOT_GROUP) {
            Some(HiddenValue::Group(group)) => Some(*group),
            _ => None,
        }
    }

    pub fn call_env(&self) -> Option<&S> {
        match self.bindings.get(DOT_GENERIC_CALL_ENV) {
            Some(HiddenValue::Scope(scope)) => Some(scope),
            _ => None,
        }
    }

    pub fn def_env(&self) -> Option<&S> {
        match self.bindings.get(DOT_GENERIC_DEF_ENV) {
            Some(HiddenValue::Scope(scope)) => Some(scope),
            _ => None,
        }
    }

    /// The arguments the method was dispatched with.
    pub fn args(&self) -> &CallArgs<V> {
        &self.args
    }

    pub fn into_args(self) -> CallArgs<V> {
        self.args
    }
}

/// Builds a [`MethodCallContext`] for a resolved method.
pub struct MethodEnvironmentBuilder<'a, T: GenericTable> {
    table: &'a T,
}

impl<'a, T: GenericTable> MethodEnvironmentBuilder<'a, T> {
    pub fn new(table: &'a T) -> Self {
        Self { table }
    }

    /// Create the context for invoking `found` as a method of `generic`.
    pub fn build<V>(
        &self,
        generic: &str,
        found: &MethodMatch<'_, T::Callable>,
        scope: &DispatchScope<T::Scope>,
        args: CallArgs<V>,
    ) -> MethodCallContext<T::Scope, V> {
        let mut bindings = IndexMap::with_capacity(6);
        bindings.insert(DOT_GENERIC, HiddenValue::Name(generic.to_string()));
        bindings.insert(DOT_METHOD, HiddenValue::Name(found.method_name.clone()));
        bindings.insert(DOT_CLASS, HiddenValue::Class(found.remaining.clone()));
        if let Some(group) = found.matched_group {
            bindings.insert(DOT_GROUP, HiddenValue::Group(group));
        }
        bindings.insert(DOT_GENERIC_CALL_ENV, HiddenValue::Scope(scope.call_env.clone()));
        if let Some(def_env) = &scope.def_env {
            bindings.insert(DOT_GENERIC_DEF_ENV, HiddenValue::Scope(def_env.clone()));
        }

        MethodCallContext {
            enclosing_scope: self.table.enclosing_scope(found.target),
            bindings,
            args,
        }
    }
}
