//! Single-receiver dispatch resolution.
//!
//! This module implements the algorithm that selects which method
//! implements a generic for a given class vector. Methods are plain
//! functions found by name: `generic.class`, `Group.class` or
//! `generic.default`.
//!
//! # Algorithm Overview
//!
//! 1. **Walk the class vector**: at each index try `generic.class`, then
//!    `Group.class` when the generic belongs to a group
//! 2. **Registered methods**: repeat the walk in the registered-methods
//!    table of the generic's defining scope
//! 3. **Default**: try `generic.default`
//! 4. **Not found**: the caller falls back to the builtin
//!
//! Generic-named lookup always precedes group lookup at the same index;
//! the walk never tries all generic names before any group name.
//!
//! # Module Structure
//!
//! - [`result`] - Dispatch result types

mod result;

use std::cell::Cell;

use tracing::{debug, trace};

use crate::class::{ClassVector, DEFAULT_CLASS};
use crate::config::DispatchConfig;
use crate::error::{DispatchError, Result};
use crate::group::Group;
use crate::table::GenericTable;

pub use result::{DispatchResult, LookupSource, MethodMatch};

/// The scopes a generic call resolves methods in.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchScope<S> {
    /// The scope the generic was called from; the lexical search starts here.
    pub call_env: S,
    /// The scope the generic was defined in, whose registered-methods table
    /// is searched after the lexical chain.
    pub def_env: Option<S>,
}

impl<S> DispatchScope<S> {
    /// A scope with no generic-definition scope.
    pub fn new(call_env: S) -> Self {
        Self {
            call_env,
            def_env: None,
        }
    }

    pub fn with_def_env(mut self, def_env: S) -> Self {
        self.def_env = Some(def_env);
        self
    }
}

/// Build the method name `prefix.class`.
pub fn method_name(prefix: &str, class: &str) -> String {
    let mut name = String::with_capacity(prefix.len() + class.len() + 1);
    name.push_str(prefix);
    name.push('.');
    name.push_str(class);
    name
}

/// Dispatch resolution over a [`GenericTable`].
pub struct DispatchEngine<'a, T: GenericTable> {
    table: &'a T,
    config: DispatchConfig,
    resolve_count: Cell<u64>,
}

impl<'a, T: GenericTable> DispatchEngine<'a, T> {
    /// Create an engine with the default configuration.
    pub fn new(table: &'a T) -> Self {
        Self::with_config(table, DispatchConfig::default())
    }

    pub fn with_config(table: &'a T, config: DispatchConfig) -> Self {
        Self {
            table,
            config,
            resolve_count: Cell::new(0),
        }
    }

    pub fn table(&self) -> &'a T {
        self.table
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// How many times [`resolve`](Self::resolve) has run.
    pub fn resolve_count(&self) -> u64 {
        self.resolve_count.get()
    }

    /// Resolve `generic` for `class_vector`.
    ///
    /// The same inputs always produce an equal result.
    pub fn resolve(
        &self,
        generic: &str,
        class_vector: &ClassVector,
        group: Option<Group>,
        scope: &DispatchScope<T::Scope>,
    ) -> Result<DispatchResult<'a, T::Callable>> {
        self.resolve_count.set(self.resolve_count.get() + 1);

        // Step 1: lexical scope chain
        let table = self.table;
        let in_scope = |name: &str| table.lookup(name, &scope.call_env);
        if let Some(found) =
            self.walk(generic, class_vector, group, LookupSource::Scope, in_scope)?
        {
            return Ok(DispatchResult::Match(found));
        }

        // Step 2: registered methods of the defining scope
        let registered_env = scope
            .def_env
            .as_ref()
            .filter(|_| self.config.registered_methods);
        if let Some(def_env) = registered_env {
            let in_table = |name: &str| table.lookup_registered(name, def_env);
            if let Some(found) =
                self.walk(generic, class_vector, group, LookupSource::Registered, in_table)?
            {
                return Ok(DispatchResult::Match(found));
            }
        }

        // Step 3: generic.default
        self.check_name_length(generic, generic, DEFAULT_CLASS)?;
        let default_name = method_name(generic, DEFAULT_CLASS);
        let default = table
            .lookup(&default_name, &scope.call_env)
            .map(|f| (f, LookupSource::Scope))
            .or_else(|| {
                registered_env
                    .and_then(|def_env| table.lookup_registered(&default_name, def_env))
                    .map(|f| (f, LookupSource::Registered))
            });
        if let Some((target, source)) = default {
            debug!(generic, method = %default_name, "dispatched to default method");
            return Ok(DispatchResult::Match(MethodMatch {
                method_name: default_name,
                target,
                remaining: ClassVector::default_sentinel(),
                matched_group: None,
                matched_at_head: false,
                source,
            }));
        }

        // Step 4: nothing applies
        debug!(generic, class = %class_vector, "no method found");
        Ok(DispatchResult::NotFound)
    }

    /// Walk the class vector, trying the generic then the group name at
    /// each index.
    ///
    /// Name lengths are checked only for the names actually looked up, so a
    /// long class after the matching one never fails the walk.
    fn walk<'n>(
        &self,
        generic: &str,
        class_vector: &ClassVector,
        group: Option<Group>,
        source: LookupSource,
        lookup: impl Fn(&str) -> Option<&'n T::Callable>,
    ) -> Result<Option<MethodMatch<'n, T::Callable>>> {
        for (index, class) in class_vector.iter().enumerate() {
            self.check_name_length(generic, generic, class)?;
            let name = method_name(generic, class);
            let mut found = lookup(&name).map(|target| (name, target, None));

            if let Some(group) = group.filter(|_| found.is_none()) {
                self.check_name_length(generic, group.name(), class)?;
                let name = method_name(group.name(), class);
                found = lookup(&name).map(|target| (name, target, Some(group)));
            }

            if let Some((method_name, target, matched_group)) = found {
                trace!(generic, method = %method_name, index, ?source, "class method found");
                return Ok(Some(MethodMatch {
                    method_name,
                    target,
                    remaining: class_vector.remaining_after(index),
                    matched_group,
                    matched_at_head: index == 0,
                    source,
                }));
            }
        }
        Ok(None)
    }

    /// `prefix.class` must fit in `max_method_name_len`.
    fn check_name_length(&self, generic: &str, prefix: &str, class: &str) -> Result<()> {
        if prefix.len() + class.len() + 2 > self.config.max_method_name_len {
            return Err(DispatchError::ClassNameTooLong {
                generic: generic.to_string(),
            });
        }
        Ok(())
    }
}
