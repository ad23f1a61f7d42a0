//! The `UseMethod` entry point.
//!
//! [`GenericDispatcher`] ties the pieces together: class resolution of the
//! receiver, the call-site memo, method context construction and the builtin
//! fallback. It returns what the evaluator should call next; it never calls
//! anything itself.

use tracing::debug;

use crate::args::CallArgs;
use crate::cache::{CallSiteCache, DispatchSite};
use crate::class::{ClassResolver, ClassSource};
use crate::config::DispatchConfig;
use crate::dispatch::{DispatchEngine, DispatchResult, DispatchScope};
use crate::error::{DispatchError, Result};
use crate::group::Group;
use crate::method_env::{MethodCallContext, MethodEnvironmentBuilder};
use crate::next_method::{NextMethodContinuation, NextMethodSite};
use crate::table::GenericTable;

/// Class reported when there is no receiver to dispatch on.
const NULL_CLASS: &str = "NULL";

/// The callable chosen by dispatch and what to call it with.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation<'t, C, S, V> {
    /// A user-defined method, run in its own context.
    Method {
        target: &'t C,
        context: MethodCallContext<S, V>,
    },
    /// The builtin of the generic's name.
    Builtin { target: &'t C, args: CallArgs<V> },
}

impl<'t, C, S, V> Invocation<'t, C, S, V> {
    pub fn target(&self) -> &'t C {
        match self {
            Invocation::Method { target, .. } | Invocation::Builtin { target, .. } => target,
        }
    }

    pub fn args(&self) -> &CallArgs<V> {
        match self {
            Invocation::Method { context, .. } => context.args(),
            Invocation::Builtin { args, .. } => args,
        }
    }

    /// The method context; `None` for a builtin.
    pub fn context(&self) -> Option<&MethodCallContext<S, V>> {
        match self {
            Invocation::Method { context, .. } => Some(context),
            Invocation::Builtin { .. } => None,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Invocation::Builtin { .. })
    }
}

/// Dispatches generic calls against a [`GenericTable`].
pub struct GenericDispatcher<'a, T: GenericTable> {
    engine: DispatchEngine<'a, T>,
}

impl<'a, T: GenericTable> GenericDispatcher<'a, T> {
    pub fn new(table: &'a T) -> Self {
        Self {
            engine: DispatchEngine::new(table),
        }
    }

    pub fn with_config(table: &'a T, config: DispatchConfig) -> Self {
        Self {
            engine: DispatchEngine::with_config(table, config),
        }
    }

    pub fn engine(&self) -> &DispatchEngine<'a, T> {
        &self.engine
    }

    /// Dispatch `generic` on the class of its first argument.
    ///
    /// Operators and the other group members also try their group's method
    /// at each class.
    pub fn dispatch<V: ClassSource>(
        &self,
        site: &mut DispatchSite,
        generic: &str,
        args: CallArgs<V>,
        scope: &DispatchScope<T::Scope>,
    ) -> Result<Invocation<'a, T::Callable, T::Scope, V>> {
        self.dispatch_in(site, generic, Group::of_generic(generic), args, scope)
    }

    /// Dispatch with an explicit group, whatever the generic's name.
    pub fn dispatch_group<V: ClassSource>(
        &self,
        site: &mut DispatchSite,
        generic: &str,
        group: Group,
        args: CallArgs<V>,
        scope: &DispatchScope<T::Scope>,
    ) -> Result<Invocation<'a, T::Callable, T::Scope, V>> {
        self.dispatch_in(site, generic, Some(group), args, scope)
    }

    /// Continue from the executing method to the next one.
    pub fn next_method<V: Clone>(
        &self,
        site: &mut NextMethodSite,
        current: Option<&MethodCallContext<T::Scope, V>>,
        extra: CallArgs<V>,
    ) -> Result<Invocation<'a, T::Callable, T::Scope, V>> {
        NextMethodContinuation::new(&self.engine).run(site, current, extra)
    }

    fn dispatch_in<V: ClassSource>(
        &self,
        site: &mut DispatchSite,
        generic: &str,
        group: Option<Group>,
        args: CallArgs<V>,
        scope: &DispatchScope<T::Scope>,
    ) -> Result<Invocation<'a, T::Callable, T::Scope, V>> {
        let receiver = args
            .receiver()
            .ok_or_else(|| DispatchError::method_not_found(generic, &[NULL_CLASS.to_string()]))?;
        let class_vector = ClassResolver::resolve(receiver);

        let result = CallSiteCache::new(&self.engine).execute_for(
            site,
            generic,
            class_vector.clone(),
            group,
            scope,
        )?;
        match result {
            DispatchResult::Match(found) => {
                debug!(generic, method = %found.method_name, class = %class_vector, "dispatched");
                let context = MethodEnvironmentBuilder::new(self.engine.table())
                    .build(generic, &found, scope, args);
                Ok(Invocation::Method {
                    target: found.target,
                    context,
                })
            }
            DispatchResult::NotFound => match self.engine.table().builtin(generic) {
                Some(target) => {
                    debug!(generic, class = %class_vector, "no method, using builtin");
                    Ok(Invocation::Builtin { target, args })
                }
                None => Err(DispatchError::method_not_found(generic, class_vector.as_slice())),
            },
        }
    }
}
