//! Delegation to the next method (`NextMethod`).
//!
//! A dispatched method may ask dispatch to continue with the classes after
//! the one it was selected for. The continuation runs in four stages:
//!
//! 1. **Init**: read `.Generic`, `.Group`, `.Class` and `.Method` from the
//!    calling method's context
//! 2. **Resolve**: resolve the generic against the remaining classes,
//!    reusing the site's last head match when nothing changed
//! 3. **MergeArgs**: the dispatched arguments, then the extra ones
//! 4. **Invoke**: build a fresh context for the next method
//!
//! Once the chain is exhausted the builtin of the same name is the terminal
//! default.

use tracing::{debug, trace};

use crate::args::CallArgs;
use crate::cache::{is_cacheable, replay_head_match};
use crate::class::{ClassVector, DEFAULT_CLASS};
use crate::dispatch::{method_name, DispatchEngine, DispatchResult, DispatchScope, MethodMatch};
use crate::dispatcher::Invocation;
use crate::error::{DispatchError, Result};
use crate::group::Group;
use crate::method_env::{MethodCallContext, MethodEnvironmentBuilder};
use crate::table::GenericTable;

/// Per-call-site memo for `NextMethod` calls.
#[derive(Debug, Clone, Default)]
pub struct NextMethodSite {
    last_generic: Option<String>,
    last_class_vector: Option<ClassVector>,
    has_group: bool,
    last_group: Option<Group>,
    last_calling_method: Option<String>,
    resolved_method: Option<String>,
    resolved_group: Option<Group>,
    last_matched_at_head: bool,
    hits: u64,
    misses: u64,
}

impl NextMethodSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// The method the last delegation resolved to.
    pub fn resolved_method(&self) -> Option<&str> {
        self.resolved_method.as_deref()
    }

    pub fn clear(&mut self) {
        *self = Self {
            hits: self.hits,
            misses: self.misses,
            ..Self::default()
        };
    }

    fn matches_key<S>(&self, delegation: &Delegation<'_, S>) -> bool {
        self.last_matched_at_head
            && self.has_group == delegation.group.is_some()
            && self.last_group == delegation.group
            && self.last_calling_method.as_deref() == Some(delegation.calling_method)
            && self.last_generic.as_deref() == Some(delegation.generic)
            && self
                .last_class_vector
                .as_ref()
                .is_some_and(|last| last.same_classes(delegation.class))
    }

    fn record<S, C>(&mut self, delegation: &Delegation<'_, S>, found: &MethodMatch<'_, C>) {
        self.last_generic = Some(delegation.generic.to_string());
        self.last_class_vector = Some(delegation.class.clone());
        self.has_group = delegation.group.is_some();
        self.last_group = delegation.group;
        self.last_calling_method = Some(delegation.calling_method.to_string());
        self.resolved_method = Some(found.method_name.clone());
        self.resolved_group = found.matched_group;
        self.last_matched_at_head = is_cacheable(found);
    }
}

/// What the calling method's context says about the delegation.
struct Delegation<'c, S> {
    generic: &'c str,
    group: Option<Group>,
    class: &'c ClassVector,
    calling_method: &'c str,
    scope: DispatchScope<S>,
}

impl<S> Delegation<'_, S> {
    /// A method selected for the `default` class, under the generic's name
    /// or its group's, is the last one; only the builtin follows it.
    fn is_exhausted(&self) -> bool {
        if !self.class.is_default_sentinel() {
            return false;
        }
        let by_generic = method_name(self.generic, DEFAULT_CLASS);
        let by_group = self.group.map(|group| method_name(group.name(), DEFAULT_CLASS));
        self.calling_method == by_generic || by_group.as_deref() == Some(self.calling_method)
    }
}

/// Resumes dispatch after the class the current method was selected for.
pub struct NextMethodContinuation<'e, 'a, T: GenericTable> {
    engine: &'e DispatchEngine<'a, T>,
}

impl<'e, 'a, T: GenericTable> NextMethodContinuation<'e, 'a, T> {
    pub fn new(engine: &'e DispatchEngine<'a, T>) -> Self {
        Self { engine }
    }

    /// Delegate from `current` to the next applicable method.
    ///
    /// `current` is the context of the executing method, or `None` when the
    /// request comes from outside any dispatched method.
    pub fn run<V: Clone>(
        &self,
        site: &mut NextMethodSite,
        current: Option<&MethodCallContext<T::Scope, V>>,
        extra: CallArgs<V>,
    ) -> Result<Invocation<'a, T::Callable, T::Scope, V>> {
        let current = current.ok_or(DispatchError::InvalidDelegationContext {
            reason: "NextMethod called from outside a method dispatch",
        })?;
        let delegation = Self::init(current)?;
        let next = self.resolve(site, &delegation)?;
        let args = current.args().merged(extra);
        Ok(self.invoke(&delegation, next, args))
    }

    fn init<V>(current: &MethodCallContext<T::Scope, V>) -> Result<Delegation<'_, T::Scope>> {
        let generic = current.generic().filter(|g| !g.is_empty()).ok_or(
            DispatchError::InvalidDelegationContext {
                reason: "generic function not specified",
            },
        )?;
        let class = current
            .class()
            .ok_or(DispatchError::InvalidDelegationContext {
                reason: "object not specified",
            })?;
        let calling_method = current.method().unwrap_or_default();
        let call_env = current
            .call_env()
            .unwrap_or_else(|| current.enclosing_scope())
            .clone();
        let scope = DispatchScope {
            call_env,
            def_env: current.def_env().cloned(),
        };
        Ok(Delegation {
            generic,
            group: current.group(),
            class,
            calling_method,
            scope,
        })
    }

    fn resolve(
        &self,
        site: &mut NextMethodSite,
        delegation: &Delegation<'_, T::Scope>,
    ) -> Result<NextTarget<'a, T::Callable>> {
        let generic = delegation.generic;

        let result = if delegation.is_exhausted() {
            DispatchResult::NotFound
        } else if let Some(found) = self.replay(site, delegation) {
            site.hits += 1;
            trace!(generic, method = %found.method_name, "next method cache hit");
            DispatchResult::Match(found)
        } else {
            site.misses += 1;
            self.engine
                .resolve(generic, delegation.class, delegation.group, &delegation.scope)?
        };

        match result {
            DispatchResult::Match(found) => {
                site.record(delegation, &found);
                debug!(
                    generic,
                    from = delegation.calling_method,
                    to = %found.method_name,
                    "next method"
                );
                Ok(NextTarget::Method(found))
            }
            DispatchResult::NotFound => {
                site.clear();
                match self.engine.table().builtin(generic) {
                    Some(builtin) => {
                        debug!(generic, from = delegation.calling_method, "next method is builtin");
                        Ok(NextTarget::Builtin(builtin))
                    }
                    None => Err(DispatchError::method_not_found(
                        generic,
                        delegation.class.as_slice(),
                    )),
                }
            }
        }
    }

    fn replay(
        &self,
        site: &NextMethodSite,
        delegation: &Delegation<'_, T::Scope>,
    ) -> Option<MethodMatch<'a, T::Callable>> {
        if !self.engine.config().next_method_cache || !site.matches_key(delegation) {
            return None;
        }
        let cached = site.resolved_method.as_deref()?;
        replay_head_match(
            self.engine.table(),
            delegation.generic,
            delegation.class,
            cached,
            site.resolved_group,
            &delegation.scope,
        )
    }

    fn invoke<V>(
        &self,
        delegation: &Delegation<'_, T::Scope>,
        next: NextTarget<'a, T::Callable>,
        args: CallArgs<V>,
    ) -> Invocation<'a, T::Callable, T::Scope, V> {
        match next {
            NextTarget::Method(found) => {
                let context = MethodEnvironmentBuilder::new(self.engine.table()).build(
                    delegation.generic,
                    &found,
                    &delegation.scope,
                    args,
                );
                Invocation::Method {
                    target: found.target,
                    context,
                }
            }
            NextTarget::Builtin(target) => Invocation::Builtin { target, args },
        }
    }
}

enum NextTarget<'a, C> {
    Method(MethodMatch<'a, C>),
    Builtin(&'a C),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Function, ScopeId, ScopeRegistry};
    use pretty_assertions::assert_eq;

    type Ctx = MethodCallContext<ScopeId, &'static str>;

    fn enter(
        engine: &DispatchEngine<'_, ScopeRegistry<&'static str>>,
        generic: &str,
        classes: &[&str],
        args: &[&'static str],
    ) -> Ctx {
        let cv = ClassVector::new(classes.iter().copied()).unwrap();
        let scope = DispatchScope::new(ScopeId::GLOBAL);
        let found = engine
            .resolve(generic, &cv, Group::of_generic(generic), &scope)
            .unwrap()
            .into_match()
            .unwrap();
        MethodEnvironmentBuilder::new(engine.table()).build(
            generic,
            &found,
            &scope,
            CallArgs::positional(args.iter().copied()),
        )
    }

    fn method_of<'a>(
        invocation: &'a Invocation<'_, Function<&'static str>, ScopeId, &'static str>,
    ) -> &'a Ctx {
        match invocation {
            Invocation::Method { context, .. } => context,
            Invocation::Builtin { .. } => panic!("expected a method invocation"),
        }
    }

    #[test]
    fn test_delegates_down_the_chain() {
        let mut registry = ScopeRegistry::new();
        registry.define(ScopeId::GLOBAL, "g.B", "B");
        registry.define(ScopeId::GLOBAL, "g.A", "A");
        let engine = DispatchEngine::new(&registry);
        let continuation = NextMethodContinuation::new(&engine);
        let mut site = NextMethodSite::new();

        let ctx = enter(&engine, "g", &["C", "B", "A"], &["x"]);
        assert_eq!(ctx.method(), Some("g.B"));

        let next = continuation.run(&mut site, Some(&ctx), CallArgs::new()).unwrap();
        assert_eq!(next.target().body, "A");
        let next_ctx = method_of(&next);
        assert_eq!(next_ctx.method(), Some("g.A"));
        assert!(next_ctx.class().unwrap().is_default_sentinel());
    }

    #[test]
    fn test_merges_extra_args_after_original() {
        let mut registry = ScopeRegistry::new();
        registry.define(ScopeId::GLOBAL, "g.B", "B");
        registry.define(ScopeId::GLOBAL, "g.A", "A");
        let engine = DispatchEngine::new(&registry);
        let continuation = NextMethodContinuation::new(&engine);

        let ctx = enter(&engine, "g", &["B", "A"], &["x", "y"]);
        let next = continuation
            .run(&mut NextMethodSite::new(), Some(&ctx), CallArgs::positional(["z"]))
            .unwrap();
        assert_eq!(next.args().values().copied().collect::<Vec<_>>(), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_outside_method_is_invalid() {
        let registry: ScopeRegistry<&'static str> = ScopeRegistry::new();
        let engine = DispatchEngine::new(&registry);
        let continuation = NextMethodContinuation::new(&engine);

        let err = continuation
            .run::<&'static str>(&mut NextMethodSite::new(), None, CallArgs::new())
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidDelegationContext { .. }));
    }

    #[test]
    fn test_default_then_builtin() {
        let mut registry = ScopeRegistry::new();
        registry.define(ScopeId::GLOBAL, "print.A", "A");
        registry.define(ScopeId::GLOBAL, "print.default", "default");
        registry.define_builtin("print", "builtin");
        let engine = DispatchEngine::new(&registry);
        let continuation = NextMethodContinuation::new(&engine);
        let mut site = NextMethodSite::new();

        let ctx = enter(&engine, "print", &["A"], &["x"]);
        let to_default = continuation.run(&mut site, Some(&ctx), CallArgs::new()).unwrap();
        assert_eq!(to_default.target().body, "default");

        let default_ctx = method_of(&to_default);
        let to_builtin = continuation
            .run(&mut site, Some(default_ctx), CallArgs::new())
            .unwrap();
        assert!(matches!(
            to_builtin,
            Invocation::Builtin { target, .. } if target.body == "builtin"
        ));
    }

    #[test]
    fn test_exhausted_without_builtin() {
        let mut registry = ScopeRegistry::new();
        registry.define(ScopeId::GLOBAL, "g.A", "A");
        let engine = DispatchEngine::new(&registry);
        let continuation = NextMethodContinuation::new(&engine);

        let ctx = enter(&engine, "g", &["A"], &[]);
        let err = continuation
            .run(&mut NextMethodSite::new(), Some(&ctx), CallArgs::new())
            .unwrap_err();
        assert!(matches!(err, DispatchError::MethodNotFound { ref generic, .. } if generic == "g"));
    }

    #[test]
    fn test_group_carries_through() {
        let mut registry = ScopeRegistry::new();
        registry.define(ScopeId::GLOBAL, "Ops.money", "money");
        registry.define(ScopeId::GLOBAL, "Ops.numeric_like", "numeric_like");
        let engine = DispatchEngine::new(&registry);
        let continuation = NextMethodContinuation::new(&engine);

        let ctx = enter(&engine, "+", &["money", "numeric_like"], &["a", "b"]);
        assert_eq!(ctx.group(), Some(Group::Ops));

        let next = continuation
            .run(&mut NextMethodSite::new(), Some(&ctx), CallArgs::new())
            .unwrap();
        assert_eq!(next.target().body, "numeric_like");
        assert_eq!(method_of(&next).group(), Some(Group::Ops));
    }

    #[test]
    fn test_group_default_then_builtin() {
        let mut registry = ScopeRegistry::new();
        registry.define(ScopeId::GLOBAL, "Ops.money", "money");
        registry.define(ScopeId::GLOBAL, "Ops.default", "ops_default");
        registry.define_builtin("+", "builtin");
        let engine = DispatchEngine::new(&registry);
        let continuation = NextMethodContinuation::new(&engine);
        let mut site = NextMethodSite::new();

        let ctx = enter(&engine, "+", &["money"], &["a", "b"]);
        let to_default = continuation.run(&mut site, Some(&ctx), CallArgs::new()).unwrap();
        assert_eq!(to_default.target().body, "ops_default");

        let default_ctx = method_of(&to_default);
        assert_eq!(default_ctx.method(), Some("Ops.default"));
        assert!(default_ctx.class().unwrap().is_default_sentinel());

        let to_builtin = continuation
            .run(&mut site, Some(default_ctx), CallArgs::new())
            .unwrap();
        assert!(to_builtin.is_builtin());
        assert_eq!(to_builtin.target().body, "builtin");
    }

    #[test]
    fn test_group_default_exhausted_without_builtin() {
        let mut registry = ScopeRegistry::new();
        registry.define(ScopeId::GLOBAL, "Ops.default", "ops_default");
        let engine = DispatchEngine::new(&registry);
        let continuation = NextMethodContinuation::new(&engine);

        let ctx = enter(&engine, "+", &["default"], &[]);
        assert_eq!(ctx.method(), Some("Ops.default"));

        let err = continuation
            .run(&mut NextMethodSite::new(), Some(&ctx), CallArgs::new())
            .unwrap_err();
        assert!(matches!(err, DispatchError::MethodNotFound { ref generic, .. } if generic == "+"));
    }

    #[test]
    fn test_site_reuses_group_head_match() {
        let mut registry = ScopeRegistry::new();
        registry.define(ScopeId::GLOBAL, "Ops.money", "money");
        registry.define(ScopeId::GLOBAL, "Ops.numeric_like", "numeric_like");
        let engine = DispatchEngine::new(&registry);
        let continuation = NextMethodContinuation::new(&engine);
        let mut site = NextMethodSite::new();

        let ctx = enter(&engine, "+", &["money", "numeric_like"], &[]);
        let before = engine.resolve_count();

        let first = continuation.run(&mut site, Some(&ctx), CallArgs::new()).unwrap();
        let second = continuation.run(&mut site, Some(&ctx), CallArgs::new()).unwrap();
        assert_eq!(engine.resolve_count(), before + 1);
        assert_eq!((site.hits(), site.misses()), (1, 1));
        assert_eq!(site.resolved_method(), Some("Ops.numeric_like"));

        assert_eq!(second.target().body, "numeric_like");
        assert_eq!(method_of(&second).group(), Some(Group::Ops));
        assert_eq!(method_of(&first), method_of(&second));
    }

    #[test]
    fn test_site_reuses_head_match() {
        let mut registry = ScopeRegistry::new();
        registry.define(ScopeId::GLOBAL, "g.B", "B");
        registry.define(ScopeId::GLOBAL, "g.A", "A");
        let engine = DispatchEngine::new(&registry);
        let continuation = NextMethodContinuation::new(&engine);
        let mut site = NextMethodSite::new();

        let ctx = enter(&engine, "g", &["B", "A"], &[]);
        let before = engine.resolve_count();

        continuation.run(&mut site, Some(&ctx), CallArgs::new()).unwrap();
        continuation.run(&mut site, Some(&ctx), CallArgs::new()).unwrap();
        assert_eq!(engine.resolve_count(), before + 1);
        assert_eq!((site.hits(), site.misses()), (1, 1));
        assert_eq!(site.resolved_method(), Some("g.A"));
    }

    #[test]
    fn test_site_misses_for_other_calling_method() {
        let mut registry = ScopeRegistry::new();
        registry.define(ScopeId::GLOBAL, "g.B", "B");
        registry.define(ScopeId::GLOBAL, "g.C", "C");
        registry.define(ScopeId::GLOBAL, "g.A", "A");
        let engine = DispatchEngine::new(&registry);
        let continuation = NextMethodContinuation::new(&engine);
        let mut site = NextMethodSite::new();

        // Both contexts have .Class == ["A"] but were entered via different methods.
        let from_b = enter(&engine, "g", &["B", "A"], &[]);
        let from_c = enter(&engine, "g", &["C", "A"], &[]);
        let before = engine.resolve_count();

        continuation.run(&mut site, Some(&from_b), CallArgs::new()).unwrap();
        continuation.run(&mut site, Some(&from_c), CallArgs::new()).unwrap();
        assert_eq!(engine.resolve_count(), before + 2);
    }
}
