//! Call-site caching of dispatch results.
//!
//! Each generic call expression owns a [`DispatchSite`] remembering its
//! last resolution. When the next call presents the same class vector and
//! group, and the last method matched at the head of the vector, the walk
//! is skipped and the method is re-read by name.
//!
//! Only head matches are reused. A match at index `i > 0` depends on the
//! absence of methods for every earlier class, so a vector that merely
//! shares the matched position would be resolved wrongly. A head match
//! depends on at most one absent name (`generic.head` for a group match),
//! which is re-checked on every reuse.

use tracing::trace;

use crate::class::{ClassResolver, ClassSource, ClassVector};
use crate::dispatch::{
    method_name, DispatchEngine, DispatchResult, DispatchScope, LookupSource, MethodMatch,
};
use crate::error::Result;
use crate::group::Group;
use crate::table::GenericTable;

/// Per-call-site dispatch memo.
///
/// Owned by exactly one call expression. Never share a site between call
/// sites or interpreter instances.
#[derive(Debug, Clone, Default)]
pub struct DispatchSite {
    last_generic: Option<String>,
    last_class_vector: Option<ClassVector>,
    last_group: Option<Group>,
    last_method_name: Option<String>,
    last_matched_at_head: bool,
    last_group_match: bool,
    hits: u64,
    misses: u64,
}

impl DispatchSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls answered without walking the class vector.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Number of calls that ran full resolution.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn last_method_name(&self) -> Option<&str> {
        self.last_method_name.as_deref()
    }

    pub fn last_class_vector(&self) -> Option<&ClassVector> {
        self.last_class_vector.as_ref()
    }

    /// True if the next call with the same key may skip resolution.
    pub fn is_reusable(&self) -> bool {
        self.last_matched_at_head
    }

    /// Forget the last resolution. Counters are kept.
    pub fn clear(&mut self) {
        self.last_generic = None;
        self.last_class_vector = None;
        self.last_group = None;
        self.last_method_name = None;
        self.last_matched_at_head = false;
        self.last_group_match = false;
    }

    fn matches_key(&self, generic: &str, class_vector: &ClassVector, group: Option<Group>) -> bool {
        self.last_matched_at_head
            && self.last_group == group
            && self.last_generic.as_deref() == Some(generic)
            && self
                .last_class_vector
                .as_ref()
                .is_some_and(|last| last.same_classes(class_vector))
    }

    fn record<C>(
        &mut self,
        generic: &str,
        class_vector: ClassVector,
        group: Option<Group>,
        found: &MethodMatch<'_, C>,
    ) {
        self.last_generic = Some(generic.to_string());
        self.last_class_vector = Some(class_vector);
        self.last_group = group;
        self.last_method_name = Some(found.method_name.clone());
        self.last_matched_at_head = is_cacheable(found);
        self.last_group_match = found.matched_group.is_some();
    }
}

/// A match can be replayed by name only if it was found at the head of the
/// lexical scope walk.
pub(crate) fn is_cacheable<C>(found: &MethodMatch<'_, C>) -> bool {
    found.matched_at_head && found.source == LookupSource::Scope
}

/// Rebuild a head match for `class_vector` from the cached method name.
///
/// Returns `None` when the binding disappeared or, for a group match, when
/// a `generic.head` method now shadows it.
pub(crate) fn replay_head_match<'a, T: GenericTable>(
    table: &'a T,
    generic: &str,
    class_vector: &ClassVector,
    cached_method: &str,
    matched_group: Option<Group>,
    scope: &DispatchScope<T::Scope>,
) -> Option<MethodMatch<'a, T::Callable>> {
    if matched_group.is_some() {
        let shadow = method_name(generic, class_vector.head());
        if table.lookup(&shadow, &scope.call_env).is_some() {
            return None;
        }
    }
    let target = table.lookup(cached_method, &scope.call_env)?;
    Some(MethodMatch {
        method_name: cached_method.to_string(),
        target,
        remaining: class_vector.remaining_after(0),
        matched_group,
        matched_at_head: true,
        source: LookupSource::Scope,
    })
}

/// [`DispatchEngine`] behind a per-site memo.
pub struct CallSiteCache<'e, 'a, T: GenericTable> {
    engine: &'e DispatchEngine<'a, T>,
}

impl<'e, 'a, T: GenericTable> CallSiteCache<'e, 'a, T> {
    pub fn new(engine: &'e DispatchEngine<'a, T>) -> Self {
        Self { engine }
    }

    /// Resolve `generic` for `value` at `site`.
    pub fn execute<V: ClassSource + ?Sized>(
        &self,
        site: &mut DispatchSite,
        generic: &str,
        value: &V,
        group: Option<Group>,
        scope: &DispatchScope<T::Scope>,
    ) -> Result<DispatchResult<'a, T::Callable>> {
        let class_vector = ClassResolver::resolve(value);
        self.execute_for(site, generic, class_vector, group, scope)
    }

    /// Like [`execute`](Self::execute) with an already computed class vector.
    pub fn execute_for(
        &self,
        site: &mut DispatchSite,
        generic: &str,
        class_vector: ClassVector,
        group: Option<Group>,
        scope: &DispatchScope<T::Scope>,
    ) -> Result<DispatchResult<'a, T::Callable>> {
        if self.engine.config().call_site_cache && site.matches_key(generic, &class_vector, group) {
            let cached_group = site.last_group_match.then_some(group).flatten();
            let replayed = site.last_method_name.as_deref().and_then(|cached| {
                replay_head_match(
                    self.engine.table(),
                    generic,
                    &class_vector,
                    cached,
                    cached_group,
                    scope,
                )
            });
            if let Some(found) = replayed {
                site.hits += 1;
                trace!(generic, method = %found.method_name, "call site cache hit");
                return Ok(DispatchResult::Match(found));
            }
            trace!(generic, "cached method binding changed, re-resolving");
        }

        site.misses += 1;
        let result = self.engine.resolve(generic, &class_vector, group, scope)?;
        match &result {
            DispatchResult::Match(found) => site.record(generic, class_vector, group, found),
            DispatchResult::NotFound => site.clear(),
        }
        Ok(result)
    }
}
