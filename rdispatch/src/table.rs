//! Callable lookup.
//!
//! Dispatch never owns methods: it asks a [`GenericTable`] for the callable
//! bound to a name, searching outward from a scope. [`ScopeRegistry`] is an
//! in-memory implementation with lexical parent chains, per-scope
//! registered-method tables and a builtin namespace.

use std::fmt;

use rustc_hash::FxHashMap;

/// Name-based lookup of callables, injected into the dispatch engine.
pub trait GenericTable {
    /// Handle for a lexical scope.
    type Scope: Clone + PartialEq + fmt::Debug;

    /// A function value. Owned by the table; dispatch only borrows it.
    type Callable: fmt::Debug;

    /// Find `name` in `scope`, searching outward to the global scope.
    fn lookup(&self, name: &str, scope: &Self::Scope) -> Option<&Self::Callable>;

    /// Find `name` among the methods registered explicitly in `def_scope`.
    fn lookup_registered(&self, _name: &str, _def_scope: &Self::Scope) -> Option<&Self::Callable> {
        None
    }

    /// The builtin implementation of `name`, if any.
    fn builtin(&self, name: &str) -> Option<&Self::Callable>;

    /// The scope `callable` was defined in.
    fn enclosing_scope(&self, callable: &Self::Callable) -> Self::Scope;
}

/// Handle for a scope in a [`ScopeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    /// The root scope every registry starts with.
    pub const GLOBAL: ScopeId = ScopeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A function bound in a [`ScopeRegistry`].
#[derive(Debug, Clone, PartialEq)]
pub struct Function<B> {
    /// The name the function was bound under.
    pub name: String,
    /// The scope the function closes over.
    pub env: ScopeId,
    /// Host payload (e.g. compiled body or a test marker).
    pub body: B,
}

#[derive(Debug)]
struct Frame<B> {
    parent: Option<ScopeId>,
    bindings: FxHashMap<String, Function<B>>,
    registered: FxHashMap<String, Function<B>>,
}

impl<B> Frame<B> {
    fn new(parent: Option<ScopeId>) -> Self {
        Self {
            parent,
            bindings: FxHashMap::default(),
            registered: FxHashMap::default(),
        }
    }
}

/// In-memory [`GenericTable`] with a tree of lexical scopes.
///
/// Scope ids are only valid for the registry that created them. The
/// mutating methods (`define`, `define_closure`, `remove`,
/// `register_method`) panic on a foreign id; lookups return `None`.
#[derive(Debug)]
pub struct ScopeRegistry<B> {
    frames: Vec<Frame<B>>,
    builtins: FxHashMap<String, Function<B>>,
}

impl<B> ScopeRegistry<B> {
    /// Create a registry holding only the global scope.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new(None)],
            builtins: FxHashMap::default(),
        }
    }

    /// Create a scope nested in `parent`.
    pub fn child(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.frames.len() as u32);
        self.frames.push(Frame::new(Some(parent)));
        id
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.frames.get(scope.index()).and_then(|frame| frame.parent)
    }

    /// Bind `name` in `scope` to a function closing over `scope`.
    pub fn define(&mut self, scope: ScopeId, name: impl Into<String>, body: B) {
        self.define_closure(scope, name, scope, body);
    }

    /// Bind `name` in `scope` to a function closing over `env`.
    pub fn define_closure(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        env: ScopeId,
        body: B,
    ) {
        let name = name.into();
        let function = Function {
            name: name.clone(),
            env,
            body,
        };
        self.frame_mut(scope).bindings.insert(name, function);
    }

    /// Remove the binding of `name` from `scope` only.
    pub fn remove(&mut self, scope: ScopeId, name: &str) -> Option<Function<B>> {
        self.frame_mut(scope).bindings.remove(name)
    }

    /// Register `name` as a method in the registered-methods table of
    /// `def_scope`.
    pub fn register_method(&mut self, def_scope: ScopeId, name: impl Into<String>, body: B) {
        let name = name.into();
        let function = Function {
            name: name.clone(),
            env: def_scope,
            body,
        };
        self.frame_mut(def_scope).registered.insert(name, function);
    }

    /// Define a builtin. Builtins close over the global scope.
    pub fn define_builtin(&mut self, name: impl Into<String>, body: B) {
        let name = name.into();
        let function = Function {
            name: name.clone(),
            env: ScopeId::GLOBAL,
            body,
        };
        self.builtins.insert(name, function);
    }

    /// # Panics
    ///
    /// Panics if `scope` was not created by this registry.
    fn frame_mut(&mut self, scope: ScopeId) -> &mut Frame<B> {
        let frames = self.frames.len();
        self.frames.get_mut(scope.index()).unwrap_or_else(|| {
            panic!("scope {scope:?} does not belong to this registry ({frames} scopes)")
        })
    }
}

impl<B> Default for ScopeRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: fmt::Debug> GenericTable for ScopeRegistry<B> {
    type Scope = ScopeId;
    type Callable = Function<B>;

    fn lookup(&self, name: &str, scope: &ScopeId) -> Option<&Function<B>> {
        let mut current = Some(*scope);
        while let Some(id) = current {
            let frame = self.frames.get(id.index())?;
            if let Some(function) = frame.bindings.get(name) {
                return Some(function);
            }
            current = frame.parent;
        }
        None
    }

    fn lookup_registered(&self, name: &str, def_scope: &ScopeId) -> Option<&Function<B>> {
        self.frames.get(def_scope.index())?.registered.get(name)
    }

    fn builtin(&self, name: &str) -> Option<&Function<B>> {
        self.builtins.get(name)
    }

    fn enclosing_scope(&self, callable: &Function<B>) -> ScopeId {
        callable.env
    }
}
