//! Single-receiver generic function dispatch
//!
//! This crate selects and invokes methods for generic functions the way an
//! S3-style object system does: a value carries an ordered class vector, and
//! calling a generic picks the first function named `generic.class` found
//! along that vector, with group generics, a `default` method and the builtin
//! as fallbacks.
//!
//! - Class vectors (explicit or derived from a value's shape)
//! - Method resolution against an injected name table
//! - Group generics (`Ops`, `Math`, `Summary`, `Complex`)
//! - Per-call-site memoization
//! - Method contexts with hidden dispatch bindings
//! - Delegation to the next method
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐   ┌────────────────┐   ┌──────────────┐
//! │ GenericDispatch│──►│ CallSiteCache  │──►│DispatchEngine│──► GenericTable
//! │  / NextMethod  │   └────────────────┘   └──────────────┘
//! └───────┬────────┘
//!         ▼
//!  MethodEnvironmentBuilder ──► Invocation
//! ```
//!
//! The evaluator owns scopes, values and callables. Dispatch borrows them
//! through [`GenericTable`] and [`ClassSource`] and returns an [`Invocation`]
//! describing what to call.

pub mod args;
pub mod cache;
pub mod class;
pub mod config;
pub mod dispatch;
pub mod dispatcher;
pub mod error;
pub mod group;
pub mod method_env;
pub mod next_method;
pub mod table;

pub use args::{Arg, CallArgs};
pub use cache::{CallSiteCache, DispatchSite};
pub use class::{BaseType, ClassResolver, ClassSource, ClassVector, Value, DEFAULT_CLASS};
pub use config::DispatchConfig;
pub use dispatch::{
    method_name, DispatchEngine, DispatchResult, DispatchScope, LookupSource, MethodMatch,
};
pub use dispatcher::{GenericDispatcher, Invocation};
pub use error::{ConfigError, DispatchError, Result};
pub use group::Group;
pub use method_env::{HiddenValue, MethodCallContext, MethodEnvironmentBuilder};
pub use next_method::{NextMethodContinuation, NextMethodSite};
pub use table::{Function, GenericTable, ScopeId, ScopeRegistry};
