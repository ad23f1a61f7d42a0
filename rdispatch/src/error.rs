//! Dispatch errors.

use thiserror::Error;

/// Errors raised while resolving or continuing generic dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// An explicit class attribute was present but held no entries.
    ///
    /// `ClassResolver` recovers from this internally; it only escapes when a
    /// caller builds a [`ClassVector`](crate::ClassVector) by hand.
    #[error("malformed class vector: explicit class attribute is empty")]
    MalformedClassVector,

    #[error("no applicable method for '{generic}' applied to an object of class '{class}'")]
    MethodNotFound { generic: String, class: String },

    #[error("invalid delegation context: {reason}")]
    InvalidDelegationContext { reason: &'static str },

    #[error("class name too long in '{generic}'")]
    ClassNameTooLong { generic: String },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from loading a [`DispatchConfig`](crate::DispatchConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Dispatch result type.
pub type Result<T> = std::result::Result<T, DispatchError>;

impl DispatchError {
    /// Create a `MethodNotFound` error for `generic`, rendering the class
    /// vector the way the runtime prints it (`c("a", "b")` for more than one
    /// entry).
    pub fn method_not_found(generic: &str, class: &[String]) -> Self {
        let class = match class {
            [single] => single.clone(),
            many => {
                let quoted: Vec<_> = many.iter().map(|c| format!("\"{c}\"")).collect();
                format!("c({})", quoted.join(", "))
            }
        };
        Self::MethodNotFound {
            generic: generic.to_string(),
            class,
        }
    }

    /// True for errors that the evaluator should surface as a user-visible
    /// condition rather than an internal failure.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::MalformedClassVector)
    }
}
