//! Error Taxonomy.
//!
//! One crate-level error enum. `CantProject` is recovered per-variable in
//! the projection driver; `Undef` is propagated to callers as an unknown
//! verdict; `Cancelled` unwinds to the public entry points; `Internal`
//! marks invariant violations and states the design claims unreachable.

use thiserror::Error;

/// Errors raised by the engine.
#[derive(Debug, Clone, Error)]
pub enum QsatError {
    /// The projector met a construct outside its fragment.
    #[error("cannot project variable out of `{term}`")]
    CantProject {
        /// Rendering of the offending term.
        term: String,
    },

    /// The decision procedure returned an unknown verdict.
    #[error("solver returned unknown: {reason}")]
    Undef {
        /// The oracle's failure message.
        reason: String,
    },

    /// Cooperative cancellation was requested.
    #[error("cancelled")]
    Cancelled,

    /// An internal invariant was violated.
    #[error("internal error: {detail}")]
    Internal {
        /// What went wrong.
        detail: String,
    },
}

impl QsatError {
    /// Build a `CantProject` for a term rendering.
    #[must_use]
    pub fn cant_project(term: impl Into<String>) -> Self {
        QsatError::CantProject { term: term.into() }
    }

    /// Build an `Undef` with a reason.
    #[must_use]
    pub fn undef(reason: impl Into<String>) -> Self {
        QsatError::Undef {
            reason: reason.into(),
        }
    }

    /// Build an `Internal` with a detail message.
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        QsatError::Internal {
            detail: detail.into(),
        }
    }
}

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, QsatError>;
