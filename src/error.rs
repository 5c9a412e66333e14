//! Error taxonomy for the indexing pipeline.
//!
//! Per-name resolution failures (`ResolveError`) never abort a run; they
//! are folded into the run's fail list. `IndexError` is the run-level
//! error returned by the trigger operations and names the stage that
//! failed.

use std::fmt;

use thiserror::Error;

/// Failure of a single name's resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No resolver is set for the name, or the registry returned the zero
    /// address. Terminal for this name; never retried.
    #[error("no resolver set for {0}")]
    NotFound(String),

    /// The assembled profile does not match the expected shape. Terminal
    /// for this name; indicates a pipeline bug rather than absent data.
    #[error("profile for {name} failed validation: {reason}")]
    Validation { name: String, reason: String },

    /// Rate limiting or a transient network failure. Retried with backoff
    /// by the orchestrator.
    #[error(transparent)]
    Transient(#[from] anyhow::Error),
}

impl ResolveError {
    /// Transient failures are retried; everything else is terminal for
    /// the name.
    pub fn is_transient(&self) -> bool {
        matches!(self, ResolveError::Transient(_))
    }
}

/// Pipeline stage named in run-level errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetch => write!(f, "fetch"),
            Stage::Persist => write!(f, "persist"),
        }
    }
}

/// Run-level error returned by the trigger operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The provider was still rate limiting after the capped retry budget.
    #[error("provider still rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// A stage failed outright. Persistence failures abort the final
    /// commit; nothing is partially committed silently.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    /// `index_from_last_sync` was called before any metadata row exists.
    #[error("no sync metadata recorded; run a full backfill first")]
    NoWatermark,
}

impl IndexError {
    pub fn fetch(source: anyhow::Error) -> Self {
        IndexError::Stage {
            stage: Stage::Fetch,
            source,
        }
    }

    pub fn persist(source: anyhow::Error) -> Self {
        IndexError::Stage {
            stage: Stage::Persist,
            source,
        }
    }
}
