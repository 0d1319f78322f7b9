//! Error taxonomy for the pricing, costing, and dispatch-matching core.
//!
//! Only conditions that must be surfaced to the caller, optionally with a
//! stable error key, become variants here. Absent optional data (missing
//! routing/fuel providers) and zero/edge numeric inputs are handled by
//! degrading to estimates, not by raising an error — see `cost` and
//! `pricing` for where that fallback happens.

use thiserror::Error;

/// Stable machine-readable key for UI localisation, mirroring the
/// `errorKey` values required by the quote lifecycle API (spec §6.B).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKey {
    AlreadyInStatus,
    InvalidTransition,
    TerminalState,
    NotFound,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid corridor/zone configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid pricing request: {0}")]
    InvalidRequest(String),

    #[error("unknown contact: {0}")]
    UnknownContact(String),

    #[error("invalid override price: {0}")]
    InvalidOverridePrice(String),

    #[error("override would breach minimum margin floor")]
    BelowMinimumMargin,

    #[error("quote transition rejected: {key:?}")]
    Transition { key: ErrorKey },

    #[error("could not allocate a unique reference after {attempts} attempts")]
    DuplicateReference { attempts: u8 },
}

pub type CoreResult<T> = Result<T, CoreError>;
