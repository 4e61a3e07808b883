//! Unified error handling for linksync.
//!
//! This module provides the error hierarchy for the bridge, with automatic
//! conversions and metric labeling. Per-pair failures never escape a sweep:
//! the engine converts them into `SyncResult::Error` and keeps going.

use thiserror::Error;
use uuid::Uuid;

use crate::db::DbError;
use crate::platform::UserId;
use crate::sync::{Side, SyncKind};

// ============================================================================
// Platform Errors (chat / game collaborators)
// ============================================================================

/// Errors reported by a chat or game platform adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("missing permission: {0}")]
    MissingPermission(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

impl PlatformError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingPermission(_) => "missing_permission",
            Self::NotFound(_) => "not_found",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

// ============================================================================
// Sync Errors (reconciliation)
// ============================================================================

/// Errors that can occur while reconciling one entry for one identity.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to fetch {side} state: {source}")]
    Fetch {
        side: Side,
        #[source]
        source: PlatformError,
    },

    #[error("failed to apply {side} state: {source}")]
    Apply {
        side: Side,
        #[source]
        source: PlatformError,
    },

    #[error("{side} side does not accept writes for this sync kind")]
    Unsupported { side: Side },

    #[error("identity lookup failed: {0}")]
    Identity(#[from] IdentityError),

    #[error("reconcile task failed: {0}")]
    Task(String),
}

impl SyncError {
    pub fn fetch(side: Side) -> impl FnOnce(PlatformError) -> SyncError {
        move |source| SyncError::Fetch { side, source }
    }

    pub fn apply(side: Side) -> impl FnOnce(PlatformError) -> SyncError {
        move |source| SyncError::Apply { side, source }
    }

    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch_failed",
            Self::Apply { .. } => "apply_failed",
            Self::Unsupported { .. } => "unsupported",
            Self::Identity(_) => "identity",
            Self::Task(_) => "task_failed",
        }
    }
}

// ============================================================================
// Identity Errors (link table, resolver)
// ============================================================================

/// Errors from identity resolution and link management.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("link storage error: {0}")]
    Storage(#[from] DbError),

    #[error("player {player} or user {user} is already linked")]
    AlreadyLinked { player: Uuid, user: UserId },

    #[error("link lookups for {0} are on cooldown")]
    RateLimited(Uuid),

    #[error("no link provider configured")]
    NoProvider,

    #[error("link provider error: {0}")]
    Provider(#[from] PlatformError),
}

// ============================================================================
// Command Errors (admin console)
// ============================================================================

/// Errors surfaced to the invoking operator as a one-line summary.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("invalid {name}: {value}")]
    InvalidArgument { name: &'static str, value: String },

    #[error("unknown sync kind: {0}")]
    UnknownKind(String),

    #[error("sync kind is not active: {0}")]
    InactiveKind(SyncKind),

    #[error("{} require -confirm", join_kinds(.0))]
    ConfirmationRequired(Vec<SyncKind>),

    #[error("{0}")]
    Identity(#[from] IdentityError),

    #[error("reload failed: {0}")]
    Reload(String),
}

impl CommandError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownCommand(_) => "unknown_command",
            Self::MissingArgument(_) => "missing_argument",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::UnknownKind(_) => "unknown_kind",
            Self::InactiveKind(_) => "inactive_kind",
            Self::ConfirmationRequired(_) => "confirmation_required",
            Self::Identity(_) => "identity",
            Self::Reload(_) => "reload_failed",
        }
    }
}

fn join_kinds(kinds: &[SyncKind]) -> String {
    kinds
        .iter()
        .map(|k| k.flag())
        .collect::<Vec<_>>()
        .join(", ")
}
