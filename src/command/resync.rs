//! `resync [kind ...] [-confirm]`

use crate::error::CommandError;
use crate::sync::{SyncKind, SyncRegistry};

const CONFIRM_FLAG: &str = "-confirm";

/// A parsed manual resync request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResyncRequest {
    /// Kinds named on the command line, in order, without duplicates.
    pub kinds: Vec<SyncKind>,
    pub confirm: bool,
}

impl ResyncRequest {
    /// Parse kind flags (`groups`, `-bans`, ...) and `-confirm`.
    pub fn parse<'a>(args: impl IntoIterator<Item = &'a str>) -> Result<Self, CommandError> {
        let mut request = ResyncRequest::default();
        for arg in args {
            if arg.eq_ignore_ascii_case(CONFIRM_FLAG) {
                request.confirm = true;
                continue;
            }
            let kind =
                SyncKind::from_flag(arg).ok_or_else(|| CommandError::UnknownKind(arg.to_string()))?;
            if !request.kinds.contains(&kind) {
                request.kinds.push(kind);
            }
        }
        Ok(request)
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: SyncKind) -> Self {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self
    }

    pub fn confirmed(mut self) -> Self {
        self.confirm = true;
        self
    }

    /// The kinds to run against `registry`.
    ///
    /// With no kinds named, every active kind is selected, except the ones
    /// that need confirmation unless `-confirm` was given. Named kinds must
    /// be active, and destructive ones must be confirmed.
    pub fn select(&self, registry: &SyncRegistry) -> Result<Vec<SyncKind>, CommandError> {
        if self.kinds.is_empty() {
            return Ok(registry
                .active_kinds()
                .into_iter()
                .filter(|kind| self.confirm || !kind.requires_confirmation())
                .collect());
        }

        if let Some(inactive) = self.kinds.iter().find(|kind| !registry.is_active(**kind)) {
            return Err(CommandError::InactiveKind(*inactive));
        }

        let unconfirmed: Vec<SyncKind> = self
            .kinds
            .iter()
            .copied()
            .filter(|kind| kind.requires_confirmation())
            .collect();
        if !self.confirm && !unconfirmed.is_empty() {
            return Err(CommandError::ConfirmationRequired(unconfirmed));
        }

        Ok(self.kinds.clone())
    }
}
