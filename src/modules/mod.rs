//! Sync kinds and the registry builder.
//!
//! Each kind implements [`SyncModule`](crate::sync::SyncModule) over the
//! platform traits. [`build_registry`] turns the `[sync]` config section into
//! a [`SyncRegistry`], leaving out sets that fail validation and kinds with
//! nothing configured.

mod ban;
mod group;
mod linked_role;
mod mute;
mod online_role;

pub use ban::{BanSync, PunishmentTarget};
pub use group::GroupSync;
pub use linked_role::{LinkedRoleSync, projection_config};
pub use mute::MuteSync;
pub use online_role::OnlineRoleSync;

use std::sync::Arc;
use tracing::{error, info};

use crate::config::{
    RoleProjectionConfig, SyncSection, ValidationError, validate_group_set, validate_projection,
    validate_sync_config,
};
use crate::error::SyncError;
use crate::identity::{IdentityResolver, LinkCheck, ResolvedIdentity};
use crate::platform::{ChatPlatform, GamePlatform, GroupKey, RoleId};
use crate::sync::{
    InFlightSet, PairKey, Reconciler, Side, SyncHandle, SyncModule, SyncRegistry, SyncSet,
};

/// Collaborators shared by every sync kind.
#[derive(Clone)]
pub struct ModuleContext {
    pub chat: Arc<dyn ChatPlatform>,
    pub game: Arc<dyn GamePlatform>,
    pub resolver: Arc<IdentityResolver>,
}

/// Grant or revoke a role, writing only when it changes.
pub(crate) async fn apply_role(
    chat: &dyn ChatPlatform,
    identity: &ResolvedIdentity,
    role: RoleId,
    grant: bool,
) -> Result<(), SyncError> {
    let held = chat
        .has_role(identity.user, role)
        .await
        .map_err(SyncError::apply(Side::Chat))?;
    if held == grant {
        return Ok(());
    }
    let written = if grant {
        chat.add_role(identity.user, role).await
    } else {
        chat.remove_role(identity.user, role).await
    };
    written.map_err(SyncError::apply(Side::Chat))
}

/// Log every validation error for a set; true when it may activate.
fn activatable(errors: Vec<ValidationError>) -> bool {
    for e in &errors {
        error!(error = %e, "sync set blocked by invalid configuration");
    }
    errors.is_empty()
}

/// Build the registry for the configured kinds.
///
/// Every reconciler shares `inflight`, so a rebuilt registry still sees pairs
/// claimed by the one it replaces.
pub fn build_registry(
    section: &SyncSection,
    ctx: &ModuleContext,
    inflight: &InFlightSet<PairKey>,
) -> SyncRegistry {
    let mut handles: Vec<Arc<dyn SyncHandle>> = Vec::new();

    let group_sets: Vec<SyncSet<GroupKey, RoleId>> = section
        .groups
        .iter()
        .enumerate()
        .filter(|(index, set)| activatable(validate_group_set(*index, set)))
        .map(|(_, set)| {
            set.pairs.iter().fold(
                SyncSet::new(set.name.clone(), set.sync.clone()),
                |sync_set, pair| {
                    let key = pair
                        .contexts
                        .iter()
                        .fold(GroupKey::new(pair.group.clone()), |key, (k, v)| {
                            key.with_context(k.clone(), v.clone())
                        });
                    sync_set.with_entry(key, RoleId(pair.role_id))
                },
            )
        })
        .filter(|set| !set.entries.is_empty())
        .collect();
    push(
        &mut handles,
        GroupSync::new(ctx.chat.clone(), ctx.game.clone()),
        group_sets,
        ctx,
        inflight,
    );

    if let Some(bans) = &section.bans
        && activatable(validate_sync_config("bans", &bans.sync))
    {
        let target = PunishmentTarget::new(bans.server_id, bans.banned_role_id);
        let set = SyncSet::new("bans", bans.sync.clone()).with_entry((), target);
        push(
            &mut handles,
            BanSync::new(ctx.chat.clone(), ctx.game.clone(), target),
            vec![set],
            ctx,
            inflight,
        );
    }

    if let Some(mutes) = &section.mutes
        && activatable(validate_sync_config("mutes", &mutes.sync))
    {
        let target = PunishmentTarget::new(mutes.server_id, mutes.muted_role_id);
        let set = SyncSet::new("mutes", mutes.sync.clone()).with_entry((), target);
        push(
            &mut handles,
            MuteSync::new(ctx.chat.clone(), ctx.game.clone(), target),
            vec![set],
            ctx,
            inflight,
        );
    }

    if let Some(linked) = &section.linked_role
        && activatable(validate_projection("linked_role", linked))
    {
        push(
            &mut handles,
            LinkedRoleSync::new(ctx.chat.clone(), ctx.resolver.clone()),
            projection_sets("linked_role", linked),
            ctx,
            inflight,
        );
    }

    if let Some(online) = &section.online_role
        && activatable(validate_projection("online_role", online))
    {
        push(
            &mut handles,
            OnlineRoleSync::new(ctx.chat.clone(), ctx.game.clone()),
            projection_sets("online_role", online),
            ctx,
            inflight,
        );
    }

    let registry = SyncRegistry::new(handles);
    info!(kinds = ?registry.active_kinds(), "sync registry built");
    registry
}

fn projection_sets(name: &str, config: &RoleProjectionConfig) -> Vec<SyncSet<(), RoleId>> {
    let set = config
        .role_ids
        .iter()
        .fold(SyncSet::new(name, projection_config(config.timer)), |set, id| {
            set.with_entry((), RoleId(*id))
        });
    if set.entries.is_empty() {
        Vec::new()
    } else {
        vec![set]
    }
}

fn push<M: SyncModule>(
    handles: &mut Vec<Arc<dyn SyncHandle>>,
    module: M,
    sets: Vec<SyncSet<M::GameId, M::ChatId>>,
    ctx: &ModuleContext,
    inflight: &InFlightSet<PairKey>,
) {
    if sets.is_empty() {
        return;
    }
    let links = Arc::clone(&ctx.resolver) as Arc<dyn LinkCheck>;
    handles.push(Arc::new(Reconciler::new(module, sets, inflight.clone(), links)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::identity::ResolverParams;
    use crate::platform::{MemoryChat, MemoryGame};
    use crate::sync::SyncKind;
    use std::time::Duration;

    async fn context() -> ModuleContext {
        let db = Database::new(":memory:").await.unwrap();
        let resolver = IdentityResolver::new(ResolverParams {
            store: Arc::new(db),
            provider: None,
            cache_ttl: Duration::ZERO,
            link_cooldown: Duration::ZERO,
        });
        ModuleContext {
            chat: Arc::new(MemoryChat::new()),
            game: Arc::new(MemoryGame::new()),
            resolver: Arc::new(resolver),
        }
    }

    #[tokio::test]
    async fn invalid_sets_and_empty_kinds_are_left_out() {
        let section: SyncSection = toml::from_str(
            r#"
[[groups]]
name = "staff"
direction = "bidirectional"
tie_breakers = { link = "chat" }
pairs = [{ group = "vip", role_id = 1 }]

[[groups]]
name = "donors"
direction = "game_to_chat"
pairs = [{ group = "donor", role_id = 2 }, { group = "donor", role_id = 2 }]

[bans]
server_id = 42
direction = "game_to_chat"

[linked_role]
role_ids = []
"#,
        )
        .unwrap();

        let registry = build_registry(&section, &context().await, &InFlightSet::new());
        assert_eq!(registry.active_kinds(), vec![SyncKind::Groups, SyncKind::Bans]);

        let groups = registry.get(SyncKind::Groups).unwrap().sets();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "donors");
        assert_eq!(groups[0].entries, 1);
    }

    #[tokio::test]
    async fn unnamed_sets_and_zero_cycle_projections_stay_inactive() {
        let section: SyncSection = toml::from_str(
            r#"
[[groups]]
name = ""
direction = "game_to_chat"
pairs = [{ group = "vip", role_id = 1 }]

[linked_role]
role_ids = [99]
timer = { cycle_secs = 0, side = "chat" }

[online_role]
role_ids = [55]
"#,
        )
        .unwrap();

        let registry = build_registry(&section, &context().await, &InFlightSet::new());
        assert_eq!(registry.active_kinds(), vec![SyncKind::OnlineRole]);
    }

    #[tokio::test]
    async fn empty_section_builds_empty_registry() {
        let registry = build_registry(
            &SyncSection::default(),
            &context().await,
            &InFlightSet::new(),
        );
        assert!(registry.is_empty());
    }
}
