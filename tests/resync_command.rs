//! Manual resync through the bridge and the console.

use linksync::command::{Console, ConsoleCommand, ResyncRequest};
use linksync::error::CommandError;
use linksync::platform::{GroupKey, Punishment, RoleId, ServerId};
use linksync::sync::{Cause, ResultKind, SyncKind};

mod common;
use common::{TestBridge, player, user};

const GROUPS_AND_BANS: &str = r#"
[[sync.groups]]
name = "staff"
direction = "game_to_chat"
pairs = [{ group = "vip", role_id = 123 }]

[sync.bans]
server_id = 42
direction = "game_to_chat"
"#;

#[tokio::test]
async fn resync_over_fifty_players_with_three_failures() {
    let t = TestBridge::new(GROUPS_AND_BANS).await;
    for n in 1..=50 {
        t.join_linked(n).await;
        if n % 2 == 0 {
            t.game.grant_group(player(n), GroupKey::new("vip"));
        }
    }
    for n in [7, 21, 42] {
        t.game.fail_reads_for(player(n));
    }

    let report = t
        .bridge
        .resync(&ResyncRequest::all().with_kind(SyncKind::Groups), Cause::Command)
        .await
        .unwrap();

    let groups = &report.per_kind[&SyncKind::Groups];
    assert_eq!(report.identities, 50);
    assert_eq!(groups.errors(), 3);
    assert_eq!(groups.total() - groups.errors(), 47);
    assert_eq!(groups.get(ResultKind::AppliedToChat), 24);
    assert_eq!(groups.get(ResultKind::BothMatch), 23);

    let lines = report.render();
    assert!(lines[0].starts_with("Resync (command) over 50 identities"));
    assert!(lines.iter().any(|line| line.contains("3 failed")));
}

#[tokio::test]
async fn destructive_kinds_need_confirmation() {
    let t = TestBridge::new(GROUPS_AND_BANS).await;
    t.join_linked(1).await;
    t.game.seed_ban(player(1), Punishment::permanent());

    let request = ResyncRequest::all().with_kind(SyncKind::Bans);
    let err = t.bridge.resync(&request, Cause::Command).await.unwrap_err();
    assert!(matches!(err, CommandError::ConfirmationRequired(ref kinds) if kinds == &[SyncKind::Bans]));
    assert_eq!(t.chat.ban_of(ServerId(42), user(1)), None);

    let report = t.bridge.resync(&request.confirmed(), Cause::Command).await.unwrap();
    assert_eq!(report.per_kind[&SyncKind::Bans].get(ResultKind::AppliedToChat), 1);
    assert!(t.chat.ban_of(ServerId(42), user(1)).is_some());
}

#[tokio::test]
async fn bare_resync_skips_unconfirmed_kinds() {
    let t = TestBridge::new(GROUPS_AND_BANS).await;
    t.join_linked(1).await;
    t.game.seed_ban(player(1), Punishment::permanent());

    let report = t.bridge.resync(&ResyncRequest::all(), Cause::Command).await.unwrap();
    assert_eq!(report.per_kind.keys().copied().collect::<Vec<_>>(), vec![SyncKind::Groups]);
    assert_eq!(t.chat.ban_of(ServerId(42), user(1)), None);
}

#[tokio::test]
async fn resync_of_inactive_kind_is_rejected() {
    let t = TestBridge::new(GROUPS_AND_BANS).await;
    let err = t
        .bridge
        .resync(&ResyncRequest::all().with_kind(SyncKind::OnlineRole), Cause::Command)
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::InactiveKind(SyncKind::OnlineRole)));
}

#[tokio::test]
async fn console_runs_resync_and_link_commands() {
    let t = TestBridge::new(GROUPS_AND_BANS).await;
    let console = Console::new(t.bridge.clone(), "unused.toml");
    t.game.set_online(player(1), true);
    t.game.grant_group(player(1), GroupKey::new("vip"));

    let link = ConsoleCommand::parse(&format!("link {} {}", player(1), user(1).0))
        .unwrap()
        .unwrap();
    let output = console.execute(link).await.unwrap();
    assert!(output[0].starts_with("linked"));

    let resync = ConsoleCommand::parse("resync groups").unwrap().unwrap();
    let output = console.execute(resync).await.unwrap();
    assert!(output.iter().any(|line| line.contains("groups: applied_to_chat=1")));
    assert!(t.chat.roles_of(user(1)).contains(&RoleId(123)));

    let refused = ConsoleCommand::parse("resync bans").unwrap().unwrap();
    let err = console.execute(refused).await.unwrap_err();
    assert_eq!(err.to_string(), "bans require -confirm");

    let status = console.execute(ConsoleCommand::Status).await.unwrap();
    assert!(status[0].contains("1 linked accounts"));
    assert!(status.iter().any(|line| line.contains("groups/staff: 1 entries")));
}
