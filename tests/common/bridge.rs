//! Test bridge management.

#![allow(dead_code)]

use linksync::bridge::{Bridge, BridgeParams};
use linksync::config::Config;
use linksync::db::Database;
use linksync::identity::{IdentityResolver, LinkEvent, LinkProvider, ResolvedIdentity, ResolverParams};
use linksync::platform::{MemoryChat, MemoryGame, MemoryLinks, UserId};
use linksync::sync::ResultTally;
use std::sync::Arc;
use uuid::Uuid;

const PRELUDE: &str = r#"
[bridge]
name = "test-bridge"

[database]
path = ":memory:"

[identity]
cache_ttl_secs = 0
link_cooldown_secs = 0
"#;

pub fn player(n: u64) -> Uuid {
    Uuid::from_u128(0x5eed_0000_0000_0000_0000_0000_0000_0000 + n as u128)
}

pub fn user(n: u64) -> UserId {
    UserId(900_000 + n)
}

pub fn identity(n: u64) -> ResolvedIdentity {
    ResolvedIdentity::new(player(n), user(n))
}

/// Parse a config made of the test prelude followed by `extra`.
pub fn config(extra: &str) -> Config {
    toml::from_str(&format!("{PRELUDE}\n{extra}")).expect("test config should parse")
}

/// A bridge over in-memory platforms. The link-event listener and timers are
/// not running unless [`Bridge::start`] is called.
pub struct TestBridge {
    pub bridge: Arc<Bridge>,
    pub resolver: Arc<IdentityResolver>,
    pub chat: Arc<MemoryChat>,
    pub game: Arc<MemoryGame>,
    pub links: Arc<MemoryLinks>,
}

impl TestBridge {
    pub async fn new(sync_config: &str) -> Self {
        Self::with_config(&config(sync_config)).await
    }

    pub async fn with_config(config: &Config) -> Self {
        let db = Database::new(":memory:").await.expect("in-memory database");
        let links = Arc::new(MemoryLinks::new());
        let resolver = Arc::new(IdentityResolver::new(ResolverParams {
            store: Arc::new(db),
            provider: Some(Arc::clone(&links) as Arc<dyn LinkProvider>),
            cache_ttl: config.identity.cache_ttl(),
            link_cooldown: config.identity.link_cooldown(),
        }));
        let chat = Arc::new(MemoryChat::new());
        let game = Arc::new(MemoryGame::new());

        let bridge = Bridge::new(BridgeParams {
            config,
            resolver: Arc::clone(&resolver),
            chat: Arc::clone(&chat) as _,
            game: Arc::clone(&game) as _,
        });

        Self {
            bridge,
            resolver,
            chat,
            game,
            links,
        }
    }

    /// Persist the link for test identity `n` without running any sync.
    pub async fn link_quietly(&self, n: u64) -> ResolvedIdentity {
        self.resolver
            .link(player(n), user(n))
            .await
            .expect("link should succeed")
    }

    /// Persist the link for test identity `n` and handle the link event.
    pub async fn link(&self, n: u64) -> ResultTally {
        let identity = self.link_quietly(n).await;
        self.bridge.handle_link_event(LinkEvent::Linked(identity)).await
    }

    /// Link `n` and mark the player online.
    pub async fn join_linked(&self, n: u64) -> ResolvedIdentity {
        let identity = self.link_quietly(n).await;
        self.game.set_online(player(n), true);
        identity
    }
}
