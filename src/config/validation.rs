//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.
//! Global errors stop the bridge from starting. Sync-set errors only keep
//! the affected set from activating.

use std::path::Path;
use thiserror::Error;

use super::{Config, GroupSetConfig, RoleProjectionConfig};
use crate::sync::{Cause, SyncConfig, SyncDirection};

/// Validation errors for configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("bridge.name is required")]
    MissingBridgeName,
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
    #[error("timer.minimum_delay_secs must be greater than zero")]
    ZeroMinimumDelay,
    #[error("sync set '{set}' is bidirectional but has no tie-breaker for cause '{cause}'")]
    MissingTieBreaker { set: String, cause: Cause },
    #[error("sync set '{set}' enables its timer with a zero cycle")]
    ZeroCycle { set: String },
    #[error("sync set '{set}' has no name")]
    UnnamedSet { set: String },
}

impl ValidationError {
    /// Errors that keep the whole bridge from starting.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ValidationError::MissingBridgeName
                | ValidationError::DatabasePathInvalid(_)
                | ValidationError::ZeroMinimumDelay
        )
    }
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.bridge.name.trim().is_empty() {
        errors.push(ValidationError::MissingBridgeName);
    }

    if config.database.path != ":memory:" {
        let db_path = Path::new(&config.database.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::DatabasePathInvalid(config.database.path.clone()));
        }
    }

    if config.timer.minimum_delay_secs == 0 {
        errors.push(ValidationError::ZeroMinimumDelay);
    }

    for (index, set) in config.sync.groups.iter().enumerate() {
        errors.extend(validate_group_set(index, set));
    }
    if let Some(bans) = &config.sync.bans {
        errors.extend(validate_sync_config("bans", &bans.sync));
    }
    if let Some(mutes) = &config.sync.mutes {
        errors.extend(validate_sync_config("mutes", &mutes.sync));
    }
    if let Some(linked) = &config.sync.linked_role {
        errors.extend(validate_projection("linked_role", linked));
    }
    if let Some(online) = &config.sync.online_role {
        errors.extend(validate_projection("online_role", online));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the `index`th group set, including its name.
pub fn validate_group_set(index: usize, set: &GroupSetConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if set.name.trim().is_empty() {
        errors.push(ValidationError::UnnamedSet {
            set: format!("groups[{index}]"),
        });
    }
    errors.extend(validate_sync_config(&set.name, &set.sync));
    errors
}

/// Validate a linked-role or online-role projection. Only its timer is
/// configurable.
pub fn validate_projection(name: &str, config: &RoleProjectionConfig) -> Vec<ValidationError> {
    if config.timer.side.is_enabled() && config.timer.cycle_secs == 0 {
        vec![ValidationError::ZeroCycle {
            set: name.to_string(),
        }]
    } else {
        Vec::new()
    }
}

/// Validate one user-editable sync set.
///
/// A bidirectional set needs an explicit tie-breaker for every cause that can
/// reach it; one-way sets fall back to their direction.
pub fn validate_sync_config(set: &str, config: &SyncConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.direction == SyncDirection::Bidirectional {
        for cause in config.reachable_causes() {
            if !config.tie_breakers.is_set(cause) {
                errors.push(ValidationError::MissingTieBreaker {
                    set: set.to_string(),
                    cause,
                });
            }
        }
    }

    if config.timer.side.is_enabled() && config.timer.cycle_secs == 0 {
        errors.push(ValidationError::ZeroCycle {
            set: set.to_string(),
        });
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_valid_config() -> String {
        r#"
[bridge]
name = "test-bridge"

[database]
path = ":memory:"
"#
        .to_string()
    }

    #[test]
    fn test_valid_config_passes() {
        let config: Config = toml::from_str(&minimal_valid_config()).unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_bridge_name_fails() {
        let toml = r#"
[bridge]
name = ""
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingBridgeName)));
        assert!(errors.iter().all(|e| e.is_fatal()));
    }

    #[test]
    fn test_missing_database_directory_fails() {
        let toml = r#"
[bridge]
name = "test"

[database]
path = "/nonexistent/dir/links.db"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DatabasePathInvalid(_))));
    }

    #[test]
    fn test_bidirectional_without_tie_breakers_is_blocked() {
        let toml = r#"
[bridge]
name = "test"

[database]
path = ":memory:"

[[sync.groups]]
name = "staff"
tie_breakers = { link = "chat", command = "game" }
pairs = [{ group = "vip", role_id = 123 }]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        let missing: Vec<Cause> = errors
            .iter()
            .filter_map(|e| match e {
                ValidationError::MissingTieBreaker { set, cause } if set == "staff" => Some(*cause),
                _ => None,
            })
            .collect();
        assert_eq!(missing, vec![Cause::Api, Cause::GameJoin]);
        assert!(errors.iter().all(|e| !e.is_fatal()));
    }

    #[test]
    fn test_timer_makes_timer_cause_reachable() {
        let toml = r#"
direction = "bidirectional"
timer = { side = "both" }
tie_breakers = { api = "game", command = "game", game_join = "game", link = "chat" }
"#;
        let sync: SyncConfig = toml::from_str(toml).unwrap();
        let errors = validate_sync_config("staff", &sync);
        assert_eq!(
            errors,
            vec![ValidationError::MissingTieBreaker {
                set: "staff".to_string(),
                cause: Cause::Timer
            }]
        );
    }

    #[test]
    fn test_one_way_set_needs_no_tie_breakers() {
        let sync: SyncConfig = toml::from_str("direction = \"chat_to_game\"\n").unwrap();
        assert!(validate_sync_config("bans", &sync).is_empty());
    }

    #[test]
    fn test_unnamed_group_set_is_blocked() {
        let toml = r#"
[bridge]
name = "test"

[[sync.groups]]
name = " "
direction = "game_to_chat"
pairs = [{ group = "vip", role_id = 123 }]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnnamedSet {
                set: "groups[0]".to_string()
            }]
        );
        assert!(!errors[0].is_fatal());
    }

    #[test]
    fn test_projection_timer_needs_a_cycle() {
        let toml = r#"
[bridge]
name = "test"

[sync.linked_role]
role_ids = [99]
timer = { cycle_secs = 0, side = "chat" }

[sync.online_role]
role_ids = [55]
timer = { cycle_secs = 0, side = "disabled" }
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            validate(&config).unwrap_err(),
            vec![ValidationError::ZeroCycle {
                set: "linked_role".to_string()
            }]
        );
    }

    #[test]
    fn test_zero_cycle_with_enabled_timer_fails() {
        let toml = r#"
direction = "game_to_chat"
timer = { cycle_secs = 0, side = "chat" }
"#;
        let sync: SyncConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            validate_sync_config("bans", &sync),
            vec![ValidationError::ZeroCycle {
                set: "bans".to_string()
            }]
        );
    }
}
