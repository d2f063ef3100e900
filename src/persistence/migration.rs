//! Version-gated migrations of hydrated values

use serde_json::Value;

use crate::error::PersistError;
use crate::options::MigrationRule;

/// Result of running the rule list over one candidate
#[derive(Debug)]
pub struct Migrated {
    pub value: Value,
    /// Number of rules that fired
    pub applied: usize,
}

/// Run every rule, in order, against the candidate stored under `key`.
///
/// Each rule sees the output of the previous one, so a chain `1 → 2 → 3`
/// completes in a single pass while a rule never re-fires on its own output
/// unless that output still carries its version.
pub fn apply_migrations(
    rules: &[MigrationRule],
    key: &str,
    is_whole_tree: bool,
    mut candidate: Value,
) -> Result<Migrated, PersistError> {
    let mut applied = 0;
    for rule in rules {
        if !rule.applies(key, is_whole_tree, &candidate) {
            continue;
        }
        candidate = (rule.migrate)(candidate).map_err(|e| PersistError::Migration {
            key: key.to_string(),
            version: rule.version.to_string(),
            reason: format!("{:#}", e),
        })?;
        applied += 1;
        log::debug!("Migrated `{}` from version {}", key, rule.version);
    }
    Ok(Migrated {
        value: candidate,
        applied,
    })
}
