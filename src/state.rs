use crate::paths;
use crate::resource::{MembershipRecord, MessageRecord, Tracked, group_member, message};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// State file name inside the state directory
pub const STATE_FILE: &str = "state.toml";

// ============================================================================
// State Structures
// ============================================================================

/// Last observed state of every managed entity, keyed by name
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PushsyncState {
    /// Sent notifications
    #[serde(default)]
    pub messages: BTreeMap<String, MessageRecord>,

    /// Group memberships
    #[serde(default)]
    pub group_members: BTreeMap<String, MembershipRecord>,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,
}

impl Default for PushsyncState {
    fn default() -> Self {
        Self {
            messages: BTreeMap::new(),
            group_members: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}

// ============================================================================
// PushsyncState Implementation
// ============================================================================

impl PushsyncState {
    /// Default state file path
    pub fn default_path() -> Result<PathBuf> {
        Ok(paths::state_dir()?.join(STATE_FILE))
    }

    /// Load state from `path`, or return default if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: PushsyncState = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Save state to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(&self).context("Failed to serialize state to TOML")?;

        fs::write(path, &content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Update the last_updated timestamp
    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.group_members.is_empty()
    }

    /// Store or drop the record for `address` (`type.name`)
    pub fn record(&mut self, address: &str, tracked: Option<Tracked>) {
        let (type_name, name) = address.split_once('.').unwrap_or((address, ""));
        match tracked {
            Some(Tracked::Message(record)) => {
                self.messages.insert(name.to_string(), record);
            }
            Some(Tracked::Member(record)) => {
                self.group_members.insert(name.to_string(), record);
            }
            None if type_name == message::SCHEMA.type_name => {
                self.messages.remove(name);
            }
            None if type_name == group_member::SCHEMA.type_name => {
                self.group_members.remove(name);
            }
            None => log::warn!("Ignoring state update for unknown address {address}"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{MembershipSpec, MessageSpec};

    fn member() -> MembershipRecord {
        MembershipRecord {
            id: "G1/U1".to_string(),
            spec: MembershipSpec {
                group_key: "G1".to_string(),
                user_key: "U1".to_string(),
                device: None,
                memo: "lead".to_string(),
                disabled: false,
                api_token: Some("team-app".to_string()),
            },
        }
    }

    fn sent() -> MessageRecord {
        MessageRecord {
            request_id: "req-1".to_string(),
            receipt: Some("rcpt-1".to_string()),
            spec: MessageSpec {
                priority: 2,
                retry: Some(60),
                expire: Some(3600),
                ..MessageSpec::new("U1", "down")
            },
        }
    }

    #[test]
    fn test_default_state() {
        let state = PushsyncState::default();
        assert!(state.is_empty());
    }

    #[test]
    fn test_record_and_drop() {
        let mut state = PushsyncState::default();
        state.record("group_members.alice", Some(member().into()));
        state.record("messages.pager", Some(sent().into()));
        assert_eq!(state.group_members["alice"].id, "G1/U1");
        assert_eq!(state.messages["pager"].receipt.as_deref(), Some("rcpt-1"));

        state.record("group_members.alice", None);
        state.record("messages.pager", None);
        assert!(state.is_empty());
    }

    #[test]
    fn test_unknown_address_ignored() {
        let mut state = PushsyncState::default();
        state.record("group_members.alice", Some(member().into()));
        state.record("widgets.alice", None);
        assert_eq!(state.group_members.len(), 1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(STATE_FILE);

        let mut state = PushsyncState::default();
        state.record("group_members.alice", Some(member().into()));
        state.record("messages.pager", Some(sent().into()));
        state.save(&path).unwrap();

        let loaded = PushsyncState::load(&path).unwrap();
        assert_eq!(loaded.group_members["alice"], member());
        assert_eq!(loaded.messages["pager"], sent());
        assert_eq!(loaded.last_updated, state.last_updated);
    }

    #[test]
    fn test_load_missing_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let state = PushsyncState::load(&dir.path().join(STATE_FILE)).unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn test_load_corrupt_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STATE_FILE);
        fs::write(&path, "not = [valid").unwrap();
        let err = format!("{:#}", PushsyncState::load(&path).unwrap_err());
        assert!(err.contains("Failed to parse state file"));
    }
}
