//! Desired-state configuration (`pushsync.toml`)
//!
//! ```toml
//! [provider]
//! api_token = "azGDORePK8gMaC0QOYAMyEEuzJnyUi"   # or PUSHOVER_API_TOKEN
//! timeout_secs = 30
//!
//! [messages.deploy]
//! user_key = "uQiRzpo4DXghDmr9QzzfQu27cmVRsG"
//! message = "Deploy finished"
//!
//! [group_members.alice]
//! group_key = "gznej3rKEVAvPUxu9vvNnqpmZpokzF"
//! user_key = "uQiRzpo4DXghDmr9QzzfQu27cmVRsG"
//! memo = "on call"
//! ```

use crate::paths;
use crate::resource::{MembershipSpec, MessageSpec};
use anyhow::{Context, Result, bail};
use pushover::{Client, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file name inside the config directory
pub const CONFIG_FILE: &str = "pushsync.toml";

/// Environment variable holding the application token
pub const ENV_API_TOKEN: &str = "PUSHOVER_API_TOKEN";

/// Per-call timeout when none is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Parallel workers when none are configured
pub const DEFAULT_JOBS: usize = 4;

// ============================================================================
// Config Structures
// ============================================================================

/// `[provider]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Application token; falls back to `PUSHOVER_API_TOKEN`
    #[serde(default)]
    pub api_token: Option<String>,

    /// API base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-call timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Parallel workers for plan and apply
    #[serde(default)]
    pub jobs: Option<usize>,
}

/// The whole desired state
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushsyncConfig {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub messages: BTreeMap<String, MessageSpec>,

    #[serde(default)]
    pub group_members: BTreeMap<String, MembershipSpec>,
}

impl PushsyncConfig {
    /// Config file path: the `--config` override or the default location
    pub fn path(override_path: Option<&Path>) -> Result<PathBuf> {
        match override_path {
            Some(p) => Ok(paths::expand(&p.to_string_lossy())),
            None => Ok(paths::config_dir()?.join(CONFIG_FILE)),
        }
    }

    /// Load from `path`; a missing file is an empty configuration
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Config file {} does not exist, using empty config", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!(
            "Loaded {} message(s) and {} group member(s) from {}",
            config.messages.len(),
            config.group_members.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse and check entity names
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        for name in config.messages.keys().chain(config.group_members.keys()) {
            check_name(name)?;
        }
        check_unique_members(&config.group_members)?;
        Ok(config)
    }

    /// Resolve the application token
    pub fn api_token(&self) -> Result<String> {
        resolve_token_from(
            self.provider.api_token.as_deref(),
            std::env::var(ENV_API_TOKEN).ok().as_deref(),
        )
    }

    pub fn base_url(&self) -> &str {
        self.provider.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.provider.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn jobs(&self) -> usize {
        self.provider.jobs.unwrap_or(DEFAULT_JOBS).max(1)
    }

    /// Build a client with the resolved token
    pub fn client(&self) -> Result<Client> {
        let token = self.api_token()?;
        log::debug!("Using API base URL {}", self.base_url());
        Ok(Client::with_base_url(token, self.base_url()))
    }
}

/// Pick the token: configuration first, then the environment
pub fn resolve_token_from(configured: Option<&str>, env: Option<&str>) -> Result<String> {
    if let Some(token) = configured.filter(|t| !t.trim().is_empty()) {
        return Ok(token.trim().to_string());
    }
    if let Some(token) = env.filter(|t| !t.trim().is_empty()) {
        log::debug!("Using API token from {ENV_API_TOKEN}");
        return Ok(token.trim().to_string());
    }
    bail!("No API token configured: set [provider].api_token in {CONFIG_FILE} or {ENV_API_TOKEN}")
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("Entity names must not be empty");
    }
    if name.contains('.') {
        bail!("Entity name '{name}' must not contain '.'");
    }
    Ok(())
}

/// Two entries for one (group, user, device) would fight over one remote row
fn check_unique_members(members: &BTreeMap<String, MembershipSpec>) -> Result<()> {
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    for (name, spec) in members {
        if let Some(first) = seen.insert(spec.id(), name) {
            bail!(
                "group_members.{first} and group_members.{name} both manage {}",
                spec.id()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[provider]
api_token = "app-token"
timeout_secs = 5
jobs = 2

[messages.deploy]
user_key = "U1"
message = "Deploy finished"
priority = 1

[messages.pager]
user_key = "U1"
message = "Pager"
priority = 2
retry = 60
expire = 3600

[group_members.alice]
group_key = "G1"
user_key = "U1"
memo = "lead"

[group_members.bob]
group_key = "G1"
user_key = "U2"
device = "iphone"
disabled = true
api_token = "team-app"
"#;

    #[test]
    fn test_parse_sample() {
        let config = PushsyncConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.messages.len(), 2);
        assert_eq!(config.messages["pager"].retry, Some(60));
        assert_eq!(config.messages["deploy"].priority, 1);

        let bob = &config.group_members["bob"];
        assert_eq!(bob.device(), Some("iphone"));
        assert!(bob.disabled);
        assert_eq!(bob.api_token.as_deref(), Some("team-app"));

        let alice = &config.group_members["alice"];
        assert_eq!(alice.device(), None);
        assert!(!alice.disabled);

        assert_eq!(config.call_timeout(), Duration::from_secs(5));
        assert_eq!(config.jobs(), 2);
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_defaults() {
        let config = PushsyncConfig::parse("").unwrap();
        assert!(config.messages.is_empty());
        assert_eq!(config.jobs(), DEFAULT_JOBS);
        assert_eq!(
            config.call_timeout(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_dotted_name_rejected() {
        let err = PushsyncConfig::parse(
            r#"
[group_members."a.b"]
group_key = "G1"
user_key = "U1"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("must not contain '.'"));
    }

    #[test]
    fn test_duplicate_member_key_rejected() {
        let err = PushsyncConfig::parse(
            r#"
[group_members.a]
group_key = "G1"
user_key = "U1"
memo = "first"

[group_members.b]
group_key = "G1"
user_key = "U1"
device = ""
memo = "second"
"#,
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("group_members.a"));
        assert!(err.contains("group_members.b"));
        assert!(err.contains("G1/U1"));
    }

    #[test]
    fn test_same_user_on_other_device_allowed() {
        let config = PushsyncConfig::parse(
            r#"
[group_members.phone]
group_key = "G1"
user_key = "U1"
device = "iphone"

[group_members.all]
group_key = "G1"
user_key = "U1"
"#,
        )
        .unwrap();
        assert_eq!(config.group_members.len(), 2);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(PushsyncConfig::parse("[provider]\ntoken = \"x\"\n").is_err());
    }

    #[test]
    fn test_token_precedence() {
        assert_eq!(resolve_token_from(Some("cfg"), Some("env")).unwrap(), "cfg");
        assert_eq!(resolve_token_from(None, Some("env")).unwrap(), "env");
        assert_eq!(resolve_token_from(Some("  "), Some("env")).unwrap(), "env");

        let err = resolve_token_from(None, None).unwrap_err().to_string();
        assert!(err.contains("[provider].api_token"));
        assert!(err.contains(ENV_API_TOKEN));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = PushsyncConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert!(config.group_members.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = PushsyncConfig::load(file.path()).unwrap();
        assert_eq!(config.group_members.len(), 2);
    }

    #[test]
    fn test_load_reports_path_on_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[messages.x]\nmessage = 3\n").unwrap();
        let err = format!("{:#}", PushsyncConfig::load(file.path()).unwrap_err());
        assert!(err.contains("Failed to parse config file"));
    }
}
