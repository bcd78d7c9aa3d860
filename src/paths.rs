//! Centralized path resolution for pushsync
//!
//! # Environment Variables
//!
//! - `PUSHSYNC_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/pushsync`)
//! - `PUSHSYNC_STATE_DIR` - Override state directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `PUSHSYNC_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/pushsync` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\pushsync`
//!    - macOS/Linux: `~/.config/pushsync`
//!
//! For state_dir():
//! 1. `PUSHSYNC_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/pushsync` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\pushsync`
//!    - macOS/Linux: `~/.local/state/pushsync`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "PUSHSYNC_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "PUSHSYNC_STATE_DIR";

const APP_DIR: &str = "pushsync";

/// Where one kind of directory comes from, in priority order
struct DirSource {
    label: &'static str,
    env_override: &'static str,
    xdg_var: &'static str,
    platform: fn() -> Option<PathBuf>,
    home_relative: &'static [&'static str],
}

const CONFIG: DirSource = DirSource {
    label: "config",
    env_override: ENV_CONFIG_DIR,
    xdg_var: "XDG_CONFIG_HOME",
    platform: dirs::config_dir,
    home_relative: &[".config"],
};

const STATE: DirSource = DirSource {
    label: "state",
    env_override: ENV_STATE_DIR,
    xdg_var: "XDG_STATE_HOME",
    platform: dirs::data_local_dir,
    home_relative: &[".local", "state"],
};

/// Get the pushsync config directory path
pub fn config_dir() -> Result<PathBuf> {
    resolve(&CONFIG)
}

/// Get the pushsync state directory path
pub fn state_dir() -> Result<PathBuf> {
    resolve(&STATE)
}

fn resolve(source: &DirSource) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(source.env_override) {
        let path = expand(&dir);
        log::debug!(
            "Using {} dir from {}: {}",
            source.label,
            source.env_override,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg) = std::env::var(source.xdg_var) {
        let path = PathBuf::from(xdg).join(APP_DIR);
        log::debug!("Using {}: {}", source.xdg_var, path.display());
        return Ok(path);
    }

    if cfg!(windows)
        && let Some(base) = (source.platform)()
    {
        let path = base.join(APP_DIR);
        log::debug!("Using Windows {} dir: {}", source.label, path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = source
        .home_relative
        .iter()
        .fold(home, |p, part| p.join(part))
        .join(APP_DIR);
    log::debug!("Using default {} dir: {}", source.label, path.display());
    Ok(path)
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as-is.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
