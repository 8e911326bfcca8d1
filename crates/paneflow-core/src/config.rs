//! Process configuration, loaded once at startup and handed out as
//! `Arc<Config>`. Every field has a `#[serde(default = ...)]` so a missing
//! or partial on-disk config file is never an error.

use serde::{Deserialize, Serialize};

fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port_range_start() -> u16 {
    19100
}

fn default_port_range_end() -> u16 {
    19200
}

fn default_scrollback_lines() -> u32 {
    10_000
}

fn default_broadcast_capacity() -> usize {
    4096
}

fn default_cols() -> u16 {
    80
}

fn default_rows() -> u16 {
    24
}

/// Cursor shape sent to clients as part of `terminalConfig`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorShape {
    #[default]
    Block,
    Bar,
    Underline,
}

/// Preferred renderer hint; the terminal emulator itself is a black-box
/// consumer of this value, never branched on by the core (§9).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferredRenderer {
    Ghostty,
    Xterm,
}

/// `terminalConfig` as sent in `workspace_snapshot`/`workspace_update`
/// (§6). All fields are optional; clients substitute their own defaults
/// for anything omitted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TerminalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_style: Option<CursorShape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_blink: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrollback_lines: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<PreferredRenderer>,
}

/// Top-level process configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    #[serde(default = "default_port_range_start")]
    pub port_range_start: u16,
    #[serde(default = "default_port_range_end")]
    pub port_range_end: u16,

    /// Working directory new sessions are spawned in; `None` means the
    /// process's own current directory.
    #[serde(default)]
    pub working_directory: Option<std::path::PathBuf>,

    /// Default scrollback line count, clamped to [100, 100_000].
    #[serde(default = "default_scrollback_lines")]
    pub scrollback_lines: u32,

    /// Capacity of each session's `tokio::sync::broadcast` channel
    /// (component H).
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,

    /// Default dimensions used when a `create_session`/legacy connection
    /// omits `cols`/`rows`.
    #[serde(default = "default_cols")]
    pub default_cols: u16,
    #[serde(default = "default_rows")]
    pub default_rows: u16,

    #[serde(default)]
    pub default_terminal_config: TerminalConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            port_range_start: default_port_range_start(),
            port_range_end: default_port_range_end(),
            working_directory: None,
            scrollback_lines: default_scrollback_lines(),
            broadcast_capacity: default_broadcast_capacity(),
            default_cols: default_cols(),
            default_rows: default_rows(),
            default_terminal_config: TerminalConfig::default(),
        }
    }
}

impl Config {
    pub fn scrollback_lines_clamped(lines: u32) -> u32 {
        lines.clamp(100, 100_000)
    }

    /// Load from a YAML file if present; fall back to defaults on any
    /// read/parse error so a missing config never prevents startup.
    pub fn load_or_default(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => config,
                Err(err) => {
                    log::warn!("failed to parse config at {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = serde_yaml::from_str("bind_host: 0.0.0.0\n").unwrap();
        assert_eq!(config.bind_host, "0.0.0.0");
        assert_eq!(config.scrollback_lines, default_scrollback_lines());
        assert_eq!(config.port_range_start, default_port_range_start());
    }

    #[test]
    fn terminal_config_all_fields_optional() {
        let tc: TerminalConfig = serde_json::from_str("{}").unwrap();
        assert!(tc.font_family.is_none());
        assert!(tc.renderer.is_none());
    }

    #[test]
    fn scrollback_clamped_to_range() {
        assert_eq!(Config::scrollback_lines_clamped(1), 100);
        assert_eq!(Config::scrollback_lines_clamped(1_000_000), 100_000);
        assert_eq!(Config::scrollback_lines_clamped(5_000), 5_000);
    }
}
