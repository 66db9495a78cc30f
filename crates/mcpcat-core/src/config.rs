//! Configuration management for mcpcat.
//!
//! Configuration is loaded from multiple sources and merged:
//! 1. Global config: `~/.config/mcpcat/config.json`
//! 2. Environment variable: `MCPCAT_CONFIG_CONTENT`
//! 3. Project config: `mcpcat.jsonc` or `mcpcat.json` in project directory
//! 4. Environment overrides: `MCPCAT_PROBE_TIMEOUT_MS`, `MCPCAT_DEBUG`
//!
//! Supports JSONC (JSON with comments) and variable substitution:
//! - `{env:VAR_NAME}` - Substitute environment variable
//! - `{file:path}` - Substitute file contents

use crate::error::{ConfigError, CoreResult};
use mcpcat_mcp::http::DEFAULT_MAX_REDIRECTS;
use mcpcat_mcp::protocol::{CLIENT_NAME, CLIENT_VERSION};
use mcpcat_mcp::{Implementation, ProbeConfig, DEFAULT_PROBE_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// Default pause before a background probe starts.
pub const DEFAULT_BACKGROUND_DELAY: Duration = Duration::from_millis(100);

const ENV_CONFIG_CONTENT: &str = "MCPCAT_CONFIG_CONTENT";
const ENV_PROBE_TIMEOUT_MS: &str = "MCPCAT_PROBE_TIMEOUT_MS";
const ENV_DEBUG: &str = "MCPCAT_DEBUG";

/// Static regex for variable substitution, compiled once.
static VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

fn var_regex() -> &'static regex::Regex {
    VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\{(env|file):([^}]+)\}")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// JSON Schema reference.
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,

    /// Shorthand for `logLevel: "debug"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeSection>,
}

/// Log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for mcpcat_util::log::LogLevel {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::Trace,
            LogLevel::Debug => Self::Debug,
            LogLevel::Info => Self::Info,
            LogLevel::Warn => Self::Warn,
            LogLevel::Error => Self::Error,
        }
    }
}

/// The `probe` section as written in config files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProbeSection {
    /// Budget per MCP call, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_redirects: Option<usize>,

    /// Pause before a background probe starts, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_delay_ms: Option<u64>,

    /// Name announced in `clientInfo`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_version: Option<String>,
}

impl ProbeSection {
    /// Merge another section into this one (other takes precedence).
    pub fn merge(self, other: Self) -> Self {
        Self {
            timeout_ms: other.timeout_ms.or(self.timeout_ms),
            max_redirects: other.max_redirects.or(self.max_redirects),
            background_delay_ms: other.background_delay_ms.or(self.background_delay_ms),
            client_name: other.client_name.or(self.client_name),
            client_version: other.client_version.or(self.client_version),
        }
    }
}

/// Probe settings with every default resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSettings {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub background_delay: Duration,
    pub client_info: Implementation,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            background_delay: DEFAULT_BACKGROUND_DELAY,
            client_info: Implementation::default(),
        }
    }
}

impl ProbeSettings {
    /// Settings for building an `McpProber`.
    pub fn prober_config(&self) -> ProbeConfig {
        ProbeConfig {
            client_info: self.client_info.clone(),
            max_redirects: self.max_redirects,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Loading order (later sources override earlier):
    /// 1. Global config from `~/.config/mcpcat/`
    /// 2. `MCPCAT_CONFIG_CONTENT` environment variable
    /// 3. Project config from `project_dir`
    /// 4. `MCPCAT_PROBE_TIMEOUT_MS` / `MCPCAT_DEBUG`
    pub async fn load(project_dir: Option<&Path>) -> CoreResult<(Self, Vec<PathBuf>)> {
        let mut config = Config::default();
        let mut sources = Vec::new();

        if let Some(global_dir) = Self::global_config_dir() {
            if let Some(path) = first_existing(&global_dir, &["config.json", "mcpcat.json", "mcpcat.jsonc"]) {
                config = config.merge(Self::load_file(&path).await?);
                sources.push(path);
            }
        }

        if let Ok(content) = std::env::var(ENV_CONFIG_CONTENT) {
            config = config.merge(Self::parse_jsonc(&content, "<env>")?);
        }

        if let Some(dir) = project_dir {
            if let Some(path) = first_existing(dir, &["mcpcat.jsonc", "mcpcat.json"]) {
                config = config.merge(Self::load_file(&path).await?);
                sources.push(path);
            }
        }

        let config = config.with_overrides(|name| std::env::var(name).ok())?;
        Ok((config, sources))
    }

    /// Get the global config directory.
    ///
    /// On Unix, prefers `~/.config/mcpcat` over the platform directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            if let Some(home) = dirs::home_dir() {
                let xdg_config = home.join(".config").join("mcpcat");
                if xdg_config.exists() {
                    return Some(xdg_config);
                }
            }
        }

        dirs::config_dir().map(|d| d.join("mcpcat"))
    }

    /// Load configuration from a file.
    pub async fn load_file(path: &Path) -> CoreResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let content = Self::substitute_variables(&content, path)?;
        Self::parse_jsonc(&content, &path.display().to_string())
    }

    /// Apply environment overrides through `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> CoreResult<Self> {
        if let Some(raw) = lookup(ENV_PROBE_TIMEOUT_MS) {
            let timeout_ms = raw.trim().parse::<u64>().map_err(|e| ConfigError::Validation {
                message: format!("{ENV_PROBE_TIMEOUT_MS}={raw}: {e}"),
            })?;
            let probe = self.probe.take().unwrap_or_default();
            self.probe = Some(probe.merge(ProbeSection {
                timeout_ms: Some(timeout_ms),
                ..Default::default()
            }));
        }

        if let Some(raw) = lookup(ENV_DEBUG) {
            self.debug = Some(matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ));
        }

        Ok(self)
    }

    /// Effective log level; `debug: true` wins over `logLevel`.
    pub fn log_level(&self) -> mcpcat_util::log::LogLevel {
        if self.debug == Some(true) {
            return mcpcat_util::log::LogLevel::Debug;
        }
        self.log_level.map(Into::into).unwrap_or_default()
    }

    /// Resolve the probe section against defaults.
    pub fn probe_settings(&self) -> CoreResult<ProbeSettings> {
        let section = self.probe.clone().unwrap_or_default();
        let defaults = ProbeSettings::default();

        if section.timeout_ms == Some(0) {
            return Err(ConfigError::Validation {
                message: "probe.timeoutMs must be greater than zero".to_string(),
            }
            .into());
        }

        Ok(ProbeSettings {
            timeout: section
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
            max_redirects: section.max_redirects.unwrap_or(defaults.max_redirects),
            background_delay: section
                .background_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.background_delay),
            client_info: Implementation::new(
                section.client_name.unwrap_or_else(|| CLIENT_NAME.to_string()),
                section
                    .client_version
                    .unwrap_or_else(|| CLIENT_VERSION.to_string()),
            ),
        })
    }

    /// Parse JSONC (JSON with comments).
    fn parse_jsonc(content: &str, source: &str) -> CoreResult<Self> {
        let stripped = Self::strip_comments(content);

        serde_json::from_str(&stripped).map_err(|e| {
            ConfigError::InvalidJson {
                path: source.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Strip `//` and `/* */` comments outside of strings.
    fn strip_comments(input: &str) -> String {
        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars().peekable();
        let mut in_string = false;
        let mut escape_next = false;

        while let Some(c) = chars.next() {
            if escape_next {
                result.push(c);
                escape_next = false;
                continue;
            }

            if in_string {
                match c {
                    '\\' => escape_next = true,
                    '"' => in_string = false,
                    _ => {}
                }
                result.push(c);
                continue;
            }

            match (c, chars.peek()) {
                ('"', _) => {
                    in_string = true;
                    result.push(c);
                }
                ('/', Some('/')) => {
                    chars.next();
                    for c in chars.by_ref() {
                        if c == '\n' {
                            result.push('\n');
                            break;
                        }
                    }
                }
                ('/', Some('*')) => {
                    chars.next();
                    let mut prev = ' ';
                    for c in chars.by_ref() {
                        if prev == '*' && c == '/' {
                            break;
                        }
                        // Keep line numbers stable for parse errors.
                        if c == '\n' {
                            result.push('\n');
                        }
                        prev = c;
                    }
                }
                _ => result.push(c),
            }
        }

        result
    }

    /// Substitute `{env:VAR}` and `{file:path}` (relative to the config file).
    fn substitute_variables(content: &str, config_path: &Path) -> CoreResult<String> {
        let config_dir = config_path.parent().unwrap_or(Path::new("."));
        let mut result = content.to_string();

        for cap in var_regex().captures_iter(content) {
            let (Some(full_match), Some(kind), Some(value)) = (cap.get(0), cap.get(1), cap.get(2))
            else {
                continue;
            };
            let value = value.as_str();

            let replacement = match kind.as_str() {
                "env" => std::env::var(value).map_err(|_| ConfigError::EnvVarNotFound {
                    name: value.to_string(),
                })?,
                "file" => {
                    let file_path = config_dir.join(value);
                    std::fs::read_to_string(&file_path)
                        .map_err(|_| ConfigError::FileRefNotFound {
                            path: file_path.display().to_string(),
                        })?
                        .trim()
                        .to_string()
                }
                _ => continue,
            };

            result = result.replace(full_match.as_str(), &replacement);
        }

        Ok(result)
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(mut self, other: Self) -> Self {
        if other.schema.is_some() {
            self.schema = other.schema;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        if other.debug.is_some() {
            self.debug = other.debug;
        }

        self.probe = match (self.probe, other.probe) {
            (Some(base), Some(other)) => Some(base.merge(other)),
            (base, None) => base,
            (None, other) => other,
        };

        self
    }
}

fn first_existing(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    names.iter().map(|name| dir.join(name)).find(|path| path.exists())
}
