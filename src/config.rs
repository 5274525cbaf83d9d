use crate::app::AppSettings;
use crate::cli::CliArgs;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_REFRESH_MS: u64 = 500;
pub const MIN_REFRESH_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub source: Option<String>,
    pub refresh_ms: u64,
    pub list_all_containers: bool,
    pub exec_shell: Option<String>,
    pub log_tail_lines: usize,
    pub call_timeout_ms: u64,
    pub stop_grace_secs: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct BerthConfigFile {
    #[serde(default, alias = "refresh")]
    refresh_ms: Option<u64>,
    #[serde(default, alias = "all")]
    list_all_containers: bool,
    #[serde(default, alias = "shell")]
    exec_shell: Option<String>,
    #[serde(default = "default_log_tail_lines", alias = "log_tail")]
    log_tail_lines: usize,
    #[serde(default = "default_call_timeout_ms", alias = "timeout_ms")]
    call_timeout_ms: u64,
    #[serde(default = "default_stop_grace_secs", alias = "stop_grace")]
    stop_grace_secs: u32,
}

impl Default for BerthConfigFile {
    fn default() -> Self {
        Self {
            refresh_ms: None,
            list_all_containers: false,
            exec_shell: None,
            log_tail_lines: default_log_tail_lines(),
            call_timeout_ms: default_call_timeout_ms(),
            stop_grace_secs: default_stop_grace_secs(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            source: None,
            refresh_ms: DEFAULT_REFRESH_MS,
            list_all_containers: false,
            exec_shell: None,
            log_tail_lines: default_log_tail_lines(),
            call_timeout_ms: default_call_timeout_ms(),
            stop_grace_secs: default_stop_grace_secs(),
        }
    }
}

impl RuntimeConfig {
    /// Loads the explicit path when given, otherwise the first discovered
    /// config file. No file at all yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => discover_config_path(),
        };
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml(&raw, Some(path.display().to_string()))
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn from_yaml(raw: &str, source: Option<String>) -> Result<Self> {
        let parsed: BerthConfigFile = if raw.trim().is_empty() {
            BerthConfigFile::default()
        } else {
            serde_yaml::from_str(raw)?
        };

        Ok(Self {
            source,
            refresh_ms: parsed
                .refresh_ms
                .unwrap_or(DEFAULT_REFRESH_MS)
                .max(MIN_REFRESH_MS),
            list_all_containers: parsed.list_all_containers,
            exec_shell: parsed.exec_shell.filter(|shell| !shell.trim().is_empty()),
            log_tail_lines: parsed.log_tail_lines.max(1),
            call_timeout_ms: parsed.call_timeout_ms.max(1),
            stop_grace_secs: parsed.stop_grace_secs,
        })
    }

    pub fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(refresh_ms) = args.refresh_ms {
            self.refresh_ms = refresh_ms.max(MIN_REFRESH_MS);
        }
        if args.all {
            self.list_all_containers = true;
        }
    }

    /// Stop and restart wait out the grace period on the daemon side, so
    /// their bound is the call timeout plus that grace.
    pub fn app_settings(&self) -> AppSettings {
        let call_timeout = Duration::from_millis(self.call_timeout_ms);
        AppSettings {
            call_timeout,
            lifecycle_timeout: call_timeout + self.stop_grace(),
            log_tail_lines: self.log_tail_lines,
        }
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(u64::from(self.stop_grace_secs))
    }
}

fn default_log_tail_lines() -> usize {
    200
}

fn default_call_timeout_ms() -> u64 {
    4_000
}

fn default_stop_grace_secs() -> u32 {
    10
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("BERTH_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [PathBuf::from("berth.yaml"), PathBuf::from(".berth.yaml")];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let candidate = PathBuf::from(home).join(".config/berth/config.yaml");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    None
}
