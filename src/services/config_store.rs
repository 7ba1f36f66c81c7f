// Configuration Storage Service
// Handles config file read/write, version backup and environment overrides

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::services::detection::Strategy;

const MAX_BACKUPS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default = "default_strategy")]
    pub default_strategy: String,
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
    /// Extra strategies registered next to the built-ins at startup
    #[serde(default)]
    pub strategies: Vec<Strategy>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: String::new(),
            default_strategy: default_strategy(),
            provider_timeout_ms: default_provider_timeout_ms(),
            simulation: SimulationConfig::default(),
            providers: HashMap::new(),
            api_keys: HashMap::new(),
            strategies: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Apply `CONTENT_SHIELD_*` environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("CONTENT_SHIELD_STRATEGY") {
            if !v.trim().is_empty() {
                self.default_strategy = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var("CONTENT_SHIELD_PROVIDER_TIMEOUT_MS") {
            match v.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.provider_timeout_ms = ms,
                _ => warn!("Ignoring invalid CONTENT_SHIELD_PROVIDER_TIMEOUT_MS={}", v),
            }
        }
        if let Ok(v) = env::var("CONTENT_SHIELD_SIMULATION_SEED") {
            match v.trim().parse::<u64>() {
                Ok(seed) => {
                    self.simulation.enabled = true;
                    self.simulation.seed = seed;
                }
                Err(_) => warn!("Ignoring invalid CONTENT_SHIELD_SIMULATION_SEED={}", v),
            }
        }
    }

    pub fn provider_enabled(&self, provider: &str) -> bool {
        self.providers.get(provider).map_or(true, |p| p.enabled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            seed: default_seed(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: None,
            base_url: None,
        }
    }
}

fn default_strategy() -> String { "conservative".to_string() }
fn default_provider_timeout_ms() -> u64 { 10_000 }
fn default_seed() -> u64 { 42 }
fn default_true() -> bool { true }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("content-shield"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| format!("Failed to create config dir: {}", e))
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Write the config, backing up the file it replaces.
    pub fn save(&self, config: &AppConfig) -> Result<(), String> {
        self.ensure_dir()?;
        let content = serde_json::to_string_pretty(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        if self.config_file.exists() {
            self.backup_current()?;
        }

        let staging = self.config_file.with_extension("json.tmp");
        fs::write(&staging, content).map_err(|e| format!("Failed to write config: {}", e))?;
        fs::rename(&staging, &self.config_file)
            .map_err(|e| format!("Failed to replace config: {}", e))
    }

    /// Load once, apply every edit in order, save once.
    pub fn apply(&self, edits: &[ConfigEdit]) -> Result<AppConfig, String> {
        let mut config = self.load()?;
        for edit in edits {
            edit.apply_to(&mut config)?;
            info!(provider = edit.provider(), "[CONFIG] {}", edit.describe());
        }
        self.save(&config)?;
        Ok(config)
    }

    fn backup_dir(&self) -> PathBuf {
        self.config_dir.join("backups")
    }

    /// Backup files, oldest first.
    pub fn backups(&self) -> Result<Vec<PathBuf>, String> {
        let dir = self.backup_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = fs::read_dir(&dir)
            .map_err(|e| format!("Failed to read backup dir: {}", e))?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with("config_") && n.ends_with(".json"))
            })
            .collect();
        // Fixed-width timestamp + sequence names sort chronologically.
        files.sort();
        Ok(files)
    }

    fn backup_current(&self) -> Result<PathBuf, String> {
        let dir = self.backup_dir();
        fs::create_dir_all(&dir).map_err(|e| format!("Failed to create backup dir: {}", e))?;

        let prefix = format!("config_{}_", chrono::Utc::now().format("%Y%m%d_%H%M%S%3f"));
        let seq = self
            .backups()?
            .iter()
            .filter_map(|p| backup_seq(p, &prefix))
            .max()
            .map_or(0, |last| last + 1);
        let target = dir.join(format!("{}{:04}.json", prefix, seq));

        fs::copy(&self.config_file, &target)
            .map_err(|e| format!("Failed to create backup: {}", e))?;

        let backups = self.backups()?;
        let excess = backups.len().saturating_sub(MAX_BACKUPS);
        for old in &backups[..excess] {
            if let Err(e) = fs::remove_file(old) {
                warn!("[CONFIG] Failed to prune backup {}: {}", old.display(), e);
            }
        }
        Ok(target)
    }
}

fn backup_seq(path: &Path, prefix: &str) -> Option<u32> {
    path.file_name()?
        .to_str()?
        .strip_prefix(prefix)?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

/// A single change to the stored configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigEdit {
    SetApiKey { provider: String, key: String },
    DeleteApiKey { provider: String },
    SetProviderUrl { provider: String, url: String },
}

impl ConfigEdit {
    pub fn provider(&self) -> &str {
        match self {
            Self::SetApiKey { provider, .. }
            | Self::DeleteApiKey { provider }
            | Self::SetProviderUrl { provider, .. } => provider,
        }
    }

    /// Log-safe summary; never includes the key.
    pub fn describe(&self) -> String {
        match self {
            Self::SetApiKey { provider, .. } => format!("API key stored for {}", provider),
            Self::DeleteApiKey { provider } => format!("API key removed for {}", provider),
            Self::SetProviderUrl { provider, url } => format!("Endpoint for {} set to {}", provider, url),
        }
    }

    fn apply_to(&self, config: &mut AppConfig) -> Result<(), String> {
        if self.provider().trim().is_empty() {
            return Err("Provider id must not be empty".to_string());
        }
        match self {
            Self::SetApiKey { provider, key } => {
                let key = key.trim();
                if key.is_empty() {
                    return Err(format!("Empty API key for {}", provider));
                }
                config.api_keys.insert(provider.clone(), key.to_string());
            }
            Self::DeleteApiKey { provider } => {
                config.api_keys.remove(provider);
            }
            Self::SetProviderUrl { provider, url } => {
                let url = url.trim();
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(format!("Endpoint for {} must be an http(s) URL: {}", provider, url));
                }
                config.providers.entry(provider.clone()).or_default().base_url = Some(url.to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.default_strategy, "conservative");
        assert_eq!(config.provider_timeout_ms, 10_000);
        assert!(!config.simulation.enabled);
        assert!(config.provider_enabled("openai"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"providers": {"sapling": {"enabled": false}}}"#).unwrap();
        assert_eq!(parsed.default_strategy, "conservative");
        assert!(!parsed.provider_enabled("sapling"));
        assert!(parsed.provider_enabled("gptzero"));
    }

    fn set_key(provider: &str, key: &str) -> ConfigEdit {
        ConfigEdit::SetApiKey { provider: provider.to_string(), key: key.to_string() }
    }

    #[test]
    fn test_apply_edits_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        assert_eq!(store.load().unwrap().default_strategy, "conservative");

        store
            .apply(&[
                set_key("gptzero", " key-1 "),
                ConfigEdit::SetProviderUrl {
                    provider: "gptzero".to_string(),
                    url: "https://detector.example/v1".to_string(),
                },
            ])
            .unwrap();
        assert_eq!(store.load().unwrap().api_keys["gptzero"], "key-1");
        // first save had nothing to back up
        assert!(store.backups().unwrap().is_empty());

        store
            .apply(&[ConfigEdit::DeleteApiKey { provider: "gptzero".to_string() }])
            .unwrap();
        let loaded = store.load().unwrap();
        assert!(loaded.api_keys.is_empty());
        assert_eq!(
            loaded.providers["gptzero"].base_url.as_deref(),
            Some("https://detector.example/v1")
        );

        let backups = store.backups().unwrap();
        assert_eq!(backups.len(), 1);
        let previous: AppConfig =
            serde_json::from_str(&fs::read_to_string(&backups[0]).unwrap()).unwrap();
        assert_eq!(previous.api_keys["gptzero"], "key-1");
    }

    #[test]
    fn test_backups_are_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        for i in 0..(MAX_BACKUPS + 4) {
            store.apply(&[set_key("sapling", &format!("key-{}", i))]).unwrap();
        }
        let backups = store.backups().unwrap();
        assert_eq!(backups.len(), MAX_BACKUPS);

        // newest backup holds the value written just before the last save
        let newest: AppConfig =
            serde_json::from_str(&fs::read_to_string(backups.last().unwrap()).unwrap()).unwrap();
        assert_eq!(newest.api_keys["sapling"], format!("key-{}", MAX_BACKUPS + 2));
    }

    #[test]
    fn test_invalid_edit_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        store.apply(&[set_key("openai", "k")]).unwrap();

        let bad_url = ConfigEdit::SetProviderUrl {
            provider: "openai".to_string(),
            url: "ftp://nope".to_string(),
        };
        assert!(store.apply(&[set_key("openai", "k2"), bad_url]).is_err());
        assert!(store.apply(&[set_key("  ", "k3")]).is_err());
        assert_eq!(store.load().unwrap().api_keys["openai"], "k");
        assert!(store.backups().unwrap().is_empty());
    }

    #[test]
    fn test_describe_hides_key() {
        let edit = set_key("openai", "sk-secret");
        assert_eq!(edit.provider(), "openai");
        assert!(!edit.describe().contains("sk-secret"));
    }
}
