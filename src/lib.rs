pub mod models;
pub mod services;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;

use services::{
    get_api_key, get_provider_url, AppConfig, ConfigStore, ConsensusEngine, ContentAnalyzer,
    HttpDetector, ShieldError, SimulatedDetector, StrategyRegistry, KNOWN_PROVIDERS,
};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_PREFIX: &str = "content_shield_";
const KEEP_LOGS: usize = 30;

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    )
}

/// Initialize logging with a timestamped log file per run.
/// Console output goes to stderr so stdout stays clean for JSON.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if env_flag("CONTENT_SHIELD_DISABLE_FILE_LOG") {
        init_console_only_logging(env_filter);
        info!("File logging disabled via CONTENT_SHIELD_DISABLE_FILE_LOG");
        return;
    }

    let logs_dir = match std::env::var("CONTENT_SHIELD_LOG_DIR") {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => get_logs_dir(),
    };

    if let Err(e) = fs::create_dir_all(&logs_dir) {
        eprintln!("Failed to create logs directory: {}", e);
        init_console_only_logging(env_filter);
        info!("Falling back to console-only logging (log dir not writable)");
        return;
    }

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_filename = format!("{}{}.log", LOG_PREFIX, timestamp);

    let file_appender = rolling::never(&logs_dir, &log_filename);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(file_guard);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    info!("=== Content Shield Started ===");
    info!("Log file: {}/{}", logs_dir.display(), log_filename);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    std::thread::spawn(move || {
        cleanup_old_logs(&logs_dir, KEEP_LOGS);
    });
}

fn get_logs_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        return data_dir.join("content-shield").join("logs");
    }
    PathBuf::from("logs")
}

fn cleanup_old_logs(logs_dir: &Path, keep: usize) {
    let mut entries: Vec<_> = match fs::read_dir(logs_dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
        Err(_) => return,
    };

    entries.retain(|e| {
        let name = e.file_name().to_string_lossy().to_string();
        name.starts_with(LOG_PREFIX) && name.ends_with(".log")
    });

    if entries.len() <= keep {
        return;
    }

    entries.sort_by_key(|e| {
        e.metadata()
            .and_then(|m| m.modified())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
    });

    let remove_count = entries.len().saturating_sub(keep);
    for entry in entries.into_iter().take(remove_count) {
        let _ = fs::remove_file(entry.path());
    }
}

fn init_console_only_logging(env_filter: EnvFilter) {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();
}

/// Config store rooted at `dir`, or at the default config dir.
pub fn open_config_store(dir: Option<PathBuf>) -> Result<ConfigStore, ShieldError> {
    let dir = match dir {
        Some(d) => d,
        None => ConfigStore::default_config_dir()
            .ok_or_else(|| ShieldError::Config("cannot determine config directory".to_string()))?,
    };
    Ok(ConfigStore::new(dir))
}

/// Load config, apply env overrides and reject unusable values.
pub fn load_config(dir: Option<PathBuf>) -> Result<AppConfig, ShieldError> {
    let store = open_config_store(dir)?;
    let mut config = store.load().map_err(ShieldError::Config)?;
    config.apply_env_overrides();
    if config.provider_timeout_ms == 0 {
        return Err(ShieldError::Config(format!(
            "providerTimeoutMs must be greater than 0 in {}",
            store.config_file().display()
        )));
    }
    Ok(config)
}

/// Build the engine and analyzer from config.
///
/// With simulation enabled every known provider gets a seeded
/// `SimulatedDetector`. Otherwise an `HttpDetector` is registered for each
/// enabled provider that has both an endpoint and a key; the rest stay
/// unregistered and show up as unavailable in consensus results.
pub fn build_analyzer(config: &AppConfig) -> Result<ContentAnalyzer, ShieldError> {
    let registry = StrategyRegistry::with_extra(config.strategies.clone())?;
    let timeout = Duration::from_millis(config.provider_timeout_ms);
    let mut engine = ConsensusEngine::new(Arc::new(registry), timeout);

    if config.simulation.enabled {
        for id in KNOWN_PROVIDERS {
            engine.register(Arc::new(SimulatedDetector::new(id, config.simulation.seed)));
        }
        info!(seed = config.simulation.seed, "[PROVIDER] Simulation mode: {} providers", KNOWN_PROVIDERS.len());
    } else {
        let mut ids: Vec<&str> = KNOWN_PROVIDERS.to_vec();
        for id in config.providers.keys() {
            if !ids.contains(&id.as_str()) {
                ids.push(id.as_str());
            }
        }

        for id in ids {
            if !config.provider_enabled(id) {
                info!(provider = id, "[PROVIDER] Disabled in config");
                continue;
            }
            let (url, key) = match (get_provider_url(id, config), get_api_key(id, config)) {
                (Some(url), Some(key)) => (url, key),
                (url, key) => {
                    warn!(
                        provider = id,
                        has_url = url.is_some(),
                        has_key = key.is_some(),
                        "[PROVIDER] Not configured, skipping"
                    );
                    continue;
                }
            };
            let model = config.providers.get(id).and_then(|p| p.model.clone());
            match HttpDetector::new(id, &url, &key, model, timeout) {
                Ok(detector) => {
                    info!(provider = id, url = detector.url(), "[PROVIDER] Registered HTTP detector");
                    engine.register(Arc::new(detector));
                }
                Err(e) => warn!(provider = id, "[PROVIDER] Failed to build detector: {}", e),
            }
        }
    }

    ContentAnalyzer::new(engine).with_default_strategy(&config.default_strategy)
}
