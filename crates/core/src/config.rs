use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Profiled key lookup over an arbitrary variable source.
///
/// With a non-empty profile, `{PROFILE}_{KEY}` is tried first and `{KEY}` is
/// the fallback. Empty values count as unset.
struct Env<'a> {
    profile: &'a str,
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|s| !s.is_empty())
    }

    fn opt(&self, key: &str) -> Option<String> {
        if !self.profile.is_empty() {
            if let Some(v) = self.get(&format!("{}_{}", self.profile, key)) {
                return Some(v);
            }
        }
        self.get(key)
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    fn u16(&self, key: &str, default: u16) -> u16 {
        self.opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    fn u64(&self, key: &str, default: u64) -> u64 {
        self.opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    fn usize(&self, key: &str, default: usize) -> usize {
        self.opt(key)
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(default)
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub storage: StorageConfig,
    pub ingest: IngestConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `PRICEVAULT_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build config from any key/value source. Used by tests to avoid
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let profile = lookup("PRICEVAULT_PROFILE")
            .unwrap_or_default()
            .to_uppercase();
        let env = Env {
            profile: &profile,
            lookup: &lookup,
        };
        Self {
            profile: profile.clone(),
            server: ServerConfig::from_env(&env),
            provider: ProviderConfig::from_env(&env),
            storage: StorageConfig::from_env(&env),
            ingest: IngestConfig::from_env(&env),
        }
    }

    /// Names of required settings that are absent. Empty means the pipeline
    /// may run.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.provider.api_key.is_none() {
            missing.push("ALPHA_VANTAGE_API_KEY");
        }
        if self.storage.url.is_none() {
            missing.push("SUPABASE_URL");
        }
        if self.storage.key.is_none() {
            missing.push("SUPABASE_KEY");
        }
        missing
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:    {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  provider:  base_url={}, output_size={}, api_key={}",
            self.provider.base_url,
            self.provider.output_size,
            presence(&self.provider.api_key)
        );
        tracing::info!(
            "  storage:   url={}, key={}, batch_size={}",
            self.storage.url.as_deref().unwrap_or("(none)"),
            presence(&self.storage.key),
            self.storage.batch_size
        );
        tracing::info!("  ingest:    mode={}", self.ingest.mode);
    }
}

fn presence(secret: &Option<String>) -> &'static str {
    if secret.is_some() { "set" } else { "missing" }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env(env: &Env<'_>) -> Self {
        Self {
            host: env.or("HOST", "0.0.0.0"),
            port: env.u16("PORT", 3000),
        }
    }
}

// ── Market data provider ──────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// "compact" (latest 100 days) or "full".
    pub output_size: String,
    pub timeout_secs: u64,
}

impl ProviderConfig {
    fn from_env(env: &Env<'_>) -> Self {
        let output_size = match env.or("ALPHA_VANTAGE_OUTPUT_SIZE", "compact").as_str() {
            "full" => "full",
            _ => "compact",
        };
        Self {
            api_key: env.opt("ALPHA_VANTAGE_API_KEY"),
            base_url: env
                .or("ALPHA_VANTAGE_BASE_URL", "https://www.alphavantage.co")
                .trim_end_matches('/')
                .to_string(),
            output_size: output_size.to_string(),
            timeout_secs: env.u64("PROVIDER_TIMEOUT_SECS", 30),
        }
    }
}

// ── Storage (Supabase REST) ───────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub url: Option<String>,
    pub key: Option<String>,
    /// Rows per insert request. 1 means one request per record.
    pub batch_size: usize,
    pub timeout_secs: u64,
}

impl StorageConfig {
    fn from_env(env: &Env<'_>) -> Self {
        Self {
            url: env
                .opt("SUPABASE_URL")
                .map(|u| u.trim_end_matches('/').to_string()),
            key: env.opt("SUPABASE_KEY"),
            batch_size: env.usize("STORAGE_BATCH_SIZE", 1),
            timeout_secs: env.u64("STORAGE_TIMEOUT_SECS", 30),
        }
    }
}

// ── Ingestion ─────────────────────────────────────────────────

/// How the coordinator schedules per-symbol jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    /// One task per symbol, all in flight at once.
    #[default]
    Concurrent,
    /// One symbol at a time, in list order.
    Sequential,
}

impl fmt::Display for IngestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestMode::Concurrent => write!(f, "concurrent"),
            IngestMode::Sequential => write!(f, "sequential"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestConfig {
    pub mode: IngestMode,
}

impl IngestConfig {
    fn from_env(env: &Env<'_>) -> Self {
        let mode = match env.or("INGEST_MODE", "concurrent").to_lowercase().as_str() {
            "sequential" => IngestMode::Sequential,
            _ => IngestMode::Concurrent,
        };
        Self { mode }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = config_from(&[]);
        assert_eq!(config.profile_label(), "default");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.provider.base_url, "https://www.alphavantage.co");
        assert_eq!(config.provider.output_size, "compact");
        assert_eq!(config.storage.batch_size, 1);
        assert_eq!(config.ingest.mode, IngestMode::Concurrent);
    }

    #[test]
    fn missing_required_lists_every_absent_setting() {
        let config = config_from(&[]);
        assert_eq!(
            config.missing_required(),
            vec!["ALPHA_VANTAGE_API_KEY", "SUPABASE_URL", "SUPABASE_KEY"]
        );
    }

    #[test]
    fn empty_values_count_as_missing() {
        let config = config_from(&[
            ("ALPHA_VANTAGE_API_KEY", "demo"),
            ("SUPABASE_URL", ""),
            ("SUPABASE_KEY", "service-key"),
        ]);
        assert_eq!(config.missing_required(), vec!["SUPABASE_URL"]);
    }

    #[test]
    fn complete_configuration_has_nothing_missing() {
        let config = config_from(&[
            ("ALPHA_VANTAGE_API_KEY", "demo"),
            ("SUPABASE_URL", "https://abc.supabase.co/"),
            ("SUPABASE_KEY", "service-key"),
        ]);
        assert!(config.missing_required().is_empty());
        assert_eq!(config.storage.url.as_deref(), Some("https://abc.supabase.co"));
    }

    #[test]
    fn profile_prefix_takes_precedence() {
        let config = config_from(&[
            ("PRICEVAULT_PROFILE", "prod"),
            ("SUPABASE_URL", "https://dev.supabase.co"),
            ("PROD_SUPABASE_URL", "https://prod.supabase.co"),
            ("PORT", "8080"),
        ]);
        assert_eq!(config.profile_label(), "PROD");
        assert_eq!(config.storage.url.as_deref(), Some("https://prod.supabase.co"));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn parses_mode_and_tuning_knobs() {
        let config = config_from(&[
            ("INGEST_MODE", "Sequential"),
            ("ALPHA_VANTAGE_OUTPUT_SIZE", "full"),
            ("STORAGE_BATCH_SIZE", "250"),
            ("PROVIDER_TIMEOUT_SECS", "5"),
        ]);
        assert_eq!(config.ingest.mode, IngestMode::Sequential);
        assert_eq!(config.provider.output_size, "full");
        assert_eq!(config.storage.batch_size, 250);
        assert_eq!(config.provider.timeout_secs, 5);
    }

    #[test]
    fn zero_batch_size_falls_back_to_default() {
        let config = config_from(&[("STORAGE_BATCH_SIZE", "0")]);
        assert_eq!(config.storage.batch_size, 1);
    }
}
