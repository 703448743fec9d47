use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub alerting: AlertingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
    /// Defaults to `<path>.lock`
    pub lock_path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Json,
            path: default_state_path(),
            lock_path: None,
        }
    }
}

impl StorageConfig {
    pub fn lock_path(&self) -> PathBuf {
        match &self.lock_path {
            Some(p) => p.clone(),
            None => {
                let mut name = self.path.clone().into_os_string();
                name.push(".lock");
                PathBuf::from(name)
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ThresholdConfig {
    #[serde(default)]
    pub corridor: CorridorThresholds,
    #[serde(default)]
    pub liquidity: LiquidityThresholds,
    #[serde(default)]
    pub repo: RepoThresholds,
    #[serde(default)]
    pub curve: CurveThresholds,
    #[serde(default)]
    pub dollar: DollarThresholds,
    #[serde(default)]
    pub momentum: MomentumThresholds,
}

/// Axis A, in percentage points
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CorridorThresholds {
    /// |SOFR - EFFR| above this is a breach
    #[serde(default = "default_corridor_wide")]
    pub wide: f64,
    /// IORB - EFFR strictly below this is abutment
    #[serde(default = "default_corridor_tight")]
    pub tight: f64,
}

impl Default for CorridorThresholds {
    fn default() -> Self {
        Self { wide: 0.10, tight: 0.02 }
    }
}

/// Axis B, in each series' native units per run
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct LiquidityThresholds {
    #[serde(default = "default_rrp_flow")]
    pub rrp_flow: f64,
    #[serde(default = "default_tga_flow")]
    pub tga_flow: f64,
    #[serde(default = "default_reserves_flow")]
    pub reserves_flow: f64,
}

impl Default for LiquidityThresholds {
    fn default() -> Self {
        Self { rrp_flow: 50.0, tga_flow: 50_000.0, reserves_flow: 50.0 }
    }
}

/// Axis C, in percentage points
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct RepoThresholds {
    #[serde(default = "default_repo_wide")]
    pub wide: f64,
    #[serde(default)]
    pub tight: f64,
}

impl Default for RepoThresholds {
    fn default() -> Self {
        Self { wide: 0.05, tight: 0.0 }
    }
}

/// Axis D, per-run yield change in percentage points
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CurveThresholds {
    #[serde(default = "default_curve_move")]
    pub front_end: f64,
    #[serde(default = "default_curve_move")]
    pub long_end: f64,
}

impl Default for CurveThresholds {
    fn default() -> Self {
        Self { front_end: 0.10, long_end: 0.10 }
    }
}

/// Axis E, per-run index change
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct DollarThresholds {
    #[serde(default = "default_dollar_change")]
    pub change: f64,
}

impl Default for DollarThresholds {
    fn default() -> Self {
        Self { change: 0.50 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct MomentumThresholds {
    #[serde(default = "default_return_pct")]
    pub return_pct: f64,
    #[serde(default = "default_vol_z")]
    pub vol_z: f64,
}

impl Default for MomentumThresholds {
    fn default() -> Self {
        Self { return_pct: 0.3, vol_z: 1.5 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SignalConfig {
    /// Consecutive same-direction runs before a distortion counts as sustained
    #[serde(default = "default_sustained_runs")]
    pub sustained_runs: u32,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self { sustained_runs: 3 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_true")]
    pub include_axis_values: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { title: default_title(), include_axis_values: true }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    #[serde(default)]
    pub fred: FredConfig,
    #[serde(default)]
    pub crypto: CryptoConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FredConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Empty key disables the collector's requests; every FRED metric reads as unavailable
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_fred_url")]
    pub base_url: String,
    #[serde(default = "default_fred_timeout")]
    pub timeout_secs: u64,
}

impl Default for FredConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            base_url: default_fred_url(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CryptoConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_crypto_url")]
    pub base_url: String,
    #[serde(default = "default_kline_interval")]
    pub interval: String,
    #[serde(default = "default_kline_window")]
    pub window: u32,
    #[serde(default = "default_crypto_timeout")]
    pub timeout_secs: u64,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_crypto_url(),
            interval: default_kline_interval(),
            window: 48,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AlertingConfig {
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default = "default_telegram_url")]
    pub api_url: String,
    #[serde(default = "default_send_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub url: String,
    #[serde(default)]
    pub headers: std::collections::HashMap<String, String>,
    #[serde(default = "default_send_timeout")]
    pub timeout_secs: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        // Expand environment variables
        let expanded = expand_env_vars(content)?;

        let config: Config = toml::from_str(&expanded)
            .with_context(|| "Failed to parse configuration")?;

        if config.signal.sustained_runs == 0 {
            anyhow::bail!("signal.sustained_runs must be at least 1");
        }

        Ok(config)
    }
}

/// Expand ${ENV_VAR} references in config string
fn expand_env_vars(input: &str) -> Result<String> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")?;
    Ok(re
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_default()
        })
        .to_string())
}

// Default value functions
fn default_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
fn default_log_level() -> String { "info".to_string() }
fn default_state_path() -> PathBuf { PathBuf::from("/tmp/canary_state.json") }
fn default_true() -> bool { true }
fn default_corridor_wide() -> f64 { 0.10 }
fn default_corridor_tight() -> f64 { 0.02 }
fn default_rrp_flow() -> f64 { 50.0 }
fn default_tga_flow() -> f64 { 50_000.0 }
fn default_reserves_flow() -> f64 { 50.0 }
fn default_repo_wide() -> f64 { 0.05 }
fn default_curve_move() -> f64 { 0.10 }
fn default_dollar_change() -> f64 { 0.50 }
fn default_return_pct() -> f64 { 0.3 }
fn default_vol_z() -> f64 { 1.5 }
fn default_sustained_runs() -> u32 { 3 }
fn default_title() -> String { "Liquidity Canary".to_string() }
fn default_fred_url() -> String { "https://api.stlouisfed.org/fred/series/observations".to_string() }
fn default_fred_timeout() -> u64 { 10 }
fn default_crypto_url() -> String { "https://api.binance.com/api/v3".to_string() }
fn default_kline_interval() -> String { "1h".to_string() }
fn default_kline_window() -> u32 { 48 }
fn default_crypto_timeout() -> u64 { 15 }
fn default_telegram_url() -> String { "https://api.telegram.org".to_string() }
fn default_send_timeout() -> u64 { 10 }
