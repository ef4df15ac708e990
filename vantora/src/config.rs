use crate::error::AppError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vantora_instrument::{Category, Environment, Symbol};
use vantora_risk::RiskLimits;
use vantora_strategy::SignalEngineConfig;

/// Trading mode resolved from `VANTORA_MODE`. `Paper` and `Live` both run the full pipeline;
/// only the OMS's exchange implementation differs between them. `Halt` starts the process
/// with trading already stopped, useful for maintenance windows.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RunMode {
    Paper,
    Live,
    Halt,
}

impl RunMode {
    fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.to_ascii_lowercase().as_str() {
            "paper" => Ok(RunMode::Paper),
            "live" => Ok(RunMode::Live),
            "halt" => Ok(RunMode::Halt),
            other => Err(AppError::ConfigInvalid(format!("VANTORA_MODE must be paper|live|halt, got {other}"))),
        }
    }

    pub fn environment(self) -> Environment {
        match self {
            RunMode::Live => Environment::Live,
            RunMode::Paper | RunMode::Halt => Environment::Demo,
        }
    }

    /// The circuit mode a reset should return to: whatever mode the process was configured to
    /// run in, `Halt` only ever reached through an explicit operator or circuit trip.
    pub fn circuit_mode(self) -> vantora_risk::CircuitMode {
        match self {
            RunMode::Live => vantora_risk::CircuitMode::Live,
            RunMode::Paper => vantora_risk::CircuitMode::Paper,
            RunMode::Halt => vantora_risk::CircuitMode::Halt,
        }
    }
}

/// TOML overlay loaded from `config/<mode>.toml`, optional; every field falls back to the
/// environment-derived or built-in default when the file or field is absent.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    signal_engine: Option<SignalEngineConfig>,
    heartbeat_interval_secs: Option<u64>,
    checkpoint_interval_secs: Option<u64>,
}

/// Single validated, immutable configuration resolved once at startup from environment
/// variables plus an optional TOML file. Every other component receives its slice of this
/// structure as an explicit dependency; nothing reads the environment again after boot.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mode: RunMode,
    pub api_key: String,
    pub api_secret: String,
    pub recv_window_ms: u64,
    pub symbols: Vec<Symbol>,
    pub risk_limits: RiskLimits,
    pub signal_engine: SignalEngineConfig,
    pub opening_equity: Decimal,
    pub auto_trader_enabled: bool,
    pub http_bind: String,
    pub journal_path: PathBuf,
    pub checkpoint_interval: Duration,
    pub heartbeat_interval: Duration,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env_var(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| AppError::ConfigInvalid(format!("{name} is not a valid value: {raw}"))),
    }
}

fn default_signal_engine() -> SignalEngineConfig {
    SignalEngineConfig {
        model_weights: vec![
            ("trend".to_string(), dec!(0.40)),
            ("momentum".to_string(), dec!(0.35)),
            ("mean-reversion".to_string(), dec!(0.25)),
        ],
        min_agree_count: None,
        confidence_threshold: dec!(0.70),
        model_latency_budget_ms: 1000,
    }
}

impl AppConfig {
    /// Resolves configuration from the process environment plus an optional
    /// `config/<mode>.toml` overlay. Never panics: every malformed field surfaces as
    /// [`AppError::ConfigInvalid`].
    pub fn resolve() -> Result<Self, AppError> {
        let mode_raw = env_var("VANTORA_MODE").unwrap_or_else(|| "paper".to_string());
        let mode = RunMode::parse(&mode_raw)?;

        let file = load_config_file(&format!("config/{mode_raw}.toml"))?;

        let api_key = env_var("VANTORA_API_KEY").unwrap_or_default();
        let api_secret = env_var("VANTORA_API_SECRET").unwrap_or_default();
        if mode == RunMode::Live && (api_key.is_empty() || api_secret.is_empty()) {
            return Err(AppError::ConfigInvalid("VANTORA_API_KEY and VANTORA_API_SECRET are required in live mode".to_string()));
        }

        let symbols_raw = env_var("VANTORA_SYMBOLS").unwrap_or_else(|| "BTCUSDT".to_string());
        let symbols: Vec<Symbol> = symbols_raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|code| Symbol::new(code, Category::Linear))
            .collect();
        if symbols.is_empty() {
            return Err(AppError::ConfigInvalid("VANTORA_SYMBOLS must name at least one symbol".to_string()));
        }

        let risk_limits = RiskLimits {
            max_positions: parse_env("VANTORA_MAX_POSITIONS", RiskLimits::default().max_positions)?,
            per_symbol_cap_usd: parse_env("VANTORA_PER_SYMBOL_CAP_USD", RiskLimits::default().per_symbol_cap_usd)?,
            portfolio_cap_fraction_of_equity: RiskLimits::default().portfolio_cap_fraction_of_equity,
            daily_loss_limit_pct: parse_env("VANTORA_DAILY_LOSS_LIMIT_PCT", RiskLimits::default().daily_loss_limit_pct)?,
            var_limit_pct: parse_env("VANTORA_VAR_LIMIT_PCT", RiskLimits::default().var_limit_pct)?,
            confidence_threshold: parse_env("VANTORA_CONFIDENCE_THRESHOLD", RiskLimits::default().confidence_threshold)?,
            max_risk_per_trade: RiskLimits::default().max_risk_per_trade,
            stop_loss_pct: parse_env("VANTORA_STOP_LOSS_PCT", RiskLimits::default().stop_loss_pct)?,
            take_profit_pct: parse_env("VANTORA_TAKE_PROFIT_PCT", RiskLimits::default().take_profit_pct)?,
        };

        let mut signal_engine = file.signal_engine.unwrap_or_else(default_signal_engine);
        signal_engine.confidence_threshold = risk_limits.confidence_threshold;
        signal_engine.to_consensus_config().map_err(|e| AppError::ConfigInvalid(e.to_string()))?;

        let opening_equity: Decimal = parse_env("VANTORA_OPENING_EQUITY", Decimal::new(10_000, 0))?;
        let recv_window_ms: u64 = parse_env("VANTORA_RECV_WINDOW_MS", 5_000)?;
        let auto_trader_enabled: bool = parse_env("VANTORA_AUTO_TRADER_ENABLED", mode != RunMode::Halt)?;
        let http_bind = env_var("VANTORA_HTTP_BIND").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let journal_path = env_var("VANTORA_JOURNAL_PATH").unwrap_or_else(|| "data/journal.ndjson".to_string()).into();

        Ok(Self {
            mode,
            api_key,
            api_secret,
            recv_window_ms,
            symbols,
            risk_limits,
            signal_engine,
            opening_equity,
            auto_trader_enabled,
            http_bind,
            journal_path,
            checkpoint_interval: Duration::from_secs(file.checkpoint_interval_secs.unwrap_or(60)),
            heartbeat_interval: Duration::from_secs(file.heartbeat_interval_secs.unwrap_or(20)),
        })
    }

    pub fn strategy_id(&self) -> &'static str {
        "vantora-ensemble-v1"
    }
}

fn load_config_file(path: impl AsRef<Path>) -> Result<ConfigFile, AppError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::ConfigInvalid(format!("failed to read {}: {e}", path.display())))?;
    toml::from_str(&contents).map_err(|e| AppError::ConfigInvalid(format!("failed to parse {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_mode_rejects_unknown_values() {
        assert!(RunMode::parse("nope").is_err());
        assert_eq!(RunMode::parse("paper").unwrap(), RunMode::Paper);
    }

    #[test]
    fn default_signal_engine_weights_sum_to_one_and_validate() {
        let engine = default_signal_engine();
        assert!(engine.to_consensus_config().is_ok());
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let file = load_config_file("config/does-not-exist.toml").unwrap();
        assert!(file.signal_engine.is_none());
    }
}
