//! Runtime configuration
//!
//! Every knob has a default taken from the production deployment and can be
//! overridden through an environment variable. A malformed value is an error,
//! never a silent fallback to the default.

use chrono::Duration;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use swarm_core::{Direction, Side, Symbol, Timeframe};
use swarm_execution::{ExecutionConfig, WatchdogConfig};
use swarm_notify::NotifyConfig;
use swarm_risk::{PlannerConfig, VolatilityEstimator};
use swarm_signals::{ClusterParams, ConfluenceConfig};
use thiserror::Error;

use crate::payload::SymbolStyle;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Missing value for {0}")]
    Missing(&'static str),
}

/// How a signal direction maps to an entry side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectionPolicy {
    /// UP opens a long, DOWN opens a short
    #[default]
    Follow,
    /// UP opens a short, DOWN opens a long
    Contrarian,
}

impl DirectionPolicy {
    pub fn side_for(&self, direction: Direction) -> Side {
        match self {
            DirectionPolicy::Follow => Side::following(direction),
            DirectionPolicy::Contrarian => Side::following(direction).opposite(),
        }
    }
}

impl FromStr for DirectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "follow" => Ok(DirectionPolicy::Follow),
            "contrarian" => Ok(DirectionPolicy::Contrarian),
            other => Err(format!("expected follow or contrarian, got {}", other)),
        }
    }
}

impl fmt::Display for DirectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectionPolicy::Follow => f.write_str("follow"),
            DirectionPolicy::Contrarian => f.write_str("contrarian"),
        }
    }
}

/// Trading switches and sizing
#[derive(Debug, Clone)]
pub struct TradingConfig {
    /// Master switch; nothing reaches the exchange when false
    pub enabled: bool,
    /// Trade single signals that carry an entry price
    pub individual_enabled: bool,
    pub direction_policy: DirectionPolicy,
    /// Instrument traded on a cluster; the trigger symbol when `None`
    pub cluster_symbol: Option<Symbol>,
    /// Process-wide pause between two individual-signal trades
    pub individual_cooldown: Duration,
    pub planner: PlannerConfig,
    pub estimator: VolatilityEstimator,
    pub execution: ExecutionConfig,
    pub watchdog: WatchdogConfig,
    /// Queued intents before new ones are skipped
    pub queue_capacity: usize,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            individual_enabled: false,
            direction_policy: DirectionPolicy::Follow,
            cluster_symbol: None,
            individual_cooldown: Duration::seconds(180),
            planner: PlannerConfig::default(),
            estimator: VolatilityEstimator::default(),
            execution: ExecutionConfig::default(),
            watchdog: WatchdogConfig::default(),
            queue_capacity: 64,
        }
    }
}

/// Telegram Bot API credentials
#[derive(Clone, PartialEq, Eq)]
pub struct TelegramCredentials {
    pub token: String,
    pub chat_id: String,
}

impl fmt::Debug for TelegramCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramCredentials")
            .field("token", &"***")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Complete swarm configuration
#[derive(Debug, Clone)]
pub struct SwarmConfig {
    /// Timeframes evaluated for clusters
    pub cluster_timeframes: Vec<Timeframe>,
    pub cluster: ClusterParams,
    /// Cluster evaluation period (woken early by new signals)
    pub check_interval: std::time::Duration,
    /// Duplicate-delivery window
    pub dedup_window: Duration,
    /// Hard cap per signal window
    pub window_capacity: usize,
    pub confluence: ConfluenceConfig,
    pub trading: TradingConfig,
    pub notify: NotifyConfig,
    pub telegram: Option<TelegramCredentials>,
    pub symbol_style: SymbolStyle,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            cluster_timeframes: vec![Timeframe::M15],
            cluster: ClusterParams::default(),
            check_interval: std::time::Duration::from_secs(60),
            dedup_window: Duration::seconds(5),
            window_capacity: swarm_signals::window::DEFAULT_WINDOW_CAPACITY,
            confluence: ConfluenceConfig::default(),
            trading: TradingConfig::default(),
            notify: NotifyConfig::default(),
            telegram: None,
            symbol_style: SymbolStyle::Plain,
        }
    }
}

impl SwarmConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup: &lookup };
        let mut config = Self::default();

        config.cluster_timeframes = env.list("VALID_TF", config.cluster_timeframes)?;
        if config.cluster_timeframes.is_empty() {
            return Err(ConfigError::Missing("VALID_TF"));
        }

        let window = env.minutes("CLUSTER_WINDOW_MIN", 60)?;
        if window.is_zero() {
            return Err(ConfigError::Invalid {
                key: "CLUSTER_WINDOW_MIN",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let threshold: usize = env.parse("CLUSTER_THRESHOLD", config.cluster.threshold)?;
        if threshold == 0 {
            return Err(ConfigError::Invalid {
                key: "CLUSTER_THRESHOLD",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        config.trading.enabled = env.flag("TRADE_ENABLED", false)?;
        config.cluster = ClusterParams {
            threshold,
            window,
            notify_cooldown: env.seconds("CLUSTER_COOLDOWN_SEC", 300)?,
            trade_cooldown: env.seconds("TRADE_COOLDOWN_SEC", 1800)?,
            trade_confirm_delay: env.seconds("TRADE_CONFIRM_SEC", 0)?,
            trading_enabled: config.trading.enabled,
        };

        config.check_interval =
            std::time::Duration::from_secs(env.parse("CHECK_INTERVAL_SEC", 60u64)?.max(1));
        config.dedup_window = env.seconds("DEDUP_WINDOW_SEC", 5)?;
        config.window_capacity = env.parse("WINDOW_CAPACITY", config.window_capacity)?;

        let confluence_tfs: Vec<Timeframe> = env.list("CONFLUENCE_TF", Vec::new())?;
        config.confluence = ConfluenceConfig::default()
            .with_window(env.seconds("CONFLUENCE_WINDOW_SEC", 600)?);
        match confluence_tfs.as_slice() {
            [] => {}
            [a, b] => config.confluence = config.confluence.with_pair(*a, *b),
            _ => {
                return Err(ConfigError::Invalid {
                    key: "CONFLUENCE_TF",
                    value: format!("{:?}", confluence_tfs),
                    reason: "expected exactly two timeframes".to_string(),
                });
            }
        }

        config.trading.individual_enabled = env.flag("INDIVIDUAL_TRADE_ENABLED", false)?;
        config.trading.direction_policy = env.parse("DIRECTION_POLICY", DirectionPolicy::Follow)?;
        config.trading.cluster_symbol = env.optional("CLUSTER_TRADE_SYMBOL");
        config.trading.individual_cooldown = env.seconds("GLOBAL_TRADE_COOLDOWN_SEC", 180)?;
        config.trading.planner = PlannerConfig::default()
            .with_risk_budget(env.parse("MAX_RISK_USDT", Decimal::ONE)?)
            .with_stop(
                env.parse("BASE_SL_PCT", config.trading.planner.base_stop_pct)?,
                env.parse("RR_RATIO", config.trading.planner.reward_ratio)?,
            );

        config.notify = config
            .notify
            .with_max_per_minute(env.parse("NOTIFY_MAX_PER_MIN", config.notify.max_per_minute)?);
        config.telegram = match (env.optional("TELEGRAM_TOKEN"), env.optional("CHAT_ID")) {
            (Some(token), Some(chat_id)) => Some(TelegramCredentials { token, chat_id }),
            _ => None,
        };
        config.symbol_style = env.parse("SYMBOL_STYLE", SymbolStyle::Plain)?;

        Ok(config)
    }

    /// Every timeframe that needs a signal window
    pub fn tracked_timeframes(&self) -> Vec<Timeframe> {
        let mut tracked = self.cluster_timeframes.clone();
        for (a, b) in &self.confluence.pairs {
            tracked.extend([*a, *b]);
        }
        tracked.sort();
        tracked.dedup();
        tracked
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        }
    }

    fn seconds(&self, key: &'static str, default: i64) -> Result<Duration, ConfigError> {
        self.duration(key, default, Duration::try_seconds)
    }

    fn minutes(&self, key: &'static str, default: i64) -> Result<Duration, ConfigError> {
        self.duration(key, default, Duration::try_minutes)
    }

    /// Non-negative duration that fits in a `chrono::Duration`
    fn duration(
        &self,
        key: &'static str,
        default: i64,
        build: fn(i64) -> Option<Duration>,
    ) -> Result<Duration, ConfigError> {
        let amount: i64 = self.parse(key, default)?;
        let invalid = |reason: &str| ConfigError::Invalid {
            key,
            value: amount.to_string(),
            reason: reason.to_string(),
        };
        if amount < 0 {
            return Err(invalid("must not be negative"));
        }
        build(amount).ok_or_else(|| invalid("out of range"))
    }

    fn flag(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(key) {
            None => Ok(default),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Invalid {
                    key,
                    value,
                    reason: "expected true or false".to_string(),
                }),
            },
        }
    }

    fn list<T>(&self, key: &'static str, default: Vec<T>) -> Result<Vec<T>, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let Some(value) = self.optional(key) else {
            return Ok(default);
        };
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                item.parse().map_err(|e: T::Err| ConfigError::Invalid {
                    key,
                    value: value.clone(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<SwarmConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SwarmConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = load(&[]).unwrap();
        assert_eq!(config.cluster_timeframes, vec![Timeframe::M15]);
        assert_eq!(config.cluster.threshold, 6);
        assert_eq!(config.cluster.window, Duration::minutes(60));
        assert_eq!(config.cluster.notify_cooldown, Duration::seconds(300));
        assert_eq!(config.check_interval, std::time::Duration::from_secs(60));
        assert!(!config.trading.enabled);
        assert_eq!(config.trading.planner.risk_budget, dec!(1));
        assert_eq!(config.trading.planner.base_stop_pct, dec!(0.003));
        assert_eq!(config.trading.planner.reward_ratio, dec!(2.4));
        assert!(config.telegram.is_none());
        assert!(!config.confluence.is_enabled());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("VALID_TF", "5m, 15m"),
            ("CLUSTER_THRESHOLD", "4"),
            ("TRADE_ENABLED", "true"),
            ("DIRECTION_POLICY", "contrarian"),
            ("MAX_RISK_USDT", "2.5"),
            ("CONFLUENCE_TF", "3m,5m"),
            ("TELEGRAM_TOKEN", "123:abc"),
            ("CHAT_ID", "42"),
            ("SYMBOL_STYLE", "okx-swap"),
        ])
        .unwrap();

        assert_eq!(config.cluster_timeframes, vec![Timeframe::M5, Timeframe::M15]);
        assert_eq!(config.cluster.threshold, 4);
        assert!(config.cluster.trading_enabled);
        assert_eq!(config.trading.direction_policy, DirectionPolicy::Contrarian);
        assert_eq!(config.trading.planner.risk_budget, dec!(2.5));
        assert_eq!(config.confluence.pairs, vec![(Timeframe::M3, Timeframe::M5)]);
        assert_eq!(config.symbol_style, SymbolStyle::OkxSwap);
        assert_eq!(
            config.tracked_timeframes(),
            vec![Timeframe::M3, Timeframe::M5, Timeframe::M15]
        );
        assert_eq!(config.telegram.unwrap().chat_id, "42");
    }

    #[test]
    fn test_malformed_values_are_errors() {
        assert!(matches!(
            load(&[("CLUSTER_THRESHOLD", "six")]),
            Err(ConfigError::Invalid { key: "CLUSTER_THRESHOLD", .. })
        ));
        assert!(load(&[("TRADE_ENABLED", "maybe")]).is_err());
        assert!(load(&[("VALID_TF", "7m")]).is_err());
        assert!(load(&[("CONFLUENCE_TF", "3m")]).is_err());
        assert!(load(&[("CLUSTER_THRESHOLD", "0")]).is_err());
    }

    #[test]
    fn test_out_of_range_durations_are_errors() {
        assert!(matches!(
            load(&[("CLUSTER_WINDOW_MIN", "999999999999999999")]),
            Err(ConfigError::Invalid { key: "CLUSTER_WINDOW_MIN", .. })
        ));
        assert!(matches!(
            load(&[("CLUSTER_WINDOW_MIN", "-5")]),
            Err(ConfigError::Invalid { key: "CLUSTER_WINDOW_MIN", .. })
        ));
        assert!(load(&[("CLUSTER_WINDOW_MIN", "0")]).is_err());
        assert!(matches!(
            load(&[("TRADE_COOLDOWN_SEC", "-1")]),
            Err(ConfigError::Invalid { key: "TRADE_COOLDOWN_SEC", .. })
        ));
        assert!(load(&[("DEDUP_WINDOW_SEC", "9223372036854775807")]).is_err());

        // Zero cooldowns are allowed
        let config = load(&[("TRADE_CONFIRM_SEC", "0"), ("CLUSTER_COOLDOWN_SEC", "0")]).unwrap();
        assert!(config.cluster.notify_cooldown.is_zero());
    }

    #[test]
    fn test_direction_policy_mapping() {
        assert_eq!(DirectionPolicy::Follow.side_for(Direction::Up), Side::Buy);
        assert_eq!(DirectionPolicy::Contrarian.side_for(Direction::Up), Side::Sell);
        assert_eq!(DirectionPolicy::Contrarian.side_for(Direction::Down), Side::Buy);
    }

    #[test]
    fn test_telegram_token_is_redacted() {
        let creds = TelegramCredentials {
            token: "secret".to_string(),
            chat_id: "42".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("secret"));
    }
}
