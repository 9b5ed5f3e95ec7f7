//! Alert payload normalization
//!
//! Alert sources disagree on key casing and field names (`tf` vs
//! `timeframe`, `sl` vs `stop`) and send numbers either as JSON numbers or as
//! strings. [`AlertPayload`] absorbs those differences and produces a
//! [`Signal`]; anything it cannot make sense of is a [`ValidationError`].
//!
//! The alert `type` picks the route:
//!
//! | type       | route                | notes                                  |
//! |------------|----------------------|----------------------------------------|
//! | (absent)   | every enabled path   |                                        |
//! | `MTF`      | cluster windows      |                                        |
//! | `SCALP`    | individual trading   | `tf` defaults to 1m                    |
//! | `3WAVESUP` | confluence           | direction is UP, `time` (ms) required  |

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use chrono::{TimeZone, Utc};
use swarm_core::{Direction, Price, Signal, SignalKind, Symbol, Timeframe, Timestamp};
use swarm_signals::ValidationError;

/// How tickers are written for the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolStyle {
    /// `OKX:ETHUSDT.P` -> `ETHUSDT`
    #[default]
    Plain,
    /// `OKX:ETHUSDT.P` -> `ETH-USDT-SWAP`
    OkxSwap,
}

impl FromStr for SymbolStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(SymbolStyle::Plain),
            "okx-swap" | "okx_swap" | "okx" => Ok(SymbolStyle::OkxSwap),
            other => Err(format!("expected plain or okx-swap, got {}", other)),
        }
    }
}

impl fmt::Display for SymbolStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolStyle::Plain => f.write_str("plain"),
            SymbolStyle::OkxSwap => f.write_str("okx-swap"),
        }
    }
}

/// Strip the exchange prefix and perpetual suffix, then apply `style`
pub fn normalize_ticker(raw: &str, style: SymbolStyle) -> Symbol {
    let mut ticker = raw.trim().to_ascii_uppercase();
    if let Some((_, rest)) = ticker.split_once(':') {
        ticker = rest.to_string();
    }
    if let Some(stripped) = ticker.strip_suffix(".P") {
        ticker = stripped.to_string();
    }

    match style {
        SymbolStyle::Plain => ticker,
        SymbolStyle::OkxSwap => {
            if ticker.ends_with("-SWAP") {
                return ticker;
            }
            match ticker.strip_suffix("USDT") {
                Some(base) if !base.is_empty() => format!("{}-USDT-SWAP", base.trim_end_matches('-')),
                _ => ticker,
            }
        }
    }
}

/// Alert JSON as sent by the charting platform
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertPayload {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(alias = "symbol")]
    pub ticker: Option<String>,
    #[serde(alias = "side", alias = "signal")]
    pub direction: Option<String>,
    #[serde(alias = "timeframe", alias = "interval")]
    pub tf: Option<Value>,
    #[serde(alias = "price")]
    pub entry: Option<Value>,
    #[serde(alias = "sl")]
    pub stop: Option<Value>,
    #[serde(alias = "tp")]
    pub target: Option<Value>,
    pub message: Option<String>,
    /// Bar time in epoch milliseconds
    #[serde(alias = "bar_time")]
    pub time: Option<Value>,
}

impl AlertPayload {
    /// Parse one alert body; keys are matched case-insensitively
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_str(raw).map_err(|e| ValidationError::InvalidField {
            field: "payload",
            value: e.to_string(),
        })?;
        let Value::Object(map) = value else {
            return Err(ValidationError::InvalidField {
                field: "payload",
                value: "expected a JSON object".to_string(),
            });
        };

        let lowered: serde_json::Map<String, Value> = map
            .into_iter()
            .map(|(key, value)| (key.trim().to_ascii_lowercase(), value))
            .collect();

        serde_json::from_value(Value::Object(lowered)).map_err(|e| ValidationError::InvalidField {
            field: "payload",
            value: e.to_string(),
        })
    }

    /// Build the signal received at `received_at`
    pub fn into_signal(
        self,
        received_at: Timestamp,
        style: SymbolStyle,
    ) -> Result<Signal, ValidationError> {
        let kind = match non_empty(self.kind.clone()) {
            None => SignalKind::Generic,
            Some(raw) => match raw.to_ascii_uppercase().as_str() {
                "MTF" => SignalKind::Cluster,
                "SCALP" => SignalKind::Scalp,
                "3WAVESUP" => SignalKind::Waves,
                _ => {
                    return Err(ValidationError::InvalidField {
                        field: "type",
                        value: raw,
                    });
                }
            },
        };

        let ticker = non_empty(self.ticker).ok_or(ValidationError::MissingField("ticker"))?;
        let direction_raw = match (kind, non_empty(self.direction)) {
            (SignalKind::Waves, _) => Direction::Up.to_string(),
            (_, Some(raw)) => raw,
            (_, None) => return Err(ValidationError::MissingField("direction")),
        };
        let timeframe_raw = match (kind, self.tf.as_ref().and_then(scalar_text)) {
            (_, Some(raw)) => raw,
            (SignalKind::Scalp, None) => Timeframe::M1.to_string(),
            (_, None) => return Err(ValidationError::MissingField("tf")),
        };
        let bar_time = bar_time_field(self.time.as_ref())?;
        if kind == SignalKind::Waves && bar_time.is_none() {
            return Err(ValidationError::MissingField("time"));
        }

        let symbol = normalize_ticker(&ticker, style);
        if symbol.is_empty() {
            return Err(ValidationError::InvalidField {
                field: "ticker",
                value: ticker,
            });
        }
        let direction: Direction =
            direction_raw
                .parse()
                .map_err(|_| ValidationError::InvalidField {
                    field: "direction",
                    value: direction_raw.clone(),
                })?;
        let timeframe: Timeframe =
            timeframe_raw
                .parse()
                .map_err(|_| ValidationError::InvalidField {
                    field: "tf",
                    value: timeframe_raw.clone(),
                })?;

        let mut signal = Signal::new(received_at, symbol, direction, timeframe);
        signal.entry = price_field("entry", self.entry.as_ref())?;
        signal.stop = price_field("stop", self.stop.as_ref())?;
        signal.target = price_field("target", self.target.as_ref())?;
        signal.message = non_empty(self.message);
        signal.kind = kind;
        signal.bar_time = bar_time;
        Ok(signal)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Epoch milliseconds as a JSON number or numeric string
fn bar_time_field(value: Option<&Value>) -> Result<Option<Timestamp>, ValidationError> {
    let Some(value) = value else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }
    let invalid = || ValidationError::InvalidField {
        field: "time",
        value: value.to_string(),
    };

    let millis = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(invalid)?;
    Utc.timestamp_millis_opt(millis).single().map(Some).ok_or_else(invalid)
}

/// Absent, null and empty are `None`; anything else must be a positive number
fn price_field(field: &'static str, value: Option<&Value>) -> Result<Option<Price>, ValidationError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let text = match value {
        Value::Null => return Ok(None),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        other => scalar_text(other),
    };
    let invalid = || ValidationError::InvalidField {
        field,
        value: value.to_string(),
    };

    let text = text.ok_or_else(invalid)?;
    let price = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| invalid())?;
    if price <= Decimal::ZERO {
        return Err(invalid());
    }
    Ok(Some(price.normalize()))
}
