use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// The trading strategies the backtest server knows how to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyType {
    #[default]
    MaCross,
    Rsi,
    Macd,
    Bollinger,
    /// Dollar-cost averaging (periodic fixed investment).
    Dca,
    SmaBreakout,
}

impl StrategyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyType::MaCross => "MA_CROSS",
            StrategyType::Rsi => "RSI",
            StrategyType::Macd => "MACD",
            StrategyType::Bollinger => "BOLLINGER",
            StrategyType::Dca => "DCA",
            StrategyType::SmaBreakout => "SMA_BREAKOUT",
        }
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MA_CROSS" => Ok(StrategyType::MaCross),
            "RSI" => Ok(StrategyType::Rsi),
            "MACD" => Ok(StrategyType::Macd),
            "BOLLINGER" => Ok(StrategyType::Bollinger),
            "DCA" => Ok(StrategyType::Dca),
            "SMA_BREAKOUT" => Ok(StrategyType::SmaBreakout),
            other => Err(CoreError::InvalidInput(
                "strategy_type".to_string(),
                other.to_string(),
            )),
        }
    }
}

/// How often a DCA strategy invests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvestmentInterval {
    #[default]
    Monthly,
    Yearly,
}

/// The light/dark display preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    /// The value persisted in storage and used as the document class name.
    pub const fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    /// Returns the other mode.
    pub const fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }

    pub const fn is_dark(self) -> bool {
        matches!(self, ThemeMode::Dark)
    }

    /// Reads a persisted value. Only the exact string `"dark"` selects dark mode;
    /// anything else, including a missing value, falls back to light.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value {
            Some("dark") => ThemeMode::Dark,
            _ => ThemeMode::Light,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_type_uses_server_names_on_the_wire() {
        let json = serde_json::to_string(&StrategyType::SmaBreakout).unwrap();
        assert_eq!(json, "\"SMA_BREAKOUT\"");
        let parsed: StrategyType = serde_json::from_str("\"MA_CROSS\"").unwrap();
        assert_eq!(parsed, StrategyType::MaCross);
    }

    #[test]
    fn strategy_type_parses_case_insensitively() {
        assert_eq!("dca".parse::<StrategyType>().unwrap(), StrategyType::Dca);
        assert!("martingale".parse::<StrategyType>().is_err());
    }

    #[test]
    fn theme_mode_only_accepts_exact_dark() {
        assert_eq!(ThemeMode::from_stored(Some("dark")), ThemeMode::Dark);
        assert_eq!(ThemeMode::from_stored(Some("light")), ThemeMode::Light);
        assert_eq!(ThemeMode::from_stored(Some("DARK")), ThemeMode::Light);
        assert_eq!(ThemeMode::from_stored(None), ThemeMode::Light);
    }

    #[test]
    fn theme_mode_toggles_back_and_forth() {
        assert_eq!(ThemeMode::Light.toggled(), ThemeMode::Dark);
        assert_eq!(ThemeMode::Light.toggled().toggled(), ThemeMode::Light);
    }
}
