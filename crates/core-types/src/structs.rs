use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::enums::{InvestmentInterval, StrategyType};
use crate::error::CoreError;

/// The signed-in user as reported by `GET /auth/check` and `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Body of `GET /auth/check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<UserInfo>,
}

/// One leg of a multi-stock DCA allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAllocation {
    pub stock_symbol: String,
    /// Fraction of each investment going to this stock, between 0 and 1.
    pub allocation_ratio: Decimal,
}

/// Parameters for `POST /backtest/run`.
///
/// Only the first four fields are required; every strategy parameter has the
/// server's default so a request file can stay short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRequest {
    pub strategy_name: String,
    pub stock_symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: Decimal,
    #[serde(default)]
    pub strategy_type: StrategyType,

    // --- MA cross ---
    #[serde(default = "default_short_period")]
    pub short_period: u32,
    #[serde(default = "default_long_period")]
    pub long_period: u32,

    // --- RSI ---
    #[serde(default = "default_rsi_period")]
    pub rsi_period: u32,
    #[serde(default = "default_rsi_buy")]
    pub rsi_buy: u32,
    #[serde(default = "default_rsi_sell")]
    pub rsi_sell: u32,

    // --- MACD ---
    #[serde(default = "default_macd_fast")]
    pub macd_fast: u32,
    #[serde(default = "default_macd_slow")]
    pub macd_slow: u32,
    #[serde(default = "default_macd_signal")]
    pub macd_signal: u32,

    // --- Bollinger ---
    #[serde(default = "default_bb_period")]
    pub bb_period: u32,
    #[serde(default = "default_bb_std")]
    pub bb_std: Decimal,

    // --- DCA ---
    #[serde(default = "default_dca_amount")]
    pub dca_amount: Decimal,
    /// Day of the month to buy on (1-31).
    #[serde(default = "default_dca_day")]
    pub dca_day: u32,
    /// Month of the year to buy in (1-12), yearly interval only.
    #[serde(default = "default_dca_month")]
    pub dca_month: u32,
    #[serde(default)]
    pub dca_interval: InvestmentInterval,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_allocations: Option<Vec<StockAllocation>>,

    /// Fraction of the position sold on a sell signal.
    #[serde(default = "default_sell_ratio")]
    pub sell_ratio: Decimal,

    // --- SMA breakout ---
    #[serde(default = "default_sma_period")]
    pub sma_period: u32,
}

fn default_initial_capital() -> Decimal {
    dec!(1000000)
}
fn default_short_period() -> u32 {
    5
}
fn default_long_period() -> u32 {
    20
}
fn default_rsi_period() -> u32 {
    14
}
fn default_rsi_buy() -> u32 {
    30
}
fn default_rsi_sell() -> u32 {
    70
}
fn default_macd_fast() -> u32 {
    12
}
fn default_macd_slow() -> u32 {
    26
}
fn default_macd_signal() -> u32 {
    9
}
fn default_bb_period() -> u32 {
    20
}
fn default_bb_std() -> Decimal {
    dec!(2.0)
}
fn default_dca_amount() -> Decimal {
    dec!(10000)
}
fn default_dca_day() -> u32 {
    1
}
fn default_dca_month() -> u32 {
    1
}
fn default_sell_ratio() -> Decimal {
    dec!(1.0)
}
fn default_sma_period() -> u32 {
    200
}

impl BacktestRequest {
    /// Creates a request with the server's default strategy parameters.
    pub fn new(
        strategy_name: impl Into<String>,
        stock_symbol: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            strategy_name: strategy_name.into(),
            stock_symbol: stock_symbol.into(),
            start_date,
            end_date,
            initial_capital: default_initial_capital(),
            strategy_type: StrategyType::default(),
            short_period: default_short_period(),
            long_period: default_long_period(),
            rsi_period: default_rsi_period(),
            rsi_buy: default_rsi_buy(),
            rsi_sell: default_rsi_sell(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            bb_period: default_bb_period(),
            bb_std: default_bb_std(),
            dca_amount: default_dca_amount(),
            dca_day: default_dca_day(),
            dca_month: default_dca_month(),
            dca_interval: InvestmentInterval::default(),
            stock_allocations: None,
            sell_ratio: default_sell_ratio(),
            sma_period: default_sma_period(),
        }
    }

    /// Checks the constraints the server would otherwise reject with a 4xx,
    /// so a bad request file fails before any network traffic.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.end_date < self.start_date {
            return Err(CoreError::InvalidInput(
                "end_date".to_string(),
                format!("{} is before start_date {}", self.end_date, self.start_date),
            ));
        }
        if self.initial_capital < Decimal::ZERO {
            return Err(CoreError::InvalidInput(
                "initial_capital".to_string(),
                "must not be negative".to_string(),
            ));
        }
        if self.sell_ratio <= Decimal::ZERO || self.sell_ratio > Decimal::ONE {
            return Err(CoreError::InvalidInput(
                "sell_ratio".to_string(),
                format!("{} is outside (0, 1]", self.sell_ratio),
            ));
        }
        if let Some(allocations) = self.stock_allocations.as_deref().filter(|a| !a.is_empty()) {
            if let Some(bad) = allocations
                .iter()
                .find(|a| a.allocation_ratio < Decimal::ZERO || a.allocation_ratio > Decimal::ONE)
            {
                return Err(CoreError::InvalidInput(
                    "allocation_ratio".to_string(),
                    format!("{} for {} is outside [0, 1]", bad.allocation_ratio, bad.stock_symbol),
                ));
            }
            let total: Decimal = allocations.iter().map(|a| a.allocation_ratio).sum();
            if (total - Decimal::ONE).abs() > dec!(0.001) {
                return Err(CoreError::InvalidInput(
                    "stock_allocations".to_string(),
                    format!("ratios must sum to 1.0, got {total}"),
                ));
            }
        }
        Ok(())
    }
}

/// Parameters for `POST /strategy/optimize`: a grid over two integer parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub strategy_type: StrategyType,
    pub stock_symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Inclusive `[min, max]`.
    pub param1_range: [i64; 2],
    pub param1_step: i64,
    pub param2_range: [i64; 2],
    pub param2_step: i64,
}

impl OptimizeRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, range, step) in [
            ("param1", self.param1_range, self.param1_step),
            ("param2", self.param2_range, self.param2_step),
        ] {
            if step <= 0 {
                return Err(CoreError::InvalidInput(
                    format!("{name}_step"),
                    "must be positive".to_string(),
                ));
            }
            if range[0] > range[1] {
                return Err(CoreError::InvalidInput(
                    format!("{name}_range"),
                    format!("min {} is greater than max {}", range[0], range[1]),
                ));
            }
        }
        Ok(())
    }
}

/// Body of `POST /strategy/compare`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareRequest {
    pub ids: Vec<i64>,
}

/// Query object for `GET /backtest/history`. Unset fields are omitted from the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<String>,
}

/// One row of `GET /backtest/history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: i64,
    pub date: String,
    pub strategy: String,
    pub stock: String,
    pub return_pct: f64,
    pub win_rate: f64,
    /// `success`, `warning` or `danger`.
    pub status: String,
}
