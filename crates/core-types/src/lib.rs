pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{InvestmentInterval, StrategyType, ThemeMode};
pub use error::CoreError;
pub use structs::{
    AuthStatus, BacktestRequest, CompareRequest, HistoryItem, HistoryQuery, OptimizeRequest,
    StockAllocation, UserInfo,
};
