//! Console client for the stock backtest service.
//!
//! [`AppContext`] builds the whole client layer once: storage, the headless
//! window, the API client with its hooks, session and theme state, and the
//! guarded router.

pub mod context;
pub mod error;
pub mod output;

pub use context::{AUTH_CALLBACK_PATH, AppContext, POST_LOGIN_KEY};
pub use error::AppError;
