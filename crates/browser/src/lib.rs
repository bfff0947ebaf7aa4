//! The browser host the client layer runs against: durable key-value storage,
//! the document, and the page location. Each is a trait so the flow can run
//! in a real page or headless, as the console client and the tests do.

pub mod error;
pub mod storage;
pub mod window;

pub use error::StorageError;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use window::{Document, HeadlessWindow, Location};
