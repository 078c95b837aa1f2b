//! # Utility Modules
//!
//! Supporting utilities shared by the rest of the crate.
//!
//! ## Components
//! - **Logging**: `tracing-subscriber` setup driven by [`LoggingConfig`](crate::config::LoggingConfig)

pub mod logging;

pub use logging::init_logging;
