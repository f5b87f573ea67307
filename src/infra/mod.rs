//! Infrastructure - configuration and logging
//!
//! - `config` - Application configuration (TOML loading, defaults)
//! - `logging` - Tracing subscriber setup

pub mod config;
pub mod logging;

pub use config::Config;
