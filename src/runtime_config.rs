//! # Runtime Configuration Module
//!
//! Environment-driven settings for the `may` coroutine runtime that serves
//! requests.
//!
//! ## Environment Variables
//!
//! ### `SVCH_STACK_SIZE`
//!
//! Stack size for each connection coroutine. Accepts decimal (`32768`) or
//! hexadecimal (`0x8000`). Default: `0x8000` (32 KB).
//!
//! Every request runs binding, validation and the operation itself on this
//! stack, so services with deep call chains need more.
//!
//! ## Usage
//!
//! ```rust
//! use servicehandler::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! config.apply();
//! ```

use std::env;

/// Default coroutine stack size (32 KB).
pub const DEFAULT_STACK_SIZE: usize = 0x8000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = env::var("SVCH_STACK_SIZE")
            .ok()
            .and_then(|val| parse_size(&val))
            .unwrap_or(DEFAULT_STACK_SIZE);
        RuntimeConfig { stack_size }
    }

    /// Apply the configuration to the global `may` runtime.
    ///
    /// Must run before the server starts spawning coroutines.
    pub fn apply(&self) {
        may::config().set_stack_size(self.stack_size);
        tracing::info!(stack_size = self.stack_size, "Coroutine runtime configured");
    }
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    let size = match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    };
    size.filter(|size| *size > 0)
}
