//! Centralized configuration for nodelink.
//!
//! Connection defaults and engine limits. Values that callers may override
//! per connection are carried by [`EngineConfig`].

use std::time::Duration;

/// Connection and protocol defaults.
pub struct RpcConfig;

impl RpcConfig {
    pub const JSONRPC_VERSION: &'static str = "2.0";
    pub const DEFAULT_HOST: &'static str = "localhost";
    pub const DEFAULT_PORT: u16 = 26658;
    pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(180);
    pub const SUBSCRIPTION_QUEUE_CAPACITY: usize = 1024;
    /// Cancelled call ids remembered so their late responses are tolerated.
    pub const ABANDONED_ID_LIMIT: usize = 1024;
    pub const AUTH_TOKEN_ENV: &'static str = "NODELINK_AUTH_TOKEN";
}

/// Per-engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on how long a call waits for its response.
    pub response_timeout: Duration,
    /// Items buffered per subscription before new items are dropped.
    pub subscription_capacity: usize,
}

impl EngineConfig {
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_subscription_capacity(mut self, capacity: usize) -> Self {
        self.subscription_capacity = capacity.max(1);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            response_timeout: RpcConfig::DEFAULT_RESPONSE_TIMEOUT,
            subscription_capacity: RpcConfig::SUBSCRIPTION_QUEUE_CAPACITY,
        }
    }
}
