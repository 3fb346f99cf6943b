// (c) Meta Platforms, Inc. and affiliates. Confidential and proprietary.

use std::time::Duration;

use tracing::warn;

/// Delay before an asynchronous call completes.
///
/// Sits halfway between the short (10ms) and long (1s) timeouts callers use,
/// so a test can observe both "completes in time" and "times out".
pub const GO_CALL_DELAY: Duration = Duration::from_millis(505);

/// Environment variable overriding `call_delay`, in milliseconds.
pub const CALL_DELAY_ENV: &str = "TESTBUS_CALL_DELAY_MS";

/// Tunables for a `TestBus`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestBusConfig {
    /// How long `go` waits before performing the call
    pub call_delay: Duration,
}

impl Default for TestBusConfig {
    fn default() -> Self {
        Self {
            call_delay: GO_CALL_DELAY,
        }
    }
}

impl TestBusConfig {
    pub fn with_call_delay(mut self, call_delay: Duration) -> Self {
        self.call_delay = call_delay;
        self
    }

    /// Defaults, overridden by `TESTBUS_CALL_DELAY_MS` when it is set.
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var(CALL_DELAY_ENV) {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) => config.with_call_delay(Duration::from_millis(ms)),
                Err(e) => {
                    warn!(
                        variable = CALL_DELAY_ENV,
                        value = raw,
                        error = %e,
                        "Ignoring unparseable call delay override"
                    );
                    config
                }
            },
            Err(_) => config,
        }
    }
}
