use std::thread::sleep;
use std::time::Duration;

use log::warn;

use crate::error::Result;

/// How often a model call is attempted before its unit of work is given up.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u8, delay_ms: u64) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            delay: Duration::from_millis(delay_ms),
        }
    }

    /// Run `call`, sleeping `delay * attempt` between failed attempts.
    pub fn run<T>(&self, what: &str, mut call: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 1;
        loop {
            match call() {
                Ok(v) => return Ok(v),
                Err(err) if attempt < self.max_attempts => {
                    warn!("{what}: attempt {attempt}/{} failed: {err}", self.max_attempts);
                    sleep(self.delay * u32::from(attempt));
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
