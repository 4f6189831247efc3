//! # Logging
//!
//! `env_logger` setup plus two helpers used on the connection path: a rate
//! limiter for noisy warnings and a bounded hex dump of frames.

use log::{debug, log_enabled, Level};
use std::time::{Duration, Instant};

/// Longest prefix of a frame written by [`log_frame_hex`].
const MAX_LOG_BYTES: usize = 128;

/// Inbound frame marker.
pub const INBOUND: &str = ">>>>";

/// Outbound frame marker.
pub const OUTBOUND: &str = "<<<<";

/// Initializes the logger with the `env_logger` crate.
///
/// `RUST_LOG` wins when set; otherwise `level` is used as the filter.
pub fn init_logger(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A second call (tests, embedding) keeps the first logger.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}

/// Rate limiter for log messages.
///
/// Allows at most `cap` messages per `window`; the counter restarts once
/// the window has elapsed.
#[derive(Debug)]
pub struct LogThrottle {
    window: Duration,
    cap: u32,
    count: u32,
    suppressed: u32,
    t0: Instant,
}

impl LogThrottle {
    pub fn new(window: Duration, cap: u32) -> Self {
        Self {
            window,
            cap,
            count: 0,
            suppressed: 0,
            t0: Instant::now(),
        }
    }

    /// Whether the next message may be logged.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.t0) > self.window {
            self.t0 = now;
            self.count = 0;
        }

        self.count += 1;
        let allowed = self.count <= self.cap;
        if !allowed {
            self.suppressed += 1;
        }
        allowed
    }

    /// Messages dropped since the last call.
    pub fn take_suppressed(&mut self) -> u32 {
        std::mem::take(&mut self.suppressed)
    }
}

/// Logs frame bytes in hex at debug level.
pub fn log_frame_hex(marker: &str, peer: &str, data: &[u8]) {
    if !log_enabled!(Level::Debug) {
        return;
    }
    let shown = &data[..data.len().min(MAX_LOG_BYTES)];
    let suffix = if data.len() > MAX_LOG_BYTES {
        format!(" ... ({} bytes total)", data.len())
    } else {
        String::new()
    };
    debug!("{peer} {marker} {}{suffix}", hex::encode_upper(shown));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_caps_window() {
        let mut throttle = LogThrottle::new(Duration::from_secs(60), 2);
        assert!(throttle.allow());
        assert!(throttle.allow());
        assert!(!throttle.allow());
        assert!(!throttle.allow());
        assert_eq!(throttle.take_suppressed(), 2);
        assert_eq!(throttle.take_suppressed(), 0);
    }

    #[test]
    fn test_throttle_window_restarts() {
        let mut throttle = LogThrottle::new(Duration::ZERO, 1);
        assert!(throttle.allow());
        std::thread::sleep(Duration::from_millis(2));
        assert!(throttle.allow());
    }

    #[test]
    fn test_init_logger_twice() {
        init_logger("debug");
        init_logger("info");
        log_frame_hex(INBOUND, "test", &[0x64, 0x0C, 0x00]);
    }
}
