// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Validated configuration for the transfer engine — the in-memory
//! counterpart of the CLI surface. Range checks live here rather than in
//! the CLI parser, so the exit-code contract ("0 on clean shutdown;
//! non-zero on argument error") is enforced once, at `main()`.

use crate::fail::Fail;

pub const DEFAULT_WINDOW_BYTES: u32 = 5000;
pub const DEFAULT_TIMEOUT_MS: u64 = 10000;
const MIN_WINDOW_BYTES: u32 = 1000;
const MAX_WINDOW_BYTES: u32 = 15000;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub window_cap_packets: usize,
    pub timeout_ms: u64,
    pub p_loss: f64,
    pub p_corrupt: f64,
    pub congestion_enabled: bool,
}

impl Config {
    pub fn new(
        port: u16,
        window_bytes: u32,
        timeout_ms: u64,
        p_loss: f64,
        p_corrupt: f64,
        congestion_enabled: bool,
    ) -> Result<Self, Fail> {
        if window_bytes < MIN_WINDOW_BYTES
            || window_bytes > MAX_WINDOW_BYTES
            || window_bytes % 1000 != 0
        {
            return Err(Fail::ConfigError {
                details: "window size must be a multiple of 1000 between 1000 and 15000",
            });
        }
        if !(0.0..=1.0).contains(&p_loss) {
            return Err(Fail::ConfigError {
                details: "loss probability must be between 0 and 1",
            });
        }
        if !(0.0..=1.0).contains(&p_corrupt) {
            return Err(Fail::ConfigError {
                details: "corruption probability must be between 0 and 1",
            });
        }

        Ok(Config {
            port,
            window_cap_packets: (window_bytes / 1000) as usize,
            timeout_ms,
            p_loss,
            p_corrupt,
            congestion_enabled,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(
            0,
            DEFAULT_WINDOW_BYTES,
            DEFAULT_TIMEOUT_MS,
            0.0,
            0.0,
            false,
        )
        .expect("default configuration is always valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_boundary_window_sizes() {
        assert!(Config::new(9000, 1000, 10000, 0.0, 0.0, false).is_ok());
        assert!(Config::new(9000, 15000, 10000, 0.0, 0.0, false).is_ok());
    }

    #[test]
    fn rejects_non_multiple_of_1000() {
        assert!(Config::new(9000, 1500, 10000, 0.0, 0.0, false).is_err());
    }

    #[test]
    fn rejects_out_of_range_window() {
        assert!(Config::new(9000, 0, 10000, 0.0, 0.0, false).is_err());
        assert!(Config::new(9000, 16000, 10000, 0.0, 0.0, false).is_err());
    }

    #[test]
    fn rejects_out_of_range_probabilities() {
        assert!(Config::new(9000, 5000, 10000, 1.1, 0.0, false).is_err());
        assert!(Config::new(9000, 5000, 10000, 0.0, -0.1, false).is_err());
    }

    #[test]
    fn default_is_five_packet_window() {
        let cfg = Config::default();
        assert_eq!(cfg.window_cap_packets, 5);
        assert_eq!(cfg.timeout_ms, 10000);
    }
}
