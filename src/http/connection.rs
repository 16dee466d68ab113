//! Client construction and rate helpers

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use reqwest::Client;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Build the client used for media downloads.
///
/// No total timeout is set since transfers can run for hours; only the
/// connect phase is bounded.
pub fn media_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| Error::Unknown(format!("Failed to create HTTP client: {}", e)))
}

/// Build the client used for playlist fetches.
///
/// IPTV panels commonly serve self-signed certificates, so verification is
/// off for this client only.
pub fn playlist_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.playlist_timeout_secs))
        .user_agent(config.playlist_user_agent.as_str())
        .danger_accept_invalid_certs(true)
        .build()
        .map_err(|e| Error::Unknown(format!("Failed to create HTTP client: {}", e)))
}

/// Seconds to sleep after writing `bytes` so the average rate stays near
/// `limit_kbs`. This is pacing, not a token bucket: bursts inside one chunk
/// are not smoothed.
pub fn pacing_delay(bytes: usize, limit_kbs: u64) -> Duration {
    if limit_kbs == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(bytes as f64 / (limit_kbs as f64 * 1024.0))
}

/// Speed calculator for tracking download rates
///
/// Takes a throughput sample once at least `interval` has passed since the
/// previous one and reports the mean of the last `window_size` samples.
#[derive(Debug)]
pub struct SpeedCalculator {
    /// Window size for averaging
    window_size: usize,
    /// Minimum time between samples
    interval: Duration,
    /// Recent samples in bytes/sec
    samples: VecDeque<f64>,
    /// Start of the current sampling period
    period_start: Instant,
    /// Bytes seen in the current sampling period
    period_bytes: u64,
}

impl SpeedCalculator {
    /// Create a new speed calculator
    pub fn new(window_size: usize, interval: Duration) -> Self {
        Self::starting_at(window_size, interval, Instant::now())
    }

    /// Create a calculator whose first period begins at `start`
    pub fn starting_at(window_size: usize, interval: Duration, start: Instant) -> Self {
        Self {
            window_size: window_size.max(1),
            interval,
            samples: VecDeque::with_capacity(window_size.max(1)),
            period_start: start,
            period_bytes: 0,
        }
    }

    /// Add bytes written now; returns the new mean when a sample was taken
    pub fn add_bytes(&mut self, bytes: u64) -> Option<f64> {
        self.add_bytes_at(bytes, Instant::now())
    }

    /// Add bytes written at `now`; returns the new mean when a sample was taken
    pub fn add_bytes_at(&mut self, bytes: u64, now: Instant) -> Option<f64> {
        self.period_bytes += bytes;

        let elapsed = now.saturating_duration_since(self.period_start);
        if elapsed < self.interval {
            return None;
        }

        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            if self.samples.len() >= self.window_size {
                self.samples.pop_front();
            }
            self.samples.push_back(self.period_bytes as f64 / secs);
        }

        self.period_start = now;
        self.period_bytes = 0;
        Some(self.speed())
    }

    /// Start a fresh sampling period (after a pause) without dropping samples
    pub fn restart_period(&mut self) {
        self.period_start = Instant::now();
        self.period_bytes = 0;
    }

    /// Mean of the retained samples in bytes/second
    pub fn speed(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Mean of the retained samples in KB/s
    pub fn speed_kbs(&self) -> f64 {
        self.speed() / 1024.0
    }
}
