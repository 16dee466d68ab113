//! HTTP plumbing
//!
//! This module builds the two HTTP clients the library uses and holds the
//! transfer-rate helpers shared by the download engine:
//! - a media client with default TLS verification
//! - a playlist client with a browser-like user agent, a total timeout and
//!   certificate verification disabled
//! - speed sampling over a short sliding window
//! - pacing delays for bandwidth limits

pub mod connection;

pub use connection::{media_client, pacing_delay, playlist_client, SpeedCalculator};
