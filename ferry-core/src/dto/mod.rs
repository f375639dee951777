//! Data Transfer Objects for node communication
//!
//! This module contains the request and response bodies exchanged with an
//! execution node over its RPC endpoint.

pub mod blueprint;
pub mod module;
pub mod script;
pub mod service;

use std::time::Duration;

/// Converts a time-to-live into the millisecond field carried by requests
pub fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}
