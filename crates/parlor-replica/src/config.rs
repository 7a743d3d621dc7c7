//! Operational tunables for the replication and election machinery.
//!
//! These are knobs, not business logic, so they are assembled from CLI flags
//! with environment-variable fallbacks rather than a file-based config
//! loader (see the design notes on why no config file format is used here).

use std::time::Duration;

/// Timing knobs shared by the leader's fan-out worker and every follower's
/// heartbeat loop.
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// How often a follower probes the leader with `HeartBeat`.
    pub heartbeat_interval: Duration,
    /// Per-call timeout for any outbound peer RPC.
    pub peer_timeout: Duration,
    /// How long a heartbeat-losing follower waits before calling
    /// `CheckLeader` on the presumed new leader.
    pub election_settle: Duration,
    /// Idle tick used by the fan-out worker while the queue is empty.
    pub fanout_poll_interval: Duration,
    /// Consecutive heartbeat failures tolerated before declaring the leader
    /// dead and starting an election.
    pub heartbeat_retries: u32,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(5),
            peer_timeout: Duration::from_secs(1),
            election_settle: Duration::from_secs(10),
            fanout_poll_interval: Duration::from_secs(2),
            heartbeat_retries: 2,
        }
    }
}

impl ReplicationConfig {
    /// Builds a config from defaults, overridden by environment variables
    /// when present (`PARLOR_HEARTBEAT_INTERVAL_MS`, `PARLOR_PEER_TIMEOUT_MS`,
    /// `PARLOR_ELECTION_SETTLE_MS`, `PARLOR_FANOUT_POLL_INTERVAL_MS`,
    /// `PARLOR_HEARTBEAT_RETRIES`).
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(ms) = env_u64("PARLOR_HEARTBEAT_INTERVAL_MS") {
            cfg.heartbeat_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("PARLOR_PEER_TIMEOUT_MS") {
            cfg.peer_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("PARLOR_ELECTION_SETTLE_MS") {
            cfg.election_settle = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("PARLOR_FANOUT_POLL_INTERVAL_MS") {
            cfg.fanout_poll_interval = Duration::from_millis(ms);
        }
        if let Some(n) = env_u64("PARLOR_HEARTBEAT_RETRIES") {
            cfg.heartbeat_retries = n as u32;
        }
        cfg
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_intervals() {
        let cfg = ReplicationConfig::default();
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(cfg.election_settle, Duration::from_secs(10));
    }
}
