// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Health tracking for the remote flight-data provider
//!
//! Consecutive failures put the remote on a cooldown during which the
//! facade answers from the fallback dataset without attempting the wire.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Remote provider health states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// Normal operation, requests allowed
    Healthy,
    /// Too many failures, remote skipped
    Cooldown,
    /// Cooldown expired, next request probes the remote
    Probing,
}

/// Tracks remote provider health across requests
pub struct ProviderHealth {
    /// Consecutive failure count
    failure_count: AtomicU32,
    /// Timestamp when cooldown started (seconds since epoch)
    opened_at: AtomicU64,
    /// Maximum consecutive failures before cooldown
    max_failures: u32,
    /// Cooldown period in seconds
    cooldown_secs: u64,
}

impl ProviderHealth {
    /// Create a new health tracker
    pub fn new(max_failures: u32, cooldown_secs: u64) -> Self {
        Self {
            failure_count: AtomicU32::new(0),
            opened_at: AtomicU64::new(0),
            max_failures: max_failures.max(1),
            cooldown_secs,
        }
    }

    /// Get the current health state
    pub fn state(&self) -> HealthState {
        let failures = self.failure_count.load(Ordering::Relaxed);
        let opened_at = self.opened_at.load(Ordering::Relaxed);

        if failures < self.max_failures {
            return HealthState::Healthy;
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        if now.saturating_sub(opened_at) >= self.cooldown_secs {
            HealthState::Probing
        } else {
            HealthState::Cooldown
        }
    }

    /// Check if a remote request should be attempted
    pub fn allow_request(&self) -> bool {
        match self.state() {
            HealthState::Healthy => true,
            HealthState::Cooldown => false,
            HealthState::Probing => true, // One test request
        }
    }

    /// Record a successful remote request
    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
        self.opened_at.store(0, Ordering::Relaxed);
    }

    /// Record a failed remote request
    pub fn record_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;

        if failures >= self.max_failures {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            self.opened_at.store(now, Ordering::Relaxed);
            tracing::warn!(
                failures,
                cooldown_secs = self.cooldown_secs,
                "flight data remote unhealthy, entering cooldown"
            );
        }
    }

    /// Get current failure count
    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Reset the tracker
    pub fn reset(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
        self.opened_at.store(0, Ordering::Relaxed);
    }
}
