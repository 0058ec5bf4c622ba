use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use watchtower_core::types::AutonomyLevel;

/// Sliding-window attempt log keyed by incident key (§4.4 guardrail b).
#[derive(Default)]
pub struct RateLimiter {
    attempts: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts recorded for `key` within the trailing `window_secs`.
    pub fn attempt_count(&self, key: &str, now: DateTime<Utc>, window_secs: i64) -> usize {
        let attempts = self.attempts.lock().unwrap();
        match attempts.get(key) {
            Some(log) => log.iter().filter(|t| now - **t <= Duration::seconds(window_secs)).count(),
            None => 0,
        }
    }

    /// Whether `key` has already hit `max_attempts` within the window —
    /// checked *before* recording the current attempt.
    pub fn is_limited(&self, key: &str, now: DateTime<Utc>, window_secs: i64, max_attempts: usize) -> bool {
        self.attempt_count(key, now, window_secs) >= max_attempts
    }

    /// Record this attempt and prune entries that have aged out of the window.
    pub fn record_attempt(&self, key: &str, now: DateTime<Utc>, window_secs: i64) {
        let mut attempts = self.attempts.lock().unwrap();
        let log = attempts.entry(key.to_string()).or_default();
        log.retain(|t| now - *t <= Duration::seconds(window_secs));
        log.push(now);
    }
}

/// At most one active remediation across the cluster (§4.4 guardrail c).
/// A 10-minute staleness timeout is the safety net for a process that
/// crashed mid-remediation and never released its lock.
#[derive(Default)]
pub struct BlastRadiusLock {
    active: Mutex<Option<(String, DateTime<Utc>)>>,
}

impl BlastRadiusLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, holder: &str, now: DateTime<Utc>, staleness_secs: i64) -> bool {
        let mut active = self.active.lock().unwrap();
        if let Some((_, acquired_at)) = active.as_ref() {
            if now - *acquired_at <= Duration::seconds(staleness_secs) {
                return false;
            }
            // Stale — sweep it and allow this acquisition to proceed.
        }
        *active = Some((holder.to_string(), now));
        true
    }

    pub fn release(&self) {
        *self.active.lock().unwrap() = None;
    }
}

/// One outgoing email per `window_secs`, except escalations which bypass it.
#[derive(Default)]
pub struct EmailRateLimiter {
    last_sent: Mutex<Option<DateTime<Utc>>>,
}

impl EmailRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&self, now: DateTime<Utc>, window_secs: i64, bypass: bool) -> bool {
        if bypass {
            *self.last_sent.lock().unwrap() = Some(now);
            return true;
        }
        let mut last_sent = self.last_sent.lock().unwrap();
        let allowed = match *last_sent {
            Some(last) => now - last > Duration::seconds(window_secs),
            None => true,
        };
        if allowed {
            *last_sent = Some(now);
        }
        allowed
    }
}

/// `autonomy.killSwitch` — fail-safe to denied on any read failure.
pub fn kill_switch_engaged(conn: &Connection) -> bool {
    match watchtower_core::db::get_preference(conn, "autonomy.killSwitch") {
        Ok(Some(v)) => v == "true",
        Ok(None) => false,
        Err(_) => true,
    }
}

/// `autonomy.level` — defaults to `Observe` (the most conservative level) on
/// any read failure or unparseable value.
pub fn current_autonomy_level(conn: &Connection) -> AutonomyLevel {
    match watchtower_core::db::get_preference(conn, "autonomy.level") {
        Ok(Some(v)) => v.parse::<i64>().map(AutonomyLevel::from_i64).unwrap_or(AutonomyLevel::Observe),
        _ => AutonomyLevel::Observe,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiter_blocks_after_max_attempts() {
        let rl = RateLimiter::new();
        let now = Utc::now();
        for _ in 0..3 {
            rl.record_attempt("VM_CRASHED:vmid=200", now, 3600);
        }
        assert!(rl.is_limited("VM_CRASHED:vmid=200", now, 3600, 3));
    }

    #[test]
    fn rate_limiter_forgets_old_attempts() {
        let rl = RateLimiter::new();
        let old = Utc::now() - Duration::seconds(7200);
        rl.record_attempt("k", old, 3600);
        assert_eq!(rl.attempt_count("k", Utc::now(), 3600), 0);
    }

    #[test]
    fn blast_radius_lock_is_exclusive() {
        let lock = BlastRadiusLock::new();
        let now = Utc::now();
        assert!(lock.try_acquire("pve", now, 600));
        assert!(!lock.try_acquire("pve", now, 600));
        lock.release();
        assert!(lock.try_acquire("pve", now, 600));
    }

    #[test]
    fn blast_radius_lock_sweeps_stale_entries() {
        let lock = BlastRadiusLock::new();
        let old = Utc::now() - Duration::seconds(700);
        assert!(lock.try_acquire("pve", old, 600));
        assert!(lock.try_acquire("pve", Utc::now(), 600));
    }

    #[test]
    fn email_limiter_allows_one_per_window() {
        let limiter = EmailRateLimiter::new();
        let now = Utc::now();
        assert!(limiter.allow(now, 300, false));
        assert!(!limiter.allow(now, 300, false));
        assert!(limiter.allow(now, 300, true));
    }
}
