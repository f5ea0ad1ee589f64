//! Suppression records: "this fingerprint was already claimed".
//!
//! A record lives for one suppression window. Expiry is lazy: every claim
//! first drops stale records, so no timer is needed.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::fingerprint::Fingerprint;

/// Windowed set of claimed fingerprints.
#[derive(Debug, Clone)]
pub struct SuppressionStore {
    window: Duration,
    records: HashMap<Fingerprint, DateTime<Utc>>,
}

impl SuppressionStore {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            records: HashMap::new(),
        }
    }

    /// Claim a fingerprint for rendering.
    ///
    /// Returns `true` and records `now` if no live record exists.
    /// Returns `false` and leaves the store untouched otherwise.
    pub fn try_claim(&mut self, fingerprint: &Fingerprint, now: DateTime<Utc>) -> bool {
        self.expire(now);

        if self.is_claimed(fingerprint, now) {
            return false;
        }

        self.records.insert(fingerprint.clone(), now);
        true
    }

    /// Apply a claim announced by another surface.
    ///
    /// Never extends a live record, so echoes of our own announcements are
    /// harmless. Returns `true` if a record was inserted.
    pub fn record(&mut self, fingerprint: &Fingerprint, now: DateTime<Utc>) -> bool {
        if self.is_claimed(fingerprint, now) {
            return false;
        }

        self.records.insert(fingerprint.clone(), now);
        true
    }

    /// Whether a live record exists for `fingerprint` at `now`.
    pub fn is_claimed(&self, fingerprint: &Fingerprint, now: DateTime<Utc>) -> bool {
        self.records
            .get(fingerprint)
            .is_some_and(|claimed_at| self.is_live(*claimed_at, now))
    }

    /// Drop records older than the window. Returns how many were removed.
    pub fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.records.len();
        let window = self.window;
        self.records
            .retain(|_, claimed_at| now.signed_duration_since(*claimed_at) < window);
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn is_live(&self, claimed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(claimed_at) < self.window
    }
}
