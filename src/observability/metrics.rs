//! Gateway counters
//!
//! - Counters only, monotonic, reset on process start
//! - Lock-free atomics, Relaxed ordering

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    requests_submitted: AtomicU64,
    requests_rejected: AtomicU64,
    requests_dispatch_failed: AtomicU64,
    requests_succeeded: AtomicU64,
    requests_failed: AtomicU64,
    requests_deleted: AtomicU64,
    requests_cleaned: AtomicU64,
    tokens_issued: AtomicU64,
    tokens_revoked: AtomicU64,
    auth_rejections: AtomicU64,
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub requests_submitted: u64,
    pub requests_rejected: u64,
    pub requests_dispatch_failed: u64,
    pub requests_succeeded: u64,
    pub requests_failed: u64,
    pub requests_deleted: u64,
    pub requests_cleaned: u64,
    pub tokens_issued: u64,
    pub tokens_revoked: u64,
    pub auth_rejections: u64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_submitted(&self) {
        self.requests_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_dispatch_failed(&self) {
        self.requests_dispatch_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_succeeded(&self) {
        self.requests_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deleted(&self) {
        self.requests_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_cleaned(&self, count: u64) {
        self.requests_cleaned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_tokens_issued(&self) {
        self.tokens_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_tokens_revoked(&self) {
        self.tokens_revoked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_auth_rejections(&self) {
        self.auth_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_submitted: self.requests_submitted.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            requests_dispatch_failed: self.requests_dispatch_failed.load(Ordering::Relaxed),
            requests_succeeded: self.requests_succeeded.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            requests_deleted: self.requests_deleted.load(Ordering::Relaxed),
            requests_cleaned: self.requests_cleaned.load(Ordering::Relaxed),
            tokens_issued: self.tokens_issued.load(Ordering::Relaxed),
            tokens_revoked: self.tokens_revoked.load(Ordering::Relaxed),
            auth_rejections: self.auth_rejections.load(Ordering::Relaxed),
        }
    }
}
