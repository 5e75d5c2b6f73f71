use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters for the summary endpoint. Read-only from the
/// aggregation's point of view; they never influence a result.
#[derive(Debug)]
pub struct SummaryStats {
    requests: AtomicU64,
    failed_requests: AtomicU64,
    priced_transactions: AtomicU64,
    skipped_transactions: AtomicU64,
    stale_substitutions: AtomicU64,
}

impl Default for SummaryStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryStats {
    pub const fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            priced_transactions: AtomicU64::new(0),
            skipped_transactions: AtomicU64::new(0),
            stale_substitutions: AtomicU64::new(0),
        }
    }

    pub fn inc_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed_requests(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run(&self, priced: u64, skipped: u64, stale: u64) {
        self.priced_transactions.fetch_add(priced, Ordering::Relaxed);
        self.skipped_transactions.fetch_add(skipped, Ordering::Relaxed);
        self.stale_substitutions.fetch_add(stale, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SummarySnapshot {
        SummarySnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            priced_transactions: self.priced_transactions.load(Ordering::Relaxed),
            skipped_transactions: self.skipped_transactions.load(Ordering::Relaxed),
            stale_substitutions: self.stale_substitutions.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SummarySnapshot {
    pub requests: u64,
    pub failed_requests: u64,
    pub priced_transactions: u64,
    pub skipped_transactions: u64,
    pub stale_substitutions: u64,
}

pub static SUMMARY_STATS: SummaryStats = SummaryStats::new();
