//! Progress tracking for a reconciliation pass.
//!
//! The `PassProgressTracker` counts how many stale wallets a pass selected, refreshed,
//! demoted or skipped, logs progress as wallets complete, and summarises the pass.

use tracing::info;

/// Tracks the progress of one reconciliation pass
#[derive(Debug, Clone)]
pub struct PassProgressTracker {
    /// Block height the pass reconciles against
    height: u64,
    /// Wallets selected as stale
    selected: usize,
    /// Wallets refreshed and persisted
    updated: usize,
    /// Validators demoted to ordinary wallets
    demoted: usize,
    /// Wallets left for the next pass after an unrecovered error
    skipped: usize,
    /// Whether validator discovery ran in this pass
    validators_refreshed: bool,
}

impl PassProgressTracker {
    pub fn new(height: u64) -> Self {
        Self {
            height,
            selected: 0,
            updated: 0,
            demoted: 0,
            skipped: 0,
            validators_refreshed: false,
        }
    }

    pub fn record_selected(&mut self, count: usize) {
        self.selected = count;
        info!("Found {} wallets to update", count);
    }

    pub fn record_validator_refresh(&mut self) {
        self.validators_refreshed = true;
    }

    pub fn record_updated(&mut self) {
        self.updated += 1;
        self.log_progress();
    }

    pub fn record_demoted(&mut self) {
        self.demoted += 1;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
        self.log_progress();
    }

    fn log_progress(&self) {
        info!(
            "Updated {}/{} wallets.",
            self.updated + self.skipped,
            self.selected
        );
    }

    pub fn get_stats(&self) -> PassStats {
        PassStats {
            height: self.height,
            selected: self.selected,
            updated: self.updated,
            demoted: self.demoted,
            skipped: self.skipped,
            validators_refreshed: self.validators_refreshed,
        }
    }
}

/// Statistics about one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassStats {
    pub height: u64,
    pub selected: usize,
    pub updated: usize,
    pub demoted: usize,
    pub skipped: usize,
    pub validators_refreshed: bool,
}

impl PassStats {
    /// Get a human-readable summary of the pass
    pub fn summary(&self) -> String {
        format!(
            "Pass at height {}: {} of {} stale wallets updated{}{}{}",
            self.height,
            self.updated,
            self.selected,
            if self.skipped > 0 {
                format!(", {} skipped", self.skipped)
            } else {
                String::new()
            },
            if self.demoted > 0 {
                format!(", {} validators demoted", self.demoted)
            } else {
                String::new()
            },
            if self.validators_refreshed {
                " (validators refreshed)"
            } else {
                ""
            }
        )
    }
}
