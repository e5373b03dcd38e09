use std::time::Duration;

use tracing::{info, warn};

use crate::services::ledger::{AuditReport, EnrollmentLedger, LedgerError};

/// Periodically recounts section occupancy and reports counter drift.
pub struct CounterAuditor {
    ledger: EnrollmentLedger,
    interval: Duration,
    repair: bool,
}

impl CounterAuditor {
    pub fn new(ledger: EnrollmentLedger, interval_secs: u64, repair: bool) -> Self {
        Self {
            ledger,
            interval: Duration::from_secs(interval_secs),
            repair,
        }
    }

    /// Runs forever; spawn it on the runtime.
    pub async fn start(self) {
        info!(
            "Starting counter auditor (interval: {:?}, repair: {})",
            self.interval, self.repair
        );

        loop {
            tokio::time::sleep(self.interval).await;

            match self.run_audit().await {
                Ok(report) if report.is_consistent() => {
                    info!(
                        "Counter audit clean - {} sections checked, {} underflows so far",
                        report.sections_checked,
                        self.ledger.underflow_count()
                    );
                }
                Ok(report) => {
                    let repaired = report.drifted.iter().filter(|d| d.repaired).count();
                    warn!(
                        "Counter audit found drift in {} of {} sections ({} repaired)",
                        report.drifted.len(),
                        report.sections_checked,
                        repaired
                    );
                }
                Err(e) => {
                    warn!("Counter audit failed: {:?}", e);
                }
            }
        }
    }

    pub async fn run_audit(&self) -> Result<AuditReport, LedgerError> {
        self.ledger.audit(self.repair).await
    }
}
