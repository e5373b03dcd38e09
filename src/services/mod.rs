pub mod auditor;
pub mod dashboard;
pub mod ledger;

pub use auditor::CounterAuditor;
pub use dashboard::Dashboard;
pub use ledger::{AuditReport, EnrollmentLedger, LedgerError, SectionDrift, TransitionOutcome};
