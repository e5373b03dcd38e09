//! Enrollment ledger: the only code that moves a section's seat counter.
//!
//! Every mutation runs in one transaction whose first statement is a
//! conditional write (seat reservation or status compare-and-set). SQLite
//! takes the write lock there, so contending requests queue on the busy
//! timeout instead of acting on a stale read.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::{enrollments, sections, users};
use crate::models::{Enrollment, EnrollmentAction, EnrollmentStatus, Transition};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("student {student_id} already has an enrollment in section {section_id}")]
    AlreadyEnrolled {
        student_id: String,
        section_id: String,
    },

    #[error("section {0} is full")]
    SectionFull(String),

    #[error("cannot {action} an enrollment that is {from}")]
    InvalidStateTransition {
        from: EnrollmentStatus,
        action: EnrollmentAction,
    },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("grade {0} is outside 0-100")]
    InvalidGrade(f64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result of a transition that keeps the record.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub enrollment: Option<Enrollment>,
    pub released_seat: bool,
}

/// One section whose counter disagrees with its enrollment rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionDrift {
    pub section_id: String,
    pub recorded: i64,
    pub actual: i64,
    pub max_students: i64,
    pub repaired: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub sections_checked: usize,
    pub drifted: Vec<SectionDrift>,
}

impl AuditReport {
    pub fn is_consistent(&self) -> bool {
        self.drifted.is_empty()
    }
}

#[derive(Clone)]
pub struct EnrollmentLedger {
    db: SqlitePool,
    underflows: Arc<AtomicU64>,
}

impl EnrollmentLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            underflows: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Times a seat release found the counter already at zero.
    pub fn underflow_count(&self) -> u64 {
        self.underflows.load(Ordering::Relaxed)
    }

    /// Creates a pending enrollment and takes a seat for it.
    pub async fn enroll(
        &self,
        student_id: &str,
        section_id: &str,
        remarks: Option<String>,
    ) -> Result<Enrollment, LedgerError> {
        let mut tx = self.db.begin().await?;

        if !sections::reserve_seat(&mut *tx, section_id).await? {
            tx.rollback().await?;
            return Err(self.explain_refused_seat(student_id, section_id).await?);
        }

        let enrollment = Enrollment::new_pending(student_id, section_id, remarks);
        if let Err(err) = enrollments::insert(&mut *tx, &enrollment).await {
            tx.rollback().await?;
            return Err(match err {
                sqlx::Error::Database(db) if db.is_unique_violation() => LedgerError::AlreadyEnrolled {
                    student_id: student_id.to_string(),
                    section_id: section_id.to_string(),
                },
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => LedgerError::NotFound("student"),
                other => other.into(),
            });
        }

        tx.commit().await?;

        info!(
            "enrolled student {} in section {} as {}",
            student_id, section_id, enrollment.id
        );
        Ok(enrollment)
    }

    /// A duplicate record wins over a full section, matching what the
    /// student would see if they asked twice.
    async fn explain_refused_seat(&self, student_id: &str, section_id: &str) -> Result<LedgerError, LedgerError> {
        if sections::find_by_id(&self.db, section_id).await?.is_none() {
            return Ok(LedgerError::NotFound("section"));
        }
        if enrollments::find_for_student(&self.db, student_id, section_id)
            .await?
            .is_some()
        {
            return Ok(LedgerError::AlreadyEnrolled {
                student_id: student_id.to_string(),
                section_id: section_id.to_string(),
            });
        }
        if users::find_by_id(&self.db, student_id).await?.is_none() {
            return Ok(LedgerError::NotFound("student"));
        }
        Ok(LedgerError::SectionFull(section_id.to_string()))
    }

    pub async fn approve(&self, enrollment_id: &str) -> Result<Enrollment, LedgerError> {
        self.kept_record(enrollment_id, EnrollmentAction::Approve).await
    }

    pub async fn reject(&self, enrollment_id: &str) -> Result<Enrollment, LedgerError> {
        self.kept_record(enrollment_id, EnrollmentAction::Reject).await
    }

    pub async fn drop(&self, enrollment_id: &str) -> Result<Enrollment, LedgerError> {
        self.kept_record(enrollment_id, EnrollmentAction::Drop).await
    }

    /// Withdraws a pending request; the record is deleted.
    pub async fn cancel(&self, enrollment_id: &str) -> Result<(), LedgerError> {
        self.transition(enrollment_id, EnrollmentAction::Cancel).await?;
        Ok(())
    }

    async fn kept_record(&self, enrollment_id: &str, action: EnrollmentAction) -> Result<Enrollment, LedgerError> {
        self.transition(enrollment_id, action)
            .await?
            .enrollment
            .ok_or(LedgerError::NotFound("enrollment"))
    }

    pub async fn transition(
        &self,
        enrollment_id: &str,
        action: EnrollmentAction,
    ) -> Result<TransitionOutcome, LedgerError> {
        let current = enrollments::find_by_id(&self.db, enrollment_id)
            .await?
            .ok_or(LedgerError::NotFound("enrollment"))?;

        let transition = current
            .status
            .apply(action)
            .ok_or(LedgerError::InvalidStateTransition {
                from: current.status,
                action,
            })?;

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let changed = match transition {
            Transition::To(next) => {
                let approved_at = (next == EnrollmentStatus::Approved).then_some(now);
                enrollments::compare_and_set_status(&mut *tx, enrollment_id, current.status, next, approved_at).await?
            }
            Transition::Delete => enrollments::delete_if_status(&mut *tx, enrollment_id, current.status).await?,
        };

        if !changed {
            tx.rollback().await?;
            // Another request moved the record first; report against its state.
            let latest = enrollments::find_by_id(&self.db, enrollment_id)
                .await?
                .ok_or(LedgerError::NotFound("enrollment"))?;
            return Err(LedgerError::InvalidStateTransition {
                from: latest.status,
                action,
            });
        }

        let released_seat = transition.releases_seat(current.status);
        if released_seat && !sections::release_seat(&mut *tx, &current.section_id).await? {
            self.underflows.fetch_add(1, Ordering::Relaxed);
            warn!(
                "counter underflow: section {} was already at 0 while releasing enrollment {}",
                current.section_id, enrollment_id
            );
        }

        let enrollment = match transition {
            Transition::To(_) => enrollments::find_by_id(&mut *tx, enrollment_id).await?,
            Transition::Delete => None,
        };

        tx.commit().await?;

        info!(
            "enrollment {} {}: {} -> {}",
            enrollment_id,
            action,
            current.status,
            enrollment
                .as_ref()
                .map(|e| e.status.as_str())
                .unwrap_or("deleted")
        );

        Ok(TransitionOutcome {
            enrollment,
            released_seat,
        })
    }

    /// Sets the grade, rounded to two decimals. Allowed in every state.
    pub async fn record_grade(
        &self,
        enrollment_id: &str,
        grade: f64,
        remarks: Option<&str>,
    ) -> Result<Enrollment, LedgerError> {
        if !grade.is_finite() || !(0.0..=100.0).contains(&grade) {
            return Err(LedgerError::InvalidGrade(grade));
        }
        let grade = (grade * 100.0).round() / 100.0;

        let enrollment = enrollments::set_grade(&self.db, enrollment_id, grade, remarks)
            .await?
            .ok_or(LedgerError::NotFound("enrollment"))?;

        info!("recorded grade {} for enrollment {}", grade, enrollment_id);
        Ok(enrollment)
    }

    /// Compares every counter with its enrollment rows. With `repair`, drifted
    /// counters are rewritten unless the true count exceeds capacity.
    pub async fn audit(&self, repair: bool) -> Result<AuditReport, LedgerError> {
        let rows = sections::occupancy(&self.db).await?;
        let mut report = AuditReport {
            sections_checked: rows.len(),
            drifted: Vec::new(),
        };

        for row in rows {
            if row.current_students == row.occupying {
                continue;
            }

            let mut repaired = false;
            if repair {
                if row.occupying > row.max_students {
                    error!(
                        "section {} holds {} seats over capacity {}; leaving counter at {}",
                        row.section_id, row.occupying, row.max_students, row.current_students
                    );
                } else {
                    repaired = sections::recount(&self.db, &row.section_id).await?;
                }
            }

            warn!(
                "section {} counter drift: recorded {} actual {} (repaired: {})",
                row.section_id, row.current_students, row.occupying, repaired
            );

            report.drifted.push(SectionDrift {
                section_id: row.section_id,
                recorded: row.current_students,
                actual: row.occupying,
                max_students: row.max_students,
                repaired,
            });
        }

        Ok(report)
    }
}
