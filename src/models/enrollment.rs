use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle state of an enrollment record.
///
/// `Pending` and `Approved` hold a seat in the section. `Rejected` and
/// `Dropped` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Pending,
    Approved,
    Rejected,
    Dropped,
}

/// What a staff member or student asks the ledger to do with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentAction {
    Approve,
    Reject,
    Drop,
    Cancel,
}

/// Outcome of a legal action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    To(EnrollmentStatus),
    Delete,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Dropped => "dropped",
        }
    }

    pub fn occupies_seat(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }

    /// The single transition table. `None` means the action is illegal from
    /// this state.
    pub fn apply(self, action: EnrollmentAction) -> Option<Transition> {
        use EnrollmentAction::*;
        use EnrollmentStatus::*;

        match (self, action) {
            (Pending, Approve) => Some(Transition::To(Approved)),
            (Pending, Reject) => Some(Transition::To(Rejected)),
            (Pending, Cancel) => Some(Transition::Delete),
            (Approved, Drop) => Some(Transition::To(Dropped)),
            _ => None,
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EnrollmentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Drop => "drop",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for EnrollmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Transition {
    /// Whether moving from `from` through this transition gives a seat back.
    pub fn releases_seat(&self, from: EnrollmentStatus) -> bool {
        let still_occupying = match self {
            Transition::To(next) => next.occupies_seat(),
            Transition::Delete => false,
        };
        from.occupies_seat() && !still_occupying
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: String,
    pub student_id: String,
    pub section_id: String,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub grade: Option<f64>,
    pub remarks: Option<String>,
}

impl Enrollment {
    pub fn new_pending(student_id: &str, section_id: &str, remarks: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            section_id: section_id.to_string(),
            status: EnrollmentStatus::Pending,
            enrolled_at: Utc::now(),
            approved_at: None,
            grade: None,
            remarks,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollRequest {
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeRequest {
    pub grade: f64,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrollmentQuery {
    #[serde(default)]
    pub status: Option<EnrollmentStatus>,
}
