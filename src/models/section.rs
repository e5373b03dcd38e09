use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::{Announcement, Enrollment};

/// A teaching instance of a course with its own roster and seat counter.
///
/// `current_students` counts enrollments that are `pending` or `approved`.
/// Only the enrollment ledger moves it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Section {
    pub id: String,
    pub course_id: String,
    pub teacher_id: String,
    pub code: String,
    pub classroom: String,
    pub schedule: String,
    pub max_students: i64,
    pub current_students: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Section {
    pub fn is_full(&self) -> bool {
        self.current_students >= self.max_students
    }

    pub fn available_spots(&self) -> i64 {
        (self.max_students - self.current_students).max(0)
    }
}

/// Listing row joined with the owning course and the teacher.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SectionSummary {
    pub id: String,
    pub course_id: String,
    pub course_code: String,
    pub course_name: String,
    pub teacher_id: String,
    pub teacher_username: String,
    pub code: String,
    pub classroom: String,
    pub schedule: String,
    pub max_students: i64,
    pub current_students: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionDetail {
    #[serde(flatten)]
    pub section: Section,
    pub available_spots: i64,
    pub enrollments: Vec<Enrollment>,
    pub announcements: Vec<Announcement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSectionRequest {
    pub course_id: String,
    pub teacher_id: String,
    pub code: String,
    pub classroom: String,
    pub schedule: String,
    #[serde(default = "default_capacity")]
    pub max_students: i64,
}

fn default_capacity() -> i64 {
    50
}

impl NewSectionRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.code.trim().is_empty() || self.code.len() > 20 {
            return Err(AppError::BadRequest("section code must be 1-20 characters".to_string()));
        }
        if self.max_students < 0 {
            return Err(AppError::BadRequest("max_students must not be negative".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSectionRequest {
    pub teacher_id: Option<String>,
    pub code: Option<String>,
    pub classroom: Option<String>,
    pub schedule: Option<String>,
    pub max_students: Option<i64>,
}

impl UpdateSectionRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(code) = &self.code {
            if code.trim().is_empty() || code.len() > 20 {
                return Err(AppError::BadRequest("section code must be 1-20 characters".to_string()));
            }
        }
        if matches!(self.max_students, Some(v) if v < 0) {
            return Err(AppError::BadRequest("max_students must not be negative".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectionQuery {
    #[serde(default)]
    pub search: Option<String>,
}
