use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::Section;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: String,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub credits: i64,
    pub hours: i64,
    pub max_students: i64,
    pub semester: String,
    pub academic_year: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourseRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_credits")]
    pub credits: i64,
    #[serde(default = "default_hours")]
    pub hours: i64,
    #[serde(default = "default_capacity")]
    pub max_students: i64,
    pub semester: String,
    pub academic_year: String,
}

fn default_credits() -> i64 {
    1
}

fn default_hours() -> i64 {
    1
}

fn default_capacity() -> i64 {
    50
}

impl NewCourseRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.code.trim().is_empty() || self.code.len() > 20 {
            return Err(AppError::BadRequest("course code must be 1-20 characters".to_string()));
        }
        if self.name.trim().is_empty() || self.name.len() > 100 {
            return Err(AppError::BadRequest("course name must be 1-100 characters".to_string()));
        }
        check_counts(Some(self.credits), Some(self.hours), Some(self.max_students))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCourseRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub credits: Option<i64>,
    pub hours: Option<i64>,
    pub max_students: Option<i64>,
    pub semester: Option<String>,
    pub academic_year: Option<String>,
}

impl UpdateCourseRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(code) = &self.code {
            if code.trim().is_empty() || code.len() > 20 {
                return Err(AppError::BadRequest("course code must be 1-20 characters".to_string()));
            }
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() || name.len() > 100 {
                return Err(AppError::BadRequest("course name must be 1-100 characters".to_string()));
            }
        }
        check_counts(self.credits, self.hours, self.max_students)
    }
}

fn check_counts(credits: Option<i64>, hours: Option<i64>, max_students: Option<i64>) -> Result<(), AppError> {
    for (field, value) in [("credits", credits), ("hours", hours), ("max_students", max_students)] {
        if matches!(value, Some(v) if v < 0) {
            return Err(AppError::BadRequest(format!("{} must not be negative", field)));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseQuery {
    #[serde(default)]
    pub search: Option<String>,
}

/// A course with its sections and seat totals across them.
#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub sections: Vec<Section>,
    pub total_capacity: i64,
    pub total_enrolled: i64,
    pub remaining_spots: i64,
}

impl CourseDetail {
    pub fn new(course: Course, sections: Vec<Section>) -> Self {
        let total_capacity = sections.iter().map(|s| s.max_students).sum::<i64>();
        let total_enrolled = sections.iter().map(|s| s.current_students).sum::<i64>();
        Self {
            course,
            sections,
            total_capacity,
            total_enrolled,
            remaining_spots: (total_capacity - total_enrolled).max(0),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteCourseParams {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseDeletion {
    pub course_id: String,
    pub code: String,
    pub sections_removed: i64,
    pub enrollments_cleared: i64,
}

impl CourseDeletion {
    /// Deletes this large need an explicit confirmation from the admin.
    pub fn is_high_impact(&self) -> bool {
        self.sections_removed > 15 || self.enrollments_cleared > 100
    }
}
