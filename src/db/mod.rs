pub mod announcements;
pub mod courses;
pub mod enrollments;
pub mod sections;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::migrate::MigrateError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

/// Writers queue on the SQLite lock for up to this long before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

pub async fn migrate(db: &SqlitePool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(db).await
}

/// `LIKE` pattern for a free-text search box; blank input means no filter.
pub(crate) fn like_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s))
}

#[cfg(test)]
pub(crate) async fn setup_test_db() -> SqlitePool {
    // One connection: every pooled connection to `:memory:` is its own database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            SqliteConnectOptions::from_str("sqlite::memory:")
                .expect("valid memory url")
                .foreign_keys(true),
        )
        .await
        .expect("Failed to create test db");

    migrate(&pool).await.expect("Failed to run migrations");

    pool
}

#[cfg(test)]
pub(crate) mod fixtures {
    use sqlx::SqlitePool;

    use crate::models::{Course, NewCourseRequest, NewSectionRequest, NewUserRequest, Role, Section, User};

    pub async fn user(db: &SqlitePool, username: &str, role: Role) -> User {
        super::users::insert(
            db,
            NewUserRequest {
                id: None,
                username: username.to_string(),
                display_name: None,
                role,
            },
        )
        .await
        .expect("Failed to insert user")
    }

    pub async fn course(db: &SqlitePool, code: &str) -> Course {
        super::courses::insert(
            db,
            NewCourseRequest {
                code: code.to_string(),
                name: format!("{} course", code),
                description: None,
                credits: 3,
                hours: 48,
                max_students: 60,
                semester: "Fall".to_string(),
                academic_year: "2025".to_string(),
            },
        )
        .await
        .expect("Failed to insert course")
    }

    pub async fn section(db: &SqlitePool, course: &Course, teacher: &User, code: &str, capacity: i64) -> Section {
        super::sections::insert(
            db,
            NewSectionRequest {
                course_id: course.id.clone(),
                teacher_id: teacher.id.clone(),
                code: code.to_string(),
                classroom: "A-101".to_string(),
                schedule: "Mon 08:00-09:40".to_string(),
                max_students: capacity,
            },
        )
        .await
        .expect("Failed to insert section")
    }
}
