use chrono::Utc;
use sqlx::{Executor, Sqlite};
use uuid::Uuid;

use crate::db::like_pattern;
use crate::models::{Course, CourseDeletion, NewCourseRequest, UpdateCourseRequest};

const COURSE_COLUMNS: &str = "id, code, name, description, credits, hours, max_students, semester, academic_year, created_at, updated_at";

pub async fn insert<'e, E>(db: E, req: NewCourseRequest) -> Result<Course, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    let course = Course {
        id: Uuid::new_v4().to_string(),
        code: req.code.trim().to_string(),
        name: req.name,
        description: req.description,
        credits: req.credits,
        hours: req.hours,
        max_students: req.max_students,
        semester: req.semester,
        academic_year: req.academic_year,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO courses
            (id, code, name, description, credits, hours, max_students,
            semester, academic_year, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&course.id)
    .bind(&course.code)
    .bind(&course.name)
    .bind(&course.description)
    .bind(course.credits)
    .bind(course.hours)
    .bind(course.max_students)
    .bind(&course.semester)
    .bind(&course.academic_year)
    .bind(course.created_at)
    .bind(course.updated_at)
    .execute(db)
    .await?;

    Ok(course)
}

pub async fn find_by_id<'e, E>(db: E, id: &str) -> Result<Option<Course>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Course>(&format!("SELECT {} FROM courses WHERE id = ?", COURSE_COLUMNS))
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Newest first; `search` matches code or name, case-insensitively.
pub async fn list<'e, E>(db: E, search: Option<&str>) -> Result<Vec<Course>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Course>(&format!(
        r#"
        SELECT {}
        FROM courses
        WHERE (?1 IS NULL OR code LIKE ?1 OR name LIKE ?1)
        ORDER BY created_at DESC
        "#,
        COURSE_COLUMNS
    ))
    .bind(like_pattern(search))
    .fetch_all(db)
    .await
}

pub async fn update<'e, E>(
    db: E,
    mut current: Course,
    req: UpdateCourseRequest,
) -> Result<Course, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    if let Some(code) = req.code {
        current.code = code.trim().to_string();
    }
    if let Some(name) = req.name {
        current.name = name;
    }
    if let Some(description) = req.description {
        current.description = Some(description);
    }
    if let Some(credits) = req.credits {
        current.credits = credits;
    }
    if let Some(hours) = req.hours {
        current.hours = hours;
    }
    if let Some(max_students) = req.max_students {
        current.max_students = max_students;
    }
    if let Some(semester) = req.semester {
        current.semester = semester;
    }
    if let Some(academic_year) = req.academic_year {
        current.academic_year = academic_year;
    }
    current.updated_at = Utc::now();

    sqlx::query(
        r#"
        UPDATE courses
        SET code = ?1,
            name = ?2,
            description = ?3,
            credits = ?4,
            hours = ?5,
            max_students = ?6,
            semester = ?7,
            academic_year = ?8,
            updated_at = ?9
        WHERE id = ?10
        "#,
    )
    .bind(&current.code)
    .bind(&current.name)
    .bind(&current.description)
    .bind(current.credits)
    .bind(current.hours)
    .bind(current.max_students)
    .bind(&current.semester)
    .bind(&current.academic_year)
    .bind(current.updated_at)
    .bind(&current.id)
    .execute(db)
    .await?;

    Ok(current)
}

/// What deleting the course would take with it.
pub async fn deletion_summary<'e, E>(db: E, course: &Course) -> Result<CourseDeletion, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let (sections_removed, enrollments_cleared): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COALESCE(SUM(current_students), 0)
        FROM sections
        WHERE course_id = ?
        "#,
    )
    .bind(&course.id)
    .fetch_one(db)
    .await?;

    Ok(CourseDeletion {
        course_id: course.id.clone(),
        code: course.code.clone(),
        sections_removed,
        enrollments_cleared,
    })
}

/// Sections, their enrollments and announcements go with it via cascade.
pub async fn delete<'e, E>(db: E, id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn count<'e, E>(db: E) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar("SELECT COUNT(*) FROM courses").fetch_one(db).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fixtures, sections, setup_test_db};
    use crate::models::Role;

    #[tokio::test]
    async fn test_insert_and_fetch_course() {
        let pool = setup_test_db().await;

        let course = fixtures::course(&pool, "CS101").await;
        assert_eq!(course.code, "CS101");

        let fetched = find_by_id(&pool, &course.id)
            .await
            .expect("Failed to fetch course")
            .expect("Course not found");
        assert_eq!(fetched.name, "CS101 course");
        assert_eq!(fetched.credits, 3);

        let courses = list(&pool, None).await.expect("Failed to list courses");
        assert_eq!(courses.len(), 1);
    }

    #[tokio::test]
    async fn test_search_matches_code_and_name() {
        let pool = setup_test_db().await;
        fixtures::course(&pool, "CS101").await;
        fixtures::course(&pool, "MA201").await;

        let hits = list(&pool, Some("cs1")).await.expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].code, "CS101");

        let all = list(&pool, Some("   ")).await.expect("blank search");
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_update_course() {
        let pool = setup_test_db().await;
        let course = fixtures::course(&pool, "CS101").await;

        let updated = update(
            &pool,
            course.clone(),
            UpdateCourseRequest {
                name: Some("Programming I".to_string()),
                credits: Some(4),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update course");

        assert_eq!(updated.name, "Programming I");
        assert_eq!(updated.credits, 4);
        assert_eq!(updated.code, "CS101");

        let fetched = find_by_id(&pool, &course.id).await.expect("fetch").expect("exists");
        assert_eq!(fetched.name, "Programming I");
    }

    #[tokio::test]
    async fn test_delete_cascades_to_sections() {
        let pool = setup_test_db().await;
        let teacher = fixtures::user(&pool, "wang", Role::Teacher).await;
        let course = fixtures::course(&pool, "CS101").await;
        let section = fixtures::section(&pool, &course, &teacher, "01", 30).await;

        let summary = deletion_summary(&pool, &course).await.expect("summary");
        assert_eq!(summary.sections_removed, 1);
        assert_eq!(summary.enrollments_cleared, 0);

        assert!(delete(&pool, &course.id).await.expect("delete"));
        assert!(
            sections::find_by_id(&pool, &section.id)
                .await
                .expect("fetch section")
                .is_none()
        );
        assert!(!delete(&pool, &course.id).await.expect("second delete"));
    }
}
