use chrono::Utc;
use serde::Serialize;
use sqlx::{Executor, FromRow, Sqlite};
use uuid::Uuid;

use crate::db::like_pattern;
use crate::models::{NewSectionRequest, Section, SectionSummary, UpdateSectionRequest};

/// Recorded counter next to the true number of seat-holding enrollments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Occupancy {
    pub section_id: String,
    pub max_students: i64,
    pub current_students: i64,
    pub occupying: i64,
}

pub async fn insert<'e, E>(db: E, req: NewSectionRequest) -> Result<Section, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    let section = Section {
        id: Uuid::new_v4().to_string(),
        course_id: req.course_id,
        teacher_id: req.teacher_id,
        code: req.code.trim().to_string(),
        classroom: req.classroom,
        schedule: req.schedule,
        max_students: req.max_students,
        current_students: 0,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO sections
            (id, course_id, teacher_id, code, classroom, schedule,
            max_students, current_students, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9)
        "#,
    )
    .bind(&section.id)
    .bind(&section.course_id)
    .bind(&section.teacher_id)
    .bind(&section.code)
    .bind(&section.classroom)
    .bind(&section.schedule)
    .bind(section.max_students)
    .bind(section.created_at)
    .bind(section.updated_at)
    .execute(db)
    .await?;

    Ok(section)
}

pub async fn find_by_id<'e, E>(db: E, id: &str) -> Result<Option<Section>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Section>(
        r#"
        SELECT id, course_id, teacher_id, code, classroom, schedule,
            max_students, current_students, created_at, updated_at
        FROM sections
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn list_by_course<'e, E>(db: E, course_id: &str) -> Result<Vec<Section>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Section>(
        r#"
        SELECT id, course_id, teacher_id, code, classroom, schedule,
            max_students, current_students, created_at, updated_at
        FROM sections
        WHERE course_id = ?
        ORDER BY code
        "#,
    )
    .bind(course_id)
    .fetch_all(db)
    .await
}

pub async fn list_by_teacher<'e, E>(db: E, teacher_id: &str) -> Result<Vec<Section>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Section>(
        r#"
        SELECT id, course_id, teacher_id, code, classroom, schedule,
            max_students, current_students, created_at, updated_at
        FROM sections
        WHERE teacher_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(teacher_id)
    .fetch_all(db)
    .await
}

/// Newest first; `search` matches section code, course name or teacher username.
pub async fn list_summaries<'e, E>(db: E, search: Option<&str>) -> Result<Vec<SectionSummary>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, SectionSummary>(
        r#"
        SELECT s.id, s.course_id, c.code AS course_code, c.name AS course_name,
            s.teacher_id, u.username AS teacher_username,
            s.code, s.classroom, s.schedule, s.max_students, s.current_students, s.created_at
        FROM sections s
        JOIN courses c ON c.id = s.course_id
        JOIN users u ON u.id = s.teacher_id
        WHERE (?1 IS NULL OR s.code LIKE ?1 OR c.name LIKE ?1 OR u.username LIKE ?1)
        ORDER BY s.created_at DESC
        "#,
    )
    .bind(like_pattern(search))
    .fetch_all(db)
    .await
}

/// Sections with a free seat where the student holds no record at all.
pub async fn list_available_for_student<'e, E>(
    db: E,
    student_id: &str,
    limit: i64,
) -> Result<Vec<SectionSummary>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, SectionSummary>(
        r#"
        SELECT s.id, s.course_id, c.code AS course_code, c.name AS course_name,
            s.teacher_id, u.username AS teacher_username,
            s.code, s.classroom, s.schedule, s.max_students, s.current_students, s.created_at
        FROM sections s
        JOIN courses c ON c.id = s.course_id
        JOIN users u ON u.id = s.teacher_id
        WHERE s.current_students < s.max_students
          AND NOT EXISTS (
              SELECT 1 FROM enrollments e
              WHERE e.section_id = s.id AND e.student_id = ?1
          )
        ORDER BY s.created_at DESC
        LIMIT ?2
        "#,
    )
    .bind(student_id)
    .bind(limit)
    .fetch_all(db)
    .await
}

/// Writes everything except the capacity and the counter.
pub async fn update_details<'e, E>(
    db: E,
    mut current: Section,
    req: &UpdateSectionRequest,
) -> Result<Section, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    if let Some(teacher_id) = &req.teacher_id {
        current.teacher_id = teacher_id.clone();
    }
    if let Some(code) = &req.code {
        current.code = code.trim().to_string();
    }
    if let Some(classroom) = &req.classroom {
        current.classroom = classroom.clone();
    }
    if let Some(schedule) = &req.schedule {
        current.schedule = schedule.clone();
    }
    current.updated_at = Utc::now();

    sqlx::query(
        r#"
        UPDATE sections
        SET teacher_id = ?1,
            code = ?2,
            classroom = ?3,
            schedule = ?4,
            updated_at = ?5
        WHERE id = ?6
        "#,
    )
    .bind(&current.teacher_id)
    .bind(&current.code)
    .bind(&current.classroom)
    .bind(&current.schedule)
    .bind(current.updated_at)
    .bind(&current.id)
    .execute(db)
    .await?;

    Ok(current)
}

/// Changes capacity unless that would put it under the current occupancy.
/// Returns false when the section is missing or the new capacity is too small.
pub async fn set_capacity<'e, E>(db: E, id: &str, max_students: i64) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE sections
        SET max_students = ?1,
            updated_at = ?2
        WHERE id = ?3 AND current_students <= ?1
        "#,
    )
    .bind(max_students)
    .bind(Utc::now())
    .bind(id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn delete<'e, E>(db: E, id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM sections WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

/// Takes a seat only if one is free. Check and increment are a single
/// statement, so concurrent callers cannot oversubscribe the section.
pub async fn reserve_seat<'e, E>(db: E, id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE sections
        SET current_students = current_students + 1,
            updated_at = ?2
        WHERE id = ?1 AND current_students < max_students
        "#,
    )
    .bind(id)
    .bind(Utc::now())
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

/// Gives a seat back. Returns false if the counter was already zero, in
/// which case it is left at zero.
pub async fn release_seat<'e, E>(db: E, id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE sections
        SET current_students = current_students - 1,
            updated_at = ?2
        WHERE id = ?1 AND current_students > 0
        "#,
    )
    .bind(id)
    .bind(Utc::now())
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn occupancy<'e, E>(db: E) -> Result<Vec<Occupancy>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Occupancy>(
        r#"
        SELECT s.id AS section_id, s.max_students, s.current_students,
            (SELECT COUNT(*) FROM enrollments e
             WHERE e.section_id = s.id AND e.status IN ('pending', 'approved')) AS occupying
        FROM sections s
        ORDER BY s.id
        "#,
    )
    .fetch_all(db)
    .await
}

/// Rewrites the counter from the enrollment table. Skips sections whose true
/// occupancy exceeds capacity; returns whether a row was written.
pub async fn recount<'e, E>(db: E, id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE sections
        SET current_students = (
                SELECT COUNT(*) FROM enrollments e
                WHERE e.section_id = sections.id AND e.status IN ('pending', 'approved')
            ),
            updated_at = ?2
        WHERE id = ?1
          AND (SELECT COUNT(*) FROM enrollments e
               WHERE e.section_id = sections.id AND e.status IN ('pending', 'approved')) <= max_students
        "#,
    )
    .bind(id)
    .bind(Utc::now())
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}
