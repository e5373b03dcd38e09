use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite};

use crate::models::{Enrollment, EnrollmentStatus};

/// Which enrollments a listing may show.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'s> {
    All,
    Teacher(&'s str),
    Student(&'s str),
}

pub async fn insert<'e, E>(db: E, enrollment: &Enrollment) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO enrollments
            (id, student_id, section_id, status, enrolled_at, approved_at, grade, remarks)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&enrollment.id)
    .bind(&enrollment.student_id)
    .bind(&enrollment.section_id)
    .bind(enrollment.status)
    .bind(enrollment.enrolled_at)
    .bind(enrollment.approved_at)
    .bind(enrollment.grade)
    .bind(&enrollment.remarks)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn find_by_id<'e, E>(db: E, id: &str) -> Result<Option<Enrollment>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Enrollment>(
        r#"
        SELECT id, student_id, section_id, status, enrolled_at, approved_at, grade, remarks
        FROM enrollments
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn find_for_student<'e, E>(
    db: E,
    student_id: &str,
    section_id: &str,
) -> Result<Option<Enrollment>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Enrollment>(
        r#"
        SELECT id, student_id, section_id, status, enrolled_at, approved_at, grade, remarks
        FROM enrollments
        WHERE student_id = ?1 AND section_id = ?2
        "#,
    )
    .bind(student_id)
    .bind(section_id)
    .fetch_optional(db)
    .await
}

pub async fn list_by_section<'e, E>(db: E, section_id: &str) -> Result<Vec<Enrollment>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Enrollment>(
        r#"
        SELECT id, student_id, section_id, status, enrolled_at, approved_at, grade, remarks
        FROM enrollments
        WHERE section_id = ?
        ORDER BY enrolled_at DESC
        "#,
    )
    .bind(section_id)
    .fetch_all(db)
    .await
}

/// Newest first, limited to what `scope` may see.
pub async fn list<'e, E>(
    db: E,
    scope: Scope<'_>,
    status: Option<EnrollmentStatus>,
) -> Result<Vec<Enrollment>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let (teacher_id, student_id) = match scope {
        Scope::All => (None, None),
        Scope::Teacher(id) => (Some(id), None),
        Scope::Student(id) => (None, Some(id)),
    };

    sqlx::query_as::<_, Enrollment>(
        r#"
        SELECT e.id, e.student_id, e.section_id, e.status, e.enrolled_at,
            e.approved_at, e.grade, e.remarks
        FROM enrollments e
        JOIN sections s ON s.id = e.section_id
        WHERE (?1 IS NULL OR s.teacher_id = ?1)
          AND (?2 IS NULL OR e.student_id = ?2)
          AND (?3 IS NULL OR e.status = ?3)
        ORDER BY e.enrolled_at DESC
        "#,
    )
    .bind(teacher_id)
    .bind(student_id)
    .bind(status)
    .fetch_all(db)
    .await
}

/// Moves the record to `to` only while it is still in `from`.
/// `approved_at` is written when given and kept otherwise.
pub async fn compare_and_set_status<'e, E>(
    db: E,
    id: &str,
    from: EnrollmentStatus,
    to: EnrollmentStatus,
    approved_at: Option<DateTime<Utc>>,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE enrollments
        SET status = ?1,
            approved_at = COALESCE(?2, approved_at)
        WHERE id = ?3 AND status = ?4
        "#,
    )
    .bind(to)
    .bind(approved_at)
    .bind(id)
    .bind(from)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

/// Deletes the record only while it is still in `status`.
pub async fn delete_if_status<'e, E>(db: E, id: &str, status: EnrollmentStatus) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM enrollments WHERE id = ?1 AND status = ?2")
        .bind(id)
        .bind(status)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn set_grade<'e, E>(
    db: E,
    id: &str,
    grade: f64,
    remarks: Option<&str>,
) -> Result<Option<Enrollment>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Enrollment>(
        r#"
        UPDATE enrollments
        SET grade = ?1,
            remarks = COALESCE(?2, remarks)
        WHERE id = ?3
        RETURNING id, student_id, section_id, status, enrolled_at, approved_at, grade, remarks
        "#,
    )
    .bind(grade)
    .bind(remarks)
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn count_by_status<'e, E>(db: E, status: EnrollmentStatus) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE status = ?")
        .bind(status)
        .fetch_one(db)
        .await
}

pub async fn count_approved_for_teacher<'e, E>(db: E, teacher_id: &str) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM enrollments e
        JOIN sections s ON s.id = e.section_id
        WHERE s.teacher_id = ? AND e.status = 'approved'
        "#,
    )
    .bind(teacher_id)
    .fetch_one(db)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fixtures, setup_test_db};
    use crate::models::Role;

    #[tokio::test]
    async fn test_compare_and_set_requires_expected_status() {
        let pool = setup_test_db().await;
        let teacher = fixtures::user(&pool, "wang", Role::Teacher).await;
        let student = fixtures::user(&pool, "li", Role::Student).await;
        let course = fixtures::course(&pool, "CS101").await;
        let section = fixtures::section(&pool, &course, &teacher, "01", 5).await;

        let enrollment = Enrollment::new_pending(&student.id, &section.id, None);
        insert(&pool, &enrollment).await.expect("insert");

        let now = Utc::now();
        assert!(
            compare_and_set_status(&pool, &enrollment.id, EnrollmentStatus::Pending, EnrollmentStatus::Approved, Some(now))
                .await
                .expect("cas")
        );
        assert!(
            !compare_and_set_status(&pool, &enrollment.id, EnrollmentStatus::Pending, EnrollmentStatus::Rejected, None)
                .await
                .expect("stale cas")
        );

        let fetched = find_by_id(&pool, &enrollment.id).await.expect("fetch").expect("exists");
        assert_eq!(fetched.status, EnrollmentStatus::Approved);
        assert!(fetched.approved_at.is_some());

        assert!(!delete_if_status(&pool, &enrollment.id, EnrollmentStatus::Pending).await.expect("delete"));
        assert!(find_by_id(&pool, &enrollment.id).await.expect("fetch").is_some());
    }

    #[tokio::test]
    async fn test_scoped_listing() {
        let pool = setup_test_db().await;
        let wang = fixtures::user(&pool, "wang", Role::Teacher).await;
        let zhou = fixtures::user(&pool, "zhou", Role::Teacher).await;
        let li = fixtures::user(&pool, "li", Role::Student).await;
        let chen = fixtures::user(&pool, "chen", Role::Student).await;
        let course = fixtures::course(&pool, "CS101").await;
        let a = fixtures::section(&pool, &course, &wang, "01", 5).await;
        let b = fixtures::section(&pool, &course, &zhou, "02", 5).await;

        for (student, section) in [(&li, &a), (&chen, &a), (&li, &b)] {
            insert(&pool, &Enrollment::new_pending(&student.id, &section.id, None))
                .await
                .expect("insert");
        }

        assert_eq!(list(&pool, Scope::All, None).await.expect("all").len(), 3);
        assert_eq!(list(&pool, Scope::Teacher(&wang.id), None).await.expect("teacher").len(), 2);
        assert_eq!(list(&pool, Scope::Student(&li.id), None).await.expect("student").len(), 2);
        assert!(
            list(&pool, Scope::All, Some(EnrollmentStatus::Approved))
                .await
                .expect("filtered")
                .is_empty()
        );
        assert_eq!(count_by_status(&pool, EnrollmentStatus::Pending).await.expect("count"), 3);
    }

    #[tokio::test]
    async fn test_unique_per_student_and_section() {
        let pool = setup_test_db().await;
        let teacher = fixtures::user(&pool, "wang", Role::Teacher).await;
        let student = fixtures::user(&pool, "li", Role::Student).await;
        let course = fixtures::course(&pool, "CS101").await;
        let section = fixtures::section(&pool, &course, &teacher, "01", 5).await;

        insert(&pool, &Enrollment::new_pending(&student.id, &section.id, None))
            .await
            .expect("first insert");
        let err = insert(&pool, &Enrollment::new_pending(&student.id, &section.id, None))
            .await
            .expect_err("second insert must fail");

        match err {
            sqlx::Error::Database(db) => assert!(db.is_unique_violation()),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
