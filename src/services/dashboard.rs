use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::{courses, enrollments, sections, users};
use crate::db::enrollments::Scope;
use crate::models::{Enrollment, EnrollmentStatus, Role, Section, SectionSummary};

/// Sections listed on a student's dashboard.
pub const AVAILABLE_SECTION_LIMIT: i64 = 10;

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Dashboard {
    Admin {
        total_users: i64,
        total_students: i64,
        total_teachers: i64,
        total_courses: i64,
        approved_enrollments: i64,
        pending_enrollments: i64,
    },
    Teacher {
        sections: Vec<Section>,
        total_students: i64,
    },
    Student {
        enrollments: Vec<Enrollment>,
        available_sections: Vec<SectionSummary>,
    },
}

pub async fn build(db: &SqlitePool, user_id: &str, role: Role) -> Result<Dashboard, sqlx::Error> {
    let dashboard = match role {
        Role::Admin => Dashboard::Admin {
            total_users: users::count(db, None).await?,
            total_students: users::count(db, Some(Role::Student)).await?,
            total_teachers: users::count(db, Some(Role::Teacher)).await?,
            total_courses: courses::count(db).await?,
            approved_enrollments: enrollments::count_by_status(db, EnrollmentStatus::Approved).await?,
            pending_enrollments: enrollments::count_by_status(db, EnrollmentStatus::Pending).await?,
        },
        Role::Teacher => Dashboard::Teacher {
            sections: sections::list_by_teacher(db, user_id).await?,
            total_students: enrollments::count_approved_for_teacher(db, user_id).await?,
        },
        Role::Student => Dashboard::Student {
            enrollments: enrollments::list(db, Scope::Student(user_id), Some(EnrollmentStatus::Approved)).await?,
            available_sections: sections::list_available_for_student(db, user_id, AVAILABLE_SECTION_LIMIT).await?,
        },
    };

    Ok(dashboard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fixtures, setup_test_db};
    use crate::services::EnrollmentLedger;

    #[tokio::test]
    async fn test_dashboard_per_role() {
        let pool = setup_test_db().await;
        let admin = fixtures::user(&pool, "root", Role::Admin).await;
        let teacher = fixtures::user(&pool, "wang", Role::Teacher).await;
        let student = fixtures::user(&pool, "li", Role::Student).await;
        let course = fixtures::course(&pool, "CS101").await;
        let s1 = fixtures::section(&pool, &course, &teacher, "01", 30).await;
        let s2 = fixtures::section(&pool, &course, &teacher, "02", 30).await;

        let ledger = EnrollmentLedger::new(pool.clone());
        let rec = ledger.enroll(&student.id, &s1.id, None).await.expect("enroll");
        ledger.approve(&rec.id).await.expect("approve");

        match build(&pool, &admin.id, Role::Admin).await.expect("admin dashboard") {
            Dashboard::Admin {
                total_users,
                total_students,
                total_teachers,
                total_courses,
                approved_enrollments,
                pending_enrollments,
            } => {
                assert_eq!(total_users, 3);
                assert_eq!(total_students, 1);
                assert_eq!(total_teachers, 1);
                assert_eq!(total_courses, 1);
                assert_eq!(approved_enrollments, 1);
                assert_eq!(pending_enrollments, 0);
            }
            other => panic!("unexpected dashboard {:?}", other),
        }

        match build(&pool, &teacher.id, Role::Teacher).await.expect("teacher dashboard") {
            Dashboard::Teacher { sections, total_students } => {
                assert_eq!(sections.len(), 2);
                assert_eq!(total_students, 1);
            }
            other => panic!("unexpected dashboard {:?}", other),
        }

        match build(&pool, &student.id, Role::Student).await.expect("student dashboard") {
            Dashboard::Student {
                enrollments,
                available_sections,
            } => {
                assert_eq!(enrollments.len(), 1);
                assert_eq!(available_sections.len(), 1);
                assert_eq!(available_sections[0].id, s2.id);
            }
            other => panic!("unexpected dashboard {:?}", other),
        }
    }
}
