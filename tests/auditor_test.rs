mod common;

use std::time::Duration;

use common::{course, current_students, memory_pool, section, user};
use course_portal::models::Role;
use course_portal::services::{CounterAuditor, EnrollmentLedger};

#[tokio::test]
async fn test_run_audit_reports_without_repair() {
    let pool = memory_pool().await;
    let teacher = user(&pool, "wang", Role::Teacher).await;
    let course = course(&pool, "CS240").await;
    let section = section(&pool, &course, &teacher, "01", 10).await;

    sqlx::query("UPDATE sections SET current_students = 4 WHERE id = ?")
        .bind(&section.id)
        .execute(&pool)
        .await
        .expect("Failed to skew counter");

    let auditor = CounterAuditor::new(EnrollmentLedger::new(pool.clone()), 60, false);
    let report = auditor.run_audit().await.expect("audit");

    assert_eq!(report.drifted.len(), 1);
    assert!(!report.drifted[0].repaired);
    assert_eq!(current_students(&pool, &section.id).await, 4);
}

#[tokio::test]
async fn test_auditor_loop_repairs_drift() {
    let pool = memory_pool().await;
    let teacher = user(&pool, "wang", Role::Teacher).await;
    let student = user(&pool, "li", Role::Student).await;
    let course = course(&pool, "CS240").await;
    let section = section(&pool, &course, &teacher, "01", 10).await;

    let ledger = EnrollmentLedger::new(pool.clone());
    ledger.enroll(&student.id, &section.id, None).await.expect("enroll");

    sqlx::query("UPDATE sections SET current_students = 7 WHERE id = ?")
        .bind(&section.id)
        .execute(&pool)
        .await
        .expect("Failed to skew counter");

    let auditor = CounterAuditor::new(ledger, 1, true);
    let auditor_task = tokio::spawn(auditor.start());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    auditor_task.abort();

    assert_eq!(current_students(&pool, &section.id).await, 1);
}
