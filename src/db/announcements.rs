use chrono::Utc;
use sqlx::{Executor, Sqlite};
use uuid::Uuid;

use crate::models::{Announcement, NewAnnouncementRequest};

pub async fn insert<'e, E>(
    db: E,
    author_id: &str,
    req: NewAnnouncementRequest,
) -> Result<Announcement, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    let announcement = Announcement {
        id: Uuid::new_v4().to_string(),
        title: req.title,
        content: req.content,
        author_id: author_id.to_string(),
        section_id: req.section_id,
        is_active: req.is_active,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO announcements
            (id, title, content, author_id, section_id, is_active, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&announcement.id)
    .bind(&announcement.title)
    .bind(&announcement.content)
    .bind(&announcement.author_id)
    .bind(&announcement.section_id)
    .bind(announcement.is_active)
    .bind(announcement.created_at)
    .bind(announcement.updated_at)
    .execute(db)
    .await?;

    Ok(announcement)
}

/// Active announcements, newest first. With a section id, only that
/// section's; without, every active announcement.
pub async fn list_active<'e, E>(db: E, section_id: Option<&str>) -> Result<Vec<Announcement>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Announcement>(
        r#"
        SELECT id, title, content, author_id, section_id, is_active, created_at, updated_at
        FROM announcements
        WHERE is_active = 1 AND (?1 IS NULL OR section_id = ?1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(section_id)
    .fetch_all(db)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fixtures, setup_test_db};
    use crate::models::Role;

    #[tokio::test]
    async fn test_only_active_announcements_are_listed() {
        let pool = setup_test_db().await;
        let teacher = fixtures::user(&pool, "wang", Role::Teacher).await;
        let course = fixtures::course(&pool, "CS101").await;
        let section = fixtures::section(&pool, &course, &teacher, "01", 5).await;

        let make = |title: &str, section_id: Option<String>, is_active: bool| NewAnnouncementRequest {
            title: title.to_string(),
            content: "room change".to_string(),
            section_id,
            is_active,
        };

        insert(&pool, &teacher.id, make("moved", Some(section.id.clone()), true))
            .await
            .expect("insert");
        insert(&pool, &teacher.id, make("draft", Some(section.id.clone()), false))
            .await
            .expect("insert");
        insert(&pool, &teacher.id, make("campus", None, true))
            .await
            .expect("insert");

        let scoped = list_active(&pool, Some(&section.id)).await.expect("list");
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].title, "moved");

        assert_eq!(list_active(&pool, None).await.expect("list").len(), 2);
    }
}
