use chrono::Utc;
use sqlx::{Executor, Sqlite};
use uuid::Uuid;

use crate::models::{NewUserRequest, Role, User};

pub async fn insert<'e, E>(db: E, req: NewUserRequest) -> Result<User, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let user = User {
        id: req.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        username: req.username,
        display_name: req.display_name,
        role: req.role,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO users (id, username, display_name, role, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.display_name)
    .bind(user.role)
    .bind(user.created_at)
    .execute(db)
    .await?;

    Ok(user)
}

pub async fn find_by_id<'e, E>(db: E, id: &str) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, User>(
        "SELECT id, username, display_name, role, created_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn find_by_username<'e, E>(db: E, username: &str) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, User>(
        "SELECT id, username, display_name, role, created_at FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(db)
    .await
}

pub async fn list<'e, E>(db: E, role: Option<Role>) -> Result<Vec<User>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, display_name, role, created_at
        FROM users
        WHERE (?1 IS NULL OR role = ?1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(role)
    .fetch_all(db)
    .await
}

pub async fn count<'e, E>(db: E, role: Option<Role>) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE (?1 IS NULL OR role = ?1)")
        .bind(role)
        .fetch_one(db)
        .await
}
