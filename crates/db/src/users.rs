use crate::{map_write_err, Db, DbError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_user(
    db: &Db,
    username: &str,
    email: &str,
    password_hash: &str,
    first_name: &str,
    last_name: &str,
    role: &str,
) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"INSERT INTO users (username, email, password_hash, first_name, last_name, role)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING *"#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(first_name)
    .bind(last_name)
    .bind(role)
    .fetch_one(&db.0)
    .await
    .map_err(map_write_err)?;
    Ok(row)
}

pub async fn find_user_by_id(db: &Db, id: Uuid) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&db.0)
        .await?;
    Ok(row)
}

pub async fn find_user_by_email(db: &Db, email: &str) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(&db.0)
        .await?;
    Ok(row)
}

pub async fn find_user_by_username(db: &Db, username: &str) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(&db.0)
        .await?;
    Ok(row)
}

pub async fn list_users(db: &Db, limit: i64, offset: i64) -> Result<(Vec<UserRow>, i64), DbError> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(&db.0)
    .await?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&db.0)
        .await?;
    Ok((rows, total))
}

pub async fn list_doctors(db: &Db) -> Result<Vec<UserRow>, DbError> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT * FROM users WHERE role = 'doctor' AND is_active ORDER BY last_name, first_name",
    )
    .fetch_all(&db.0)
    .await?;
    Ok(rows)
}

#[allow(clippy::too_many_arguments)]
pub async fn update_user(
    db: &Db,
    id: Uuid,
    first_name: Option<&str>,
    last_name: Option<&str>,
    email: Option<&str>,
    role: Option<&str>,
    is_active: Option<bool>,
) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"UPDATE users SET
               first_name = COALESCE($2, first_name),
               last_name  = COALESCE($3, last_name),
               email      = COALESCE($4, email),
               role       = COALESCE($5, role),
               is_active  = COALESCE($6, is_active),
               updated_at = NOW()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(id)
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(role)
    .bind(is_active)
    .fetch_optional(&db.0)
    .await
    .map_err(map_write_err)?;
    Ok(row)
}

pub async fn touch_last_login(db: &Db, id: Uuid) -> Result<(), DbError> {
    sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(id)
        .execute(&db.0)
        .await?;
    Ok(())
}

pub async fn deactivate_user(db: &Db, id: Uuid) -> Result<u64, DbError> {
    let res = sqlx::query("UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&db.0)
        .await?;
    Ok(res.rows_affected())
}
