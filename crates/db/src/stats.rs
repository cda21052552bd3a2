use crate::{AppointmentRow, Db, DbError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

pub async fn count_active_patients(db: &Db) -> Result<i64, DbError> {
    let n = sqlx::query_scalar("SELECT COUNT(*) FROM patients WHERE is_active")
        .fetch_one(&db.0)
        .await?;
    Ok(n)
}

pub async fn count_active_doctors(db: &Db) -> Result<i64, DbError> {
    let n = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'doctor' AND is_active")
        .fetch_one(&db.0)
        .await?;
    Ok(n)
}

pub async fn count_appointments_on(db: &Db, date: NaiveDate) -> Result<i64, DbError> {
    let n = sqlx::query_scalar("SELECT COUNT(*) FROM appointments WHERE date = $1")
        .bind(date)
        .fetch_one(&db.0)
        .await?;
    Ok(n)
}

pub async fn count_pending_appointments(db: &Db) -> Result<i64, DbError> {
    let n = sqlx::query_scalar(
        "SELECT COUNT(*) FROM appointments WHERE status IN ('scheduled', 'confirmed')",
    )
    .fetch_one(&db.0)
    .await?;
    Ok(n)
}

pub async fn count_completed_on(db: &Db, date: NaiveDate) -> Result<i64, DbError> {
    let n = sqlx::query_scalar(
        "SELECT COUNT(*) FROM appointments WHERE date = $1 AND status = 'completed'",
    )
    .bind(date)
    .fetch_one(&db.0)
    .await?;
    Ok(n)
}

pub async fn count_patients_since(db: &Db, since: DateTime<Utc>) -> Result<i64, DbError> {
    let n = sqlx::query_scalar("SELECT COUNT(*) FROM patients WHERE is_active AND created_at >= $1")
        .bind(since)
        .fetch_one(&db.0)
        .await?;
    Ok(n)
}

pub async fn upcoming_appointments(
    db: &Db,
    from: NaiveDate,
    limit: i64,
) -> Result<Vec<AppointmentRow>, DbError> {
    let rows = sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT * FROM appointments
           WHERE date >= $1 AND status IN ('scheduled', 'confirmed')
           ORDER BY date, start_time
           LIMIT $2"#,
    )
    .bind(from)
    .bind(limit)
    .fetch_all(&db.0)
    .await?;
    Ok(rows)
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct StatusCountRow {
    pub status: String,
    pub count: i64,
}

pub async fn appointments_by_status(db: &Db) -> Result<Vec<StatusCountRow>, DbError> {
    let rows = sqlx::query_as::<_, StatusCountRow>(
        "SELECT status, COUNT(*) AS count FROM appointments GROUP BY status",
    )
    .fetch_all(&db.0)
    .await?;
    Ok(rows)
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct TrendRow {
    pub year: i32,
    pub month: i32,
    pub status: String,
    pub count: i64,
}

/// Monthly appointment counts per status since `from`, oldest first.
pub async fn appointment_trend_since(db: &Db, from: NaiveDate) -> Result<Vec<TrendRow>, DbError> {
    let rows = sqlx::query_as::<_, TrendRow>(
        r#"SELECT EXTRACT(YEAR FROM date)::INT AS year,
                  EXTRACT(MONTH FROM date)::INT AS month,
                  status,
                  COUNT(*) AS count
           FROM appointments
           WHERE date >= $1
           GROUP BY year, month, status
           ORDER BY year, month, status"#,
    )
    .bind(from)
    .fetch_all(&db.0)
    .await?;
    Ok(rows)
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct GenderCountRow {
    pub gender: String,
    pub count: i64,
}

pub async fn gender_distribution(db: &Db) -> Result<Vec<GenderCountRow>, DbError> {
    let rows = sqlx::query_as::<_, GenderCountRow>(
        "SELECT gender, COUNT(*) AS count FROM patients WHERE is_active GROUP BY gender",
    )
    .fetch_all(&db.0)
    .await?;
    Ok(rows)
}

/// Birth dates of active patients; age bracketing happens in the caller.
pub async fn patient_birth_dates(db: &Db) -> Result<Vec<NaiveDate>, DbError> {
    let rows: Vec<NaiveDate> =
        sqlx::query_scalar("SELECT date_of_birth FROM patients WHERE is_active")
            .fetch_all(&db.0)
            .await?;
    Ok(rows)
}
