use crate::{map_write_err, Db, DbError};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use common::Prescription;
use serde::Serialize;
use sqlx::types::Json;
use uuid::Uuid;

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRow {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(rename = "type")]
    pub appointment_type: String,
    pub status: String,
    pub date: NaiveDate,
    #[serde(rename = "time", with = "common::hhmm")]
    pub start_time: NaiveTime,
    #[serde(rename = "duration")]
    pub duration_minutes: i32,
    pub reason: String,
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescriptions: Json<Vec<Prescription>>,
    pub follow_up_required: bool,
    pub follow_up_date: Option<NaiveDate>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewAppointment<'a> {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_type: &'a str,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: i32,
    pub reason: &'a str,
    pub notes: Option<&'a str>,
    pub prescriptions: Vec<Prescription>,
    pub follow_up_required: bool,
    pub follow_up_date: Option<NaiveDate>,
    pub created_by: Uuid,
}

pub async fn insert_appointment(db: &Db, a: NewAppointment<'_>) -> Result<AppointmentRow, DbError> {
    let row = sqlx::query_as::<_, AppointmentRow>(
        r#"INSERT INTO appointments (
               patient_id, doctor_id, appointment_type, date, start_time,
               duration_minutes, reason, notes, prescriptions,
               follow_up_required, follow_up_date, created_by
           )
           VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
           RETURNING *"#,
    )
    .bind(a.patient_id)
    .bind(a.doctor_id)
    .bind(a.appointment_type)
    .bind(a.date)
    .bind(a.start_time)
    .bind(a.duration_minutes)
    .bind(a.reason)
    .bind(a.notes)
    .bind(Json(a.prescriptions))
    .bind(a.follow_up_required)
    .bind(a.follow_up_date)
    .bind(a.created_by)
    .fetch_one(&db.0)
    .await
    .map_err(map_write_err)?;
    Ok(row)
}

pub async fn find_appointment_by_id(db: &Db, id: Uuid) -> Result<Option<AppointmentRow>, DbError> {
    let row = sqlx::query_as::<_, AppointmentRow>("SELECT * FROM appointments WHERE id = $1")
        .bind(id)
        .fetch_optional(&db.0)
        .await?;
    Ok(row)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentFilter<'a> {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub status: Option<&'a str>,
}

pub async fn list_appointments(
    db: &Db,
    f: AppointmentFilter<'_>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<AppointmentRow>, i64), DbError> {
    let rows = sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT * FROM appointments
           WHERE ($1::UUID IS NULL OR doctor_id = $1)
             AND ($2::UUID IS NULL OR patient_id = $2)
             AND ($3::DATE IS NULL OR date = $3)
             AND ($4::TEXT IS NULL OR status = $4)
           ORDER BY date DESC, start_time DESC
           LIMIT $5 OFFSET $6"#,
    )
    .bind(f.doctor_id)
    .bind(f.patient_id)
    .bind(f.date)
    .bind(f.status)
    .bind(limit)
    .bind(offset)
    .fetch_all(&db.0)
    .await?;
    let total: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM appointments
           WHERE ($1::UUID IS NULL OR doctor_id = $1)
             AND ($2::UUID IS NULL OR patient_id = $2)
             AND ($3::DATE IS NULL OR date = $3)
             AND ($4::TEXT IS NULL OR status = $4)"#,
    )
    .bind(f.doctor_id)
    .bind(f.patient_id)
    .bind(f.date)
    .bind(f.status)
    .fetch_one(&db.0)
    .await?;
    Ok((rows, total))
}

pub struct AppointmentChanges<'a> {
    pub doctor_id: Option<Uuid>,
    pub appointment_type: Option<&'a str>,
    pub status: Option<&'a str>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub duration_minutes: Option<i32>,
    pub reason: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub diagnosis: Option<&'a str>,
    pub treatment: Option<&'a str>,
    pub prescriptions: Option<Vec<Prescription>>,
    pub follow_up_required: Option<bool>,
    pub follow_up_date: Option<NaiveDate>,
    pub updated_by: Uuid,
}

pub async fn update_appointment(
    db: &Db,
    id: Uuid,
    c: AppointmentChanges<'_>,
) -> Result<Option<AppointmentRow>, DbError> {
    let row = sqlx::query_as::<_, AppointmentRow>(
        r#"UPDATE appointments SET
               doctor_id          = COALESCE($2,  doctor_id),
               appointment_type   = COALESCE($3,  appointment_type),
               status             = COALESCE($4,  status),
               date               = COALESCE($5,  date),
               start_time         = COALESCE($6,  start_time),
               duration_minutes   = COALESCE($7,  duration_minutes),
               reason             = COALESCE($8,  reason),
               notes              = COALESCE($9,  notes),
               diagnosis          = COALESCE($10, diagnosis),
               treatment          = COALESCE($11, treatment),
               prescriptions      = COALESCE($12, prescriptions),
               follow_up_required = COALESCE($13, follow_up_required),
               follow_up_date     = COALESCE($14, follow_up_date),
               updated_by         = $15,
               updated_at         = NOW()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(id)
    .bind(c.doctor_id)
    .bind(c.appointment_type)
    .bind(c.status)
    .bind(c.date)
    .bind(c.start_time)
    .bind(c.duration_minutes)
    .bind(c.reason)
    .bind(c.notes)
    .bind(c.diagnosis)
    .bind(c.treatment)
    .bind(c.prescriptions.map(Json))
    .bind(c.follow_up_required)
    .bind(c.follow_up_date)
    .bind(c.updated_by)
    .fetch_optional(&db.0)
    .await
    .map_err(map_write_err)?;
    Ok(row)
}

pub async fn set_appointment_status(
    db: &Db,
    id: Uuid,
    status: &str,
    updated_by: Uuid,
) -> Result<Option<AppointmentRow>, DbError> {
    let row = sqlx::query_as::<_, AppointmentRow>(
        r#"UPDATE appointments
           SET status = $2, updated_by = $3, updated_at = NOW()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(id)
    .bind(status)
    .bind(updated_by)
    .fetch_optional(&db.0)
    .await?;
    Ok(row)
}

/// Application-level double-booking guard: exact (doctor, date, time) match
/// among schedule-blocking rows, optionally ignoring the row being updated.
/// Interval overlap is deliberately NOT considered here; only the
/// availability view reasons about durations.
pub async fn exact_slot_taken(
    db: &Db,
    doctor_id: Uuid,
    date: NaiveDate,
    start_time: NaiveTime,
    exclude: Option<Uuid>,
) -> Result<bool, DbError> {
    let taken: bool = sqlx::query_scalar(
        r#"SELECT EXISTS(
               SELECT 1 FROM appointments
               WHERE doctor_id = $1 AND date = $2 AND start_time = $3
                 AND status NOT IN ('cancelled', 'no-show')
                 AND ($4::UUID IS NULL OR id <> $4)
           )"#,
    )
    .bind(doctor_id)
    .bind(date)
    .bind(start_time)
    .bind(exclude)
    .fetch_one(&db.0)
    .await?;
    Ok(taken)
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct BookedSlotRow {
    #[serde(rename = "time", with = "common::hhmm")]
    pub start_time: NaiveTime,
    #[serde(rename = "duration")]
    pub duration_minutes: i32,
}

/// Schedule-blocking appointments for one doctor on one date, in time order.
pub async fn day_schedule(
    db: &Db,
    doctor_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<BookedSlotRow>, DbError> {
    let rows = sqlx::query_as::<_, BookedSlotRow>(
        r#"SELECT start_time, duration_minutes FROM appointments
           WHERE doctor_id = $1 AND date = $2
             AND status NOT IN ('cancelled', 'no-show')
           ORDER BY start_time"#,
    )
    .bind(doctor_id)
    .bind(date)
    .fetch_all(&db.0)
    .await?;
    Ok(rows)
}

pub async fn recent_appointments(db: &Db, limit: i64) -> Result<Vec<AppointmentRow>, DbError> {
    let rows = sqlx::query_as::<_, AppointmentRow>(
        "SELECT * FROM appointments ORDER BY created_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(&db.0)
    .await?;
    Ok(rows)
}
