use crate::{map_write_err, Db, DbError};
use chrono::{DateTime, NaiveDate, Utc};
use common::{Address, EmergencyContact, MedicalHistoryEntry, MedicationEntry};
use serde::Serialize;
use sqlx::types::Json;
use uuid::Uuid;

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub address: Json<Address>,
    pub emergency_contact: Json<EmergencyContact>,
    pub medical_history: Json<Vec<MedicalHistoryEntry>>,
    pub medications: Json<Vec<MedicationEntry>>,
    pub allergies: Json<Vec<String>>,
    pub blood_type: Option<String>,
    pub assigned_doctor: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PatientRow {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn age(&self) -> i64 {
        common::age_years(self.date_of_birth, Utc::now().date_naive())
    }
}

pub struct NewPatient<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub date_of_birth: NaiveDate,
    pub gender: &'a str,
    pub address: Address,
    pub emergency_contact: EmergencyContact,
    pub medical_history: Vec<MedicalHistoryEntry>,
    pub medications: Vec<MedicationEntry>,
    pub allergies: Vec<String>,
    pub blood_type: Option<&'a str>,
    pub assigned_doctor: Option<Uuid>,
}

pub async fn insert_patient(db: &Db, p: NewPatient<'_>) -> Result<PatientRow, DbError> {
    let row = sqlx::query_as::<_, PatientRow>(
        r#"INSERT INTO patients (
               first_name, last_name, email, phone, date_of_birth, gender,
               address, emergency_contact, medical_history, medications,
               allergies, blood_type, assigned_doctor
           )
           VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
           RETURNING *"#,
    )
    .bind(p.first_name)
    .bind(p.last_name)
    .bind(p.email)
    .bind(p.phone)
    .bind(p.date_of_birth)
    .bind(p.gender)
    .bind(Json(p.address))
    .bind(Json(p.emergency_contact))
    .bind(Json(p.medical_history))
    .bind(Json(p.medications))
    .bind(Json(p.allergies))
    .bind(p.blood_type)
    .bind(p.assigned_doctor)
    .fetch_one(&db.0)
    .await
    .map_err(map_write_err)?;
    Ok(row)
}

/// Active-only view by default; `include_inactive` is the admin audit path.
pub async fn find_patient_by_id(
    db: &Db,
    id: Uuid,
    include_inactive: bool,
) -> Result<Option<PatientRow>, DbError> {
    let row = sqlx::query_as::<_, PatientRow>(
        "SELECT * FROM patients WHERE id = $1 AND (is_active OR $2)",
    )
    .bind(id)
    .bind(include_inactive)
    .fetch_optional(&db.0)
    .await?;
    Ok(row)
}

pub async fn list_patients(
    db: &Db,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<PatientRow>, i64), DbError> {
    let pattern = search.map(|s| format!("%{}%", s));
    let rows = sqlx::query_as::<_, PatientRow>(
        r#"SELECT * FROM patients
           WHERE is_active
             AND ($1::TEXT IS NULL
                  OR first_name ILIKE $1 OR last_name ILIKE $1 OR email ILIKE $1)
           ORDER BY created_at DESC
           LIMIT $2 OFFSET $3"#,
    )
    .bind(pattern.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(&db.0)
    .await?;
    let total: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM patients
           WHERE is_active
             AND ($1::TEXT IS NULL
                  OR first_name ILIKE $1 OR last_name ILIKE $1 OR email ILIKE $1)"#,
    )
    .bind(pattern.as_deref())
    .fetch_one(&db.0)
    .await?;
    Ok((rows, total))
}

pub struct PatientChanges<'a> {
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<&'a str>,
    pub address: Option<Address>,
    pub emergency_contact: Option<EmergencyContact>,
    pub medical_history: Option<Vec<MedicalHistoryEntry>>,
    pub medications: Option<Vec<MedicationEntry>>,
    pub allergies: Option<Vec<String>>,
    pub blood_type: Option<&'a str>,
    pub assigned_doctor: Option<Uuid>,
}

pub async fn update_patient(
    db: &Db,
    id: Uuid,
    c: PatientChanges<'_>,
) -> Result<Option<PatientRow>, DbError> {
    let row = sqlx::query_as::<_, PatientRow>(
        r#"UPDATE patients SET
               first_name        = COALESCE($2,  first_name),
               last_name         = COALESCE($3,  last_name),
               email             = COALESCE($4,  email),
               phone             = COALESCE($5,  phone),
               date_of_birth     = COALESCE($6,  date_of_birth),
               gender            = COALESCE($7,  gender),
               address           = COALESCE($8,  address),
               emergency_contact = COALESCE($9,  emergency_contact),
               medical_history   = COALESCE($10, medical_history),
               medications       = COALESCE($11, medications),
               allergies         = COALESCE($12, allergies),
               blood_type        = COALESCE($13, blood_type),
               assigned_doctor   = COALESCE($14, assigned_doctor),
               updated_at        = NOW()
           WHERE id = $1 AND is_active
           RETURNING *"#,
    )
    .bind(id)
    .bind(c.first_name)
    .bind(c.last_name)
    .bind(c.email)
    .bind(c.phone)
    .bind(c.date_of_birth)
    .bind(c.gender)
    .bind(c.address.map(Json))
    .bind(c.emergency_contact.map(Json))
    .bind(c.medical_history.map(Json))
    .bind(c.medications.map(Json))
    .bind(c.allergies.map(Json))
    .bind(c.blood_type)
    .bind(c.assigned_doctor)
    .fetch_optional(&db.0)
    .await
    .map_err(map_write_err)?;
    Ok(row)
}

pub async fn deactivate_patient(db: &Db, id: Uuid) -> Result<u64, DbError> {
    let res = sqlx::query(
        "UPDATE patients SET is_active = FALSE, updated_at = NOW() WHERE id = $1 AND is_active",
    )
    .bind(id)
    .execute(&db.0)
    .await?;
    Ok(res.rows_affected())
}

pub async fn recent_patients(db: &Db, limit: i64) -> Result<Vec<PatientRow>, DbError> {
    let rows = sqlx::query_as::<_, PatientRow>(
        "SELECT * FROM patients WHERE is_active ORDER BY created_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(&db.0)
    .await?;
    Ok(rows)
}
