use crate::error::{conflict, not_found, parse_id, validation, HttpApiError};
use crate::extractors::{require_role, Principal};
use crate::schemas::{PatientCreateInput, PatientUpdateInput};
use crate::state::AppState;
use actix_web::{delete, get, post, put, web, HttpResponse};
use common::{ApiResponse, Pagination, Role};
use db::{NewPatient, PatientChanges, PatientRow};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Stored record plus the derived attributes the dashboard renders.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientResponse {
    #[serde(flatten)]
    pub record: PatientRow,
    pub full_name: String,
    pub age: i64,
}

impl From<PatientRow> for PatientResponse {
    fn from(record: PatientRow) -> Self {
        let full_name = record.full_name();
        let age = record.age();
        Self {
            record,
            full_name,
            age,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PatientListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[get("/patients")]
pub async fn list(
    data: web::Data<AppState>,
    _who: Principal,
    query: web::Query<PatientListQuery>,
) -> Result<HttpResponse, HttpApiError> {
    let pq = common::PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let (page_no, limit) = pq.clamp();
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let (rows, total) = db::list_patients(&data.db, search, limit, pq.offset()).await?;
    let patients: Vec<PatientResponse> = rows.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::page(
        patients,
        Pagination::new(page_no, limit, total),
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientGetQuery {
    pub include_inactive: Option<bool>,
}

#[get("/patients/{id}")]
pub async fn get(
    data: web::Data<AppState>,
    who: Principal,
    path: web::Path<String>,
    query: web::Query<PatientGetQuery>,
) -> Result<HttpResponse, HttpApiError> {
    let id = parse_id(&path)?;
    // soft-deleted records stay readable for admin audits only
    let include_inactive = who.role == Role::Admin && query.include_inactive.unwrap_or(false);
    let patient = db::find_patient_by_id(&data.db, id, include_inactive)
        .await?
        .ok_or_else(|| not_found("patient"))?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(PatientResponse::from(patient))))
}

#[post("/patients")]
pub async fn create(
    data: web::Data<AppState>,
    who: Principal,
    payload: web::Json<PatientCreateInput>,
) -> Result<HttpResponse, HttpApiError> {
    require_role(&who, &[Role::Admin, Role::Doctor, Role::Nurse])?;
    let payload = payload.into_inner();
    let gender = payload.validate().map_err(validation)?;

    let patient = db::insert_patient(
        &data.db,
        NewPatient {
            first_name: payload.first_name.trim(),
            last_name: payload.last_name.trim(),
            email: &payload.email,
            phone: &payload.phone,
            date_of_birth: payload.date_of_birth,
            gender: gender.as_str(),
            address: payload.address.unwrap_or_default(),
            emergency_contact: payload.emergency_contact.unwrap_or_default(),
            medical_history: payload.medical_history.unwrap_or_default(),
            medications: payload.medications.unwrap_or_default(),
            allergies: payload.allergies.unwrap_or_default(),
            blood_type: payload.blood_type.as_deref(),
            assigned_doctor: payload.assigned_doctor,
        },
    )
    .await
    .map_err(|e| match e {
        db::DbError::Duplicate => conflict("a patient with this email already exists"),
        other => other.into(),
    })?;

    info!(patient = %patient.id, by = %who.id, "patient registered");
    Ok(HttpResponse::Created().json(ApiResponse::ok_message(
        PatientResponse::from(patient),
        "patient created",
    )))
}

#[put("/patients/{id}")]
pub async fn update(
    data: web::Data<AppState>,
    who: Principal,
    path: web::Path<String>,
    payload: web::Json<PatientUpdateInput>,
) -> Result<HttpResponse, HttpApiError> {
    require_role(&who, &[Role::Admin, Role::Doctor, Role::Nurse])?;
    let id = parse_id(&path)?;
    let payload = payload.into_inner();
    payload.validate().map_err(validation)?;

    let patient = db::update_patient(
        &data.db,
        id,
        PatientChanges {
            first_name: payload.first_name.as_deref(),
            last_name: payload.last_name.as_deref(),
            email: payload.email.as_deref(),
            phone: payload.phone.as_deref(),
            date_of_birth: payload.date_of_birth,
            gender: payload.gender.as_deref(),
            address: payload.address,
            emergency_contact: payload.emergency_contact,
            medical_history: payload.medical_history,
            medications: payload.medications,
            allergies: payload.allergies,
            blood_type: payload.blood_type.as_deref(),
            assigned_doctor: payload.assigned_doctor,
        },
    )
    .await
    .map_err(|e| match e {
        db::DbError::Duplicate => conflict("a patient with this email already exists"),
        other => other.into(),
    })?
    .ok_or_else(|| not_found("patient"))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_message(
        PatientResponse::from(patient),
        "patient updated",
    )))
}

#[delete("/patients/{id}")]
pub async fn remove(
    data: web::Data<AppState>,
    who: Principal,
    path: web::Path<String>,
) -> Result<HttpResponse, HttpApiError> {
    require_role(&who, &[Role::Admin])?;
    let id = parse_id(&path)?;
    let affected = db::deactivate_patient(&data.db, id).await?;
    if affected == 0 {
        return Err(not_found("patient"));
    }
    info!(patient = %id, by = %who.id, "patient deactivated");
    Ok(HttpResponse::Ok().json(ApiResponse::message_only("patient deactivated")))
}

#[get("/patients/{id}/medical-history")]
pub async fn medical_history(
    data: web::Data<AppState>,
    _who: Principal,
    path: web::Path<String>,
) -> Result<HttpResponse, HttpApiError> {
    let id = parse_id(&path)?;
    let patient = db::find_patient_by_id(&data.db, id, false)
        .await?
        .ok_or_else(|| not_found("patient"))?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(patient.medical_history.0)))
}

#[get("/patients/{id}/medications")]
pub async fn medications(
    data: web::Data<AppState>,
    _who: Principal,
    path: web::Path<String>,
) -> Result<HttpResponse, HttpApiError> {
    let id = parse_id(&path)?;
    let patient = db::find_patient_by_id(&data.db, id, false)
        .await?
        .ok_or_else(|| not_found("patient"))?;
    let active: Vec<_> = patient
        .medications
        .0
        .into_iter()
        .filter(|m| m.is_active)
        .collect();
    Ok(HttpResponse::Ok().json(ApiResponse::ok(active)))
}
