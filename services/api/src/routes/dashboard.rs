use crate::error::HttpApiError;
use crate::extractors::Principal;
use crate::routes::appointments::AppointmentResponse;
use crate::routes::patients::PatientResponse;
use crate::state::AppState;
use actix_web::{get, web, HttpResponse};
use chrono::{DateTime, Datelike, Months, TimeZone, Utc};
use common::{age_bracket, age_years, ApiResponse, AppError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

const AGE_BRACKETS: [&str; 5] = ["0-17", "18-34", "35-49", "50-64", "65+"];

#[get("/dashboard/stats")]
pub async fn stats(data: web::Data<AppState>, _who: Principal) -> Result<HttpResponse, HttpApiError> {
    let db = &data.db;
    let now = Utc::now();
    let today = now.date_naive();
    let month_start = Utc
        .with_ymd_and_hms(today.year(), today.month(), 1, 0, 0, 0)
        .single()
        .ok_or(AppError::Internal)?;
    let trend_from = today
        .checked_sub_months(Months::new(5))
        .and_then(|d| d.with_day(1))
        .unwrap_or(today);

    let total_patients = db::count_active_patients(db).await?;
    let total_doctors = db::count_active_doctors(db).await?;
    let today_appointments = db::count_appointments_on(db, today).await?;
    let pending_appointments = db::count_pending_appointments(db).await?;
    let completed_today = db::count_completed_on(db, today).await?;
    let new_patients_this_month = db::count_patients_since(db, month_start).await?;

    let upcoming: Vec<AppointmentResponse> = db::upcoming_appointments(db, today, 5)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let recent_patients: Vec<PatientResponse> = db::recent_patients(db, 5)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let mut by_status = BTreeMap::new();
    for row in db::appointments_by_status(db).await? {
        by_status.insert(row.status, row.count);
    }

    let trend = db::appointment_trend_since(db, trend_from).await?;

    let mut genders = BTreeMap::new();
    for row in db::gender_distribution(db).await? {
        genders.insert(row.gender, row.count);
    }

    let mut ages: BTreeMap<&str, i64> = AGE_BRACKETS.iter().map(|b| (*b, 0)).collect();
    for birth in db::patient_birth_dates(db).await? {
        *ages.entry(age_bracket(age_years(birth, today))).or_insert(0) += 1;
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({
        "totalPatients": total_patients,
        "totalDoctors": total_doctors,
        "todayAppointments": today_appointments,
        "pendingAppointments": pending_appointments,
        "completedToday": completed_today,
        "newPatientsThisMonth": new_patients_this_month,
        "upcomingAppointments": upcoming,
        "recentPatients": recent_patients,
        "appointmentsByStatus": by_status,
        "appointmentTrend": trend,
        "genderDistribution": genders,
        "ageDistribution": ages,
    }))))
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivityItem {
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp: DateTime<Utc>,
    data: serde_json::Value,
}

#[get("/dashboard/recent-activity")]
pub async fn recent_activity(
    data: web::Data<AppState>,
    _who: Principal,
    query: web::Query<ActivityQuery>,
) -> Result<HttpResponse, HttpApiError> {
    let limit = query.limit.unwrap_or(10).clamp(1, 50);

    let mut items = Vec::new();
    for row in db::recent_appointments(&data.db, limit).await? {
        items.push(ActivityItem {
            kind: "appointment",
            timestamp: row.created_at,
            data: serde_json::to_value(AppointmentResponse::from(row))
                .map_err(|_| AppError::Internal)?,
        });
    }
    for row in db::recent_patients(&data.db, limit).await? {
        items.push(ActivityItem {
            kind: "patient",
            timestamp: row.created_at,
            data: serde_json::to_value(PatientResponse::from(row))
                .map_err(|_| AppError::Internal)?,
        });
    }
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items.truncate(limit as usize);

    Ok(HttpResponse::Ok().json(ApiResponse::ok(items)))
}
