//! Request bodies, one strongly-typed schema per endpoint. Each `validate`
//! collects field-level messages; handlers reject before touching a store.

use chrono::{NaiveDate, NaiveTime};
use common::{
    Address, AppointmentStatus, AppointmentType, EmergencyContact, Gender, MedicalHistoryEntry,
    MedicationEntry, Prescription, Role,
};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use uuid::Uuid;

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$").unwrap());

pub const MIN_DURATION_MINUTES: i32 = 15;
pub const MAX_DURATION_MINUTES: i32 = 480;
pub const DEFAULT_DURATION_MINUTES: i32 = 30;

pub fn parse_wall_clock(raw: &str) -> Option<NaiveTime> {
    if !TIME_RE.is_match(raw) {
        return None;
    }
    NaiveTime::parse_from_str(raw, "%H:%M").ok()
}

fn valid_email(s: &str) -> bool {
    s.contains('@') && s.len() >= 3 && !s.starts_with('@') && !s.ends_with('@')
}

// ==== Auth ====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<String>,
}

impl RegisterInput {
    pub fn validate(&self) -> Result<Role, Vec<String>> {
        let mut errs = Vec::new();
        if self.username.trim().len() < 3 {
            errs.push("username must be at least 3 characters".into());
        }
        if !valid_email(&self.email) {
            errs.push("email is invalid".into());
        }
        if self.password.len() < 6 {
            errs.push("password must be at least 6 characters".into());
        }
        if self.first_name.trim().is_empty() {
            errs.push("firstName is required".into());
        }
        if self.last_name.trim().is_empty() {
            errs.push("lastName is required".into());
        }
        let role = match self.role.as_deref() {
            None => Some(Role::default()),
            Some(r) => {
                let parsed = Role::parse(r);
                if parsed.is_none() {
                    errs.push("role must be one of admin, doctor, nurse, staff".into());
                }
                parsed
            }
        };
        match (errs.is_empty(), role) {
            (true, Some(role)) => Ok(role),
            _ => Err(errs),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

// ==== Users ====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

impl UserUpdateInput {
    pub fn validate(&self) -> Result<Option<Role>, Vec<String>> {
        let mut errs = Vec::new();
        if let Some(e) = &self.email {
            if !valid_email(e) {
                errs.push("email is invalid".into());
            }
        }
        let role = match self.role.as_deref() {
            None => None,
            Some(r) => {
                let parsed = Role::parse(r);
                if parsed.is_none() {
                    errs.push("role must be one of admin, doctor, nurse, staff".into());
                }
                parsed
            }
        };
        if errs.is_empty() {
            Ok(role)
        } else {
            Err(errs)
        }
    }

    /// True when the patch touches fields only an admin may change.
    pub fn touches_privileged_fields(&self) -> bool {
        self.role.is_some() || self.is_active.is_some()
    }
}

// ==== Patients ====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientCreateInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub address: Option<Address>,
    pub emergency_contact: Option<EmergencyContact>,
    pub medical_history: Option<Vec<MedicalHistoryEntry>>,
    pub medications: Option<Vec<MedicationEntry>>,
    pub allergies: Option<Vec<String>>,
    pub blood_type: Option<String>,
    pub assigned_doctor: Option<Uuid>,
}

impl PatientCreateInput {
    pub fn validate(&self) -> Result<Gender, Vec<String>> {
        let mut errs = Vec::new();
        if self.first_name.trim().is_empty() {
            errs.push("firstName is required".into());
        }
        if self.last_name.trim().is_empty() {
            errs.push("lastName is required".into());
        }
        if !valid_email(&self.email) {
            errs.push("email is invalid".into());
        }
        if self.phone.trim().is_empty() {
            errs.push("phone is required".into());
        }
        let gender = Gender::parse(&self.gender);
        if gender.is_none() {
            errs.push("gender must be one of male, female, other".into());
        }
        match (errs.is_empty(), gender) {
            (true, Some(g)) => Ok(g),
            _ => Err(errs),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientUpdateInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<Address>,
    pub emergency_contact: Option<EmergencyContact>,
    pub medical_history: Option<Vec<MedicalHistoryEntry>>,
    pub medications: Option<Vec<MedicationEntry>>,
    pub allergies: Option<Vec<String>>,
    pub blood_type: Option<String>,
    pub assigned_doctor: Option<Uuid>,
}

impl PatientUpdateInput {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errs = Vec::new();
        if let Some(e) = &self.email {
            if !valid_email(e) {
                errs.push("email is invalid".into());
            }
        }
        if let Some(g) = &self.gender {
            if Gender::parse(g).is_none() {
                errs.push("gender must be one of male, female, other".into());
            }
        }
        if errs.is_empty() {
            Ok(())
        } else {
            Err(errs)
        }
    }
}

// ==== Appointments ====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentCreateInput {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(rename = "type")]
    pub appointment_type: String,
    pub date: NaiveDate,
    pub time: String,
    pub duration: Option<i32>,
    pub reason: String,
    pub notes: Option<String>,
    pub prescriptions: Option<Vec<Prescription>>,
    pub follow_up_required: Option<bool>,
    pub follow_up_date: Option<NaiveDate>,
}

impl AppointmentCreateInput {
    pub fn validate(&self) -> Result<(AppointmentType, NaiveTime, i32), Vec<String>> {
        let mut errs = Vec::new();
        let kind = AppointmentType::parse(&self.appointment_type);
        if kind.is_none() {
            errs.push(
                "type must be one of checkup, consultation, followup, emergency, procedure".into(),
            );
        }
        let time = parse_wall_clock(&self.time);
        if time.is_none() {
            errs.push("time must be a valid HH:MM wall-clock time".into());
        }
        let duration = self.duration.unwrap_or(DEFAULT_DURATION_MINUTES);
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration) {
            errs.push(format!(
                "duration must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES} minutes"
            ));
        }
        if self.reason.trim().is_empty() {
            errs.push("reason is required".into());
        }
        match (errs.is_empty(), kind, time) {
            (true, Some(kind), Some(time)) => Ok((kind, time, duration)),
            _ => Err(errs),
        }
    }
}

/// Parsed pieces of an appointment patch that need more than serde.
#[derive(Debug, Default)]
pub struct AppointmentPatch {
    pub appointment_type: Option<AppointmentType>,
    pub status: Option<AppointmentStatus>,
    pub time: Option<NaiveTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentUpdateInput {
    pub doctor_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub appointment_type: Option<String>,
    pub status: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub duration: Option<i32>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescriptions: Option<Vec<Prescription>>,
    pub follow_up_required: Option<bool>,
    pub follow_up_date: Option<NaiveDate>,
}

impl AppointmentUpdateInput {
    pub fn validate(&self) -> Result<AppointmentPatch, Vec<String>> {
        let mut errs = Vec::new();
        let mut patch = AppointmentPatch::default();
        if let Some(t) = &self.appointment_type {
            patch.appointment_type = AppointmentType::parse(t);
            if patch.appointment_type.is_none() {
                errs.push(
                    "type must be one of checkup, consultation, followup, emergency, procedure"
                        .into(),
                );
            }
        }
        if let Some(s) = &self.status {
            patch.status = AppointmentStatus::parse(s);
            if patch.status.is_none() {
                errs.push("status is not a recognized appointment status".into());
            }
        }
        if let Some(t) = &self.time {
            patch.time = parse_wall_clock(t);
            if patch.time.is_none() {
                errs.push("time must be a valid HH:MM wall-clock time".into());
            }
        }
        if let Some(d) = self.duration {
            if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&d) {
                errs.push(format!(
                    "duration must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES} minutes"
                ));
            }
        }
        if errs.is_empty() {
            Ok(patch)
        } else {
            Err(errs)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_regex_accepts_and_rejects() {
        for ok in ["00:00", "9:30", "09:30", "23:59", "17:00"] {
            assert!(parse_wall_clock(ok).is_some(), "{ok}");
        }
        for bad in ["24:00", "12:60", "noon", "1200", "7:5", ""] {
            assert!(parse_wall_clock(bad).is_none(), "{bad}");
        }
    }

    #[test]
    fn register_defaults_to_staff_role() {
        let input = RegisterInput {
            username: "frontdesk".into(),
            email: "desk@clinic.test".into(),
            password: "secret1".into(),
            first_name: "Front".into(),
            last_name: "Desk".into(),
            role: None,
        };
        assert_eq!(input.validate().unwrap(), Role::Staff);
    }

    #[test]
    fn register_collects_all_field_errors() {
        let input = RegisterInput {
            username: "ab".into(),
            email: "nope".into(),
            password: "123".into(),
            first_name: "".into(),
            last_name: "X".into(),
            role: Some("wizard".into()),
        };
        let errs = input.validate().unwrap_err();
        assert_eq!(errs.len(), 5);
    }

    #[test]
    fn appointment_duration_bounds() {
        let mut input = AppointmentCreateInput {
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            appointment_type: "checkup".into(),
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            time: "10:00".into(),
            duration: Some(14),
            reason: "annual physical".into(),
            notes: None,
            prescriptions: None,
            follow_up_required: None,
            follow_up_date: None,
        };
        assert!(input.validate().is_err());
        input.duration = Some(480);
        let (kind, time, duration) = input.validate().unwrap();
        assert_eq!(kind, AppointmentType::Checkup);
        assert_eq!(time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(duration, 480);
        input.duration = None;
        assert_eq!(input.validate().unwrap().2, DEFAULT_DURATION_MINUTES);
    }
}
