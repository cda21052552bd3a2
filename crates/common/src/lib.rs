use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
    Nurse,
    Staff,
}

impl Default for Role {
    fn default() -> Self {
        Role::Staff
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Staff => "staff",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "doctor" => Some(Role::Doctor),
            "nurse" => Some(Role::Nurse),
            "staff" => Some(Role::Staff),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Gender> {
        match s {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentType {
    Checkup,
    Consultation,
    Followup,
    Emergency,
    Procedure,
}

impl AppointmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentType::Checkup => "checkup",
            AppointmentType::Consultation => "consultation",
            AppointmentType::Followup => "followup",
            AppointmentType::Emergency => "emergency",
            AppointmentType::Procedure => "procedure",
        }
    }

    pub fn parse(s: &str) -> Option<AppointmentType> {
        match s {
            "checkup" => Some(AppointmentType::Checkup),
            "consultation" => Some(AppointmentType::Consultation),
            "followup" => Some(AppointmentType::Followup),
            "emergency" => Some(AppointmentType::Emergency),
            "procedure" => Some(AppointmentType::Procedure),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppointmentStatus {
    #[serde(rename = "scheduled")]
    Scheduled,
    #[serde(rename = "confirmed")]
    Confirmed,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "cancelled")]
    Cancelled,
    #[serde(rename = "no-show")]
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::InProgress => "in-progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no-show",
        }
    }

    pub fn parse(s: &str) -> Option<AppointmentStatus> {
        match s {
            "scheduled" => Some(AppointmentStatus::Scheduled),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "in-progress" => Some(AppointmentStatus::InProgress),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "no-show" => Some(AppointmentStatus::NoShow),
            _ => None,
        }
    }

    /// Cancelled and no-show appointments do not occupy the doctor's time.
    pub fn blocks_schedule(&self) -> bool {
        !matches!(
            self,
            AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }
}

// ==== Embedded document values (stored as JSONB) ====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStatus {
    Active,
    Resolved,
    Chronic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalHistoryEntry {
    pub condition: String,
    #[serde(default)]
    pub diagnosed_date: Option<NaiveDate>,
    pub status: HistoryStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationEntry {
    pub name: String,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub medication: String,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

// ==== Application errors ====

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("internal server error")]
    Internal,
}

pub type AppResult<T> = Result<T, AppError>;

// ==== Response envelope ====

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total_items: i64) -> Self {
        let total_pages = if total_items == 0 {
            0
        } else {
            (total_items + limit - 1) / limit
        };
        Self {
            current_page: page,
            total_pages,
            total_items,
            items_per_page: limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
            pagination: None,
        }
    }

    pub fn ok_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            error: None,
            pagination: None,
        }
    }

    pub fn page(data: T, pagination: Pagination) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
            pagination: Some(pagination),
        }
    }
}

impl ApiResponse<serde_json::Value> {
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            error: None,
            pagination: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    /// Clamped (page, limit): page >= 1 (default 1), limit in 1..=100 (default 10).
    pub fn clamp(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(10).clamp(1, 100);
        (page, limit)
    }

    pub fn offset(&self) -> i64 {
        let (page, limit) = self.clamp();
        (page - 1) * limit
    }
}

// ==== Derived patient attributes ====

/// Whole years between birth date and `today`, over the 365.25-day year
/// the dashboard age brackets are defined against.
pub fn age_years(birth_date: NaiveDate, today: NaiveDate) -> i64 {
    let days = (today - birth_date).num_days();
    if days <= 0 {
        return 0;
    }
    (days as f64 / 365.25).floor() as i64
}

pub fn age_bracket(age: i64) -> &'static str {
    match age {
        0..=17 => "0-17",
        18..=34 => "18-34",
        35..=49 => "35-49",
        50..=64 => "50-64",
        _ => "65+",
    }
}

/// Serde adapter for wall-clock times rendered as "HH:MM".
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M").map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn role_round_trip() {
        for r in [Role::Admin, Role::Doctor, Role::Nurse, Role::Staff] {
            assert_eq!(Role::parse(r.as_str()), Some(r));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn status_blocks_schedule() {
        assert!(AppointmentStatus::Scheduled.blocks_schedule());
        assert!(AppointmentStatus::InProgress.blocks_schedule());
        assert!(!AppointmentStatus::Cancelled.blocks_schedule());
        assert!(!AppointmentStatus::NoShow.blocks_schedule());
    }

    #[test]
    fn eighteenth_birthday_lands_in_adult_bracket() {
        // Exactly 18 years before "now"; the span holds 5 leap days so the
        // 365.25 division floors to 18, not 17.
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let birth = NaiveDate::from_ymd_opt(2006, 6, 15).unwrap();
        let age = age_years(birth, today);
        assert_eq!(age, 18);
        assert_eq!(age_bracket(age), "18-34");
    }

    #[test]
    fn age_bracket_edges() {
        assert_eq!(age_bracket(0), "0-17");
        assert_eq!(age_bracket(17), "0-17");
        assert_eq!(age_bracket(18), "18-34");
        assert_eq!(age_bracket(34), "18-34");
        assert_eq!(age_bracket(35), "35-49");
        assert_eq!(age_bracket(64), "50-64");
        assert_eq!(age_bracket(65), "65+");
        assert_eq!(age_bracket(90), "65+");
    }

    #[test]
    fn pagination_rounds_up() {
        let p = Pagination::new(2, 10, 35);
        assert_eq!(p.total_pages, 4);
        let p = Pagination::new(1, 10, 0);
        assert_eq!(p.total_pages, 0);
    }

    #[test]
    fn page_query_clamps() {
        let q = PageQuery {
            page: Some(0),
            limit: Some(500),
        };
        assert_eq!(q.clamp(), (1, 100));
        let q = PageQuery {
            page: None,
            limit: None,
        };
        assert_eq!(q.clamp(), (1, 10));
        assert_eq!(q.offset(), 0);
    }
}
