// src/models/booking.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::ward::{AcType, WardType};

// ==================== PERSISTED ROW ====================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookingRow {
    pub id: i64,
    pub user_id: i64,
    pub hospital_id: i64,
    pub ward_type: String,
    pub ac_type: String,
    pub room_config: Option<String>,
    pub patient_name: String,
    pub patient_age: Option<i64>,
    pub patient_gender: Option<String>,
    pub patient_phone: String,
    pub patient_email: Option<String>,
    pub emergency_contact: Option<String>,
    pub preferred_date: String,
    pub expected_discharge_date: Option<String>,
    pub admission_reason: Option<String>,
    pub doctor_name: Option<String>,
    pub special_requirements: Option<String>,
    pub notes: Option<String>,
    pub booked_by_name: Option<String>,
    pub booked_by_email: Option<String>,
    pub booked_by_phone: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==================== DISPLAY RECORD ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedBy {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Read-only booking record as shown on the bed management dashboard.
/// Produced by the booking subsystem; this component only groups and
/// displays it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: i64,
    pub booking_id: String,
    pub bed_number: String,
    pub patient_name: String,
    pub patient_age: Option<i64>,
    pub patient_gender: Option<String>,
    pub patient_phone: String,
    pub patient_email: Option<String>,
    pub emergency_contact: Option<String>,
    pub admission_date: Option<String>,
    pub admission_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booked_by: Option<BookedBy>,
    pub created_at: String,
}

impl From<&BookingRow> for BookingRecord {
    fn from(row: &BookingRow) -> Self {
        let booked_by = row.booked_by_name.as_ref().map(|name| BookedBy {
            name: name.clone(),
            email: row.booked_by_email.clone(),
            phone: row.booked_by_phone.clone(),
        });

        Self {
            id: row.id,
            booking_id: format!("BK-{:04}", row.id),
            bed_number: format!("BED-{:04}", row.id),
            patient_name: row.patient_name.clone(),
            patient_age: row.patient_age,
            patient_gender: row.patient_gender.clone(),
            patient_phone: row.patient_phone.clone(),
            patient_email: row.patient_email.clone(),
            emergency_contact: row.emergency_contact.clone(),
            admission_date: Some(row.preferred_date.clone()),
            admission_reason: row
                .admission_reason
                .clone()
                .unwrap_or_else(|| "Not specified".to_string()),
            booked_by,
            created_at: row.created_at.to_rfc3339(),
        }
    }
}

// ==================== REQUESTS ====================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub hospital_id: i64,

    pub ward_type: WardType,

    pub ac_type: Option<AcType>,

    /// Accepted in either underscore convention.
    pub room_config: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Patient name must be between 1 and 255 characters"))]
    pub patient_name: String,

    #[validate(range(min = 0, max = 150, message = "Patient age must be between 0 and 150"))]
    pub patient_age: Option<i64>,

    #[validate(length(max = 20, message = "Patient gender cannot exceed 20 characters"))]
    pub patient_gender: Option<String>,

    #[validate(length(min = 1, max = 30, message = "Patient phone must be between 1 and 30 characters"))]
    pub patient_phone: String,

    #[validate(email(message = "Invalid patient email"))]
    pub patient_email: Option<String>,

    #[validate(length(max = 255, message = "Emergency contact cannot exceed 255 characters"))]
    pub emergency_contact: Option<String>,

    #[validate(length(min = 1, max = 30, message = "Admission date is required"))]
    pub admission_date: String,

    #[validate(length(max = 30, message = "Discharge date cannot exceed 30 characters"))]
    pub expected_discharge_date: Option<String>,

    #[validate(length(max = 1000, message = "Medical condition cannot exceed 1000 characters"))]
    pub medical_condition: Option<String>,

    #[validate(length(max = 255, message = "Doctor name cannot exceed 255 characters"))]
    pub doctor_name: Option<String>,

    #[validate(length(max = 1000, message = "Special requirements cannot exceed 1000 characters"))]
    pub special_requirements: Option<String>,

    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,

    #[validate(length(max = 255, message = "Booked-by name cannot exceed 255 characters"))]
    pub booked_by_name: Option<String>,

    #[validate(email(message = "Invalid booked-by email"))]
    pub booked_by_email: Option<String>,

    #[validate(length(max = 30, message = "Booked-by phone cannot exceed 30 characters"))]
    pub booked_by_phone: Option<String>,
}
