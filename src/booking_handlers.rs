// src/booking_handlers.rs
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::booking;
use crate::error::{ApiError, ApiResult};
use crate::handlers::ApiResponse;
use crate::inventory;
use crate::models::{
    AcType, BookingRecord, BookingRow, CreateBookingRequest, WardConfigKey, WardType,
};
use crate::session;
use crate::ward_handlers::resolve_slot;
use crate::AppState;

// ==================== BOOKINGS BY WARD ====================

#[derive(Debug, Serialize)]
struct BookingsByWardResponse {
    success: bool,
    bookings_by_ward: BTreeMap<WardConfigKey, Vec<BookingRecord>>,
}

/// GET /hospital/bed-bookings/by-ward
///
/// Confirmed bookings for the calling hospital, grouped under canonical
/// ward keys.
pub async fn get_bookings_by_ward(
    app_state: web::Data<Arc<AppState>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let hospital_id = session::require_hospital(app_state.sessions.as_ref(), &http_request)?;

    let rows: Vec<BookingRow> = sqlx::query_as(
        r#"SELECT * FROM bed_bookings
           WHERE hospital_id = ? AND status = 'confirmed'
           ORDER BY created_at DESC"#,
    )
    .bind(hospital_id)
    .fetch_all(&app_state.db_pool)
    .await?;

    let mut raw: HashMap<String, Vec<BookingRecord>> = HashMap::new();
    for row in &rows {
        raw.entry(booking::raw_ward_key(row))
            .or_default()
            .push(BookingRecord::from(row));
    }

    let bookings_by_ward = booking::group_by_ward(raw);

    Ok(HttpResponse::Ok().json(BookingsByWardResponse {
        success: true,
        bookings_by_ward,
    }))
}

// ==================== BOOKING CREATION ====================

/// POST /user/bed-bookings
///
/// Books one bed: checks slot availability, then decrements available and
/// increments reserved in the same transaction as the booking insert. The
/// guarded UPDATE keeps two concurrent bookings from taking the last bed.
pub async fn create_bed_booking(
    app_state: web::Data<Arc<AppState>>,
    request: web::Json<CreateBookingRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let user_id = session::require_user(app_state.sessions.as_ref(), &http_request)?;
    request.validate()?;

    let hospital_name: String = sqlx::query_scalar("SELECT name FROM hospitals WHERE id = ?")
        .bind(request.hospital_id)
        .fetch_optional(&app_state.db_pool)
        .await?
        .ok_or_else(|| ApiError::hospital_not_found(request.hospital_id))?;

    // Private rooms never carry an AC choice, whatever the client sent.
    let ac_type = if request.ward_type == WardType::PrivateRoom {
        Some(AcType::NotApplicable)
    } else {
        request.ac_type
    };

    let key = resolve_slot(request.ward_type, ac_type, request.room_config.as_deref())?;

    let ward_rows: Vec<crate::models::WardRow> =
        sqlx::query_as("SELECT * FROM bed_wards WHERE hospital_id = ?")
            .bind(request.hospital_id)
            .fetch_all(&app_state.db_pool)
            .await?;

    let inventory = inventory::ingest(&ward_rows);
    if inventory::total_available(&inventory, request.ward_type) <= 0 {
        return Err(ApiError::no_beds_available());
    }
    let slot = inventory.get(&key).copied().unwrap_or_default();
    if slot.available <= 0 {
        return Err(ApiError::no_beds_available());
    }

    let ward_type = key.ward_type().to_string();
    let ac_type_str = key.ac_type().to_string();
    let room_config = key.room_config().map(|rc| rc.as_config_str());
    let now = Utc::now();

    let mut tx = app_state.db_pool.begin().await?;

    let result = sqlx::query(
        r#"INSERT INTO bed_bookings (
            user_id, hospital_id, ward_type, ac_type, room_config,
            patient_name, patient_age, patient_gender, patient_phone, patient_email,
            emergency_contact, preferred_date, expected_discharge_date, admission_reason,
            doctor_name, special_requirements, notes,
            booked_by_name, booked_by_email, booked_by_phone,
            status, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'confirmed', ?, ?)"#,
    )
    .bind(user_id)
    .bind(request.hospital_id)
    .bind(&ward_type)
    .bind(&ac_type_str)
    .bind(room_config)
    .bind(&request.patient_name)
    .bind(request.patient_age)
    .bind(&request.patient_gender)
    .bind(&request.patient_phone)
    .bind(&request.patient_email)
    .bind(&request.emergency_contact)
    .bind(&request.admission_date)
    .bind(&request.expected_discharge_date)
    .bind(&request.medical_condition)
    .bind(&request.doctor_name)
    .bind(&request.special_requirements)
    .bind(&request.notes)
    .bind(&request.booked_by_name)
    .bind(&request.booked_by_email)
    .bind(&request.booked_by_phone)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let booking_id = result.last_insert_rowid();

    // Guarded decrement: no row is touched if the last bed was taken
    // between the read above and this write.
    let update = match room_config {
        Some(rc) => {
            sqlx::query(
                r#"UPDATE bed_wards
                   SET available_beds = available_beds - 1,
                       reserved_beds = reserved_beds + 1,
                       updated_at = ?
                   WHERE hospital_id = ? AND ward_type = ? AND ac_type = ? AND room_config = ?
                     AND available_beds > 0"#,
            )
            .bind(now)
            .bind(request.hospital_id)
            .bind(&ward_type)
            .bind(&ac_type_str)
            .bind(rc)
            .execute(&mut *tx)
            .await?
        }
        None => {
            sqlx::query(
                r#"UPDATE bed_wards
                   SET available_beds = available_beds - 1,
                       reserved_beds = reserved_beds + 1,
                       updated_at = ?
                   WHERE hospital_id = ? AND ward_type = ? AND ac_type = ? AND room_config IS NULL
                     AND available_beds > 0"#,
            )
            .bind(now)
            .bind(request.hospital_id)
            .bind(&ward_type)
            .bind(&ac_type_str)
            .execute(&mut *tx)
            .await?
        }
    };

    if update.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(ApiError::no_beds_available());
    }

    sqlx::query(
        r#"INSERT INTO bed_allocation_logs (
            id, hospital_id, booking_id, action, ward_type, details, created_at
        ) VALUES (?, ?, ?, 'allocated', ?, ?, ?)"#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(request.hospital_id)
    .bind(booking_id)
    .bind(&ward_type)
    .bind(format!("Bed allocated in {}", key.label()))
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    log::info!(
        "Booking BK-{:04} created for hospital {} ({})",
        booking_id,
        request.hospital_id,
        key.canonical()
    );

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "message": "Bed booked successfully",
        "booking_id": format!("BK-{:04}", booking_id),
        "hospital_name": hospital_name,
        "status": "confirmed"
    })))
}

// ==================== BOOKING LIFECYCLE ====================

/// Give a booking's bed back to its slot: `available + 1`, `reserved`
/// floored at zero. The inverse of the allocation decrement, with a
/// matching `released` log entry.
async fn release_bed(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    booking: &BookingRow,
) -> ApiResult<()> {
    let key = match WardConfigKey::from_raw_parts(
        &booking.ward_type,
        &booking.ac_type,
        booking.room_config.as_deref(),
    ) {
        Some(key) => key,
        None => {
            log::warn!(
                "Booking {} maps to no known ward slot; nothing to release",
                booking.id
            );
            return Ok(());
        }
    };

    let ward_type = key.ward_type().to_string();
    let ac_type = key.ac_type().to_string();
    let room_config = key.room_config().map(|rc| rc.as_config_str());
    let now = Utc::now();

    match room_config {
        Some(rc) => {
            sqlx::query(
                r#"UPDATE bed_wards
                   SET available_beds = available_beds + 1,
                       reserved_beds = MAX(reserved_beds - 1, 0),
                       updated_at = ?
                   WHERE hospital_id = ? AND ward_type = ? AND ac_type = ? AND room_config = ?"#,
            )
            .bind(now)
            .bind(booking.hospital_id)
            .bind(&ward_type)
            .bind(&ac_type)
            .bind(rc)
            .execute(&mut **tx)
            .await?
        }
        None => {
            sqlx::query(
                r#"UPDATE bed_wards
                   SET available_beds = available_beds + 1,
                       reserved_beds = MAX(reserved_beds - 1, 0),
                       updated_at = ?
                   WHERE hospital_id = ? AND ward_type = ? AND ac_type = ? AND room_config IS NULL"#,
            )
            .bind(now)
            .bind(booking.hospital_id)
            .bind(&ward_type)
            .bind(&ac_type)
            .execute(&mut **tx)
            .await?
        }
    };

    sqlx::query(
        r#"INSERT INTO bed_allocation_logs (
            id, hospital_id, booking_id, action, ward_type, details, created_at
        ) VALUES (?, ?, ?, 'released', ?, ?, ?)"#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(booking.hospital_id)
    .bind(booking.id)
    .bind(&ward_type)
    .bind(format!("Bed released from {}", key.label()))
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// DELETE /user/bed-bookings/{id}
///
/// Cancels the caller's booking and gives the bed back to its slot.
pub async fn cancel_bed_booking(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let user_id = session::require_user(app_state.sessions.as_ref(), &http_request)?;
    let booking_id = path.into_inner();

    let booking: BookingRow =
        sqlx::query_as("SELECT * FROM bed_bookings WHERE id = ? AND user_id = ?")
            .bind(booking_id)
            .bind(user_id)
            .fetch_optional(&app_state.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Booking"))?;

    if matches!(booking.status.as_str(), "cancelled" | "discharged") {
        return Err(ApiError::bad_request(&format!(
            "Cannot cancel a {} booking",
            booking.status
        )));
    }

    let mut tx = app_state.db_pool.begin().await?;

    sqlx::query("UPDATE bed_bookings SET status = 'cancelled', updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(booking_id)
        .execute(&mut *tx)
        .await?;

    release_bed(&mut tx, &booking).await?;

    tx.commit().await?;

    log::info!("Booking BK-{:04} cancelled by user {}", booking_id, user_id);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Booking cancelled successfully"
    })))
}

#[derive(Debug, serde::Deserialize, Validate)]
pub struct UpdateBookingStatusRequest {
    #[validate(length(min = 1, max = 20, message = "Status is required"))]
    pub status: String,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

/// PUT /hospital/bed-bookings/{id}/status
///
/// Hospital-side status transition. Leaving `confirmed` for `cancelled`
/// or `discharged` gives the bed back; any other transition only writes
/// the status.
pub async fn update_booking_status(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
    request: web::Json<UpdateBookingStatusRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let hospital_id = session::require_hospital(app_state.sessions.as_ref(), &http_request)?;
    let booking_id = path.into_inner();
    request.validate()?;

    if !matches!(
        request.status.as_str(),
        "confirmed" | "cancelled" | "discharged"
    ) {
        return Err(ApiError::bad_request(
            "Status must be one of: confirmed, cancelled, discharged",
        ));
    }

    let booking: BookingRow =
        sqlx::query_as("SELECT * FROM bed_bookings WHERE id = ? AND hospital_id = ?")
            .bind(booking_id)
            .bind(hospital_id)
            .fetch_optional(&app_state.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Booking"))?;

    let mut tx = app_state.db_pool.begin().await?;

    match &request.notes {
        Some(notes) => {
            sqlx::query("UPDATE bed_bookings SET status = ?, notes = ?, updated_at = ? WHERE id = ?")
                .bind(&request.status)
                .bind(notes)
                .bind(Utc::now())
                .bind(booking_id)
                .execute(&mut *tx)
                .await?
        }
        None => {
            sqlx::query("UPDATE bed_bookings SET status = ?, updated_at = ? WHERE id = ?")
                .bind(&request.status)
                .bind(Utc::now())
                .bind(booking_id)
                .execute(&mut *tx)
                .await?
        }
    };

    if booking.status == "confirmed"
        && matches!(request.status.as_str(), "cancelled" | "discharged")
    {
        release_bed(&mut tx, &booking).await?;
    }

    tx.commit().await?;

    log::info!(
        "Booking BK-{:04} status: {} -> {}",
        booking_id,
        booking.status,
        request.status
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Booking status updated successfully"
    })))
}

// ==================== HOSPITAL BOOKING LIST ====================

#[derive(Debug, serde::Deserialize)]
pub struct HospitalBookingsQuery {
    pub status: Option<String>,
    pub ward_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct HospitalBooking {
    #[serde(flatten)]
    record: BookingRecord,
    user_id: i64,
    ward_type: String,
    ac_type: String,
    room_config: Option<String>,
    status: String,
}

/// GET /hospital/bed-bookings?status=&ward_type=
pub async fn get_hospital_bookings(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<HospitalBookingsQuery>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let hospital_id = session::require_hospital(app_state.sessions.as_ref(), &http_request)?;

    let rows: Vec<BookingRow> = sqlx::query_as(
        r#"SELECT * FROM bed_bookings
           WHERE hospital_id = ?
           ORDER BY created_at DESC"#,
    )
    .bind(hospital_id)
    .fetch_all(&app_state.db_pool)
    .await?;

    let bookings: Vec<HospitalBooking> = rows
        .iter()
        .filter(|row| {
            query
                .status
                .as_ref()
                .map_or(true, |status| &row.status == status)
        })
        .filter(|row| {
            query
                .ward_type
                .as_ref()
                .map_or(true, |ward| &row.ward_type == ward)
        })
        .map(|row| HospitalBooking {
            record: BookingRecord::from(row),
            user_id: row.user_id,
            ward_type: row.ward_type.clone(),
            ac_type: row.ac_type.clone(),
            room_config: row.room_config.clone(),
            status: row.status.clone(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::success(bookings)))
}

// ==================== USER BOOKING HISTORY ====================

#[derive(Debug, Serialize)]
struct UserBooking {
    #[serde(flatten)]
    record: BookingRecord,
    hospital_id: i64,
    hospital_name: Option<String>,
    ward_type: String,
    status: String,
}

/// GET /user/bed-bookings
pub async fn get_user_bookings(
    app_state: web::Data<Arc<AppState>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let user_id = session::require_user(app_state.sessions.as_ref(), &http_request)?;

    let rows: Vec<BookingRow> = sqlx::query_as(
        r#"SELECT * FROM bed_bookings
           WHERE user_id = ?
           ORDER BY created_at DESC"#,
    )
    .bind(user_id)
    .fetch_all(&app_state.db_pool)
    .await?;

    let mut names: HashMap<i64, String> = HashMap::new();
    let name_rows: Vec<(i64, String)> = sqlx::query_as(
        r#"SELECT DISTINCT h.id, h.name
           FROM hospitals h
           JOIN bed_bookings b ON b.hospital_id = h.id
           WHERE b.user_id = ?"#,
    )
    .bind(user_id)
    .fetch_all(&app_state.db_pool)
    .await?;
    names.extend(name_rows);

    let bookings: Vec<UserBooking> = rows
        .iter()
        .map(|row| UserBooking {
            record: BookingRecord::from(row),
            hospital_id: row.hospital_id,
            hospital_name: names.get(&row.hospital_id).cloned(),
            ward_type: row.ward_type.clone(),
            status: row.status.clone(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::success(bookings)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db;
    use crate::session::{Session, SessionProvider, SessionSubject};
    use actix_web::{http::StatusCode, test, App};
    use sqlx::sqlite::SqlitePoolOptions;

    struct FixedSessions(Option<Session>);

    impl SessionProvider for FixedSessions {
        fn current_session(&self, _req: &actix_web::HttpRequest) -> Option<Session> {
            self.0
        }
    }

    async fn test_state(session: Option<Session>) -> web::Data<Arc<AppState>> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::run_migrations(&pool).await.unwrap();

        sqlx::query(
            "INSERT INTO hospitals (id, name, created_at, updated_at) VALUES (1, 'Test Hospital', datetime('now'), datetime('now'))",
        )
        .execute(&pool)
        .await
        .unwrap();

        web::Data::new(Arc::new(AppState {
            db_pool: pool,
            config: Config::default(),
            sessions: Arc::new(FixedSessions(session)),
        }))
    }

    async fn seed_ward(
        state: &web::Data<Arc<AppState>>,
        ward_type: &str,
        ac_type: &str,
        room_config: Option<&str>,
        total: i64,
        reserved: i64,
    ) {
        sqlx::query(
            r#"INSERT INTO bed_wards (
                hospital_id, ward_type, ac_type, room_config,
                total_beds, available_beds, reserved_beds, occupied_beds,
                created_at, updated_at
            ) VALUES (1, ?, ?, ?, ?, ?, ?, 0, datetime('now'), datetime('now'))"#,
        )
        .bind(ward_type)
        .bind(ac_type)
        .bind(room_config)
        .bind(total)
        .bind(total - reserved)
        .bind(reserved)
        .execute(&state.db_pool)
        .await
        .unwrap();
    }

    fn booking_json(ward_type: &str, ac_type: Option<&str>, room_config: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "hospital_id": 1,
            "ward_type": ward_type,
            "ac_type": ac_type,
            "room_config": room_config,
            "patient_name": "Asha Rao",
            "patient_age": 52,
            "patient_phone": "5550100",
            "admission_date": "2026-08-25"
        })
    }

    #[actix_web::test]
    async fn test_create_booking_decrements_slot() {
        let user = Session { subject: SessionSubject::User(7) };
        let state = test_state(Some(user)).await;
        seed_ward(&state, "private_room", "not_applicable", Some("1_bed_no_bath"), 2, 0).await;

        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/bed-bookings", web::post().to(create_bed_booking)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/bed-bookings")
            .set_json(booking_json("private_room", Some("ac"), Some("1bed_no_bath")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "confirmed");
        assert_eq!(body["hospital_name"], "Test Hospital");
        assert_eq!(body["booking_id"], "BK-0001");

        let (available, reserved): (i64, i64) = sqlx::query_as(
            "SELECT available_beds, reserved_beds FROM bed_wards WHERE room_config = '1_bed_no_bath'",
        )
        .fetch_one(&state.db_pool)
        .await
        .unwrap();
        assert_eq!(available, 1);
        assert_eq!(reserved, 1);

        // The AC choice sent by the client was discarded for a private room.
        let ac_type: (String,) = sqlx::query_as("SELECT ac_type FROM bed_bookings WHERE id = 1")
            .fetch_one(&state.db_pool)
            .await
            .unwrap();
        assert_eq!(ac_type.0, "not_applicable");
    }

    #[actix_web::test]
    async fn test_create_booking_exhausts_slot() {
        let user = Session { subject: SessionSubject::User(7) };
        let state = test_state(Some(user)).await;
        seed_ward(&state, "icu", "not_applicable", None, 1, 0).await;

        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/bed-bookings", web::post().to(create_bed_booking)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/bed-bookings")
            .set_json(booking_json("icu", None, None))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        // Last bed is gone; no booking row is left behind.
        let req = test::TestRequest::post()
            .uri("/bed-bookings")
            .set_json(booking_json("icu", None, None))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bed_bookings")
            .fetch_one(&state.db_pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[actix_web::test]
    async fn test_create_booking_requires_user_session() {
        let hospital = Session { subject: SessionSubject::Hospital(1) };
        let state = test_state(Some(hospital)).await;

        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/bed-bookings", web::post().to(create_bed_booking)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/bed-bookings")
            .set_json(booking_json("icu", None, None))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_bookings_by_ward_groups_under_canonical_keys() {
        let hospital = Session { subject: SessionSubject::Hospital(1) };
        let state = test_state(Some(hospital)).await;

        // Two private-room bookings stored under different spellings plus
        // one general AC booking.
        for (ward, ac, rc, patient) in [
            ("private_room", "not_applicable", Some("1_bed_no_bath"), "A"),
            ("private_room", "not_applicable", Some("1bed_no_bath"), "B"),
            ("general", "ac", None, "C"),
        ] {
            sqlx::query(
                r#"INSERT INTO bed_bookings (
                    user_id, hospital_id, ward_type, ac_type, room_config,
                    patient_name, patient_phone, preferred_date,
                    status, created_at, updated_at
                ) VALUES (7, 1, ?, ?, ?, ?, '5550100', '2026-08-25', 'confirmed', datetime('now'), datetime('now'))"#,
            )
            .bind(ward)
            .bind(ac)
            .bind(rc)
            .bind(patient)
            .execute(&state.db_pool)
            .await
            .unwrap();
        }

        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/by-ward", web::get().to(get_bookings_by_ward)),
        )
        .await;

        let req = test::TestRequest::get().uri("/by-ward").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);

        let groups = body["bookings_by_ward"].as_object().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["private_1bed_no_bath"].as_array().unwrap().len(), 2);
        assert_eq!(groups["general_ac"].as_array().unwrap().len(), 1);
        assert_eq!(groups["general_ac"][0]["booking_id"], "BK-0003");
    }

    async fn seed_booking(
        state: &web::Data<Arc<AppState>>,
        user_id: i64,
        ward_type: &str,
        ac_type: &str,
        status: &str,
    ) {
        sqlx::query(
            r#"INSERT INTO bed_bookings (
                user_id, hospital_id, ward_type, ac_type,
                patient_name, patient_phone, preferred_date,
                status, created_at, updated_at
            ) VALUES (?, 1, ?, ?, 'A', '5550100', '2026-08-25', ?, datetime('now'), datetime('now'))"#,
        )
        .bind(user_id)
        .bind(ward_type)
        .bind(ac_type)
        .bind(status)
        .execute(&state.db_pool)
        .await
        .unwrap();
    }

    async fn ward_counts(state: &web::Data<Arc<AppState>>) -> (i64, i64) {
        sqlx::query_as("SELECT available_beds, reserved_beds FROM bed_wards LIMIT 1")
            .fetch_one(&state.db_pool)
            .await
            .unwrap()
    }

    #[actix_web::test]
    async fn test_cancel_booking_restores_bed() {
        let user = Session { subject: SessionSubject::User(7) };
        let state = test_state(Some(user)).await;
        seed_ward(&state, "icu", "not_applicable", None, 1, 0).await;

        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/bed-bookings", web::post().to(create_bed_booking))
                .route("/bed-bookings/{id}", web::delete().to(cancel_bed_booking)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/bed-bookings")
            .set_json(booking_json("icu", None, None))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        assert_eq!(ward_counts(&state).await, (0, 1));

        let req = test::TestRequest::delete().uri("/bed-bookings/1").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        // The bed is back and the booking is flagged cancelled.
        assert_eq!(ward_counts(&state).await, (1, 0));
        let status: (String,) = sqlx::query_as("SELECT status FROM bed_bookings WHERE id = 1")
            .fetch_one(&state.db_pool)
            .await
            .unwrap();
        assert_eq!(status.0, "cancelled");

        // Allocation trail carries both sides of the lifecycle.
        let actions: Vec<(String,)> =
            sqlx::query_as("SELECT action FROM bed_allocation_logs ORDER BY created_at")
                .fetch_all(&state.db_pool)
                .await
                .unwrap();
        let actions: Vec<&str> = actions.iter().map(|(a,)| a.as_str()).collect();
        assert!(actions.contains(&"allocated"));
        assert!(actions.contains(&"released"));

        // A second cancel is rejected and releases nothing further.
        let req = test::TestRequest::delete().uri("/bed-bookings/1").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ward_counts(&state).await, (1, 0));
    }

    #[actix_web::test]
    async fn test_cancel_rejects_foreign_booking() {
        let user = Session { subject: SessionSubject::User(7) };
        let state = test_state(Some(user)).await;
        seed_booking(&state, 8, "icu", "not_applicable", "confirmed").await;

        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/bed-bookings/{id}", web::delete().to(cancel_bed_booking)),
        )
        .await;

        let req = test::TestRequest::delete().uri("/bed-bookings/1").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_status_update_releases_bed_once() {
        let hospital = Session { subject: SessionSubject::Hospital(1) };
        let state = test_state(Some(hospital)).await;
        seed_ward(&state, "general", "ac", None, 5, 1).await;
        seed_booking(&state, 7, "general", "ac", "confirmed").await;

        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/bed-bookings/{id}/status", web::put().to(update_booking_status)),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/bed-bookings/1/status")
            .set_json(serde_json::json!({ "status": "discharged" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        assert_eq!(ward_counts(&state).await, (5, 0));

        // No longer confirmed, so a second transition moves nothing.
        let req = test::TestRequest::put()
            .uri("/bed-bookings/1/status")
            .set_json(serde_json::json!({ "status": "cancelled" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        assert_eq!(ward_counts(&state).await, (5, 0));

        let req = test::TestRequest::put()
            .uri("/bed-bookings/1/status")
            .set_json(serde_json::json!({ "status": "rejected" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_hospital_bookings_honor_filters() {
        let hospital = Session { subject: SessionSubject::Hospital(1) };
        let state = test_state(Some(hospital)).await;
        seed_booking(&state, 7, "icu", "not_applicable", "confirmed").await;
        seed_booking(&state, 8, "general", "ac", "cancelled").await;

        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/bed-bookings", web::get().to(get_hospital_bookings)),
        )
        .await;

        let req = test::TestRequest::get().uri("/bed-bookings").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let req = test::TestRequest::get()
            .uri("/bed-bookings?status=confirmed")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let filtered = body["data"].as_array().unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0]["ward_type"], "icu");

        let req = test::TestRequest::get()
            .uri("/bed-bookings?ward_type=general")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let filtered = body["data"].as_array().unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0]["status"], "cancelled");
    }

    #[actix_web::test]
    async fn test_user_bookings_list_own_only() {
        let user = Session { subject: SessionSubject::User(7) };
        let state = test_state(Some(user)).await;
        seed_booking(&state, 7, "icu", "not_applicable", "confirmed").await;
        seed_booking(&state, 8, "general", "ac", "confirmed").await;

        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/bed-bookings", web::get().to(get_user_bookings)),
        )
        .await;

        let req = test::TestRequest::get().uri("/bed-bookings").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let bookings = body["data"].as_array().unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0]["booking_id"], "BK-0001");
        assert_eq!(bookings[0]["hospital_name"], "Test Hospital");
        assert_eq!(bookings[0]["status"], "confirmed");
    }
}
