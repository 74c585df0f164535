// src/handlers.rs
use actix_web::{web, HttpResponse};
use serde::Serialize;
use std::sync::Arc;

use std::collections::HashMap;

use crate::error::{ApiError, ApiResult};
use crate::models::{BookingRecord, BookingRow, WardConfigKey, WardRow};
use crate::{booking, inventory, AppState};

// ==================== COMMON STRUCTURES ====================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message),
        }
    }
}

// ==================== HEALTH CHECK ====================

pub async fn health_check(app_state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    sqlx::query("SELECT 1").execute(&app_state.db_pool).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "pocketcare-beds"
    })))
}

// ==================== BED SUMMARY ====================

#[derive(Debug, Serialize)]
struct WardSlotSummary {
    key: WardConfigKey,
    label: &'static str,
    ward_type: String,
    total_beds: i64,
    available_beds: i64,
    reserved_beds: i64,
    occupied_beds: i64,
}

#[derive(Debug, Serialize)]
struct BedSummary {
    hospital_id: i64,
    wards: Vec<WardSlotSummary>,
    total_beds: i64,
    available_beds: i64,
    reserved_beds: i64,
    /// Capacity pressure for the status banner: 'high' when more than ten
    /// beds are free, 'medium' when any are, 'low' when none.
    availability_level: &'static str,
}

pub async fn get_bed_summary(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<crate::ward_handlers::HospitalQuery>,
) -> ApiResult<HttpResponse> {
    let hospital_id = query
        .hospital_id
        .ok_or_else(|| ApiError::bad_request("hospital_id is required"))?;

    let rows: Vec<WardRow> = sqlx::query_as("SELECT * FROM bed_wards WHERE hospital_id = ?")
        .bind(hospital_id)
        .fetch_all(&app_state.db_pool)
        .await?;

    let inventory = inventory::ingest(&rows);

    // Confirmed bookings are the ground truth for the reserved column;
    // the stored counter only fills in for slots with no bookings at all.
    let booking_rows: Vec<BookingRow> = sqlx::query_as(
        "SELECT * FROM bed_bookings WHERE hospital_id = ? AND status = 'confirmed'",
    )
    .bind(hospital_id)
    .fetch_all(&app_state.db_pool)
    .await?;

    let mut raw: HashMap<String, Vec<BookingRecord>> = HashMap::new();
    for row in &booking_rows {
        raw.entry(booking::raw_ward_key(row))
            .or_default()
            .push(BookingRecord::from(row));
    }
    let bookings_by_slot = booking::group_by_ward(raw);
    let no_bookings: Vec<BookingRecord> = Vec::new();

    let wards: Vec<WardSlotSummary> = inventory
        .iter()
        .map(|(key, inv)| {
            let slot_bookings = bookings_by_slot.get(key).unwrap_or(&no_bookings);
            WardSlotSummary {
                key: *key,
                label: key.label(),
                ward_type: key.ward_type().to_string(),
                total_beds: inv.total,
                available_beds: inv.available,
                reserved_beds: booking::display_reserved(inv, slot_bookings),
                occupied_beds: inv.occupied(),
            }
        })
        .collect();

    let (available_beds, total_beds) = inventory::totals(&inventory);
    let reserved_beds: i64 = wards.iter().map(|w| w.reserved_beds).sum();

    let availability_level = if available_beds > 10 {
        "high"
    } else if available_beds > 0 {
        "medium"
    } else {
        "low"
    };

    let summary = BedSummary {
        hospital_id,
        wards,
        total_beds,
        available_beds,
        reserved_beds,
        availability_level,
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(summary)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db;
    use crate::session::{Session, SessionProvider};
    use actix_web::{test, App};
    use sqlx::sqlite::SqlitePoolOptions;

    struct FixedSessions(Option<Session>);

    impl SessionProvider for FixedSessions {
        fn current_session(&self, _req: &actix_web::HttpRequest) -> Option<Session> {
            self.0
        }
    }

    async fn test_state() -> web::Data<Arc<AppState>> {
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
            sessions: Arc::new(FixedSessions(None)),
        }))
    }

    #[actix_web::test]
    async fn test_health_check_reports_ok() {
        let state = test_state().await;
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "pocketcare-beds");
    }

    #[actix_web::test]
    async fn test_bed_summary_covers_all_slots_and_prefers_live_reserved() {
        let state = test_state().await;

        // Stored reserved_beds says 3, but there is exactly one confirmed
        // booking; the summary shows the live count.
        sqlx::query(
            r#"INSERT INTO bed_wards (
                hospital_id, ward_type, ac_type, room_config,
                total_beds, available_beds, reserved_beds, occupied_beds,
                created_at, updated_at
            ) VALUES (1, 'general', 'ac', NULL, 20, 999, 3, 0, datetime('now'), datetime('now'))"#,
        )
        .execute(&state.db_pool)
        .await
        .unwrap();

        sqlx::query(
            r#"INSERT INTO bed_bookings (
                user_id, hospital_id, ward_type, ac_type,
                patient_name, patient_phone, preferred_date,
                status, created_at, updated_at
            ) VALUES (7, 1, 'general', 'ac', 'A', '5550100', '2026-08-25', 'confirmed', datetime('now'), datetime('now'))"#,
        )
        .execute(&state.db_pool)
        .await
        .unwrap();

        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/bed-summary", web::get().to(get_bed_summary)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/bed-summary?hospital_id=1")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);

        let summary = &body["data"];
        let wards = summary["wards"].as_array().unwrap();
        assert_eq!(wards.len(), 11);

        let general_ac = wards
            .iter()
            .find(|w| w["key"] == "general_ac")
            .unwrap();
        assert_eq!(general_ac["total_beds"], 20);
        // Recomputed from total - stored reserved, not the bogus column.
        assert_eq!(general_ac["available_beds"], 17);
        // Live booking count wins over the stored counter.
        assert_eq!(general_ac["reserved_beds"], 1);

        // Slots without rows default to zero.
        let icu = wards.iter().find(|w| w["key"] == "icu").unwrap();
        assert_eq!(icu["total_beds"], 0);

        assert_eq!(summary["available_beds"], 17);
        assert_eq!(summary["total_beds"], 20);
        assert_eq!(summary["availability_level"], "high");
    }
}
