// src/ward_handlers.rs
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::handlers::ApiResponse;
use crate::inventory::{validate_commit, CommitPayload};
use crate::models::{
    AcType, RoomConfig, UpdateWardCountsRequest, UpsertWardRequest, WardConfigKey, WardRow,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct HospitalQuery {
    pub hospital_id: Option<i64>,
}

// ==================== WARD LISTING ====================

#[derive(Debug, Serialize)]
struct WardListResponse {
    success: bool,
    wards: Vec<WardRow>,
}

/// GET /bed-management/bed-wards?hospital_id=N
///
/// Returns the raw ward rows with `available_beds` recomputed from
/// `total_beds - reserved_beds`. The stored column is not trusted.
pub async fn get_bed_wards(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<HospitalQuery>,
) -> ApiResult<HttpResponse> {
    let hospital_id = query
        .hospital_id
        .ok_or_else(|| ApiError::bad_request("hospital_id is required"))?;

    let mut wards: Vec<WardRow> = sqlx::query_as(
        "SELECT * FROM bed_wards WHERE hospital_id = ? ORDER BY ward_type, ac_type, room_config",
    )
    .bind(hospital_id)
    .fetch_all(&app_state.db_pool)
    .await?;

    for ward in &mut wards {
        ward.available_beds = ward.total_beds - ward.reserved_beds;
    }

    Ok(HttpResponse::Ok().json(WardListResponse { success: true, wards }))
}

// ==================== WARD UPSERT ====================

pub(crate) fn resolve_slot(
    ward_type: crate::models::WardType,
    ac_type: Option<AcType>,
    room_config: Option<&str>,
) -> ApiResult<WardConfigKey> {
    let room_config = match room_config {
        Some(raw) => Some(RoomConfig::from_str(raw).map_err(|_| {
            ApiError::unknown_ward_slot(&ward_type.to_string(), "-", Some(raw))
        })?),
        None => None,
    };

    WardConfigKey::from_parts(
        ward_type,
        ac_type.unwrap_or(AcType::NotApplicable),
        room_config,
    )
    .ok_or_else(|| {
        ApiError::unknown_ward_slot(
            &ward_type.to_string(),
            &ac_type.unwrap_or(AcType::NotApplicable).to_string(),
            room_config.map(|rc| rc.as_config_str()),
        )
    })
}

fn commit_counts(request: &UpsertWardRequest) -> ApiResult<CommitPayload> {
    let total = request.total_beds;
    let reserved = request.reserved_beds.unwrap_or(0);
    validate_commit(total, reserved)?;
    Ok(CommitPayload {
        total,
        available: total - reserved,
        reserved,
        occupied: request.occupied_beds.unwrap_or(0),
    })
}

/// POST /bed-management/bed-wards
///
/// Creates or updates the row for a ward slot. The slot identity is the
/// canonical (ward_type, ac_type, room_config) triple; an existing row is
/// updated in place, otherwise one is inserted.
pub async fn upsert_bed_ward(
    app_state: web::Data<Arc<AppState>>,
    request: web::Json<UpsertWardRequest>,
) -> ApiResult<HttpResponse> {
    request.validate()?;

    let key = resolve_slot(request.ward_type, request.ac_type, request.room_config.as_deref())?;
    let counts = commit_counts(&request)?;

    let ward_type = key.ward_type().to_string();
    let ac_type = key.ac_type().to_string();
    let room_config = key.room_config().map(|rc| rc.as_config_str());
    let now = Utc::now();

    // room_config is NULL for everything but private rooms, and NULL never
    // matches '=' in SQLite, hence the two lookup branches.
    let existing: Option<WardRow> = match room_config {
        Some(rc) => {
            sqlx::query_as(
                "SELECT * FROM bed_wards WHERE hospital_id = ? AND ward_type = ? AND ac_type = ? AND room_config = ?",
            )
            .bind(request.hospital_id)
            .bind(&ward_type)
            .bind(&ac_type)
            .bind(rc)
            .fetch_optional(&app_state.db_pool)
            .await?
        }
        None => {
            sqlx::query_as(
                "SELECT * FROM bed_wards WHERE hospital_id = ? AND ward_type = ? AND ac_type = ? AND room_config IS NULL",
            )
            .bind(request.hospital_id)
            .bind(&ward_type)
            .bind(&ac_type)
            .fetch_optional(&app_state.db_pool)
            .await?
        }
    };

    let (ward_id, message) = match existing {
        Some(ward) => {
            sqlx::query(
                r#"UPDATE bed_wards
                   SET total_beds = ?, available_beds = ?, reserved_beds = ?, occupied_beds = ?, updated_at = ?
                   WHERE id = ?"#,
            )
            .bind(counts.total)
            .bind(counts.available)
            .bind(counts.reserved)
            .bind(counts.occupied)
            .bind(now)
            .bind(ward.id)
            .execute(&app_state.db_pool)
            .await?;

            log::info!(
                "Updated ward {} ({}) for hospital {}: total={}, reserved={}",
                ward.id,
                key.canonical(),
                request.hospital_id,
                counts.total,
                counts.reserved
            );
            (ward.id, "Ward updated successfully")
        }
        None => {
            let result = sqlx::query(
                r#"INSERT INTO bed_wards (
                    hospital_id, ward_type, ac_type, room_config,
                    total_beds, available_beds, reserved_beds, occupied_beds,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(request.hospital_id)
            .bind(&ward_type)
            .bind(&ac_type)
            .bind(room_config)
            .bind(counts.total)
            .bind(counts.available)
            .bind(counts.reserved)
            .bind(counts.occupied)
            .bind(now)
            .bind(now)
            .execute(&app_state.db_pool)
            .await?;

            let id = result.last_insert_rowid();
            log::info!(
                "Created ward {} ({}) for hospital {}: total={}, reserved={}",
                id,
                key.canonical(),
                request.hospital_id,
                counts.total,
                counts.reserved
            );
            (id, "Ward created successfully")
        }
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": message,
        "ward_id": ward_id
    })))
}

// ==================== WARD PARTIAL UPDATE ====================

/// PUT /bed-management/bed-wards/{id}
pub async fn update_bed_ward(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
    request: web::Json<UpdateWardCountsRequest>,
) -> ApiResult<HttpResponse> {
    let ward_id = path.into_inner();
    request.validate()?;

    let ward: WardRow = sqlx::query_as("SELECT * FROM bed_wards WHERE id = ?")
        .bind(ward_id)
        .fetch_optional(&app_state.db_pool)
        .await?
        .ok_or_else(|| ApiError::ward_not_found(ward_id))?;

    let total = request.total_beds.unwrap_or(ward.total_beds);
    let reserved = request.reserved_beds.unwrap_or(ward.reserved_beds);
    validate_commit(total, reserved)?;

    // available_beds in the request is ignored: it is always re-derived.
    let available = total - reserved;
    let occupied = request.occupied_beds.unwrap_or(ward.occupied_beds);

    sqlx::query(
        r#"UPDATE bed_wards
           SET total_beds = ?, available_beds = ?, reserved_beds = ?, occupied_beds = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(total)
    .bind(available)
    .bind(reserved)
    .bind(occupied)
    .bind(Utc::now())
    .bind(ward_id)
    .execute(&app_state.db_pool)
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Ward updated successfully",
        "ward_id": ward_id
    })))
}

// ==================== WARD DELETE ====================

/// DELETE /bed-management/bed-wards/{id}
pub async fn delete_bed_ward(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let ward_id = path.into_inner();

    let result = sqlx::query("DELETE FROM bed_wards WHERE id = ?")
        .bind(ward_id)
        .execute(&app_state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::ward_not_found(ward_id));
    }

    log::info!("Deleted ward {}", ward_id);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Ward deleted successfully"
    })))
}

// ==================== ALLOCATION LOGS ====================

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AllocationLog {
    pub id: String,
    pub hospital_id: i64,
    pub ward_id: Option<i64>,
    pub booking_id: Option<i64>,
    pub action: String,
    pub ward_type: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AllocationLogQuery {
    pub hospital_id: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /bed-management/bed-allocation-logs
pub async fn get_allocation_logs(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<AllocationLogQuery>,
) -> ApiResult<HttpResponse> {
    let hospital_id = query
        .hospital_id
        .ok_or_else(|| ApiError::bad_request("hospital_id is required"))?;
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let logs: Vec<AllocationLog> = sqlx::query_as(
        r#"SELECT * FROM bed_allocation_logs
           WHERE hospital_id = ?
           ORDER BY created_at DESC
           LIMIT ?"#,
    )
    .bind(hospital_id)
    .bind(limit)
    .fetch_all(&app_state.db_pool)
    .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(logs)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAllocationLogRequest {
    pub hospital_id: i64,
    pub ward_id: Option<i64>,
    pub booking_id: Option<i64>,
    #[validate(length(min = 1, max = 20, message = "Action is required"))]
    pub action: String,
    #[validate(length(min = 1, max = 50, message = "Ward type is required"))]
    pub ward_type: String,
    #[validate(length(max = 1000, message = "Details cannot exceed 1000 characters"))]
    pub details: Option<String>,
}

/// POST /bed-management/bed-allocation-logs
pub async fn create_allocation_log(
    app_state: web::Data<Arc<AppState>>,
    request: web::Json<CreateAllocationLogRequest>,
) -> ApiResult<HttpResponse> {
    request.validate()?;

    if !matches!(request.action.as_str(), "allocated" | "released" | "adjusted") {
        return Err(ApiError::bad_request(
            "Action must be one of: allocated, released, adjusted",
        ));
    }

    let log_id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"INSERT INTO bed_allocation_logs (
            id, hospital_id, ward_id, booking_id, action, ward_type, details, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&log_id)
    .bind(request.hospital_id)
    .bind(request.ward_id)
    .bind(request.booking_id)
    .bind(&request.action)
    .bind(&request.ward_type)
    .bind(&request.details)
    .bind(Utc::now())
    .execute(&app_state.db_pool)
    .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        serde_json::json!({ "log_id": log_id }),
        "Allocation log recorded".to_string(),
    )))
}
