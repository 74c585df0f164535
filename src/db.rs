// src/db.rs - Database migrations and setup

use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Enable foreign keys and WAL mode
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    // Create hospitals table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS hospitals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK(length(name) > 0 AND length(name) <= 255),
            address TEXT CHECK(address IS NULL OR length(address) <= 500),
            city TEXT CHECK(city IS NULL OR length(city) <= 100),
            phone TEXT CHECK(phone IS NULL OR length(phone) <= 30),
            email TEXT CHECK(email IS NULL OR length(email) <= 255),
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create bed_wards table. One row per hospital ward slot; the slot
    // identity is the (ward_type, ac_type, room_config) triple and only
    // private rooms carry a room_config.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bed_wards (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            hospital_id INTEGER NOT NULL,
            ward_type TEXT NOT NULL CHECK(ward_type IN (
                'general', 'pediatrics', 'maternity', 'icu', 'emergency', 'private_room'
            )),
            ac_type TEXT NOT NULL DEFAULT 'not_applicable' CHECK(
                ac_type IN ('ac', 'non_ac', 'not_applicable')
            ),
            room_config TEXT CHECK(room_config IS NULL OR room_config IN (
                '1_bed_no_bath', '1_bed_with_bath', '2_bed_with_bath'
            )),
            total_beds INTEGER NOT NULL DEFAULT 0 CHECK(total_beds >= 0),
            available_beds INTEGER NOT NULL DEFAULT 0 CHECK(available_beds >= 0),
            reserved_beds INTEGER NOT NULL DEFAULT 0 CHECK(reserved_beds >= 0),
            occupied_beds INTEGER NOT NULL DEFAULT 0 CHECK(occupied_beds >= 0),
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL,
            FOREIGN KEY (hospital_id) REFERENCES hospitals (id) ON DELETE CASCADE,
            UNIQUE(hospital_id, ward_type, ac_type, room_config)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create bed_bookings table. Booker identity is denormalized onto the
    // row; user accounts live in a separate service.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bed_bookings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            hospital_id INTEGER NOT NULL,
            ward_type TEXT NOT NULL CHECK(ward_type IN (
                'general', 'pediatrics', 'maternity', 'icu', 'emergency', 'private_room'
            )),
            ac_type TEXT NOT NULL DEFAULT 'not_applicable' CHECK(
                ac_type IN ('ac', 'non_ac', 'not_applicable')
            ),
            room_config TEXT CHECK(room_config IS NULL OR length(room_config) <= 50),
            patient_name TEXT NOT NULL CHECK(length(patient_name) > 0 AND length(patient_name) <= 255),
            patient_age INTEGER CHECK(patient_age IS NULL OR (patient_age >= 0 AND patient_age <= 150)),
            patient_gender TEXT CHECK(patient_gender IS NULL OR length(patient_gender) <= 20),
            patient_phone TEXT NOT NULL CHECK(length(patient_phone) > 0 AND length(patient_phone) <= 30),
            patient_email TEXT CHECK(patient_email IS NULL OR length(patient_email) <= 255),
            emergency_contact TEXT CHECK(emergency_contact IS NULL OR length(emergency_contact) <= 255),
            preferred_date TEXT NOT NULL,
            expected_discharge_date TEXT,
            admission_reason TEXT CHECK(admission_reason IS NULL OR length(admission_reason) <= 1000),
            doctor_name TEXT CHECK(doctor_name IS NULL OR length(doctor_name) <= 255),
            special_requirements TEXT CHECK(special_requirements IS NULL OR length(special_requirements) <= 1000),
            notes TEXT CHECK(notes IS NULL OR length(notes) <= 1000),
            booked_by_name TEXT CHECK(booked_by_name IS NULL OR length(booked_by_name) <= 255),
            booked_by_email TEXT CHECK(booked_by_email IS NULL OR length(booked_by_email) <= 255),
            booked_by_phone TEXT CHECK(booked_by_phone IS NULL OR length(booked_by_phone) <= 30),
            status TEXT NOT NULL DEFAULT 'confirmed' CHECK(
                status IN ('pending', 'confirmed', 'cancelled', 'discharged')
            ),
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL,
            FOREIGN KEY (hospital_id) REFERENCES hospitals (id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create bed_allocation_logs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bed_allocation_logs (
            id TEXT PRIMARY KEY,
            hospital_id INTEGER NOT NULL,
            ward_id INTEGER,
            booking_id INTEGER,
            action TEXT NOT NULL CHECK(
                action IN ('allocated', 'released', 'adjusted')
            ),
            ward_type TEXT NOT NULL,
            details TEXT CHECK(details IS NULL OR length(details) <= 1000),
            created_at DATETIME NOT NULL,
            FOREIGN KEY (hospital_id) REFERENCES hospitals (id) ON DELETE CASCADE,
            FOREIGN KEY (ward_id) REFERENCES bed_wards (id) ON DELETE SET NULL,
            FOREIGN KEY (booking_id) REFERENCES bed_bookings (id) ON DELETE SET NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // ==================== CREATE INDEXES ====================

    let _ = sqlx::query("CREATE INDEX IF NOT EXISTS idx_bed_wards_hospital ON bed_wards(hospital_id)")
        .execute(pool).await;
    let _ = sqlx::query("CREATE INDEX IF NOT EXISTS idx_bed_wards_ward_type ON bed_wards(ward_type)")
        .execute(pool).await;
    let _ = sqlx::query("CREATE INDEX IF NOT EXISTS idx_bed_bookings_hospital ON bed_bookings(hospital_id)")
        .execute(pool).await;
    let _ = sqlx::query("CREATE INDEX IF NOT EXISTS idx_bed_bookings_user ON bed_bookings(user_id)")
        .execute(pool).await;
    let _ = sqlx::query("CREATE INDEX IF NOT EXISTS idx_bed_bookings_status ON bed_bookings(status)")
        .execute(pool).await;
    let _ = sqlx::query("CREATE INDEX IF NOT EXISTS idx_allocation_logs_hospital ON bed_allocation_logs(hospital_id)")
        .execute(pool).await;
    let _ = sqlx::query("CREATE INDEX IF NOT EXISTS idx_allocation_logs_created ON bed_allocation_logs(created_at)")
        .execute(pool).await;

    // Run migrations for existing tables
    migrate_existing_tables(pool).await?;

    Ok(())
}

// ==================== MIGRATION FOR EXISTING DATABASES ====================

pub async fn migrate_existing_tables(pool: &SqlitePool) -> Result<()> {
    // Add new columns to existing tables if they don't exist
    let migration_queries = [
        // ==================== BED WARDS ====================
        "ALTER TABLE bed_wards ADD COLUMN occupied_beds INTEGER NOT NULL DEFAULT 0 CHECK(occupied_beds >= 0)",

        // ==================== BED BOOKINGS ====================
        "ALTER TABLE bed_bookings ADD COLUMN booked_by_name TEXT CHECK(booked_by_name IS NULL OR length(booked_by_name) <= 255)",
        "ALTER TABLE bed_bookings ADD COLUMN booked_by_email TEXT CHECK(booked_by_email IS NULL OR length(booked_by_email) <= 255)",
        "ALTER TABLE bed_bookings ADD COLUMN booked_by_phone TEXT CHECK(booked_by_phone IS NULL OR length(booked_by_phone) <= 30)",
        "ALTER TABLE bed_bookings ADD COLUMN expected_discharge_date TEXT",
    ];

    for query in migration_queries.iter() {
        // Ignore errors for existing columns
        let _ = sqlx::query(query).execute(pool).await;
    }

    Ok(())
}

// ==================== DATABASE RESET (DEVELOPMENT ONLY) ====================

pub async fn reset_database(pool: &SqlitePool) -> Result<()> {
    log::warn!("Resetting database - all data will be lost!");

    let drop_queries = [
        "DROP TABLE IF EXISTS bed_allocation_logs",
        "DROP TABLE IF EXISTS bed_bookings",
        "DROP TABLE IF EXISTS bed_wards",
        "DROP TABLE IF EXISTS hospitals",
    ];

    for query in drop_queries.iter() {
        let _ = sqlx::query(query).execute(pool).await;
    }

    // Recreate tables
    run_migrations(pool).await?;

    Ok(())
}

// ==================== UTILITY FUNCTIONS ====================

/// Check if a column exists in a table
#[allow(dead_code)]
pub async fn column_exists(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let query = format!(
        "SELECT COUNT(*) as count FROM pragma_table_info('{}') WHERE name = ?",
        table
    );
    let result: (i32,) = sqlx::query_as(&query).bind(column).fetch_one(pool).await?;
    Ok(result.0 > 0)
}
