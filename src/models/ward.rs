// src/models/ward.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

// ==================== WARD CLASSIFICATION ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WardType {
    General,
    Pediatrics,
    Maternity,
    Icu,
    Emergency,
    PrivateRoom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AcType {
    Ac,
    NonAc,
    NotApplicable,
}

/// The AC choice for wards that actually have one. Keeping this separate
/// from [`AcType`] makes `general_not_applicable` unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AcVariant {
    Ac,
    NonAc,
}

impl AcVariant {
    pub fn as_ac_type(self) -> AcType {
        match self {
            AcVariant::Ac => AcType::Ac,
            AcVariant::NonAc => AcType::NonAc,
        }
    }
}

/// Private-room layout. The database and API use the underscore-heavy
/// spelling (`1_bed_no_bath`); dashboard keys use the contracted spelling
/// (`1bed_no_bath`). `FromStr` accepts both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, strum::Display, strum::EnumString)]
pub enum RoomConfig {
    #[serde(rename = "1_bed_no_bath")]
    #[strum(serialize = "1bed_no_bath", serialize = "1_bed_no_bath")]
    OneBedNoBath,
    #[serde(rename = "1_bed_with_bath")]
    #[strum(serialize = "1bed_with_bath", serialize = "1_bed_with_bath")]
    OneBedWithBath,
    #[serde(rename = "2_bed_with_bath")]
    #[strum(serialize = "2bed_with_bath", serialize = "2_bed_with_bath")]
    TwoBedWithBath,
}

impl RoomConfig {
    /// Contracted spelling used inside canonical ward keys.
    pub fn compact_str(self) -> &'static str {
        match self {
            RoomConfig::OneBedNoBath => "1bed_no_bath",
            RoomConfig::OneBedWithBath => "1bed_with_bath",
            RoomConfig::TwoBedWithBath => "2bed_with_bath",
        }
    }

    /// Underscore-heavy spelling stored in the `room_config` column.
    pub fn as_config_str(self) -> &'static str {
        match self {
            RoomConfig::OneBedNoBath => "1_bed_no_bath",
            RoomConfig::OneBedWithBath => "1_bed_with_bath",
            RoomConfig::TwoBedWithBath => "2_bed_with_bath",
        }
    }
}

// ==================== CANONICAL WARD KEY ====================

/// Closed set of the eleven ward slots a hospital dashboard manages.
/// Replaces the string-munging key construction of the original data model
/// with an exhaustive tagged union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WardConfigKey {
    General(AcVariant),
    Pediatrics(AcVariant),
    Maternity(AcVariant),
    Icu,
    Emergency,
    Private(RoomConfig),
}

impl WardConfigKey {
    pub const ALL: [WardConfigKey; 11] = [
        WardConfigKey::General(AcVariant::Ac),
        WardConfigKey::General(AcVariant::NonAc),
        WardConfigKey::Pediatrics(AcVariant::Ac),
        WardConfigKey::Pediatrics(AcVariant::NonAc),
        WardConfigKey::Maternity(AcVariant::Ac),
        WardConfigKey::Maternity(AcVariant::NonAc),
        WardConfigKey::Icu,
        WardConfigKey::Emergency,
        WardConfigKey::Private(RoomConfig::OneBedNoBath),
        WardConfigKey::Private(RoomConfig::OneBedWithBath),
        WardConfigKey::Private(RoomConfig::TwoBedWithBath),
    ];

    /// Total canonical key function. Every slot maps to exactly one string.
    pub fn canonical(self) -> &'static str {
        match self {
            WardConfigKey::General(AcVariant::Ac) => "general_ac",
            WardConfigKey::General(AcVariant::NonAc) => "general_non_ac",
            WardConfigKey::Pediatrics(AcVariant::Ac) => "pediatrics_ac",
            WardConfigKey::Pediatrics(AcVariant::NonAc) => "pediatrics_non_ac",
            WardConfigKey::Maternity(AcVariant::Ac) => "maternity_ac",
            WardConfigKey::Maternity(AcVariant::NonAc) => "maternity_non_ac",
            WardConfigKey::Icu => "icu",
            WardConfigKey::Emergency => "emergency",
            WardConfigKey::Private(RoomConfig::OneBedNoBath) => "private_1bed_no_bath",
            WardConfigKey::Private(RoomConfig::OneBedWithBath) => "private_1bed_with_bath",
            WardConfigKey::Private(RoomConfig::TwoBedWithBath) => "private_2bed_with_bath",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WardConfigKey::General(AcVariant::Ac) => "General Ward (AC)",
            WardConfigKey::General(AcVariant::NonAc) => "General Ward (Non-AC)",
            WardConfigKey::Pediatrics(AcVariant::Ac) => "Pediatrics Ward (AC)",
            WardConfigKey::Pediatrics(AcVariant::NonAc) => "Pediatrics Ward (Non-AC)",
            WardConfigKey::Maternity(AcVariant::Ac) => "Maternity Ward (AC)",
            WardConfigKey::Maternity(AcVariant::NonAc) => "Maternity Ward (Non-AC)",
            WardConfigKey::Icu => "ICU",
            WardConfigKey::Emergency => "Emergency",
            WardConfigKey::Private(RoomConfig::OneBedNoBath) => "Private Room (1 Bed)",
            WardConfigKey::Private(RoomConfig::OneBedWithBath) => "Private Room (1 Bed, Attached Bath)",
            WardConfigKey::Private(RoomConfig::TwoBedWithBath) => "Private Room (2 Beds, Attached Bath)",
        }
    }

    pub fn ward_type(self) -> WardType {
        match self {
            WardConfigKey::General(_) => WardType::General,
            WardConfigKey::Pediatrics(_) => WardType::Pediatrics,
            WardConfigKey::Maternity(_) => WardType::Maternity,
            WardConfigKey::Icu => WardType::Icu,
            WardConfigKey::Emergency => WardType::Emergency,
            WardConfigKey::Private(_) => WardType::PrivateRoom,
        }
    }

    pub fn ac_type(self) -> AcType {
        match self {
            WardConfigKey::General(v)
            | WardConfigKey::Pediatrics(v)
            | WardConfigKey::Maternity(v) => v.as_ac_type(),
            _ => AcType::NotApplicable,
        }
    }

    pub fn room_config(self) -> Option<RoomConfig> {
        match self {
            WardConfigKey::Private(rc) => Some(rc),
            _ => None,
        }
    }

    /// Map raw (ward_type, ac_type, room_config) fields to a slot.
    /// Returns `None` for combinations outside the eleven known slots,
    /// e.g. a general ward without an AC choice or a private room without
    /// a room configuration.
    pub fn from_parts(
        ward_type: WardType,
        ac_type: AcType,
        room_config: Option<RoomConfig>,
    ) -> Option<WardConfigKey> {
        let variant = match ac_type {
            AcType::Ac => Some(AcVariant::Ac),
            AcType::NonAc => Some(AcVariant::NonAc),
            AcType::NotApplicable => None,
        };

        match ward_type {
            WardType::General => variant.map(WardConfigKey::General),
            WardType::Pediatrics => variant.map(WardConfigKey::Pediatrics),
            WardType::Maternity => variant.map(WardConfigKey::Maternity),
            WardType::Icu => Some(WardConfigKey::Icu),
            WardType::Emergency => Some(WardConfigKey::Emergency),
            WardType::PrivateRoom => room_config.map(WardConfigKey::Private),
        }
    }

    /// Same mapping, but from the raw string columns a ward row carries.
    pub fn from_raw_parts(
        ward_type: &str,
        ac_type: &str,
        room_config: Option<&str>,
    ) -> Option<WardConfigKey> {
        let ward_type = WardType::from_str(ward_type).ok()?;
        let ac_type = AcType::from_str(ac_type).unwrap_or(AcType::NotApplicable);
        let room_config = match room_config {
            Some(raw) => Some(RoomConfig::from_str(raw).ok()?),
            None => None,
        };
        WardConfigKey::from_parts(ward_type, ac_type, room_config)
    }

    /// Parse a canonical key string. Tolerates both private-room spellings
    /// (`private_1bed_no_bath` and `private_1_bed_no_bath`) since upstream
    /// producers have used either underscore convention.
    pub fn parse(raw: &str) -> Option<WardConfigKey> {
        if let Some(rest) = raw.strip_prefix("private_") {
            return RoomConfig::from_str(rest).ok().map(WardConfigKey::Private);
        }
        match raw {
            "general_ac" => Some(WardConfigKey::General(AcVariant::Ac)),
            "general_non_ac" => Some(WardConfigKey::General(AcVariant::NonAc)),
            "pediatrics_ac" => Some(WardConfigKey::Pediatrics(AcVariant::Ac)),
            "pediatrics_non_ac" => Some(WardConfigKey::Pediatrics(AcVariant::NonAc)),
            "maternity_ac" => Some(WardConfigKey::Maternity(AcVariant::Ac)),
            "maternity_non_ac" => Some(WardConfigKey::Maternity(AcVariant::NonAc)),
            "icu" => Some(WardConfigKey::Icu),
            "emergency" => Some(WardConfigKey::Emergency),
            _ => None,
        }
    }
}

impl Serialize for WardConfigKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.canonical())
    }
}

// ==================== INVENTORY ====================

/// Per-slot bed counts. `available` is always derived from
/// `total - reserved`; the stored column is never trusted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WardInventory {
    pub total: i64,
    pub available: i64,
    pub reserved: i64,
}

impl WardInventory {
    pub fn derived(total: i64, reserved: i64) -> Self {
        Self {
            total,
            available: total - reserved,
            reserved,
        }
    }

    pub fn occupied(&self) -> i64 {
        self.total - self.available - self.reserved
    }
}

// ==================== PERSISTED ROW ====================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WardRow {
    pub id: i64,
    pub hospital_id: i64,
    pub ward_type: String,
    pub ac_type: String,
    pub room_config: Option<String>,
    pub total_beds: i64,
    pub available_beds: i64,
    pub reserved_beds: i64,
    pub occupied_beds: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==================== REQUESTS ====================

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertWardRequest {
    pub hospital_id: i64,

    pub ward_type: WardType,

    pub ac_type: Option<AcType>,

    /// Accepted in either underscore convention.
    pub room_config: Option<String>,

    #[validate(range(min = 0, message = "Total beds cannot be negative"))]
    pub total_beds: i64,

    /// Ignored on write: available is derived from total - reserved.
    pub available_beds: Option<i64>,

    #[validate(range(min = 0, message = "Reserved beds cannot be negative"))]
    pub reserved_beds: Option<i64>,

    #[validate(range(min = 0, message = "Occupied beds cannot be negative"))]
    pub occupied_beds: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWardCountsRequest {
    #[validate(range(min = 0, message = "Total beds cannot be negative"))]
    pub total_beds: Option<i64>,

    pub available_beds: Option<i64>,

    #[validate(range(min = 0, message = "Reserved beds cannot be negative"))]
    pub reserved_beds: Option<i64>,

    #[validate(range(min = 0, message = "Occupied beds cannot be negative"))]
    pub occupied_beds: Option<i64>,
}
