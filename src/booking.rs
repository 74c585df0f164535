// src/booking.rs
//! Grouping of confirmed bookings under canonical ward keys for the
//! per-ward dashboard view.

use std::collections::{BTreeMap, HashMap};

use crate::models::{BookingRecord, BookingRow, WardConfigKey, WardInventory};

/// Ward key as a booking row spells it. Private rooms carry their stored
/// room_config verbatim (either underscore convention); [`group_by_ward`]
/// normalizes and merges.
pub fn raw_ward_key(row: &BookingRow) -> String {
    match row.ward_type.as_str() {
        "private_room" => match &row.room_config {
            Some(rc) => format!("private_{}", rc),
            None => "private_room".to_string(),
        },
        "icu" | "emergency" => row.ward_type.clone(),
        _ => format!("{}_{}", row.ward_type, row.ac_type),
    }
}

/// Fold raw per-ward booking lists into a map keyed by canonical slot.
///
/// Upstream producers key their groups with either underscore convention
/// for private rooms, so two raw keys can normalize to the same slot;
/// their lists are concatenated, never replaced. Raw keys outside the
/// eleven known slots are dropped with a warning.
pub fn group_by_ward(
    raw: HashMap<String, Vec<BookingRecord>>,
) -> BTreeMap<WardConfigKey, Vec<BookingRecord>> {
    let mut grouped: BTreeMap<WardConfigKey, Vec<BookingRecord>> = BTreeMap::new();

    for (raw_key, bookings) in raw {
        let key = match WardConfigKey::parse(&raw_key) {
            Some(key) => key,
            None => {
                log::warn!(
                    "Dropping {} booking(s) under unknown ward key '{}'",
                    bookings.len(),
                    raw_key
                );
                continue;
            }
        };
        grouped.entry(key).or_default().extend(bookings);
    }

    grouped
}

/// Reserved count to display for a slot: the live confirmed-booking count
/// when any bookings exist, otherwise the stored counter. Bookings are
/// ground truth when the two disagree.
pub fn display_reserved(inventory: &WardInventory, bookings: &[BookingRecord]) -> i64 {
    if bookings.is_empty() {
        inventory.reserved
    } else {
        bookings.len() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AcVariant, RoomConfig};

    fn record(id: i64, patient: &str) -> BookingRecord {
        BookingRecord {
            id,
            booking_id: format!("BK-{:04}", id),
            bed_number: format!("BED-{:04}", id),
            patient_name: patient.to_string(),
            patient_age: Some(40),
            patient_gender: None,
            patient_phone: "5550100".to_string(),
            patient_email: None,
            emergency_contact: None,
            admission_date: Some("2026-08-20".to_string()),
            admission_reason: "Not specified".to_string(),
            booked_by: None,
            created_at: "2026-08-19T10:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_groups_under_canonical_keys() {
        let mut raw = HashMap::new();
        raw.insert("general_ac".to_string(), vec![record(1, "A")]);
        raw.insert("icu".to_string(), vec![record(2, "B"), record(3, "C")]);

        let grouped = group_by_ward(raw);
        assert_eq!(grouped[&WardConfigKey::General(AcVariant::Ac)].len(), 1);
        assert_eq!(grouped[&WardConfigKey::Icu].len(), 2);
    }

    #[test]
    fn test_colliding_private_spellings_concatenate() {
        let mut raw = HashMap::new();
        raw.insert("private_1_bed_no_bath".to_string(), vec![record(1, "A")]);
        raw.insert("private_1bed_no_bath".to_string(), vec![record(2, "B")]);

        let grouped = group_by_ward(raw);
        // One entry for the slot, holding both bookings.
        assert_eq!(grouped.len(), 1);
        let merged = &grouped[&WardConfigKey::Private(RoomConfig::OneBedNoBath)];
        assert_eq!(merged.len(), 2);
        let mut ids: Vec<i64> = merged.iter().map(|b| b.id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_unknown_keys_are_dropped() {
        let mut raw = HashMap::new();
        raw.insert("surgical_ac".to_string(), vec![record(1, "A")]);
        raw.insert("emergency".to_string(), vec![record(2, "B")]);

        let grouped = group_by_ward(raw);
        assert_eq!(grouped.len(), 1);
        assert!(grouped.contains_key(&WardConfigKey::Emergency));
    }

    #[test]
    fn test_display_reserved_prefers_live_bookings() {
        let inv = WardInventory::derived(10, 4);
        assert_eq!(display_reserved(&inv, &[]), 4);
        let bookings = vec![record(1, "A"), record(2, "B")];
        assert_eq!(display_reserved(&inv, &bookings), 2);
    }

    #[test]
    fn test_raw_ward_key_construction() {
        use chrono::Utc;

        let row = |ward_type: &str, ac_type: &str, room_config: Option<&str>| BookingRow {
            id: 1,
            user_id: 1,
            hospital_id: 1,
            ward_type: ward_type.to_string(),
            ac_type: ac_type.to_string(),
            room_config: room_config.map(|s| s.to_string()),
            patient_name: "A".to_string(),
            patient_age: None,
            patient_gender: None,
            patient_phone: "5550100".to_string(),
            patient_email: None,
            emergency_contact: None,
            preferred_date: "2026-08-20".to_string(),
            expected_discharge_date: None,
            admission_reason: None,
            doctor_name: None,
            special_requirements: None,
            notes: None,
            booked_by_name: None,
            booked_by_email: None,
            booked_by_phone: None,
            status: "confirmed".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(raw_ward_key(&row("general", "ac", None)), "general_ac");
        assert_eq!(raw_ward_key(&row("icu", "not_applicable", None)), "icu");
        assert_eq!(
            raw_ward_key(&row("private_room", "not_applicable", Some("1_bed_no_bath"))),
            "private_1_bed_no_bath"
        );
        assert_eq!(
            raw_ward_key(&row("private_room", "not_applicable", Some("2bed_with_bath"))),
            "private_2bed_with_bath"
        );
    }
}
