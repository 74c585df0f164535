// src/inventory.rs
//! Ward inventory reconciliation: raw ward rows in, a complete map of the
//! eleven known slots out, plus the edit/commit lifecycle for a single slot.

use std::collections::BTreeMap;
use std::fmt;

use crate::models::{WardConfigKey, WardInventory, WardRow, WardType};

// ==================== VALIDATION ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    ReservedExceedsTotal { reserved: i64, total: i64 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidationError::ReservedExceedsTotal { reserved, total } => write!(
                f,
                "Reserved beds ({}) cannot exceed total beds ({})",
                reserved, total
            ),
        }
    }
}

/// The single commit-time constraint: a ward cannot reserve more beds than
/// it has.
pub fn validate_commit(total: i64, reserved: i64) -> Result<(), ValidationError> {
    if reserved > total {
        return Err(ValidationError::ReservedExceedsTotal { reserved, total });
    }
    Ok(())
}

// ==================== INGEST ====================

/// Build the in-memory inventory map from raw ward rows.
///
/// Every one of the eleven known slots is present in the result, defaulting
/// to zeros. `available` is recomputed as `total_beds - reserved_beds`;
/// the stored `available_beds` column is treated as derived and ignored so
/// the counters cannot drift apart. Rows that do not map to a known slot
/// are dropped with a warning, never an error.
pub fn ingest(rows: &[WardRow]) -> BTreeMap<WardConfigKey, WardInventory> {
    let mut inventory: BTreeMap<WardConfigKey, WardInventory> = WardConfigKey::ALL
        .iter()
        .map(|key| (*key, WardInventory::default()))
        .collect();

    for row in rows {
        let key = match WardConfigKey::from_raw_parts(
            &row.ward_type,
            &row.ac_type,
            row.room_config.as_deref(),
        ) {
            Some(key) => key,
            None => {
                log::warn!(
                    "Dropping ward row {}: unknown slot (ward_type='{}', ac_type='{}', room_config='{}')",
                    row.id,
                    row.ward_type,
                    row.ac_type,
                    row.room_config.as_deref().unwrap_or("-")
                );
                continue;
            }
        };

        inventory.insert(key, WardInventory::derived(row.total_beds, row.reserved_beds));
    }

    inventory
}

/// Beds available for a whole ward type: summed across AC variants for
/// general/pediatrics/maternity, across room configurations for private
/// rooms, or the single slot for ICU/emergency. Booking intake uses this
/// to mark a ward type as exhausted.
pub fn total_available(
    inventory: &BTreeMap<WardConfigKey, WardInventory>,
    ward_type: WardType,
) -> i64 {
    inventory
        .iter()
        .filter(|(key, _)| key.ward_type() == ward_type)
        .map(|(_, inv)| inv.available)
        .sum()
}

/// (available, capacity) across the whole hospital, for the status banner.
pub fn totals(inventory: &BTreeMap<WardConfigKey, WardInventory>) -> (i64, i64) {
    inventory.values().fold((0, 0), |(avail, cap), inv| {
        (avail + inv.available, cap + inv.total)
    })
}

// ==================== EDIT DRAFTS ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Total,
    Reserved,
}

/// A numeric input mid-edit. `Empty` models the user clearing the field;
/// it is valid as a draft and only coerced to zero at commit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Empty,
    Value(i64),
}

impl DraftField {
    pub fn value_or_zero(self) -> i64 {
        match self {
            DraftField::Empty => 0,
            DraftField::Value(v) => v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WardDraft {
    pub total: DraftField,
    pub reserved: DraftField,
    /// Recomputed on every accepted edit; may go negative mid-edit.
    pub available: i64,
}

impl WardDraft {
    pub fn from_inventory(inv: WardInventory) -> Self {
        Self {
            total: DraftField::Value(inv.total),
            reserved: DraftField::Value(inv.reserved),
            available: inv.available,
        }
    }

    /// Apply one raw keystroke-level edit. Returns whether the input was
    /// accepted; invalid input (non-numeric, negative) is a silent no-op
    /// and the previous value is retained.
    pub fn apply_edit(&mut self, field: EditField, raw: &str) -> bool {
        let value = if raw.is_empty() {
            DraftField::Empty
        } else {
            match raw.parse::<i64>() {
                Ok(v) if v >= 0 => DraftField::Value(v),
                _ => return false,
            }
        };

        match field {
            EditField::Total => self.total = value,
            EditField::Reserved => self.reserved = value,
        }
        self.available = self.total.value_or_zero() - self.reserved.value_or_zero();
        true
    }

    /// Finalize the draft: empty fields coerce to zero, then the
    /// reserved-within-total constraint is enforced.
    pub fn commit(&self) -> Result<CommitPayload, ValidationError> {
        let total = self.total.value_or_zero();
        let reserved = self.reserved.value_or_zero();
        validate_commit(total, reserved)?;

        let available = total - reserved;
        Ok(CommitPayload {
            total,
            available,
            reserved,
            occupied: total - available - reserved,
        })
    }
}

/// Validated counters ready for an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitPayload {
    pub total: i64,
    pub available: i64,
    pub reserved: i64,
    pub occupied: i64,
}

// ==================== SLOT LIFECYCLE ====================

/// Explicit per-slot edit lifecycle, replacing the implicit edit-mode
/// toggles of the original dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotState {
    Viewing,
    Editing(WardDraft),
    Saving(WardDraft),
    Error {
        draft: WardDraft,
        error: ValidationError,
    },
}

/// Holds the reconciled inventory plus the edit state of each slot.
/// Transitions:
///   Viewing -> Editing          begin_edit
///   Editing -> Saving           commit (local validation passed)
///   Editing -> Error            commit (validation failed, draft retained)
///   Saving  -> Viewing          complete_save (fresh inventory re-ingested)
///   Saving  -> Editing          fail_save (persistence failed, draft retained)
///   Error   -> Editing          resume_edit
#[derive(Debug)]
pub struct WardEditor {
    inventory: BTreeMap<WardConfigKey, WardInventory>,
    slots: BTreeMap<WardConfigKey, SlotState>,
}

impl WardEditor {
    pub fn new(inventory: BTreeMap<WardConfigKey, WardInventory>) -> Self {
        let slots = WardConfigKey::ALL
            .iter()
            .map(|key| (*key, SlotState::Viewing))
            .collect();
        Self { inventory, slots }
    }

    pub fn inventory(&self) -> &BTreeMap<WardConfigKey, WardInventory> {
        &self.inventory
    }

    pub fn state(&self, key: WardConfigKey) -> &SlotState {
        // Every key in the closed set is seeded in new().
        &self.slots[&key]
    }

    pub fn begin_edit(&mut self, key: WardConfigKey) {
        if let SlotState::Viewing = self.slots[&key] {
            let inv = self.inventory.get(&key).copied().unwrap_or_default();
            self.slots.insert(key, SlotState::Editing(WardDraft::from_inventory(inv)));
        }
    }

    /// Forward a raw input edit to the slot's draft. No-op unless the slot
    /// is in `Editing`.
    pub fn apply_edit(&mut self, key: WardConfigKey, field: EditField, raw: &str) -> bool {
        match self.slots.get_mut(&key) {
            Some(SlotState::Editing(draft)) => draft.apply_edit(field, raw),
            _ => false,
        }
    }

    /// "Done": validate the draft. On success the slot moves to `Saving`
    /// and the payload is handed back for persistence; on validation
    /// failure the slot moves to `Error` with the draft retained.
    pub fn commit(&mut self, key: WardConfigKey) -> Option<Result<CommitPayload, ValidationError>> {
        let draft = match self.slots.get(&key) {
            Some(SlotState::Editing(draft)) => *draft,
            _ => return None,
        };

        match draft.commit() {
            Ok(payload) => {
                self.slots.insert(key, SlotState::Saving(draft));
                Some(Ok(payload))
            }
            Err(error) => {
                self.slots.insert(key, SlotState::Error { draft, error });
                Some(Err(error))
            }
        }
    }

    /// Persistence succeeded: replace the whole inventory with a fresh
    /// ingest rather than trusting the local write.
    pub fn complete_save(
        &mut self,
        key: WardConfigKey,
        fresh: BTreeMap<WardConfigKey, WardInventory>,
    ) {
        if let Some(SlotState::Saving(_)) = self.slots.get(&key) {
            self.inventory = fresh;
            self.slots.insert(key, SlotState::Viewing);
        }
    }

    /// Persistence failed: nothing was written, so the draft goes back to
    /// `Editing` for the user to retry or correct.
    pub fn fail_save(&mut self, key: WardConfigKey) {
        if let Some(SlotState::Saving(draft)) = self.slots.get(&key) {
            let draft = *draft;
            self.slots.insert(key, SlotState::Editing(draft));
        }
    }

    /// Acknowledge a validation error and re-open edit mode.
    pub fn resume_edit(&mut self, key: WardConfigKey) {
        if let Some(SlotState::Error { draft, .. }) = self.slots.get(&key) {
            let draft = *draft;
            self.slots.insert(key, SlotState::Editing(draft));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AcVariant, RoomConfig};
    use chrono::Utc;

    fn row(
        id: i64,
        ward_type: &str,
        ac_type: &str,
        room_config: Option<&str>,
        total: i64,
        reserved: i64,
    ) -> WardRow {
        WardRow {
            id,
            hospital_id: 1,
            ward_type: ward_type.to_string(),
            ac_type: ac_type.to_string(),
            room_config: room_config.map(|s| s.to_string()),
            total_beds: total,
            // Deliberately inconsistent so tests catch any code path that
            // trusts the stored column.
            available_beds: 999,
            reserved_beds: reserved,
            occupied_beds: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_ingest_covers_all_slots_with_defaults() {
        let inventory = ingest(&[]);
        assert_eq!(inventory.len(), 11);
        for inv in inventory.values() {
            assert_eq!(*inv, WardInventory::default());
        }
    }

    #[test]
    fn test_ingest_recomputes_available() {
        let inventory = ingest(&[row(1, "general", "ac", None, 20, 5)]);
        let general_ac = inventory[&WardConfigKey::General(AcVariant::Ac)];
        assert_eq!(general_ac.total, 20);
        assert_eq!(general_ac.available, 15);
        assert_eq!(general_ac.reserved, 5);
    }

    #[test]
    fn test_ingest_is_idempotent() {
        let rows = vec![
            row(1, "general", "ac", None, 20, 5),
            row(2, "icu", "not_applicable", None, 8, 8),
            row(3, "private_room", "not_applicable", Some("1_bed_no_bath"), 4, 1),
        ];
        assert_eq!(ingest(&rows), ingest(&rows));
    }

    #[test]
    fn test_ingest_drops_unknown_rows() {
        let rows = vec![
            row(1, "general", "not_applicable", None, 10, 0),
            row(2, "surgical", "ac", None, 10, 0),
            row(3, "private_room", "not_applicable", Some("3_bed_no_bath"), 10, 0),
        ];
        let inventory = ingest(&rows);
        // Unknown rows are dropped; all slots stay at zero.
        assert_eq!(inventory.len(), 11);
        assert!(inventory.values().all(|inv| inv.total == 0));
    }

    #[test]
    fn test_ingest_accepts_both_room_config_spellings() {
        let inventory = ingest(&[row(
            1,
            "private_room",
            "not_applicable",
            Some("1bed_no_bath"),
            4,
            2,
        )]);
        let slot = inventory[&WardConfigKey::Private(RoomConfig::OneBedNoBath)];
        assert_eq!(slot.total, 4);
        assert_eq!(slot.available, 2);
    }

    #[test]
    fn test_total_available_sums_variants() {
        let inventory = ingest(&[
            row(1, "general", "ac", None, 20, 5),
            row(2, "general", "non_ac", None, 10, 10),
            row(3, "icu", "not_applicable", None, 6, 2),
            row(4, "private_room", "not_applicable", Some("1_bed_no_bath"), 3, 0),
            row(5, "private_room", "not_applicable", Some("2_bed_with_bath"), 2, 1),
        ]);

        assert_eq!(total_available(&inventory, WardType::General), 15);
        assert_eq!(total_available(&inventory, WardType::Icu), 4);
        assert_eq!(total_available(&inventory, WardType::PrivateRoom), 4);
        assert_eq!(total_available(&inventory, WardType::Maternity), 0);
    }

    #[test]
    fn test_draft_edit_recomputes_available() {
        let mut draft = WardDraft::from_inventory(WardInventory::derived(20, 5));
        assert!(draft.apply_edit(EditField::Reserved, "8"));
        assert_eq!(draft.available, 12);
        assert!(draft.apply_edit(EditField::Total, "10"));
        assert_eq!(draft.available, 2);
    }

    #[test]
    fn test_draft_rejects_invalid_input_silently() {
        let mut draft = WardDraft::from_inventory(WardInventory::derived(20, 5));
        assert!(!draft.apply_edit(EditField::Total, "abc"));
        assert!(!draft.apply_edit(EditField::Total, "-3"));
        assert!(!draft.apply_edit(EditField::Total, "1.5"));
        // Previous values retained.
        assert_eq!(draft.total, DraftField::Value(20));
        assert_eq!(draft.available, 15);
    }

    #[test]
    fn test_draft_allows_transient_negative_available() {
        let mut draft = WardDraft::from_inventory(WardInventory::derived(5, 0));
        assert!(draft.apply_edit(EditField::Reserved, "9"));
        assert_eq!(draft.available, -4);
        // Not committable in this state.
        assert_eq!(
            draft.commit(),
            Err(ValidationError::ReservedExceedsTotal { reserved: 9, total: 5 })
        );
    }

    #[test]
    fn test_draft_empty_fields_coerce_to_zero_on_commit() {
        let mut draft = WardDraft::from_inventory(WardInventory::derived(20, 5));
        assert!(draft.apply_edit(EditField::Reserved, ""));
        assert_eq!(draft.reserved, DraftField::Empty);

        let payload = draft.commit().unwrap();
        assert_eq!(payload.reserved, 0);
        assert_eq!(payload.available, 20);
        assert_eq!(payload.occupied, 0);
    }

    #[test]
    fn test_commit_rejects_reserved_over_total() {
        assert_eq!(
            validate_commit(5, 6),
            Err(ValidationError::ReservedExceedsTotal { reserved: 6, total: 5 })
        );
        assert_eq!(validate_commit(5, 5), Ok(()));
    }

    #[test]
    fn test_committed_payload_satisfies_invariants() {
        let mut draft = WardDraft::from_inventory(WardInventory::default());
        draft.apply_edit(EditField::Total, "20");
        draft.apply_edit(EditField::Reserved, "5");
        let payload = draft.commit().unwrap();
        assert_eq!(payload.available, payload.total - payload.reserved);
        assert!(payload.reserved <= payload.total);
    }

    #[test]
    fn test_editor_lifecycle_success() {
        let key = WardConfigKey::General(AcVariant::Ac);
        let rows = vec![row(1, "general", "ac", None, 20, 5)];
        let mut editor = WardEditor::new(ingest(&rows));

        editor.begin_edit(key);
        assert!(matches!(editor.state(key), SlotState::Editing(_)));

        assert!(editor.apply_edit(key, EditField::Reserved, "7"));
        let payload = editor.commit(key).unwrap().unwrap();
        assert_eq!(payload.reserved, 7);
        assert!(matches!(editor.state(key), SlotState::Saving(_)));

        // Simulated post-save refetch.
        let fresh = ingest(&[row(1, "general", "ac", None, 20, 7)]);
        editor.complete_save(key, fresh);
        assert!(matches!(editor.state(key), SlotState::Viewing));
        assert_eq!(editor.inventory()[&key].reserved, 7);
    }

    #[test]
    fn test_editor_validation_failure_keeps_persisted_state() {
        let key = WardConfigKey::General(AcVariant::Ac);
        let rows = vec![row(1, "general", "ac", None, 20, 5)];
        let mut editor = WardEditor::new(ingest(&rows));

        editor.begin_edit(key);
        editor.apply_edit(key, EditField::Reserved, "25");
        let result = editor.commit(key).unwrap();
        assert_eq!(
            result,
            Err(ValidationError::ReservedExceedsTotal { reserved: 25, total: 20 })
        );
        assert!(matches!(editor.state(key), SlotState::Error { .. }));

        // Nothing was persisted; the reconciled inventory still shows 5.
        assert_eq!(editor.inventory()[&key].reserved, 5);

        // Re-opening edit retains the draft.
        editor.resume_edit(key);
        match editor.state(key) {
            SlotState::Editing(draft) => assert_eq!(draft.reserved, DraftField::Value(25)),
            other => panic!("expected Editing, got {:?}", other),
        }
    }

    #[test]
    fn test_editor_save_failure_reopens_edit() {
        let key = WardConfigKey::Icu;
        let mut editor = WardEditor::new(ingest(&[]));

        editor.begin_edit(key);
        editor.apply_edit(key, EditField::Total, "6");
        assert!(editor.commit(key).unwrap().is_ok());

        editor.fail_save(key);
        match editor.state(key) {
            SlotState::Editing(draft) => assert_eq!(draft.total, DraftField::Value(6)),
            other => panic!("expected Editing, got {:?}", other),
        }
    }
}
