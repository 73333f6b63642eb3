//! Panorama-id keyed deduplication.
//!
//! Neighbouring grid points have overlapping search radii and routinely
//! return the same panorama. The [`Deduplicator`] keeps one record per
//! `pano_id`: the sighting with the smallest `distance_m`, ties going to the
//! lower grid `sequence_index`. That key is a total order over sightings, so the
//! stored record does not depend on the order in which workers offer them.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use pano_hunter_core::PanoramaRecord;
use serde::{Deserialize, Serialize};

/// Result of [`Deduplicator::offer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferOutcome {
    /// First sighting of this panorama.
    Inserted,
    /// Already known from an equally close or closer probe.
    DuplicateIgnored,
    /// Already known, but this probe is closer; the stored record was replaced.
    DuplicateReplaced,
}

impl OfferOutcome {
    #[inline]
    pub fn is_duplicate(self) -> bool {
        !matches!(self, OfferOutcome::Inserted)
    }
}

#[derive(Default)]
struct Table {
    slots: HashMap<String, usize>,
    records: Vec<PanoramaRecord>,
}

/// Returns true if `new` should replace `old`.
fn is_closer(new: &PanoramaRecord, old: &PanoramaRecord) -> bool {
    new.distance_m < old.distance_m
        || (new.distance_m == old.distance_m
            && new.discovered_from.sequence_index < old.discovered_from.sequence_index)
}

/// Thread-safe first-seen/closest-kept record table.
#[derive(Default)]
pub struct Deduplicator {
    table: Mutex<Table>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offer(&self, record: PanoramaRecord) -> OfferOutcome {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        match table.slots.get(&record.pano_id).copied() {
            None => {
                let slot = table.records.len();
                table.slots.insert(record.pano_id.clone(), slot);
                table.records.push(record);
                OfferOutcome::Inserted
            }
            Some(slot) if is_closer(&record, &table.records[slot]) => {
                table.records[slot] = record;
                OfferOutcome::DuplicateReplaced
            }
            Some(_) => OfferOutcome::DuplicateIgnored,
        }
    }

    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, pano_id: &str) -> Option<PanoramaRecord> {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = *table.slots.get(pano_id)?;
        table.records.get(slot).cloned()
    }

    /// Copy of the current records in first-insertion order.
    pub fn snapshot(&self) -> Vec<PanoramaRecord> {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .clone()
    }

    /// Records in first-insertion order; a replacement keeps its original slot.
    pub fn into_records(self) -> Vec<PanoramaRecord> {
        self.table
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .records
    }
}
