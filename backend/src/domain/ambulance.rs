//! Ambulance waiting-list aggregate.
//!
//! An [`Ambulance`] is stored as a single document holding its waiting list
//! and the conditions patients may be triaged with. Every mutation of the
//! waiting list goes through this module so the ordering and start-time
//! estimates stay consistent.
//!
//! ## Invariants
//! - Entries are ordered by `waiting_since` after each mutation.
//! - Entry ids and patient ids are unique within one waiting list.
//! - No entry starts before it arrived or before the previous entry ends.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ambulance document as persisted in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ambulance {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub room_number: String,
    #[serde(default)]
    pub waiting_list: Vec<WaitingListEntry>,
    #[serde(default)]
    pub predefined_conditions: Vec<Condition>,
}

/// Patient waiting in front of an ambulance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitingListEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub patient_id: String,
    pub waiting_since: DateTime<Utc>,
    pub estimated_start: DateTime<Utc>,
    pub estimated_duration_minutes: u32,
    #[serde(default)]
    pub condition: Option<Condition>,
}

/// Reason for the visit, optionally coded against an external vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub value: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub typical_duration_minutes: Option<u32>,
}

/// Partial update applied to an existing entry; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaitingListEntryPatch {
    pub id: Option<String>,
    pub name: Option<String>,
    pub patient_id: Option<String>,
    pub waiting_since: Option<DateTime<Utc>>,
    pub estimated_duration_minutes: Option<u32>,
    pub condition: Option<Condition>,
}

/// Violations of the waiting-list invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitingListError {
    #[error("entry {id} not found")]
    EntryNotFound { id: String },
    #[error("entry {id} already exists")]
    DuplicateEntry { id: String },
    #[error("patient {patient_id} is already waiting")]
    PatientAlreadyWaiting { patient_id: String },
    #[error("entry id {given} does not match {expected}")]
    IdMismatch { expected: String, given: String },
    #[error("estimated start of entry {id} is out of range")]
    ScheduleOutOfRange { id: String },
}

impl Ambulance {
    /// Look up an entry by id.
    pub fn entry(&self, entry_id: &str) -> Option<&WaitingListEntry> {
        self.waiting_list.iter().find(|entry| entry.id == entry_id)
    }

    /// Append a new entry and recompute start estimates.
    ///
    /// # Errors
    /// Rejects entries whose id or patient id is already on the list, and
    /// entries that would push a start estimate past the representable range.
    /// The list is left untouched on error.
    pub fn add_entry(
        &mut self,
        entry: WaitingListEntry,
        now: DateTime<Utc>,
    ) -> Result<WaitingListEntry, WaitingListError> {
        if self.entry(&entry.id).is_some() {
            return Err(WaitingListError::DuplicateEntry { id: entry.id });
        }
        if self
            .waiting_list
            .iter()
            .any(|existing| existing.patient_id == entry.patient_id)
        {
            return Err(WaitingListError::PatientAlreadyWaiting {
                patient_id: entry.patient_id,
            });
        }
        let entry_id = entry.id.clone();
        let mut candidate = self.waiting_list.clone();
        candidate.push(entry);
        self.waiting_list = schedule(candidate, now)?;
        self.reconciled_entry(&entry_id)
    }

    /// Apply `patch` to the entry identified by `entry_id`.
    ///
    /// # Errors
    /// Fails when the entry is missing, the patch tries to change the entry
    /// id, the new patient id collides with another entry, or the schedule
    /// overflows. The list is left untouched on error.
    pub fn update_entry(
        &mut self,
        entry_id: &str,
        patch: WaitingListEntryPatch,
        now: DateTime<Utc>,
    ) -> Result<WaitingListEntry, WaitingListError> {
        if let Some(given) = patch.id.as_deref().filter(|given| *given != entry_id) {
            return Err(WaitingListError::IdMismatch {
                expected: entry_id.to_owned(),
                given: given.to_owned(),
            });
        }
        if let Some(patient_id) = patch.patient_id.as_deref() {
            let taken = self
                .waiting_list
                .iter()
                .any(|other| other.id != entry_id && other.patient_id == patient_id);
            if taken {
                return Err(WaitingListError::PatientAlreadyWaiting {
                    patient_id: patient_id.to_owned(),
                });
            }
        }

        let mut candidate = self.waiting_list.clone();
        let entry = candidate
            .iter_mut()
            .find(|entry| entry.id == entry_id)
            .ok_or_else(|| WaitingListError::EntryNotFound {
                id: entry_id.to_owned(),
            })?;
        if let Some(name) = patch.name {
            entry.name = name;
        }
        if let Some(patient_id) = patch.patient_id {
            entry.patient_id = patient_id;
        }
        if let Some(waiting_since) = patch.waiting_since {
            entry.waiting_since = waiting_since;
        }
        if let Some(minutes) = patch.estimated_duration_minutes {
            entry.estimated_duration_minutes = minutes;
        }
        if let Some(condition) = patch.condition {
            entry.condition = Some(condition);
        }

        self.waiting_list = schedule(candidate, now)?;
        self.reconciled_entry(entry_id)
    }

    /// Remove an entry and recompute the remaining start estimates.
    ///
    /// # Errors
    /// Returns [`WaitingListError::EntryNotFound`] when no entry matches.
    pub fn remove_entry(
        &mut self,
        entry_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), WaitingListError> {
        let mut candidate = self.waiting_list.clone();
        candidate.retain(|entry| entry.id != entry_id);
        if candidate.len() == self.waiting_list.len() {
            return Err(WaitingListError::EntryNotFound {
                id: entry_id.to_owned(),
            });
        }
        self.waiting_list = schedule(candidate, now)?;
        Ok(())
    }

    /// Sort the list by arrival and push start estimates forward so no two
    /// entries overlap.
    ///
    /// The first entry keeps its stored estimate unless that lies before its
    /// arrival or in the past; each later entry starts once the previous one
    /// is expected to finish.
    ///
    /// # Errors
    /// Returns [`WaitingListError::ScheduleOutOfRange`] when an entry's end
    /// time cannot be represented; the list is left untouched.
    pub fn reconcile(&mut self, now: DateTime<Utc>) -> Result<(), WaitingListError> {
        self.waiting_list = schedule(self.waiting_list.clone(), now)?;
        Ok(())
    }

    fn reconciled_entry(&self, entry_id: &str) -> Result<WaitingListEntry, WaitingListError> {
        self.entry(entry_id)
            .cloned()
            .ok_or_else(|| WaitingListError::EntryNotFound {
                id: entry_id.to_owned(),
            })
    }
}

fn schedule(
    mut entries: Vec<WaitingListEntry>,
    now: DateTime<Utc>,
) -> Result<Vec<WaitingListEntry>, WaitingListError> {
    entries.sort_by(|left, right| left.waiting_since.cmp(&right.waiting_since));

    let mut earliest = now;
    for entry in &mut entries {
        entry.estimated_start = entry
            .estimated_start
            .max(entry.waiting_since)
            .max(earliest);
        let duration = Duration::minutes(i64::from(entry.estimated_duration_minutes));
        earliest = entry
            .estimated_start
            .checked_add_signed(duration)
            .ok_or_else(|| WaitingListError::ScheduleOutOfRange {
                id: entry.id.clone(),
            })?;
    }
    Ok(entries)
}
