//! Use-cases over ambulance documents and their waiting lists.
//!
//! Handlers construct a [`WaitingListService`] around the store bound to the
//! current request. Waiting-list mutations follow a load, modify, replace
//! cycle; concurrent writers to the same ambulance are last-write-wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::{error, warn};
use uuid::Uuid;

use super::ambulance::{
    Ambulance, Condition, WaitingListEntry, WaitingListEntryPatch, WaitingListError,
};
use super::ports::{DocumentStore, DocumentStoreError};
use super::Error;

/// Placeholder id clients send when asking the server to allocate one.
pub const NEW_ID_PLACEHOLDER: &str = "@new";

/// Duration used when neither the entry nor its condition provides one.
pub const DEFAULT_ENTRY_DURATION_MINUTES: u32 = 15;

/// New waiting-list entry as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewWaitingListEntry {
    pub id: Option<String>,
    pub name: String,
    pub patient_id: String,
    pub waiting_since: Option<DateTime<Utc>>,
    pub estimated_duration_minutes: Option<u32>,
    pub condition: Option<Condition>,
}

/// Ambulance and waiting-list operations backed by a document store.
#[derive(Clone)]
pub struct WaitingListService {
    store: Arc<dyn DocumentStore<Ambulance>>,
    clock: Arc<dyn Clock>,
}

fn allocate_id(requested: Option<&str>) -> String {
    match requested.map(str::trim) {
        Some(id) if !id.is_empty() && id != NEW_ID_PLACEHOLDER => id.to_owned(),
        _ => Uuid::new_v4().to_string(),
    }
}

fn map_store_error(err: DocumentStoreError) -> Error {
    match err {
        DocumentStoreError::NotFound { .. } => Error::not_found("Ambulance not found"),
        DocumentStoreError::Conflict { .. } => Error::conflict("Ambulance already exists"),
        DocumentStoreError::Unavailable { ref message } => {
            warn!(error = %message, "document store unavailable");
            Error::service_unavailable("Document store is unavailable")
        }
        DocumentStoreError::Query { ref message } => {
            error!(error = %message, "document store query failed");
            Error::internal(format!("document store query failed: {message}"))
        }
    }
}

fn map_waiting_list_error(err: WaitingListError) -> Error {
    match err {
        WaitingListError::EntryNotFound { .. } => Error::not_found("Entry not found"),
        WaitingListError::DuplicateEntry { .. } => Error::conflict("Entry already exists"),
        WaitingListError::PatientAlreadyWaiting { ref patient_id } => {
            Error::conflict("Patient is already on the waiting list")
                .with_details(serde_json::json!({ "patientId": patient_id }))
        }
        WaitingListError::IdMismatch { .. } => {
            Error::invalid_request("Entry id does not match the request path")
        }
        WaitingListError::ScheduleOutOfRange { ref id } => {
            Error::invalid_request("Estimated start is outside the supported date range")
                .with_details(serde_json::json!({ "entryId": id }))
        }
    }
}

impl WaitingListService {
    /// Build the service from a store and a clock.
    pub fn new(store: Arc<dyn DocumentStore<Ambulance>>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Persist a new ambulance, allocating an id when none was supplied.
    pub async fn create_ambulance(&self, mut ambulance: Ambulance) -> Result<Ambulance, Error> {
        if ambulance.name.trim().is_empty() {
            return Err(Error::invalid_request("name must not be empty")
                .with_details(serde_json::json!({ "field": "name" })));
        }
        ambulance.id = allocate_id(Some(ambulance.id.as_str()));
        ambulance
            .reconcile(self.clock.utc())
            .map_err(map_waiting_list_error)?;
        self.store
            .create_document(&ambulance.id, &ambulance)
            .await
            .map_err(map_store_error)?;
        Ok(ambulance)
    }

    /// Load one ambulance.
    pub async fn ambulance(&self, ambulance_id: &str) -> Result<Ambulance, Error> {
        self.store
            .find_document(ambulance_id)
            .await
            .map_err(map_store_error)
    }

    /// Load all ambulances.
    pub async fn ambulances(&self) -> Result<Vec<Ambulance>, Error> {
        self.store.list_documents().await.map_err(map_store_error)
    }

    /// Remove an ambulance together with its waiting list.
    pub async fn delete_ambulance(&self, ambulance_id: &str) -> Result<(), Error> {
        self.store
            .delete_document(ambulance_id)
            .await
            .map_err(map_store_error)
    }

    /// Waiting-list entries in service order.
    pub async fn entries(&self, ambulance_id: &str) -> Result<Vec<WaitingListEntry>, Error> {
        Ok(self.ambulance(ambulance_id).await?.waiting_list)
    }

    /// One waiting-list entry.
    pub async fn entry(
        &self,
        ambulance_id: &str,
        entry_id: &str,
    ) -> Result<WaitingListEntry, Error> {
        self.ambulance(ambulance_id)
            .await?
            .entry(entry_id)
            .cloned()
            .ok_or_else(|| Error::not_found("Entry not found"))
    }

    /// Conditions offered by the ambulance for triage.
    pub async fn conditions(&self, ambulance_id: &str) -> Result<Vec<Condition>, Error> {
        Ok(self.ambulance(ambulance_id).await?.predefined_conditions)
    }

    /// Add a patient to the waiting list.
    pub async fn create_entry(
        &self,
        ambulance_id: &str,
        draft: NewWaitingListEntry,
    ) -> Result<WaitingListEntry, Error> {
        if draft.patient_id.trim().is_empty() {
            return Err(Error::invalid_request("patientId must not be empty")
                .with_details(serde_json::json!({ "field": "patientId" })));
        }
        self.modify_ambulance(ambulance_id, move |ambulance, now| {
            let waiting_since = draft.waiting_since.unwrap_or(now);
            let estimated_duration_minutes = draft
                .estimated_duration_minutes
                .or_else(|| {
                    draft
                        .condition
                        .as_ref()
                        .and_then(|condition| condition.typical_duration_minutes)
                })
                .unwrap_or(DEFAULT_ENTRY_DURATION_MINUTES);
            let entry = WaitingListEntry {
                id: allocate_id(draft.id.as_deref()),
                name: draft.name,
                patient_id: draft.patient_id,
                waiting_since,
                estimated_start: waiting_since,
                estimated_duration_minutes,
                condition: draft.condition,
            };
            ambulance.add_entry(entry, now)
        })
        .await
    }

    /// Apply a partial update to an entry.
    pub async fn update_entry(
        &self,
        ambulance_id: &str,
        entry_id: &str,
        patch: WaitingListEntryPatch,
    ) -> Result<WaitingListEntry, Error> {
        self.modify_ambulance(ambulance_id, |ambulance, now| {
            ambulance.update_entry(entry_id, patch, now)
        })
        .await
    }

    /// Remove a patient from the waiting list.
    pub async fn delete_entry(&self, ambulance_id: &str, entry_id: &str) -> Result<(), Error> {
        self.modify_ambulance(ambulance_id, |ambulance, now| {
            ambulance.remove_entry(entry_id, now)
        })
        .await
    }

    async fn modify_ambulance<R, F>(&self, ambulance_id: &str, modify: F) -> Result<R, Error>
    where
        F: FnOnce(&mut Ambulance, DateTime<Utc>) -> Result<R, WaitingListError>,
    {
        let mut ambulance = self.ambulance(ambulance_id).await?;
        let result = modify(&mut ambulance, self.clock.utc()).map_err(map_waiting_list_error)?;
        self.store
            .update_document(ambulance_id, &ambulance)
            .await
            .map_err(map_store_error)?;
        Ok(result)
    }
}
