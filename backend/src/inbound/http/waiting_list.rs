//! Waiting-list HTTP handlers.
//!
//! ```text
//! GET    /api/waiting-list/{ambulanceId}/entries
//! POST   /api/waiting-list/{ambulanceId}/entries
//! GET    /api/waiting-list/{ambulanceId}/entries/{entryId}
//! PUT    /api/waiting-list/{ambulanceId}/entries/{entryId}
//! DELETE /api/waiting-list/{ambulanceId}/entries/{entryId}
//! GET    /api/waiting-list/{ambulanceId}/condition
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Ambulance, NewWaitingListEntry, WaitingListEntry, WaitingListEntryPatch};
use crate::inbound::http::ApiResult;
use crate::inbound::http::ambulances::ConditionBody;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::middleware::BoundStore;

/// Patient waiting in front of an ambulance.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WaitingListEntryBody {
    #[schema(example = "x321ab3")]
    pub id: String,
    #[schema(example = "Jožko Púčik")]
    pub name: String,
    #[schema(example = "460527-jozef-pucik")]
    pub patient_id: String,
    pub waiting_since: DateTime<Utc>,
    /// Computed by the server from the queue order.
    pub estimated_start: DateTime<Utc>,
    #[schema(example = 15)]
    pub estimated_duration_minutes: u32,
    pub condition: Option<ConditionBody>,
}

impl From<WaitingListEntry> for WaitingListEntryBody {
    fn from(value: WaitingListEntry) -> Self {
        Self {
            id: value.id,
            name: value.name,
            patient_id: value.patient_id,
            waiting_since: value.waiting_since,
            estimated_start: value.estimated_start,
            estimated_duration_minutes: value.estimated_duration_minutes,
            condition: value.condition.map(Into::into),
        }
    }
}

/// Request payload for adding or updating a waiting-list entry.
///
/// On update, absent fields keep their stored values.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WaitingListEntryRequest {
    /// Requested id; blank or `@new` asks the server to allocate one.
    pub id: Option<String>,
    pub name: Option<String>,
    pub patient_id: Option<String>,
    pub waiting_since: Option<DateTime<Utc>>,
    pub estimated_duration_minutes: Option<u32>,
    pub condition: Option<ConditionBody>,
}

impl From<WaitingListEntryRequest> for NewWaitingListEntry {
    fn from(value: WaitingListEntryRequest) -> Self {
        Self {
            id: value.id,
            name: value.name.unwrap_or_default(),
            patient_id: value.patient_id.unwrap_or_default(),
            waiting_since: value.waiting_since,
            estimated_duration_minutes: value.estimated_duration_minutes,
            condition: value.condition.map(Into::into),
        }
    }
}

impl From<WaitingListEntryRequest> for WaitingListEntryPatch {
    fn from(value: WaitingListEntryRequest) -> Self {
        Self {
            id: value.id,
            name: value.name,
            patient_id: value.patient_id,
            waiting_since: value.waiting_since,
            estimated_duration_minutes: value.estimated_duration_minutes,
            condition: value.condition.map(Into::into),
        }
    }
}

/// List the waiting list in service order.
#[utoipa::path(
    get,
    path = "/api/waiting-list/{ambulanceId}/entries",
    params(("ambulanceId" = String, Path, description = "Ambulance id")),
    responses(
        (status = 200, description = "Waiting-list entries", body = [WaitingListEntryBody]),
        (status = 404, description = "Ambulance not found", body = ErrorSchema),
        (status = 503, description = "Document store unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["waiting-list"],
    operation_id = "getWaitingListEntries"
)]
#[get("/api/waiting-list/{ambulanceId}/entries")]
pub async fn list_entries(
    state: web::Data<HttpState>,
    store: BoundStore<Ambulance>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<WaitingListEntryBody>>> {
    let entries = state.waiting_list(&store).entries(&path).await?;
    Ok(web::Json(entries.into_iter().map(Into::into).collect()))
}

/// Add a patient to the waiting list.
#[utoipa::path(
    post,
    path = "/api/waiting-list/{ambulanceId}/entries",
    params(("ambulanceId" = String, Path, description = "Ambulance id")),
    request_body = WaitingListEntryRequest,
    responses(
        (status = 200, description = "Entry created", body = WaitingListEntryBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Ambulance not found", body = ErrorSchema),
        (status = 409, description = "Entry or patient already waiting", body = ErrorSchema),
        (status = 503, description = "Document store unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["waiting-list"],
    operation_id = "createWaitingListEntry"
)]
#[post("/api/waiting-list/{ambulanceId}/entries")]
pub async fn create_entry(
    state: web::Data<HttpState>,
    store: BoundStore<Ambulance>,
    path: web::Path<String>,
    payload: web::Json<WaitingListEntryRequest>,
) -> ApiResult<web::Json<WaitingListEntryBody>> {
    let entry = state
        .waiting_list(&store)
        .create_entry(&path, payload.into_inner().into())
        .await?;
    Ok(web::Json(entry.into()))
}

/// Read one waiting-list entry.
#[utoipa::path(
    get,
    path = "/api/waiting-list/{ambulanceId}/entries/{entryId}",
    params(
        ("ambulanceId" = String, Path, description = "Ambulance id"),
        ("entryId" = String, Path, description = "Entry id")
    ),
    responses(
        (status = 200, description = "Waiting-list entry", body = WaitingListEntryBody),
        (status = 404, description = "Ambulance or entry not found", body = ErrorSchema),
        (status = 503, description = "Document store unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["waiting-list"],
    operation_id = "getWaitingListEntry"
)]
#[get("/api/waiting-list/{ambulanceId}/entries/{entryId}")]
pub async fn get_entry(
    state: web::Data<HttpState>,
    store: BoundStore<Ambulance>,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<WaitingListEntryBody>> {
    let (ambulance_id, entry_id) = path.into_inner();
    let entry = state
        .waiting_list(&store)
        .entry(&ambulance_id, &entry_id)
        .await?;
    Ok(web::Json(entry.into()))
}

/// Update a waiting-list entry.
#[utoipa::path(
    put,
    path = "/api/waiting-list/{ambulanceId}/entries/{entryId}",
    params(
        ("ambulanceId" = String, Path, description = "Ambulance id"),
        ("entryId" = String, Path, description = "Entry id")
    ),
    request_body = WaitingListEntryRequest,
    responses(
        (status = 200, description = "Entry updated", body = WaitingListEntryBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Ambulance or entry not found", body = ErrorSchema),
        (status = 409, description = "Patient already waiting", body = ErrorSchema),
        (status = 503, description = "Document store unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["waiting-list"],
    operation_id = "updateWaitingListEntry"
)]
#[put("/api/waiting-list/{ambulanceId}/entries/{entryId}")]
pub async fn update_entry(
    state: web::Data<HttpState>,
    store: BoundStore<Ambulance>,
    path: web::Path<(String, String)>,
    payload: web::Json<WaitingListEntryRequest>,
) -> ApiResult<web::Json<WaitingListEntryBody>> {
    let (ambulance_id, entry_id) = path.into_inner();
    let entry = state
        .waiting_list(&store)
        .update_entry(&ambulance_id, &entry_id, payload.into_inner().into())
        .await?;
    Ok(web::Json(entry.into()))
}

/// Remove a patient from the waiting list.
#[utoipa::path(
    delete,
    path = "/api/waiting-list/{ambulanceId}/entries/{entryId}",
    params(
        ("ambulanceId" = String, Path, description = "Ambulance id"),
        ("entryId" = String, Path, description = "Entry id")
    ),
    responses(
        (status = 204, description = "Entry removed"),
        (status = 404, description = "Ambulance or entry not found", body = ErrorSchema),
        (status = 503, description = "Document store unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["waiting-list"],
    operation_id = "deleteWaitingListEntry"
)]
#[delete("/api/waiting-list/{ambulanceId}/entries/{entryId}")]
pub async fn delete_entry(
    state: web::Data<HttpState>,
    store: BoundStore<Ambulance>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (ambulance_id, entry_id) = path.into_inner();
    state
        .waiting_list(&store)
        .delete_entry(&ambulance_id, &entry_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Conditions the ambulance offers for triage.
#[utoipa::path(
    get,
    path = "/api/waiting-list/{ambulanceId}/condition",
    params(("ambulanceId" = String, Path, description = "Ambulance id")),
    responses(
        (status = 200, description = "Predefined conditions", body = [ConditionBody]),
        (status = 404, description = "Ambulance not found", body = ErrorSchema),
        (status = 503, description = "Document store unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["waiting-list"],
    operation_id = "getConditions"
)]
#[get("/api/waiting-list/{ambulanceId}/condition")]
pub async fn list_conditions(
    state: web::Data<HttpState>,
    store: BoundStore<Ambulance>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<ConditionBody>>> {
    let conditions = state.waiting_list(&store).conditions(&path).await?;
    Ok(web::Json(conditions.into_iter().map(Into::into).collect()))
}
