//! Ambulance HTTP handlers.
//!
//! ```text
//! POST   /api/ambulance
//! GET    /api/ambulance
//! GET    /api/ambulance/{ambulanceId}
//! DELETE /api/ambulance/{ambulanceId}
//! ```

use actix_web::{HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Ambulance, Condition};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::waiting_list::WaitingListEntryBody;
use crate::middleware::BoundStore;

/// Triage condition offered by an ambulance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConditionBody {
    #[schema(example = "Fever")]
    pub value: String,
    #[schema(example = "subfebrilia")]
    pub code: Option<String>,
    #[schema(example = "https://zdravoteka.sk/priznaky/zvysena-telesna-teplota/")]
    pub reference: Option<String>,
    #[schema(example = 20)]
    pub typical_duration_minutes: Option<u32>,
}

impl From<ConditionBody> for Condition {
    fn from(value: ConditionBody) -> Self {
        Self {
            value: value.value,
            code: value.code,
            reference: value.reference,
            typical_duration_minutes: value.typical_duration_minutes,
        }
    }
}

impl From<Condition> for ConditionBody {
    fn from(value: Condition) -> Self {
        Self {
            value: value.value,
            code: value.code,
            reference: value.reference,
            typical_duration_minutes: value.typical_duration_minutes,
        }
    }
}

/// Request payload for registering an ambulance.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAmbulanceRequest {
    /// Requested id; blank or `@new` asks the server to allocate one.
    #[serde(default)]
    #[schema(example = "bobulova")]
    pub id: Option<String>,
    #[schema(example = "Dr. Bobulová")]
    pub name: String,
    #[serde(default)]
    #[schema(example = "211")]
    pub room_number: String,
    #[serde(default)]
    pub predefined_conditions: Vec<ConditionBody>,
}

/// Ambulance with its current waiting list.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AmbulanceBody {
    pub id: String,
    pub name: String,
    pub room_number: String,
    pub waiting_list: Vec<WaitingListEntryBody>,
    pub predefined_conditions: Vec<ConditionBody>,
}

impl From<Ambulance> for AmbulanceBody {
    fn from(value: Ambulance) -> Self {
        Self {
            id: value.id,
            name: value.name,
            room_number: value.room_number,
            waiting_list: value.waiting_list.into_iter().map(Into::into).collect(),
            predefined_conditions: value
                .predefined_conditions
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

impl From<CreateAmbulanceRequest> for Ambulance {
    fn from(value: CreateAmbulanceRequest) -> Self {
        Self {
            id: value.id.unwrap_or_default(),
            name: value.name,
            room_number: value.room_number,
            waiting_list: Vec::new(),
            predefined_conditions: value
                .predefined_conditions
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

/// Register a new ambulance.
#[utoipa::path(
    post,
    path = "/api/ambulance",
    request_body = CreateAmbulanceRequest,
    responses(
        (status = 201, description = "Ambulance created", body = AmbulanceBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 409, description = "Ambulance id already exists", body = ErrorSchema),
        (status = 503, description = "Document store unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["ambulances"],
    operation_id = "createAmbulance"
)]
#[post("/api/ambulance")]
pub async fn create_ambulance(
    state: web::Data<HttpState>,
    store: BoundStore<Ambulance>,
    payload: web::Json<CreateAmbulanceRequest>,
) -> ApiResult<HttpResponse> {
    let created = state
        .waiting_list(&store)
        .create_ambulance(payload.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(AmbulanceBody::from(created)))
}

/// List every registered ambulance.
#[utoipa::path(
    get,
    path = "/api/ambulance",
    responses(
        (status = 200, description = "Ambulances", body = [AmbulanceBody]),
        (status = 503, description = "Document store unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["ambulances"],
    operation_id = "listAmbulances"
)]
#[get("/api/ambulance")]
pub async fn list_ambulances(
    state: web::Data<HttpState>,
    store: BoundStore<Ambulance>,
) -> ApiResult<web::Json<Vec<AmbulanceBody>>> {
    let ambulances = state.waiting_list(&store).ambulances().await?;
    Ok(web::Json(ambulances.into_iter().map(Into::into).collect()))
}

/// Read one ambulance.
#[utoipa::path(
    get,
    path = "/api/ambulance/{ambulanceId}",
    params(("ambulanceId" = String, Path, description = "Ambulance id")),
    responses(
        (status = 200, description = "Ambulance", body = AmbulanceBody),
        (status = 404, description = "Ambulance not found", body = ErrorSchema),
        (status = 503, description = "Document store unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["ambulances"],
    operation_id = "getAmbulance"
)]
#[get("/api/ambulance/{ambulanceId}")]
pub async fn get_ambulance(
    state: web::Data<HttpState>,
    store: BoundStore<Ambulance>,
    path: web::Path<String>,
) -> ApiResult<web::Json<AmbulanceBody>> {
    let ambulance = state.waiting_list(&store).ambulance(&path).await?;
    Ok(web::Json(ambulance.into()))
}

/// Remove an ambulance and its waiting list.
#[utoipa::path(
    delete,
    path = "/api/ambulance/{ambulanceId}",
    params(("ambulanceId" = String, Path, description = "Ambulance id")),
    responses(
        (status = 204, description = "Ambulance deleted"),
        (status = 404, description = "Ambulance not found", body = ErrorSchema),
        (status = 503, description = "Document store unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["ambulances"],
    operation_id = "deleteAmbulance"
)]
#[delete("/api/ambulance/{ambulanceId}")]
pub async fn delete_ambulance(
    state: web::Data<HttpState>,
    store: BoundStore<Ambulance>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    state.waiting_list(&store).delete_ambulance(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}
