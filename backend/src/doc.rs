//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every ambulance and waiting-list endpoint together
//! with the request, response and error schemas. The document is served as
//! YAML at `GET /openapi` and exported as JSON by the `openapi-dump` binary.

use utoipa::OpenApi;

use crate::inbound::http::ambulances::{AmbulanceBody, ConditionBody, CreateAmbulanceRequest};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use crate::inbound::http::waiting_list::{WaitingListEntryBody, WaitingListEntryRequest};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Waiting List Api",
        description = "Ambulance waiting list management for WAC Hospital.",
        license(name = "CC BY 4.0", url = "https://creativecommons.org/licenses/by/4.0/")
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::ambulances::create_ambulance,
        crate::inbound::http::ambulances::list_ambulances,
        crate::inbound::http::ambulances::get_ambulance,
        crate::inbound::http::ambulances::delete_ambulance,
        crate::inbound::http::waiting_list::list_entries,
        crate::inbound::http::waiting_list::create_entry,
        crate::inbound::http::waiting_list::get_entry,
        crate::inbound::http::waiting_list::update_entry,
        crate::inbound::http::waiting_list::delete_entry,
        crate::inbound::http::waiting_list::list_conditions,
    ),
    components(schemas(
        AmbulanceBody,
        ConditionBody,
        CreateAmbulanceRequest,
        WaitingListEntryBody,
        WaitingListEntryRequest,
        ErrorSchema,
        ErrorCodeSchema
    )),
    tags(
        (name = "ambulances", description = "Ambulance management"),
        (name = "waiting-list", description = "Patients waiting in front of an ambulance")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[test]
    fn error_schema_is_registered_under_its_domain_name() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get("Error").expect("Error schema");

        assert_object_schema_has_field(error_schema, "code");
        assert_object_schema_has_field(error_schema, "message");
        assert_object_schema_has_field(error_schema, "traceId");
    }

    #[test]
    fn entry_schema_uses_camel_case_fields() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let entry = schemas
            .get("WaitingListEntryBody")
            .expect("WaitingListEntryBody schema");

        assert_object_schema_has_field(entry, "patientId");
        assert_object_schema_has_field(entry, "estimatedStart");
    }

    #[test]
    fn every_waiting_list_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/ambulance",
            "/api/ambulance/{ambulanceId}",
            "/api/waiting-list/{ambulanceId}/entries",
            "/api/waiting-list/{ambulanceId}/entries/{entryId}",
            "/api/waiting-list/{ambulanceId}/condition",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
    }
}
