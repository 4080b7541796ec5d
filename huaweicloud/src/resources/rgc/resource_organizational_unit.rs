//! RGC registered organizational unit resource

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, DynamicValue};

use crate::api::rgc::CreateOrganizationalUnitRequest;
use crate::api::{path_search, ApiError, Client};
use crate::helpers;

const OPERATION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Default)]
pub struct RgcOrganizationalUnitResource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl RgcOrganizationalUnitResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Creates an organizational unit registered with RGC")
            .id_attribute("The organizational unit ID")
            .attribute(
                AttributeBuilder::new("organizational_unit_name", AttributeType::String)
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("parent_organizational_unit_id", AttributeType::String)
                    .description("The registered OU or root the new OU is placed under")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("type", AttributeType::String)
                    .description("CORE, CUSTOM or ROOT")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("parent_organizational_unit_name", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("created_at", AttributeType::String)
                    .computed()
                    .build(),
            )
            .build()
    }

    fn apply_organizational_unit(state: &mut DynamicValue, body: &Value) {
        helpers::set_string_from(state, "organizational_unit_name", body, "organizational_unit_name");
        helpers::set_string_from(state, "parent_organizational_unit_id", body, "parent_organizational_unit_id");
        helpers::set_string_from(state, "status", body, "organizational_unit_status");
        helpers::set_string_from(state, "type", body, "organizational_unit_type");
        helpers::set_string_from(state, "parent_organizational_unit_name", body, "parent_organizational_unit_name");
        helpers::set_timestamp_from(state, "created_at", body, "created_at");
    }

    async fn read_organizational_unit(client: &Client, mut state: DynamicValue) -> Result<Option<DynamicValue>, ApiError> {
        let ou_id = helpers::optional_string(&state, "id").unwrap_or_default();

        match client.rgc().get_organizational_unit(&ou_id).await {
            Ok(body) => {
                Self::apply_organizational_unit(&mut state, &body);
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Finds a freshly created OU by name under its parent
    async fn find_organizational_unit(
        client: &Client,
        request: &CreateOrganizationalUnitRequest,
    ) -> Result<String, ApiError> {
        client
            .rgc()
            .list_organizational_units()
            .await?
            .iter()
            .find(|ou| {
                helpers::field_matches(ou, "organizational_unit_name", Some(request.organizational_unit_name.as_str()))
                    && helpers::field_matches(
                        ou,
                        "parent_organizational_unit_id",
                        Some(request.parent_organizational_unit_id.as_str()),
                    )
            })
            .and_then(|ou| path_search::search_str("organizational_unit_id", ou))
            .ok_or_else(|| {
                ApiError::MissingField(format!(
                    "organizational unit {} was not found after its creation succeeded",
                    request.organizational_unit_name
                ))
            })
    }
}

#[async_trait]
impl Resource for RgcOrganizationalUnitResource {
    fn type_name(&self) -> &str {
        "huaweicloud_rgc_organizational_unit"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn create(
        &self,
        ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(helpers::not_configured());
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        };

        let ou_request = match helpers::required_strings(
            &request.config,
            ["organizational_unit_name", "parent_organizational_unit_id"],
        ) {
            Ok([organizational_unit_name, parent_organizational_unit_id]) => CreateOrganizationalUnitRequest {
                organizational_unit_name,
                parent_organizational_unit_id,
            },
            Err(diags) => {
                diagnostics.extend(diags);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let client = &provider_data.client;
        let api = client.rgc();
        let body = match api.create_organizational_unit(&ou_request).await {
            Ok(body) => body,
            Err(e) => {
                diagnostics.push(helpers::api_error("create", "organizational unit", &e));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        // The id is kept even if the wait fails so the OU stays tracked
        let mut state = request.planned_state;
        let response_id = path_search::search_str("organizational_unit_id", &body).filter(|id| !id.is_empty());
        if let Some(id) = &response_id {
            helpers::set_string(&mut state, "id", id.as_str());
        }

        let operation_id = path_search::search_str("operation_id", &body).unwrap_or_default();
        if let Err(e) = api
            .wait_for_operation(&ctx, &operation_id, helpers::operation_timeout(&ctx, OPERATION_TIMEOUT))
            .await
        {
            diagnostics.push(helpers::api_error("wait for creation of", "organizational unit", &e));
            return CreateResourceResponse {
                new_state: state,
                diagnostics,
            };
        }

        if response_id.is_none() {
            match Self::find_organizational_unit(client, &ou_request).await {
                Ok(id) => helpers::set_string(&mut state, "id", id),
                Err(e) => {
                    diagnostics.push(helpers::api_error("create", "organizational unit", &e));
                    return CreateResourceResponse {
                        new_state: state,
                        diagnostics,
                    };
                }
            }
        }

        match Self::read_organizational_unit(client, state.clone()).await {
            Ok(new_state) => CreateResourceResponse {
                new_state: new_state.unwrap_or(state),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "organizational unit", &e));
                CreateResourceResponse {
                    new_state: state,
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(helpers::not_configured());
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        match Self::read_organizational_unit(&provider_data.client, request.current_state.clone()).await {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "organizational unit", &e));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                }
            }
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        UpdateResourceResponse {
            diagnostics: helpers::requires_replace_diagnostics(
                &Self::schema_static(),
                &request.prior_state,
                &request.planned_state,
            ),
            new_state: request.prior_state,
        }
    }

    async fn delete(
        &self,
        ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(helpers::not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let Some(ou_id) = helpers::optional_string(&request.prior_state, "id") else {
            return DeleteResourceResponse { diagnostics };
        };

        let api = provider_data.client.rgc();
        let operation_id = match api.delete_organizational_unit(&ou_id).await {
            Ok(id) => id,
            Err(e) if e.is_not_found() => return DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(helpers::api_error("delete", "organizational unit", &e));
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = api
            .wait_for_operation(&ctx, &operation_id, helpers::operation_timeout(&ctx, OPERATION_TIMEOUT))
            .await
        {
            diagnostics.push(helpers::api_error("delete", "organizational unit", &e));
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for RgcOrganizationalUnitResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        ConfigureResourceResponse {
            diagnostics: helpers::configure_provider_data(&mut self.provider_data, request.provider_data, "resource"),
        }
    }

    fn as_importable(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for RgcOrganizationalUnitResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use crate::HuaweiCloudProviderData;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn resource(url: &str) -> RgcOrganizationalUnitResource {
        RgcOrganizationalUnitResource {
            provider_data: Some(HuaweiCloudProviderData::new(create_test_client(url))),
        }
    }

    fn config() -> DynamicValue {
        DynamicValue::from_json(json!({
            "organizational_unit_name": "Sandbox",
            "parent_organizational_unit_id": "ou-root"
        }))
    }

    const DETAIL: &str = r#"{"organizational_unit_id":"ou-5","organizational_unit_name":"Sandbox",
        "organizational_unit_status":"REGISTERED","organizational_unit_type":"CUSTOM",
        "parent_organizational_unit_id":"ou-root","parent_organizational_unit_name":"Root"}"#;

    #[tokio::test]
    async fn create_uses_id_from_response() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/v1/managed-organization/managed-organizational-units")
            .with_body(r#"{"operation_id":"op-1","organizational_unit_id":"ou-5"}"#)
            .create_async()
            .await;
        let _operation = server
            .mock("GET", "/v1/governance/operation/op-1")
            .with_body(r#"{"status":"SUCCEEDED"}"#)
            .create_async()
            .await;
        let list = server
            .mock("GET", "/v1/managed-organization/managed-organizational-units")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/v1/managed-organization/managed-organizational-units/ou-5")
            .with_body(DETAIL)
            .create_async()
            .await;

        let response = resource(&server.url())
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "huaweicloud_rgc_organizational_unit".to_string(),
                    planned_state: config(),
                    config: config(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.new_state.get_string(&AttributePath::new("type")).unwrap(), "CUSTOM");
        list.assert_async().await;
    }

    #[tokio::test]
    async fn create_falls_back_to_listing() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/v1/managed-organization/managed-organizational-units")
            .with_body(r#"{"operation_id":"op-1"}"#)
            .create_async()
            .await;
        let _operation = server
            .mock("GET", "/v1/governance/operation/op-1")
            .with_body(r#"{"status":"SUCCEEDED"}"#)
            .create_async()
            .await;
        let _list = server
            .mock("GET", "/v1/managed-organization/managed-organizational-units")
            .match_query(Matcher::Any)
            .with_body(r#"{"managed_organizational_units":[
                {"organizational_unit_id":"ou-4","organizational_unit_name":"Sandbox","parent_organizational_unit_id":"ou-other"},
                {"organizational_unit_id":"ou-5","organizational_unit_name":"Sandbox","parent_organizational_unit_id":"ou-root"}
            ]}"#)
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/v1/managed-organization/managed-organizational-units/ou-5")
            .with_body(DETAIL)
            .create_async()
            .await;

        let response = resource(&server.url())
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "huaweicloud_rgc_organizational_unit".to_string(),
                    planned_state: config(),
                    config: config(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.new_state.get_string(&AttributePath::new("id")).unwrap(), "ou-5");
    }

    #[tokio::test]
    async fn failed_wait_keeps_id_from_response() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/v1/managed-organization/managed-organizational-units")
            .with_body(r#"{"operation_id":"op-1","organizational_unit_id":"ou-5"}"#)
            .create_async()
            .await;
        let _operation = server
            .mock("GET", "/v1/governance/operation/op-1")
            .with_body(r#"{"status":"FAILED","message":"quota exceeded"}"#)
            .create_async()
            .await;

        let response = resource(&server.url())
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "huaweicloud_rgc_organizational_unit".to_string(),
                    planned_state: config(),
                    config: config(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("quota exceeded"), "{:?}", response.diagnostics);
        assert_eq!(response.new_state.get_string(&AttributePath::new("id")).unwrap(), "ou-5");
    }

    #[tokio::test]
    async fn delete_of_missing_unit_succeeds() {
        let mut server = Server::new_async().await;
        let _delete = server
            .mock("DELETE", "/v1/managed-organization/managed-organizational-units/ou-5")
            .with_status(404)
            .with_body(r#"{"error_code":"RGC.404","error_msg":"organizational unit not found"}"#)
            .create_async()
            .await;

        let mut state = config();
        helpers::set_string(&mut state, "id", "ou-5");
        let response = resource(&server.url())
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "huaweicloud_rgc_organizational_unit".to_string(),
                    prior_state: state,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
    }
}
