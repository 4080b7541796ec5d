//! RGC control resource: enables a governance control on an organizational
//! unit. Controls have no detail API, so reads search the controls enabled
//! on the target.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::import::import_state_split_id;
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

use crate::api::rgc::{ControlParameter, ControlRequest};
use crate::api::{ApiError, Client};
use crate::helpers;

const OPERATION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Default)]
pub struct RgcControlResource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl RgcControlResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        let computed = |name: &str| AttributeBuilder::new(name, AttributeType::String).computed().build();

        SchemaBuilder::new()
            .version(0)
            .description("Enables an RGC control on an organizational unit")
            .id_attribute("The control ID, <target_identifier>/<identifier>")
            .attribute(
                AttributeBuilder::new("identifier", AttributeType::String)
                    .description("The identifier of the control")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("target_identifier", AttributeType::String)
                    .description("The ID of the organizational unit the control applies to")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "parameters",
                    AttributeType::list_of(AttributeType::object([
                        ("key", AttributeType::String),
                        ("value", AttributeType::String),
                    ])),
                )
                .description("Parameters of configurable controls")
                .optional()
                .force_new()
                .build(),
            )
            .attribute(computed("state"))
            .attribute(computed("version"))
            .attribute(computed("name"))
            .attribute(computed("control_objective"))
            .attribute(computed("behavior"))
            .attribute(computed("owner"))
            .build()
    }

    fn parameters(config: &DynamicValue) -> Vec<ControlParameter> {
        config
            .get_list(&AttributePath::new("parameters"))
            .unwrap_or_default()
            .iter()
            .filter_map(|item| {
                let fields = item.as_map()?;
                Some(ControlParameter {
                    key: fields.get("key")?.as_str()?.to_string(),
                    value: fields.get("value")?.as_str()?.to_string(),
                })
            })
            .collect()
    }

    fn apply_control(state: &mut DynamicValue, control: &Value) {
        helpers::set_string_from(state, "state", control, "state");
        helpers::set_string_from(state, "version", control, "version");
        helpers::set_string_from(state, "name", control, "name");
        helpers::set_string_from(state, "control_objective", control, "control_objective");
        helpers::set_string_from(state, "behavior", control, "behavior");
        helpers::set_string_from(state, "owner", control, "owner");
    }

    async fn read_control(client: &Client, mut state: DynamicValue) -> Result<Option<DynamicValue>, ApiError> {
        let identifier = helpers::optional_string(&state, "identifier").unwrap_or_default();
        let target = helpers::optional_string(&state, "target_identifier").unwrap_or_default();

        let controls = match client.rgc().list_enabled_controls(&target).await {
            Ok(controls) => controls,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        match controls
            .iter()
            .find(|c| helpers::field_matches(c, "control_identifier", Some(identifier.as_str())))
        {
            Some(control) => {
                Self::apply_control(&mut state, control);
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Resource for RgcControlResource {
    fn type_name(&self) -> &str {
        "huaweicloud_rgc_control"
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

        let control_request = match helpers::required_strings(&request.config, ["identifier", "target_identifier"]) {
            Ok([identifier, target_identifier]) => ControlRequest {
                identifier,
                target_identifier,
                parameters: Self::parameters(&request.config),
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
        let enabled = async {
            let operation_id = api.enable_control(&control_request).await?;
            tracing::info!(
                "Enabling control {} on {} (operation {})",
                control_request.identifier,
                control_request.target_identifier,
                operation_id
            );
            api.wait_for_operation(&ctx, &operation_id, helpers::operation_timeout(&ctx, OPERATION_TIMEOUT))
                .await
        };
        if let Err(e) = enabled.await {
            diagnostics.push(helpers::api_error("enable", "control", &e));
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        }

        let mut state = request.planned_state;
        helpers::set_string(
            &mut state,
            "id",
            format!("{}/{}", control_request.target_identifier, control_request.identifier),
        );
        match Self::read_control(client, state.clone()).await {
            Ok(new_state) => CreateResourceResponse {
                new_state: new_state.unwrap_or(state),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "control", &e));
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

        match Self::read_control(&provider_data.client, request.current_state.clone()).await {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "control", &e));
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

        let identifier = helpers::optional_string(&request.prior_state, "identifier").unwrap_or_default();
        let target = helpers::optional_string(&request.prior_state, "target_identifier").unwrap_or_default();

        let api = provider_data.client.rgc();
        let operation_id = match api.disable_control(&identifier, &target).await {
            Ok(id) => id,
            Err(e) if e.is_not_found() => return DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(helpers::api_error("disable", "control", &e));
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = api
            .wait_for_operation(&ctx, &operation_id, helpers::operation_timeout(&ctx, OPERATION_TIMEOUT))
            .await
        {
            diagnostics.push(helpers::api_error("disable", "control", &e));
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for RgcControlResource {
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
impl ResourceWithImportState for RgcControlResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_split_id(&ctx, &["target_identifier", "identifier"], '/', &request, &mut response);
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

    fn resource(url: &str) -> RgcControlResource {
        RgcControlResource {
            provider_data: Some(HuaweiCloudProviderData::new(create_test_client(url))),
        }
    }

    fn config() -> DynamicValue {
        DynamicValue::from_json(json!({
            "identifier": "RGC-GR_AUDIT_BUCKET_DELETION_PROHIBITED",
            "target_identifier": "ou-5",
            "parameters": [{"key": "retention", "value": "90"}]
        }))
    }

    #[tokio::test]
    async fn create_enables_and_reads_summary() {
        let mut server = Server::new_async().await;
        let enable = server
            .mock("POST", "/v1/governance/controls/enable")
            .match_body(Matcher::Json(json!({
                "identifier": "RGC-GR_AUDIT_BUCKET_DELETION_PROHIBITED",
                "target_identifier": "ou-5",
                "parameters": [{"key": "retention", "value": "90"}]
            })))
            .with_body(r#"{"operation_id":"op-1"}"#)
            .create_async()
            .await;
        let _operation = server
            .mock("GET", "/v1/governance/operation/op-1")
            .with_body(r#"{"status":"SUCCEEDED"}"#)
            .create_async()
            .await;
        let _list = server
            .mock("GET", "/v1/governance/managed-organizational-units/ou-5/controls")
            .match_query(Matcher::Any)
            .with_body(r#"{"control_summaries":[
                {"control_identifier":"RGC-GR_OTHER","state":"ENABLED"},
                {"control_identifier":"RGC-GR_AUDIT_BUCKET_DELETION_PROHIBITED","state":"ENABLED",
                 "version":"1.0","name":"Audit bucket deletion prohibited","behavior":"Preventive",
                 "control_objective":"Protect logs","owner":"RGC"}
            ]}"#)
            .create_async()
            .await;

        let response = resource(&server.url())
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "huaweicloud_rgc_control".to_string(),
                    planned_state: config(),
                    config: config(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.new_state;
        assert_eq!(
            state.get_string(&AttributePath::new("id")).unwrap(),
            "ou-5/RGC-GR_AUDIT_BUCKET_DELETION_PROHIBITED"
        );
        assert_eq!(state.get_string(&AttributePath::new("behavior")).unwrap(), "Preventive");
        enable.assert_async().await;
    }

    #[tokio::test]
    async fn read_of_disabled_control_removes_state() {
        let mut server = Server::new_async().await;
        let _list = server
            .mock("GET", "/v1/governance/managed-organizational-units/ou-5/controls")
            .match_query(Matcher::Any)
            .with_body(r#"{"control_summaries":[{"control_identifier":"RGC-GR_OTHER"}]}"#)
            .create_async()
            .await;

        let response = resource(&server.url())
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "huaweicloud_rgc_control".to_string(),
                    current_state: config(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn import_splits_target_and_identifier() {
        let response = RgcControlResource::new()
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "huaweicloud_rgc_control".to_string(),
                    id: "ou-5/RGC-GR_AUDIT_BUCKET_DELETION_PROHIBITED".to_string(),
                },
            )
            .await;

        let state = &response.imported_resources[0].state;
        assert_eq!(state.get_string(&AttributePath::new("target_identifier")).unwrap(), "ou-5");
        assert_eq!(
            state.get_string(&AttributePath::new("identifier")).unwrap(),
            "RGC-GR_AUDIT_BUCKET_DELETION_PROHIBITED"
        );
    }
}
