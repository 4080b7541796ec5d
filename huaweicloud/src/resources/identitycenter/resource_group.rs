//! Identity Center group resource

use async_trait::async_trait;
use serde_json::Value;
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
use tfplug::types::{Diagnostic, DynamicValue};

use crate::api::identitycenter::store::GroupRequest;
use crate::api::{ApiError, Client};
use crate::helpers;

#[derive(Default)]
pub struct IdentityCenterGroupResource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl IdentityCenterGroupResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a group in an Identity Center identity store")
            .id_attribute("The group ID")
            .attribute(
                AttributeBuilder::new("identity_store_id", AttributeType::String)
                    .description("The ID of the identity store")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The display name of the group")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("The description of the group")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("created_at", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("updated_at", AttributeType::String)
                    .computed()
                    .build(),
            )
            .build()
    }

    fn apply_group(state: &mut DynamicValue, body: &Value) {
        helpers::set_string_from(state, "name", body, "display_name");
        helpers::set_string_from(state, "description", body, "description");
        helpers::set_timestamp_from(state, "created_at", body, "created_at");
        helpers::set_timestamp_from(state, "updated_at", body, "updated_at");
    }

    async fn read_group(client: &Client, mut state: DynamicValue) -> Result<Option<DynamicValue>, ApiError> {
        let store_id = helpers::optional_string(&state, "identity_store_id").unwrap_or_default();
        let group_id = helpers::optional_string(&state, "id").unwrap_or_default();

        match client.identity_store().get_group(&store_id, &group_id).await {
            Ok(body) => {
                Self::apply_group(&mut state, &body);
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Resource for IdentityCenterGroupResource {
    fn type_name(&self) -> &str {
        "huaweicloud_identitycenter_group"
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
        _ctx: Context,
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

        let (store_id, name) = match (
            helpers::required_string(&request.config, "identity_store_id"),
            helpers::required_string(&request.config, "name"),
        ) {
            (Ok(store_id), Ok(name)) => (store_id, name),
            (store, name) => {
                diagnostics.extend(store.err());
                diagnostics.extend(name.err());
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let group_request = GroupRequest {
            name: Some(name),
            description: helpers::optional_string(&request.config, "description"),
        };

        let client = &provider_data.client;
        let group_id = match client.identity_store().create_group(&store_id, &group_request).await {
            Ok(id) => id,
            Err(e) => {
                diagnostics.push(helpers::api_error("create", "Identity Center group", &e));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let mut state = request.planned_state;
        helpers::set_string(&mut state, "id", group_id);

        match Self::read_group(client, state.clone()).await {
            Ok(Some(new_state)) => CreateResourceResponse {
                new_state,
                diagnostics,
            },
            Ok(None) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read Identity Center group",
                    "The group was not found right after it was created",
                ));
                CreateResourceResponse {
                    new_state: state,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "Identity Center group", &e));
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

        match Self::read_group(&provider_data.client, request.current_state.clone()).await {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "Identity Center group", &e));
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
        let mut diagnostics =
            helpers::requires_replace_diagnostics(&Self::schema_static(), &request.prior_state, &request.planned_state);
        if !diagnostics.is_empty() {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        }

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(helpers::not_configured());
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        };

        let store_id = helpers::optional_string(&request.prior_state, "identity_store_id").unwrap_or_default();
        let group_id = helpers::optional_string(&request.prior_state, "id").unwrap_or_default();
        let group_request = GroupRequest {
            name: None,
            description: Some(helpers::optional_string(&request.config, "description").unwrap_or_default()),
        };

        if let Err(e) = provider_data
            .client
            .identity_store()
            .update_group(&store_id, &group_id, &group_request)
            .await
        {
            diagnostics.push(helpers::api_error("update", "Identity Center group", &e));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        }

        let mut state = request.planned_state;
        helpers::set_string(&mut state, "id", group_id);
        match Self::read_group(&provider_data.client, state.clone()).await {
            Ok(new_state) => UpdateResourceResponse {
                new_state: new_state.unwrap_or(state),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "Identity Center group", &e));
                UpdateResourceResponse {
                    new_state: state,
                    diagnostics,
                }
            }
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(helpers::not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let store_id = helpers::optional_string(&request.prior_state, "identity_store_id").unwrap_or_default();
        let Some(group_id) = helpers::optional_string(&request.prior_state, "id") else {
            return DeleteResourceResponse { diagnostics };
        };

        match provider_data
            .client
            .identity_store()
            .delete_group(&store_id, &group_id)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => diagnostics.push(helpers::api_error("delete", "Identity Center group", &e)),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for IdentityCenterGroupResource {
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
impl ResourceWithImportState for IdentityCenterGroupResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_split_id(&ctx, &["identity_store_id", "id"], '/', &request, &mut response);
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
    use tfplug::types::AttributePath;

    fn resource(url: &str) -> IdentityCenterGroupResource {
        IdentityCenterGroupResource {
            provider_data: Some(HuaweiCloudProviderData::new(create_test_client(url))),
        }
    }

    #[tokio::test]
    async fn create_then_read_back() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/v1/identity-stores/d-1/groups")
            .match_body(Matcher::Json(json!({"name": "ops", "description": "operators"})))
            .with_body(r#"{"group_id":"g-1"}"#)
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/v1/identity-stores/d-1/groups/g-1")
            .with_body(r#"{"group_id":"g-1","display_name":"ops","description":"operators","created_at":"2024-01-01T00:00:00Z"}"#)
            .create_async()
            .await;

        let config = DynamicValue::from_json(json!({
            "identity_store_id": "d-1",
            "name": "ops",
            "description": "operators"
        }));
        let response = resource(&server.url())
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "huaweicloud_identitycenter_group".to_string(),
                    planned_state: config.clone(),
                    config,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.new_state.get_string(&AttributePath::new("id")).unwrap(), "g-1");
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("created_at")).unwrap(),
            "2024-01-01T00:00:00Z"
        );
        create.assert_async().await;
    }

    #[tokio::test]
    async fn create_reports_missing_attributes() {
        let response = resource("http://127.0.0.1:1")
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "huaweicloud_identitycenter_group".to_string(),
                    planned_state: DynamicValue::empty(),
                    config: DynamicValue::empty(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 2);
        assert_eq!(response.diagnostics[0].summary, "Missing identity_store_id");
    }

    #[tokio::test]
    async fn update_puts_new_description() {
        let mut server = Server::new_async().await;
        let update = server
            .mock("PUT", "/v1/identity-stores/d-1/groups/g-1")
            .match_body(Matcher::Json(json!({"description": "on call"})))
            .with_status(204)
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/v1/identity-stores/d-1/groups/g-1")
            .with_body(r#"{"group_id":"g-1","display_name":"ops","description":"on call"}"#)
            .create_async()
            .await;

        let prior = DynamicValue::from_json(json!({
            "id": "g-1", "identity_store_id": "d-1", "name": "ops", "description": "operators"
        }));
        let planned = DynamicValue::from_json(json!({
            "id": "g-1", "identity_store_id": "d-1", "name": "ops", "description": "on call"
        }));
        let response = resource(&server.url())
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "huaweicloud_identitycenter_group".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("description")).unwrap(),
            "on call"
        );
        update.assert_async().await;
    }
}
