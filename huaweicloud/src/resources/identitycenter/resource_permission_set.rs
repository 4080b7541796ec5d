//! Identity Center permission set resource
//!
//! Changes to a permission set only reach member accounts after it is
//! provisioned again, so every update ends with a provisioning run.

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
use tfplug::types::{Diagnostic, DynamicValue};

use crate::api::identitycenter::{CreatePermissionSetRequest, UpdatePermissionSetRequest};
use crate::api::{ApiError, Client};
use crate::helpers;

const DEFAULT_SESSION_DURATION: &str = "PT1H";
const PROVISION_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Default)]
pub struct IdentityCenterPermissionSetResource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl IdentityCenterPermissionSetResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages an Identity Center permission set")
            .id_attribute("The permission set ID")
            .attribute(
                AttributeBuilder::new("instance_id", AttributeType::String)
                    .description("The ID of the Identity Center instance")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the permission set")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("The description of the permission set")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("session_duration", AttributeType::String)
                    .description("ISO 8601 length of a user session, defaults to PT1H")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("relay_state", AttributeType::String)
                    .description("URL users are redirected to after signing in")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("permission_set_urn", AttributeType::String)
                    .description("The URN of the permission set")
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

    fn apply_permission_set(state: &mut DynamicValue, body: &Value) {
        helpers::set_string_from(state, "name", body, "name");
        helpers::set_string_from(state, "description", body, "description");
        helpers::set_string_from(state, "session_duration", body, "session_duration");
        helpers::set_string_from(state, "relay_state", body, "relay_state");
        helpers::set_string_from(state, "permission_set_urn", body, "permission_set_urn");
        helpers::set_timestamp_from(state, "created_at", body, "created_date");
    }

    async fn read_permission_set(client: &Client, mut state: DynamicValue) -> Result<Option<DynamicValue>, ApiError> {
        let instance_id = helpers::optional_string(&state, "instance_id").unwrap_or_default();
        let permission_set_id = helpers::optional_string(&state, "id").unwrap_or_default();

        match client
            .identity_center()
            .get_permission_set(&instance_id, &permission_set_id)
            .await
        {
            Ok(body) if body.is_null() => Ok(None),
            Ok(body) => {
                Self::apply_permission_set(&mut state, &body);
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn provision(ctx: &Context, client: &Client, instance_id: &str, permission_set_id: &str) -> Result<(), ApiError> {
        let api = client.identity_center();
        let request_id = api.provision_permission_set(instance_id, permission_set_id).await?;
        tracing::debug!("Provisioning permission set {} (request {})", permission_set_id, request_id);
        api.wait_for_provisioning(
            ctx,
            instance_id,
            &request_id,
            helpers::operation_timeout(ctx, PROVISION_TIMEOUT),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Resource for IdentityCenterPermissionSetResource {
    fn type_name(&self) -> &str {
        "huaweicloud_identitycenter_permission_set"
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

        let (instance_id, name) = match (
            helpers::required_string(&request.config, "instance_id"),
            helpers::required_string(&request.config, "name"),
        ) {
            (Ok(instance_id), Ok(name)) => (instance_id, name),
            (instance, name) => {
                diagnostics.extend(instance.err());
                diagnostics.extend(name.err());
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let create_request = CreatePermissionSetRequest {
            name,
            description: helpers::optional_string(&request.config, "description"),
            session_duration: helpers::string_or(&request.config, "session_duration", DEFAULT_SESSION_DURATION),
            relay_state: helpers::optional_string(&request.config, "relay_state"),
        };

        let client = &provider_data.client;
        let permission_set_id = match client
            .identity_center()
            .create_permission_set(&instance_id, &create_request)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                diagnostics.push(helpers::api_error("create", "permission set", &e));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let mut state = request.planned_state;
        helpers::set_string(&mut state, "id", permission_set_id);

        match Self::read_permission_set(client, state.clone()).await {
            Ok(Some(new_state)) => CreateResourceResponse {
                new_state,
                diagnostics,
            },
            Ok(None) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read permission set",
                    "The permission set was not found right after it was created",
                ));
                CreateResourceResponse {
                    new_state: state,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "permission set", &e));
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

        match Self::read_permission_set(&provider_data.client, request.current_state.clone()).await {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "permission set", &e));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                }
            }
        }
    }

    async fn update(
        &self,
        ctx: Context,
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

        let client = &provider_data.client;
        let instance_id = helpers::optional_string(&request.prior_state, "instance_id").unwrap_or_default();
        let permission_set_id = helpers::optional_string(&request.prior_state, "id").unwrap_or_default();

        let update_request = UpdatePermissionSetRequest {
            description: helpers::optional_string(&request.config, "description"),
            session_duration: helpers::string_or(&request.config, "session_duration", DEFAULT_SESSION_DURATION),
            relay_state: helpers::optional_string(&request.config, "relay_state"),
        };

        if let Err(e) = client
            .identity_center()
            .update_permission_set(&instance_id, &permission_set_id, &update_request)
            .await
        {
            diagnostics.push(helpers::api_error("update", "permission set", &e));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        }

        if let Err(e) = Self::provision(&ctx, client, &instance_id, &permission_set_id).await {
            diagnostics.push(helpers::api_error("provision", "permission set", &e));
        }

        let mut state = request.planned_state;
        helpers::set_string(&mut state, "id", permission_set_id);
        match Self::read_permission_set(client, state.clone()).await {
            Ok(new_state) => UpdateResourceResponse {
                new_state: new_state.unwrap_or(state),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "permission set", &e));
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

        let instance_id = helpers::optional_string(&request.prior_state, "instance_id").unwrap_or_default();
        let Some(permission_set_id) = helpers::optional_string(&request.prior_state, "id") else {
            return DeleteResourceResponse { diagnostics };
        };

        match provider_data
            .client
            .identity_center()
            .delete_permission_set(&instance_id, &permission_set_id)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => diagnostics.push(helpers::api_error("delete", "permission set", &e)),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for IdentityCenterPermissionSetResource {
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
impl ResourceWithImportState for IdentityCenterPermissionSetResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_split_id(&ctx, &["instance_id", "id"], '/', &request, &mut response);
        response
    }
}
