//! Identity Center account assignment resource
//!
//! Grants a user or group a permission set in one account. Creation and
//! deletion are asynchronous requests polled until they finish.

use async_trait::async_trait;
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

use crate::api::identitycenter::{AccountAssignmentRequest, AssignmentOperation};
use crate::api::{path_search, ApiError, Client};
use crate::helpers;

const ASSIGNMENT_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const DEFAULT_TARGET_TYPE: &str = "ACCOUNT";

#[derive(Default)]
pub struct IdentityCenterAccountAssignmentResource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl IdentityCenterAccountAssignmentResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Assigns an Identity Center permission set to a user or group in an account")
            .id_attribute("<permission_set_id>/<principal_id>/<target_id>")
            .attribute(
                AttributeBuilder::new("instance_id", AttributeType::String)
                    .description("The ID of the Identity Center instance")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("permission_set_id", AttributeType::String)
                    .description("The ID of the permission set")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("principal_id", AttributeType::String)
                    .description("The ID of the user or group")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("principal_type", AttributeType::String)
                    .description("USER or GROUP")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("target_id", AttributeType::String)
                    .description("The ID of the account")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("target_type", AttributeType::String)
                    .description("The target type, only ACCOUNT is supported")
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .build()
    }

    fn extract_request(config: &DynamicValue) -> Result<AccountAssignmentRequest, Diagnostic> {
        Ok(AccountAssignmentRequest {
            permission_set_id: helpers::required_string(config, "permission_set_id")?,
            principal_id: helpers::required_string(config, "principal_id")?,
            principal_type: helpers::required_string(config, "principal_type")?,
            target_id: helpers::required_string(config, "target_id")?,
            target_type: helpers::string_or(config, "target_type", DEFAULT_TARGET_TYPE),
        })
    }

    fn assignment_id(request: &AccountAssignmentRequest) -> String {
        format!("{}/{}/{}", request.permission_set_id, request.principal_id, request.target_id)
    }

    /// Finds the assignment among those of the permission set in the
    /// target account; `None` when it is gone
    async fn read_assignment(client: &Client, mut state: DynamicValue) -> Result<Option<DynamicValue>, ApiError> {
        let instance_id = helpers::optional_string(&state, "instance_id").unwrap_or_default();
        let permission_set_id = helpers::optional_string(&state, "permission_set_id").unwrap_or_default();
        let principal_id = helpers::optional_string(&state, "principal_id").unwrap_or_default();
        let target_id = helpers::optional_string(&state, "target_id").unwrap_or_default();

        let assignments = match client
            .identity_center()
            .list_account_assignments(&instance_id, &target_id, &permission_set_id)
            .await
        {
            Ok(items) => items,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let Some(assignment) = assignments
            .iter()
            .find(|a| helpers::field_matches(a, "principal_id", Some(principal_id.as_str())))
        else {
            return Ok(None);
        };

        helpers::set_string_from(&mut state, "principal_type", assignment, "principal_type");
        let target_type = path_search::search_str("target_type", assignment)
            .unwrap_or_else(|| DEFAULT_TARGET_TYPE.to_string());
        helpers::set_string(&mut state, "target_type", target_type);
        helpers::set_string(
            &mut state,
            "id",
            format!("{}/{}/{}", permission_set_id, principal_id, target_id),
        );
        Ok(Some(state))
    }

    async fn run(
        ctx: &Context,
        client: &Client,
        instance_id: &str,
        operation: AssignmentOperation,
        request: &AccountAssignmentRequest,
    ) -> Result<(), ApiError> {
        let api = client.identity_center();
        let request_id = api
            .start_account_assignment(instance_id, operation, request)
            .await?;
        api.wait_for_account_assignment(
            ctx,
            instance_id,
            operation,
            &request_id,
            helpers::operation_timeout(ctx, ASSIGNMENT_TIMEOUT),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Resource for IdentityCenterAccountAssignmentResource {
    fn type_name(&self) -> &str {
        "huaweicloud_identitycenter_account_assignment"
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

        let parsed = helpers::required_string(&request.config, "instance_id")
            .and_then(|instance_id| Ok((instance_id, Self::extract_request(&request.config)?)));
        let (instance_id, assignment) = match parsed {
            Ok(parts) => parts,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        if let Err(e) = Self::run(
            &ctx,
            &provider_data.client,
            &instance_id,
            AssignmentOperation::Creation,
            &assignment,
        )
        .await
        {
            diagnostics.push(helpers::api_error("create", "account assignment", &e));
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        }

        let mut new_state = request.planned_state;
        helpers::set_string(&mut new_state, "id", Self::assignment_id(&assignment));
        helpers::set_string(&mut new_state, "target_type", assignment.target_type);

        CreateResourceResponse {
            new_state,
            diagnostics,
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

        match Self::read_assignment(&provider_data.client, request.current_state.clone()).await {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "account assignment", &e));
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

        let parsed = helpers::required_string(&request.prior_state, "instance_id")
            .and_then(|instance_id| Ok((instance_id, Self::extract_request(&request.prior_state)?)));
        let Ok((instance_id, assignment)) = parsed else {
            return DeleteResourceResponse { diagnostics };
        };

        match Self::run(
            &ctx,
            &provider_data.client,
            &instance_id,
            AssignmentOperation::Deletion,
            &assignment,
        )
        .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => diagnostics.push(helpers::api_error("delete", "account assignment", &e)),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for IdentityCenterAccountAssignmentResource {
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
impl ResourceWithImportState for IdentityCenterAccountAssignmentResource {
    /// Accepts `<instance_id>/<permission_set_id>/<principal_id>/<target_id>`;
    /// the following read fills in the principal type
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_split_id(
            &ctx,
            &["instance_id", "permission_set_id", "principal_id", "target_id"],
            '/',
            &request,
            &mut response,
        );
        response
    }
}
