//! RGC managed account resource
//!
//! Account creation is asynchronous and the operation result does not carry
//! the new account id, so the account is looked up by name once the
//! operation succeeds.

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

use crate::api::rgc::CreateAccountRequest;
use crate::api::{path_search, ApiError, Client};
use crate::helpers;

const CREATE_TIMEOUT: Duration = Duration::from_secs(60 * 60);
const DELETE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Default)]
pub struct RgcAccountResource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl RgcAccountResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        let required = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .required()
                .force_new()
                .build()
        };
        let optional = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .optional()
                .force_new()
                .build()
        };

        SchemaBuilder::new()
            .version(0)
            .description("Creates an account enrolled in RGC governance")
            .id_attribute("The account ID")
            .attribute(required("name", "The name of the account"))
            .attribute(required("email", "Email address of the account"))
            .attribute(optional("phone", "Mobile number of the account"))
            .attribute(optional("identity_store_user_name", "Identity Center user created for the account"))
            .attribute(optional("identity_store_email", "Email of the Identity Center user"))
            .attribute(required("parent_organizational_unit_id", "The registered OU the account is placed in"))
            .attribute(required("parent_organizational_unit_name", "The name of the parent OU"))
            .attribute(
                AttributeBuilder::new("account_type", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("owner", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("state", AttributeType::String)
                    .description("Governance state of the account")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "regions",
                    AttributeType::list_of(AttributeType::object([
                        ("region", AttributeType::String),
                        ("region_status", AttributeType::String),
                    ])),
                )
                .description("Governed regions of the account")
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

    fn apply_account(state: &mut DynamicValue, body: &Value) {
        helpers::set_string_from(state, "name", body, "account_name");
        helpers::set_string_from(state, "parent_organizational_unit_id", body, "parent_organizational_unit_id");
        helpers::set_string_from(state, "parent_organizational_unit_name", body, "parent_organizational_unit_name");
        helpers::set_string_from(state, "account_type", body, "account_type");
        helpers::set_string_from(state, "owner", body, "owner");
        helpers::set_string_from(state, "state", body, "state");
        helpers::set_timestamp_from(state, "created_at", body, "created_at");
        let _ = state.set_list(
            &AttributePath::new("regions"),
            helpers::object_list(
                &path_search::search_list("regions", body),
                &[("region", "region"), ("region_status", "region_status")],
            ),
        );
    }

    async fn read_account(client: &Client, mut state: DynamicValue) -> Result<Option<DynamicValue>, ApiError> {
        let account_id = helpers::optional_string(&state, "id").unwrap_or_default();

        match client.rgc().get_account(&account_id).await {
            Ok(body) => {
                Self::apply_account(&mut state, &body);
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Creates the account, waits for the operation and resolves the new id
    async fn create_account(ctx: &Context, client: &Client, request: &CreateAccountRequest) -> Result<String, ApiError> {
        let api = client.rgc();
        let operation_id = api.create_account(request).await?;
        tracing::info!("Creating account {} (operation {})", request.account_name, operation_id);
        api.wait_for_operation(ctx, &operation_id, helpers::operation_timeout(ctx, CREATE_TIMEOUT))
            .await?;

        api.list_accounts()
            .await?
            .iter()
            .find(|account| helpers::field_matches(account, "account_name", Some(request.account_name.as_str())))
            .and_then(|account| path_search::search_str("account_id", account))
            .ok_or_else(|| {
                ApiError::MissingField(format!(
                    "account {} was not found after its creation succeeded",
                    request.account_name
                ))
            })
    }
}

#[async_trait]
impl Resource for RgcAccountResource {
    fn type_name(&self) -> &str {
        "huaweicloud_rgc_account"
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

        let config = &request.config;
        let [name, email, ou_id, ou_name] = match helpers::required_strings(
            config,
            ["name", "email", "parent_organizational_unit_id", "parent_organizational_unit_name"],
        ) {
            Ok(values) => values,
            Err(diags) => {
                diagnostics.extend(diags);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let account_request = CreateAccountRequest {
            account_name: name,
            account_email: email,
            phone: helpers::optional_string(config, "phone"),
            identity_store_user_name: helpers::optional_string(config, "identity_store_user_name"),
            identity_store_email: helpers::optional_string(config, "identity_store_email"),
            parent_organizational_unit_id: ou_id,
            parent_organizational_unit_name: ou_name,
        };

        let client = &provider_data.client;
        let account_id = match Self::create_account(&ctx, client, &account_request).await {
            Ok(id) => id,
            Err(e) => {
                diagnostics.push(helpers::api_error("create", "account", &e));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let mut state = request.planned_state;
        helpers::set_string(&mut state, "id", account_id);
        match Self::read_account(client, state.clone()).await {
            Ok(new_state) => CreateResourceResponse {
                new_state: new_state.unwrap_or(state),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "account", &e));
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

        match Self::read_account(&provider_data.client, request.current_state.clone()).await {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "account", &e));
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

        let Some(account_id) = helpers::optional_string(&request.prior_state, "id") else {
            return DeleteResourceResponse { diagnostics };
        };

        let api = provider_data.client.rgc();
        let operation_id = match api.unenroll_account(&account_id).await {
            Ok(id) => id,
            Err(e) if e.is_not_found() => return DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(helpers::api_error("unenroll", "account", &e));
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = api
            .wait_for_operation(&ctx, &operation_id, helpers::operation_timeout(&ctx, DELETE_TIMEOUT))
            .await
        {
            diagnostics.push(helpers::api_error("unenroll", "account", &e));
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for RgcAccountResource {
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
impl ResourceWithImportState for RgcAccountResource {
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
