//! SFS Turbo file system resource
//!
//! Capacity can only grow. A larger `size` triggers an extend action and a
//! new `security_group_id` a security group change; both are followed by a
//! wait on the share's sub status.

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
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::sfsturbo::{CreateShareRequest, ShareMetadata, ShareWait};
use crate::api::{ApiError, Client};
use crate::helpers;

const DEFAULT_SHARE_PROTO: &str = "NFS";
const DEFAULT_SHARE_TYPE: &str = "STANDARD";
const CREATE_TIMEOUT: Duration = Duration::from_secs(60 * 60);
const UPDATE_TIMEOUT: Duration = Duration::from_secs(60 * 60);
const DELETE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Default)]
pub struct SfsTurboResource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl SfsTurboResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages an SFS Turbo file system")
            .id_attribute("The share ID")
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the file system")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("size", AttributeType::Number)
                    .description("Capacity in GB. Can be increased but not reduced.")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("share_proto", AttributeType::String)
                    .description("The sharing protocol, defaults to NFS")
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("share_type", AttributeType::String)
                    .description("STANDARD or PERFORMANCE, defaults to STANDARD")
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("availability_zone", AttributeType::String)
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("vpc_id", AttributeType::String)
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("subnet_id", AttributeType::String)
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("security_group_id", AttributeType::String)
                    .description("The security group bound to the file system")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("crypt_key_id", AttributeType::String)
                    .description("KMS key used to encrypt the file system")
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enterprise_project_id", AttributeType::String)
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("export_location", AttributeType::String)
                    .description("The mount point of the file system")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("available_capacity", AttributeType::Number)
                    .description("Free capacity in GB")
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

    fn apply_share(state: &mut DynamicValue, body: &Value) {
        helpers::set_string_from(state, "name", body, "name");
        helpers::set_i64_from(state, "size", body, "size");
        helpers::set_string_from(state, "share_proto", body, "share_proto");
        helpers::set_string_from(state, "share_type", body, "share_type");
        helpers::set_string_from(state, "availability_zone", body, "availability_zone");
        helpers::set_string_from(state, "vpc_id", body, "vpc_id");
        helpers::set_string_from(state, "subnet_id", body, "subnet_id");
        helpers::set_string_from(state, "security_group_id", body, "security_group_id");
        helpers::set_string_from(state, "crypt_key_id", body, "crypt_key_id");
        helpers::set_string_from(state, "enterprise_project_id", body, "enterprise_project_id");
        helpers::set_string_from(state, "status", body, "status");
        helpers::set_string_from(state, "export_location", body, "export_location");
        helpers::set_f64_from(state, "available_capacity", body, "avail_capacity");
        helpers::set_timestamp_from(state, "created_at", body, "created_at");
    }

    async fn read_share(client: &Client, mut state: DynamicValue) -> Result<Option<DynamicValue>, ApiError> {
        let share_id = helpers::optional_string(&state, "id").unwrap_or_default();

        match client.sfs_turbo().get_share(&share_id).await {
            Ok(body) => {
                Self::apply_share(&mut state, &body);
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Applies size and security group changes, waiting for each to settle
    async fn apply_changes(
        ctx: &Context,
        client: &Client,
        share_id: &str,
        prior: &DynamicValue,
        config: &DynamicValue,
    ) -> Result<(), Diagnostic> {
        let api = client.sfs_turbo();
        let timeout = helpers::operation_timeout(ctx, UPDATE_TIMEOUT);

        let old_size = helpers::optional_i64(prior, "size").unwrap_or_default();
        let new_size = helpers::optional_i64(config, "size").unwrap_or(old_size);
        if new_size < old_size {
            return Err(Diagnostic::error(
                "Cannot shrink SFS Turbo file system",
                format!("size can only be increased, {} GB is below the current {} GB", new_size, old_size),
            )
            .with_attribute(AttributePath::new("size")));
        }
        if new_size > old_size {
            tracing::info!("Extending SFS Turbo {} from {} to {} GB", share_id, old_size, new_size);
            api.extend_share(share_id, new_size)
                .await
                .map_err(|e| helpers::api_error("extend", "SFS Turbo", &e))?;
            api.wait_for_share(ctx, share_id, ShareWait::Expansion, timeout)
                .await
                .map_err(|e| helpers::api_error("extend", "SFS Turbo", &e))?;
        }

        let old_group = helpers::optional_string(prior, "security_group_id");
        let new_group = helpers::optional_string(config, "security_group_id");
        if let Some(group) = new_group.filter(|g| Some(g) != old_group.as_ref()) {
            tracing::info!("Changing security group of SFS Turbo {} to {}", share_id, group);
            api.change_security_group(share_id, &group)
                .await
                .map_err(|e| helpers::api_error("change security group of", "SFS Turbo", &e))?;
            api.wait_for_share(ctx, share_id, ShareWait::SecurityGroupChange, timeout)
                .await
                .map_err(|e| helpers::api_error("change security group of", "SFS Turbo", &e))?;
        }

        Ok(())
    }
}

#[async_trait]
impl Resource for SfsTurboResource {
    fn type_name(&self) -> &str {
        "huaweicloud_sfs_turbo"
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
        let required = helpers::required_strings(
            config,
            ["name", "availability_zone", "vpc_id", "subnet_id", "security_group_id"],
        );
        let size = helpers::optional_i64(config, "size");
        let ([name, availability_zone, vpc_id, subnet_id, security_group_id], size) = match (required, size) {
            (Ok(values), Some(size)) => (values, size),
            (required, size) => {
                diagnostics.extend(required.err().unwrap_or_default());
                if size.is_none() {
                    diagnostics.push(
                        Diagnostic::error("Missing size", "The 'size' attribute is required")
                            .with_attribute(AttributePath::new("size")),
                    );
                }
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let share_request = CreateShareRequest {
            name,
            share_proto: helpers::string_or(config, "share_proto", DEFAULT_SHARE_PROTO),
            share_type: helpers::string_or(config, "share_type", DEFAULT_SHARE_TYPE),
            size,
            availability_zone,
            vpc_id,
            subnet_id,
            security_group_id,
            enterprise_project_id: helpers::optional_string(config, "enterprise_project_id"),
            metadata: ShareMetadata {
                crypt_key_id: helpers::optional_string(config, "crypt_key_id"),
            },
        };

        let client = &provider_data.client;
        let api = client.sfs_turbo();
        let share_id = match api.create_share(&share_request).await {
            Ok(id) => id,
            Err(e) => {
                diagnostics.push(helpers::api_error("create", "SFS Turbo", &e));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };
        tracing::info!("Created SFS Turbo {}, waiting for it to become available", share_id);

        let mut state = request.planned_state;
        helpers::set_string(&mut state, "id", share_id.as_str());

        match api
            .wait_for_share(&ctx, &share_id, ShareWait::Creation, helpers::operation_timeout(&ctx, CREATE_TIMEOUT))
            .await
        {
            Ok(body) => {
                Self::apply_share(&mut state, &body);
                CreateResourceResponse {
                    new_state: state,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(helpers::api_error("wait for creation of", "SFS Turbo", &e));
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

        match Self::read_share(&provider_data.client, request.current_state.clone()).await {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "SFS Turbo", &e));
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
        let share_id = helpers::optional_string(&request.prior_state, "id").unwrap_or_default();

        if let Err(diag) = Self::apply_changes(&ctx, client, &share_id, &request.prior_state, &request.config).await {
            diagnostics.push(diag);
            // Steps that went through before the failure must reach the state
            let new_state = match Self::read_share(client, request.prior_state.clone()).await {
                Ok(Some(state)) => state,
                Ok(None) | Err(_) => request.prior_state,
            };
            return UpdateResourceResponse {
                new_state,
                diagnostics,
            };
        }

        let mut state = request.planned_state;
        helpers::set_string(&mut state, "id", share_id);
        match Self::read_share(client, state.clone()).await {
            Ok(new_state) => UpdateResourceResponse {
                new_state: new_state.unwrap_or(state),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "SFS Turbo", &e));
                UpdateResourceResponse {
                    new_state: state,
                    diagnostics,
                }
            }
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

        let Some(share_id) = helpers::optional_string(&request.prior_state, "id") else {
            return DeleteResourceResponse { diagnostics };
        };

        let api = provider_data.client.sfs_turbo();
        match api.delete_share(&share_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(helpers::api_error("delete", "SFS Turbo", &e));
                return DeleteResourceResponse { diagnostics };
            }
        }

        if let Err(e) = api
            .wait_for_share_deleted(&ctx, &share_id, helpers::operation_timeout(&ctx, DELETE_TIMEOUT))
            .await
        {
            diagnostics.push(helpers::api_error("wait for deletion of", "SFS Turbo", &e));
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for SfsTurboResource {
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
impl ResourceWithImportState for SfsTurboResource {
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
