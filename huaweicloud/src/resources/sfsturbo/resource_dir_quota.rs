//! SFS Turbo directory quota resource

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
use tfplug::types::DynamicValue;

use crate::api::sfsturbo::DirQuotaRequest;
use crate::api::{ApiError, Client};
use crate::helpers;

#[derive(Default)]
pub struct SfsTurboDirQuotaResource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl SfsTurboDirQuotaResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Limits the capacity and inode count of an SFS Turbo directory")
            .id_attribute("The quota ID, <share_id>/<path>")
            .attribute(
                AttributeBuilder::new("share_id", AttributeType::String)
                    .description("The ID of the SFS Turbo file system")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("path", AttributeType::String)
                    .description("Path of an existing directory")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("capacity", AttributeType::Number)
                    .description("Capacity limit in MB, 0 means unlimited")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("inode", AttributeType::Number)
                    .description("Inode limit, 0 means unlimited")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("used_capacity", AttributeType::Number)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("used_inode", AttributeType::Number)
                    .computed()
                    .build(),
            )
            .build()
    }

    fn quota_request(config: &DynamicValue, path: String) -> DirQuotaRequest {
        DirQuotaRequest {
            path,
            capacity: helpers::optional_i64(config, "capacity"),
            inode: helpers::optional_i64(config, "inode"),
        }
    }

    fn apply_quota(state: &mut DynamicValue, body: &Value) {
        helpers::set_i64_from(state, "capacity", body, "capacity");
        helpers::set_i64_from(state, "inode", body, "inode");
        helpers::set_i64_from(state, "used_capacity", body, "used_capacity");
        helpers::set_i64_from(state, "used_inode", body, "used_inode");
    }

    async fn read_quota(client: &Client, mut state: DynamicValue) -> Result<Option<DynamicValue>, ApiError> {
        let share_id = helpers::optional_string(&state, "share_id").unwrap_or_default();
        let path = helpers::optional_string(&state, "path").unwrap_or_default();

        match client.sfs_turbo().get_dir_quota(&share_id, &path).await {
            Ok(body) => {
                Self::apply_quota(&mut state, &body);
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Resource for SfsTurboDirQuotaResource {
    fn type_name(&self) -> &str {
        "huaweicloud_sfs_turbo_dir_quota"
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

        let [share_id, path] = match helpers::required_strings(&request.config, ["share_id", "path"]) {
            Ok(values) => values,
            Err(diags) => {
                diagnostics.extend(diags);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let client = &provider_data.client;
        if let Err(e) = client
            .sfs_turbo()
            .create_dir_quota(&share_id, &Self::quota_request(&request.config, path.clone()))
            .await
        {
            diagnostics.push(helpers::api_error("create", "SFS Turbo directory quota", &e));
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        }

        let mut state = request.planned_state;
        helpers::set_string(&mut state, "id", format!("{}/{}", share_id, path));
        match Self::read_quota(client, state.clone()).await {
            Ok(new_state) => CreateResourceResponse {
                new_state: new_state.unwrap_or(state),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "SFS Turbo directory quota", &e));
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

        match Self::read_quota(&provider_data.client, request.current_state.clone()).await {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "SFS Turbo directory quota", &e));
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

        let client = &provider_data.client;
        let share_id = helpers::optional_string(&request.prior_state, "share_id").unwrap_or_default();
        let path = helpers::optional_string(&request.prior_state, "path").unwrap_or_default();

        if let Err(e) = client
            .sfs_turbo()
            .update_dir_quota(&share_id, &Self::quota_request(&request.config, path))
            .await
        {
            diagnostics.push(helpers::api_error("update", "SFS Turbo directory quota", &e));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        }

        let state = request.planned_state;
        match Self::read_quota(client, state.clone()).await {
            Ok(new_state) => UpdateResourceResponse {
                new_state: new_state.unwrap_or(state),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "SFS Turbo directory quota", &e));
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

        let share_id = helpers::optional_string(&request.prior_state, "share_id").unwrap_or_default();
        let path = helpers::optional_string(&request.prior_state, "path").unwrap_or_default();

        match provider_data.client.sfs_turbo().delete_dir_quota(&share_id, &path).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => diagnostics.push(helpers::api_error("delete", "SFS Turbo directory quota", &e)),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for SfsTurboDirQuotaResource {
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
impl ResourceWithImportState for SfsTurboDirQuotaResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_split_id(&ctx, &["share_id", "path"], '/', &request, &mut response);
        response
    }
}
