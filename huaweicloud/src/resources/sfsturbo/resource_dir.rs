//! SFS Turbo directory resource

use async_trait::async_trait;
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

use crate::api::sfsturbo::DirRequest;
use crate::helpers;

#[derive(Default)]
pub struct SfsTurboDirResource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl SfsTurboDirResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a directory in an SFS Turbo file system")
            .id_attribute("The directory ID, <share_id>/<path>")
            .attribute(
                AttributeBuilder::new("share_id", AttributeType::String)
                    .description("The ID of the SFS Turbo file system")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("path", AttributeType::String)
                    .description("Absolute path of the directory, starting with /")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("mode", AttributeType::Number)
                    .description("Permission bits of the directory, as decimal digits (755)")
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("uid", AttributeType::Number)
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("gid", AttributeType::Number)
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .build()
    }
}

#[async_trait]
impl Resource for SfsTurboDirResource {
    fn type_name(&self) -> &str {
        "huaweicloud_sfs_turbo_dir"
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

        let dir_request = DirRequest {
            path: path.clone(),
            mode: helpers::optional_i64(&request.config, "mode"),
            uid: helpers::optional_i64(&request.config, "uid"),
            gid: helpers::optional_i64(&request.config, "gid"),
        };

        let api = provider_data.client.sfs_turbo();
        if let Err(e) = api.create_dir(&share_id, &dir_request).await {
            diagnostics.push(helpers::api_error("create", "SFS Turbo directory", &e));
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        }

        let mut new_state = request.planned_state;
        helpers::set_string(&mut new_state, "id", format!("{}/{}", share_id, path));

        match api.get_dir(&share_id, &path).await {
            Ok(body) => {
                helpers::set_i64_from(&mut new_state, "mode", &body, "mode");
                helpers::set_i64_from(&mut new_state, "uid", &body, "uid");
                helpers::set_i64_from(&mut new_state, "gid", &body, "gid");
            }
            Err(e) => diagnostics.push(helpers::api_error("read", "SFS Turbo directory", &e)),
        }

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

        let share_id = helpers::optional_string(&request.current_state, "share_id").unwrap_or_default();
        let path = helpers::optional_string(&request.current_state, "path").unwrap_or_default();

        match provider_data.client.sfs_turbo().get_dir(&share_id, &path).await {
            Ok(body) => {
                let mut new_state = request.current_state;
                helpers::set_i64_from(&mut new_state, "mode", &body, "mode");
                helpers::set_i64_from(&mut new_state, "uid", &body, "uid");
                helpers::set_i64_from(&mut new_state, "gid", &body, "gid");
                ReadResourceResponse {
                    new_state: Some(new_state),
                    diagnostics,
                }
            }
            Err(e) if e.is_not_found() => ReadResourceResponse {
                new_state: None,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "SFS Turbo directory", &e));
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

        match provider_data.client.sfs_turbo().delete_dir(&share_id, &path).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => diagnostics.push(helpers::api_error("delete", "SFS Turbo directory", &e)),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for SfsTurboDirResource {
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
impl ResourceWithImportState for SfsTurboDirResource {
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
