//! SFS Turbo permission rule resource

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

use crate::api::sfsturbo::PermRule;
use crate::api::{ApiError, Client};
use crate::helpers;

const DEFAULT_RW_TYPE: &str = "rw";
const DEFAULT_USER_TYPE: &str = "no_root_squash";

#[derive(Default)]
pub struct SfsTurboPermRuleResource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl SfsTurboPermRuleResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a permission rule of an SFS Turbo file system")
            .id_attribute("The rule ID")
            .attribute(
                AttributeBuilder::new("share_id", AttributeType::String)
                    .description("The ID of the SFS Turbo file system")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ip_cidr", AttributeType::String)
                    .description("IP address or CIDR block the rule applies to")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("rw_type", AttributeType::String)
                    .description("rw, ro or none, defaults to rw")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("user_type", AttributeType::String)
                    .description("Squash mode for remote users, defaults to no_root_squash")
                    .optional()
                    .computed()
                    .build(),
            )
            .build()
    }

    fn rule(config: &DynamicValue) -> PermRule {
        PermRule {
            ip_cidr: helpers::optional_string(config, "ip_cidr"),
            rw_type: helpers::string_or(config, "rw_type", DEFAULT_RW_TYPE),
            user_type: helpers::string_or(config, "user_type", DEFAULT_USER_TYPE),
        }
    }

    fn apply_rule(state: &mut DynamicValue, body: &Value) {
        helpers::set_string_from(state, "ip_cidr", body, "rule.ip_cidr");
        helpers::set_string_from(state, "rw_type", body, "rule.rw_type");
        helpers::set_string_from(state, "user_type", body, "rule.user_type");
    }

    async fn read_rule(client: &Client, mut state: DynamicValue) -> Result<Option<DynamicValue>, ApiError> {
        let share_id = helpers::optional_string(&state, "share_id").unwrap_or_default();
        let rule_id = helpers::optional_string(&state, "id").unwrap_or_default();

        match client.sfs_turbo().get_perm_rule(&share_id, &rule_id).await {
            Ok(body) => {
                Self::apply_rule(&mut state, &body);
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Resource for SfsTurboPermRuleResource {
    fn type_name(&self) -> &str {
        "huaweicloud_sfs_turbo_perm_rule"
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

        let share_id = match helpers::required_strings(&request.config, ["share_id", "ip_cidr"]) {
            Ok([share_id, _]) => share_id,
            Err(diags) => {
                diagnostics.extend(diags);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let client = &provider_data.client;
        let rule_id = match client
            .sfs_turbo()
            .create_perm_rule(&share_id, &Self::rule(&request.config))
            .await
        {
            Ok(id) => id,
            Err(e) => {
                diagnostics.push(helpers::api_error("create", "SFS Turbo permission rule", &e));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let mut state = request.planned_state;
        helpers::set_string(&mut state, "id", rule_id);
        match Self::read_rule(client, state.clone()).await {
            Ok(new_state) => CreateResourceResponse {
                new_state: new_state.unwrap_or(state),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "SFS Turbo permission rule", &e));
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

        match Self::read_rule(&provider_data.client, request.current_state.clone()).await {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "SFS Turbo permission rule", &e));
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
        let rule_id = helpers::optional_string(&request.prior_state, "id").unwrap_or_default();

        if let Err(e) = client
            .sfs_turbo()
            .update_perm_rule(&share_id, &rule_id, &Self::rule(&request.config))
            .await
        {
            diagnostics.push(helpers::api_error("update", "SFS Turbo permission rule", &e));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        }

        let mut state = request.planned_state;
        helpers::set_string(&mut state, "id", rule_id);
        match Self::read_rule(client, state.clone()).await {
            Ok(new_state) => UpdateResourceResponse {
                new_state: new_state.unwrap_or(state),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "SFS Turbo permission rule", &e));
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
        let Some(rule_id) = helpers::optional_string(&request.prior_state, "id") else {
            return DeleteResourceResponse { diagnostics };
        };

        match provider_data.client.sfs_turbo().delete_perm_rule(&share_id, &rule_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => diagnostics.push(helpers::api_error("delete", "SFS Turbo permission rule", &e)),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for SfsTurboPermRuleResource {
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
impl ResourceWithImportState for SfsTurboPermRuleResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_split_id(&ctx, &["share_id", "id"], '/', &request, &mut response);
        response
    }
}
