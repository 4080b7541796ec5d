//! Identity Center system policy attachment resource
//!
//! Owns the full set of system (managed) policies attached to one
//! permission set. After the set changes the permission set is provisioned
//! again so accounts pick up the new policies.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
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
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

use crate::api::{path_search, ApiError, Client};
use crate::helpers;

const PROVISION_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Default)]
pub struct IdentityCenterSystemPolicyAttachmentResource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl IdentityCenterSystemPolicyAttachmentResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Attaches system policies to an Identity Center permission set")
            .id_attribute("The permission set ID")
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
                AttributeBuilder::new("policy_ids", AttributeType::set_of(AttributeType::String))
                    .description("IDs of the system policies to attach")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "attached_policies",
                    AttributeType::list_of(AttributeType::object([
                        ("id", AttributeType::String),
                        ("name", AttributeType::String),
                    ])),
                )
                .description("The policies currently attached")
                .computed()
                .build(),
            )
            .build()
    }

    fn policy_ids(value: &DynamicValue) -> BTreeSet<String> {
        value
            .get_string_list(&AttributePath::new("policy_ids"))
            .unwrap_or_default()
            .into_iter()
            .collect()
    }

    fn apply_policies(state: &mut DynamicValue, permission_set_id: &str, policies: &[Value]) {
        let ids: Vec<Dynamic> = policies
            .iter()
            .filter_map(|policy| path_search::search_str("policy_id", policy))
            .map(Dynamic::String)
            .collect();
        let _ = state.set_list(&AttributePath::new("policy_ids"), ids);
        let _ = state.set_list(
            &AttributePath::new("attached_policies"),
            helpers::object_list(policies, &[("id", "policy_id"), ("name", "policy_name")]),
        );
        helpers::set_string(state, "id", permission_set_id);
    }

    /// Detaches `remove`, attaches `add`, then provisions the permission set
    /// when anything changed
    async fn sync(
        ctx: &Context,
        client: &Client,
        instance_id: &str,
        permission_set_id: &str,
        add: &BTreeSet<String>,
        remove: &BTreeSet<String>,
    ) -> Result<(), ApiError> {
        let api = client.identity_center();

        for policy_id in remove {
            tracing::debug!("Detaching policy {} from permission set {}", policy_id, permission_set_id);
            match api.detach_managed_policy(instance_id, permission_set_id, policy_id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        for policy_id in add {
            tracing::debug!("Attaching policy {} to permission set {}", policy_id, permission_set_id);
            api.attach_managed_policy(instance_id, permission_set_id, policy_id)
                .await?;
        }

        if add.is_empty() && remove.is_empty() {
            return Ok(());
        }

        let request_id = api
            .provision_permission_set(instance_id, permission_set_id)
            .await?;
        api.wait_for_provisioning(
            ctx,
            instance_id,
            &request_id,
            helpers::operation_timeout(ctx, PROVISION_TIMEOUT),
        )
        .await?;
        Ok(())
    }

    async fn read_attachment(client: &Client, mut state: DynamicValue) -> Result<Option<DynamicValue>, ApiError> {
        let instance_id = helpers::optional_string(&state, "instance_id").unwrap_or_default();
        let permission_set_id = helpers::optional_string(&state, "permission_set_id").unwrap_or_default();

        match client
            .identity_center()
            .list_managed_policies(&instance_id, &permission_set_id)
            .await
        {
            Ok(policies) if policies.is_empty() => Ok(None),
            Ok(policies) => {
                Self::apply_policies(&mut state, &permission_set_id, &policies);
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Resource for IdentityCenterSystemPolicyAttachmentResource {
    fn type_name(&self) -> &str {
        "huaweicloud_identitycenter_system_policy_attachment"
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

        let (instance_id, permission_set_id) = match (
            helpers::required_string(&request.config, "instance_id"),
            helpers::required_string(&request.config, "permission_set_id"),
        ) {
            (Ok(instance_id), Ok(permission_set_id)) => (instance_id, permission_set_id),
            (instance, permission_set) => {
                diagnostics.extend(instance.err());
                diagnostics.extend(permission_set.err());
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let client = &provider_data.client;
        let add = Self::policy_ids(&request.config);
        if let Err(e) = Self::sync(&ctx, client, &instance_id, &permission_set_id, &add, &BTreeSet::new()).await {
            diagnostics.push(helpers::api_error("attach", "system policies", &e));
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        }

        let mut state = request.planned_state;
        helpers::set_string(&mut state, "id", permission_set_id.as_str());
        match Self::read_attachment(client, state.clone()).await {
            Ok(new_state) => CreateResourceResponse {
                new_state: new_state.unwrap_or(state),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "system policy attachment", &e));
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

        match Self::read_attachment(&provider_data.client, request.current_state.clone()).await {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "system policy attachment", &e));
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
        let permission_set_id = helpers::optional_string(&request.prior_state, "permission_set_id").unwrap_or_default();

        let before = Self::policy_ids(&request.prior_state);
        let after = Self::policy_ids(&request.config);
        let add: BTreeSet<String> = after.difference(&before).cloned().collect();
        let remove: BTreeSet<String> = before.difference(&after).cloned().collect();

        if let Err(e) = Self::sync(&ctx, client, &instance_id, &permission_set_id, &add, &remove).await {
            diagnostics.push(helpers::api_error("update", "system policy attachment", &e));
            // Report the policies that are attached now, not the ones before the update
            let new_state = match Self::read_attachment(client, request.prior_state.clone()).await {
                Ok(Some(state)) => state,
                Ok(None) => {
                    let mut state = request.prior_state;
                    Self::apply_policies(&mut state, &permission_set_id, &[]);
                    state
                }
                Err(_) => request.prior_state,
            };
            return UpdateResourceResponse {
                new_state,
                diagnostics,
            };
        }

        let state = request.planned_state;
        match Self::read_attachment(client, state.clone()).await {
            Ok(new_state) => UpdateResourceResponse {
                new_state: new_state.unwrap_or(state),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "system policy attachment", &e));
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

        let instance_id = helpers::optional_string(&request.prior_state, "instance_id").unwrap_or_default();
        let permission_set_id = helpers::optional_string(&request.prior_state, "permission_set_id").unwrap_or_default();
        let remove = Self::policy_ids(&request.prior_state);

        match Self::sync(
            &ctx,
            &provider_data.client,
            &instance_id,
            &permission_set_id,
            &BTreeSet::new(),
            &remove,
        )
        .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => diagnostics.push(helpers::api_error("detach", "system policies", &e)),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for IdentityCenterSystemPolicyAttachmentResource {
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
impl ResourceWithImportState for IdentityCenterSystemPolicyAttachmentResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_split_id(&ctx, &["instance_id", "permission_set_id"], '/', &request, &mut response);
        response
    }
}
