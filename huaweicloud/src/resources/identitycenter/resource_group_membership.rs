//! Identity Center group membership resource
//!
//! Memberships cannot be changed; every attribute forces a replacement.

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

use crate::helpers;

#[derive(Default)]
pub struct IdentityCenterGroupMembershipResource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl IdentityCenterGroupMembershipResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Adds a user to an Identity Center group")
            .id_attribute("The membership ID")
            .attribute(
                AttributeBuilder::new("identity_store_id", AttributeType::String)
                    .description("The ID of the identity store")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("group_id", AttributeType::String)
                    .description("The ID of the group")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("member_id", AttributeType::String)
                    .description("The ID of the user added to the group")
                    .required()
                    .force_new()
                    .build(),
            )
            .build()
    }
}

#[async_trait]
impl Resource for IdentityCenterGroupMembershipResource {
    fn type_name(&self) -> &str {
        "huaweicloud_identitycenter_group_membership"
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

        let ids: Result<Vec<String>, _> = ["identity_store_id", "group_id", "member_id"]
            .iter()
            .map(|name| helpers::required_string(&request.config, name))
            .collect();
        let ids = match ids {
            Ok(ids) => ids,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        match provider_data
            .client
            .identity_store()
            .create_group_membership(&ids[0], &ids[1], &ids[2])
            .await
        {
            Ok(membership_id) => {
                let mut new_state = request.planned_state;
                helpers::set_string(&mut new_state, "id", membership_id);
                CreateResourceResponse {
                    new_state,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(helpers::api_error("create", "group membership", &e));
                CreateResourceResponse {
                    new_state: request.planned_state,
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

        let store_id = helpers::optional_string(&request.current_state, "identity_store_id").unwrap_or_default();
        let membership_id = helpers::optional_string(&request.current_state, "id").unwrap_or_default();

        match provider_data
            .client
            .identity_store()
            .get_group_membership(&store_id, &membership_id)
            .await
        {
            Ok(body) => {
                let mut new_state = request.current_state;
                helpers::set_string_from(&mut new_state, "group_id", &body, "group_id");
                helpers::set_string_from(&mut new_state, "member_id", &body, "member_id.user_id");
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
                diagnostics.push(helpers::api_error("read", "group membership", &e));
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

        let store_id = helpers::optional_string(&request.prior_state, "identity_store_id").unwrap_or_default();
        let Some(membership_id) = helpers::optional_string(&request.prior_state, "id") else {
            return DeleteResourceResponse { diagnostics };
        };

        match provider_data
            .client
            .identity_store()
            .delete_group_membership(&store_id, &membership_id)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => diagnostics.push(helpers::api_error("delete", "group membership", &e)),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for IdentityCenterGroupMembershipResource {
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
impl ResourceWithImportState for IdentityCenterGroupMembershipResource {
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
    use mockito::Server;
    use serde_json::json;
    use tfplug::types::{AttributePath, DynamicValue};

    fn resource(url: &str) -> IdentityCenterGroupMembershipResource {
        IdentityCenterGroupMembershipResource {
            provider_data: Some(HuaweiCloudProviderData::new(create_test_client(url))),
        }
    }

    #[tokio::test]
    async fn create_sets_membership_id() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/v1/identity-stores/d-1/group-memberships")
            .with_body(r#"{"membership_id":"m-1"}"#)
            .create_async()
            .await;

        let config = DynamicValue::from_json(json!({
            "identity_store_id": "d-1", "group_id": "g-1", "member_id": "u-1"
        }));
        let response = resource(&server.url())
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "huaweicloud_identitycenter_group_membership".to_string(),
                    planned_state: config.clone(),
                    config,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.new_state.get_string(&AttributePath::new("id")).unwrap(), "m-1");
    }

    #[tokio::test]
    async fn read_maps_nested_member_id() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/v1/identity-stores/d-1/group-memberships/m-1")
            .with_body(r#"{"membership_id":"m-1","group_id":"g-2","member_id":{"user_id":"u-9"}}"#)
            .create_async()
            .await;

        let state = DynamicValue::from_json(json!({
            "id": "m-1", "identity_store_id": "d-1", "group_id": "g-1", "member_id": "u-1"
        }));
        let response = resource(&server.url())
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "huaweicloud_identitycenter_group_membership".to_string(),
                    current_state: state,
                },
            )
            .await;

        let new_state = response.new_state.unwrap();
        assert_eq!(new_state.get_string(&AttributePath::new("group_id")).unwrap(), "g-2");
        assert_eq!(new_state.get_string(&AttributePath::new("member_id")).unwrap(), "u-9");
    }
}
