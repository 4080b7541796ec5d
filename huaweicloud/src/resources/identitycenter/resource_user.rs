//! Identity Center user resource

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

use crate::api::identitycenter::store::{
    CreateUserRequest, UpdateUserRequest, UserEmail, UserName, UserOperation,
};
use crate::api::{ApiError, Client};
use crate::helpers;

const DEFAULT_PASSWORD_MODE: &str = "OTP";

#[derive(Default)]
pub struct IdentityCenterUserResource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl IdentityCenterUserResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a user in an Identity Center identity store")
            .id_attribute("The user ID")
            .attribute(
                AttributeBuilder::new("identity_store_id", AttributeType::String)
                    .description("The ID of the identity store")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("user_name", AttributeType::String)
                    .description("The login name of the user")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("family_name", AttributeType::String)
                    .description("The family name of the user")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("given_name", AttributeType::String)
                    .description("The given name of the user")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("display_name", AttributeType::String)
                    .description("The display name of the user")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("email", AttributeType::String)
                    .description("The primary email address of the user")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("password_mode", AttributeType::String)
                    .description("How the initial password is delivered (OTP or EMAIL), defaults to OTP")
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enabled", AttributeType::Bool)
                    .description("Whether the user is enabled")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("created_at", AttributeType::String)
                    .description("When the user was created")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("updated_at", AttributeType::String)
                    .description("When the user was last updated")
                    .computed()
                    .build(),
            )
            .build()
    }

    fn extract_create_request(config: &DynamicValue) -> Result<CreateUserRequest, Diagnostic> {
        Ok(CreateUserRequest {
            user_name: helpers::required_string(config, "user_name")?,
            password_mode: helpers::string_or(config, "password_mode", DEFAULT_PASSWORD_MODE),
            name: UserName {
                family_name: helpers::required_string(config, "family_name")?,
                given_name: helpers::required_string(config, "given_name")?,
            },
            display_name: helpers::required_string(config, "display_name")?,
            emails: helpers::optional_string(config, "email")
                .map(|email| vec![UserEmail { email, primary: true }])
                .unwrap_or_default(),
        })
    }

    /// Replacements for every updatable attribute whose value changed
    fn changed_operations(prior: &DynamicValue, planned: &DynamicValue) -> Vec<UserOperation> {
        [
            ("family_name", "name.family_name"),
            ("given_name", "name.given_name"),
            ("display_name", "display_name"),
            ("email", "email"),
        ]
        .iter()
        .filter_map(|(attribute, api_path)| {
            let before = helpers::optional_string(prior, attribute);
            let after = helpers::optional_string(planned, attribute);
            (before != after).then(|| UserOperation::new(api_path, &after.unwrap_or_default()))
        })
        .collect()
    }

    fn apply_user(state: &mut DynamicValue, body: &Value) {
        helpers::set_string_from(state, "user_name", body, "user_name");
        helpers::set_string_from(state, "family_name", body, "name.family_name");
        helpers::set_string_from(state, "given_name", body, "name.given_name");
        helpers::set_string_from(state, "display_name", body, "display_name");
        helpers::set_string_from(state, "email", body, "emails[0].email");
        helpers::set_bool_from(state, "enabled", body, "enabled");
        helpers::set_timestamp_from(state, "created_at", body, "created_at");
        helpers::set_timestamp_from(state, "updated_at", body, "updated_at");
        if helpers::optional_string(state, "password_mode").is_none() {
            helpers::set_string(state, "password_mode", DEFAULT_PASSWORD_MODE);
        }
    }

    /// Refreshes `state` from the API; `None` when the user is gone
    async fn read_user(client: &Client, mut state: DynamicValue) -> Result<Option<DynamicValue>, ApiError> {
        let store_id = helpers::optional_string(&state, "identity_store_id").unwrap_or_default();
        let user_id = helpers::optional_string(&state, "id").unwrap_or_default();

        match client.identity_store().get_user(&store_id, &user_id).await {
            Ok(body) => {
                Self::apply_user(&mut state, &body);
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Resource for IdentityCenterUserResource {
    fn type_name(&self) -> &str {
        "huaweicloud_identitycenter_user"
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

        let (store_id, create_request) = match helpers::required_string(&request.config, "identity_store_id")
            .and_then(|store| Ok((store, Self::extract_create_request(&request.config)?)))
        {
            Ok(parts) => parts,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let client = &provider_data.client;
        let user_id = match client.identity_store().create_user(&store_id, &create_request).await {
            Ok(id) => id,
            Err(e) => {
                diagnostics.push(helpers::api_error("create", "Identity Center user", &e));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };
        tracing::debug!("Created Identity Center user {} in store {}", user_id, store_id);

        let mut state = request.planned_state;
        helpers::set_string(&mut state, "id", user_id);
        helpers::set_string(&mut state, "password_mode", create_request.password_mode);

        match Self::read_user(client, state.clone()).await {
            Ok(Some(new_state)) => CreateResourceResponse {
                new_state,
                diagnostics,
            },
            Ok(None) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read Identity Center user",
                    "The user was not found right after it was created",
                ));
                CreateResourceResponse {
                    new_state: state,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "Identity Center user", &e));
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

        match Self::read_user(&provider_data.client, request.current_state.clone()).await {
            Ok(new_state) => {
                if new_state.is_none() {
                    tracing::warn!("Identity Center user no longer exists, removing from state");
                }
                ReadResourceResponse {
                    new_state,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "Identity Center user", &e));
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
        let user_id = helpers::optional_string(&request.prior_state, "id").unwrap_or_default();
        let operations = Self::changed_operations(&request.prior_state, &request.planned_state);

        if !operations.is_empty() {
            let update = UpdateUserRequest { operations };
            if let Err(e) = provider_data
                .client
                .identity_store()
                .update_user(&store_id, &user_id, &update)
                .await
            {
                diagnostics.push(helpers::api_error("update", "Identity Center user", &e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        }

        let mut state = request.planned_state;
        helpers::set_string(&mut state, "id", user_id);
        match Self::read_user(&provider_data.client, state.clone()).await {
            Ok(Some(new_state)) => UpdateResourceResponse {
                new_state,
                diagnostics,
            },
            Ok(None) => UpdateResourceResponse {
                new_state: state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "Identity Center user", &e));
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
        let Some(user_id) = helpers::optional_string(&request.prior_state, "id") else {
            return DeleteResourceResponse { diagnostics };
        };

        match provider_data
            .client
            .identity_store()
            .delete_user(&store_id, &user_id)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => diagnostics.push(helpers::api_error("delete", "Identity Center user", &e)),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for IdentityCenterUserResource {
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
impl ResourceWithImportState for IdentityCenterUserResource {
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

    fn resource(url: &str) -> IdentityCenterUserResource {
        IdentityCenterUserResource {
            provider_data: Some(HuaweiCloudProviderData::new(create_test_client(url))),
        }
    }

    fn config() -> DynamicValue {
        DynamicValue::from_json(json!({
            "identity_store_id": "d-1",
            "user_name": "alice",
            "family_name": "Liddell",
            "given_name": "Alice",
            "display_name": "Alice L",
            "email": "alice@example.com"
        }))
    }

    const USER_BODY: &str = r#"{
        "user_id": "u-1",
        "user_name": "alice",
        "name": {"family_name": "Liddell", "given_name": "Alice"},
        "display_name": "Alice L",
        "emails": [{"email": "alice@example.com", "primary": true}],
        "enabled": true,
        "created_at": 1700000000000,
        "updated_at": 1700000000000
    }"#;

    #[tokio::test]
    async fn create_populates_state_from_read_back() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/v1/identity-stores/d-1/users")
            .match_body(Matcher::PartialJson(json!({"user_name": "alice", "password_mode": "OTP"})))
            .with_body(r#"{"user_id":"u-1"}"#)
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/v1/identity-stores/d-1/users/u-1")
            .with_body(USER_BODY)
            .create_async()
            .await;

        let response = resource(&server.url())
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "huaweicloud_identitycenter_user".to_string(),
                    planned_state: config(),
                    config: config(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "u-1");
        assert!(state.get_bool(&AttributePath::new("enabled")).unwrap());
        assert_eq!(
            state.get_string(&AttributePath::new("created_at")).unwrap(),
            "2023-11-14T22:13:20Z"
        );
        assert_eq!(state.get_string(&AttributePath::new("password_mode")).unwrap(), "OTP");
        create.assert_async().await;
    }

    #[tokio::test]
    async fn read_of_missing_user_removes_it_from_state() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/v1/identity-stores/d-1/users/u-1")
            .with_status(404)
            .with_body(r#"{"error_code":"IdentityStore.1001","error_msg":"user not found"}"#)
            .create_async()
            .await;

        let mut state = config();
        helpers::set_string(&mut state, "id", "u-1");
        let response = resource(&server.url())
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "huaweicloud_identitycenter_user".to_string(),
                    current_state: state,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn update_sends_only_changed_attributes() {
        let mut server = Server::new_async().await;
        let update = server
            .mock("PUT", "/v1/identity-stores/d-1/users/u-1")
            .match_body(Matcher::Json(json!({
                "operations": [{"attribute_path": "display_name", "attribute_value": "Alice Liddell"}]
            })))
            .with_status(204)
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/v1/identity-stores/d-1/users/u-1")
            .with_body(USER_BODY.replace("\"Alice L\"", "\"Alice Liddell\""))
            .create_async()
            .await;

        let mut prior = config();
        helpers::set_string(&mut prior, "id", "u-1");
        helpers::set_string(&mut prior, "password_mode", "OTP");
        let mut planned = prior.clone();
        helpers::set_string(&mut planned, "display_name", "Alice Liddell");

        let response = resource(&server.url())
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "huaweicloud_identitycenter_user".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("display_name")).unwrap(),
            "Alice Liddell"
        );
        update.assert_async().await;
    }

    #[tokio::test]
    async fn update_rejects_user_name_change() {
        let mut prior = config();
        helpers::set_string(&mut prior, "id", "u-1");
        let mut planned = prior.clone();
        helpers::set_string(&mut planned, "user_name", "bob");

        let response = IdentityCenterUserResource::new()
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "huaweicloud_identitycenter_user".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Attribute requires replacement");
    }

    #[tokio::test]
    async fn delete_tolerates_missing_user() {
        let mut server = Server::new_async().await;
        let delete = server
            .mock("DELETE", "/v1/identity-stores/d-1/users/u-1")
            .with_status(404)
            .create_async()
            .await;

        let mut state = config();
        helpers::set_string(&mut state, "id", "u-1");
        let response = resource(&server.url())
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "huaweicloud_identitycenter_user".to_string(),
                    prior_state: state,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn import_splits_store_and_user_id() {
        let response = IdentityCenterUserResource::new()
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "huaweicloud_identitycenter_user".to_string(),
                    id: "d-1/u-1".to_string(),
                },
            )
            .await;

        let state = &response.imported_resources[0].state;
        assert_eq!(state.get_string(&AttributePath::new("identity_store_id")).unwrap(), "d-1");
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "u-1");
    }
}
