//! Identity Center groups data source

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};

use crate::helpers;

#[derive(Default)]
pub struct IdentityCenterGroupsDataSource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl IdentityCenterGroupsDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for IdentityCenterGroupsDataSource {
    fn type_name(&self) -> &str {
        "huaweicloud_identitycenter_groups"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Lists the groups of an Identity Center identity store")
            .id_attribute("The data source ID")
            .attribute(
                AttributeBuilder::new("identity_store_id", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Only return the group with this name")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "groups",
                    AttributeType::list_of(AttributeType::object([
                        ("id", AttributeType::String),
                        ("name", AttributeType::String),
                        ("description", AttributeType::String),
                        ("created_at", AttributeType::String),
                        ("updated_at", AttributeType::String),
                    ])),
                )
                .computed()
                .build(),
            )
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(helpers::not_configured());
            return ReadDataSourceResponse {
                state: request.config,
                diagnostics,
            };
        };

        let store_id = match helpers::required_string(&request.config, "identity_store_id") {
            Ok(id) => id,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics,
                };
            }
        };
        let name = helpers::optional_string(&request.config, "name");

        let groups = match provider_data
            .client
            .identity_store()
            .list_groups(&store_id, name.as_deref())
            .await
        {
            Ok(groups) => groups,
            Err(e) => {
                diagnostics.push(helpers::api_error("list", "groups", &e));
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics,
                };
            }
        };

        let mut state = request.config;
        helpers::set_results(
            &mut state,
            "groups",
            helpers::object_list(
                &groups,
                &[
                    ("id", "group_id"),
                    ("name", "display_name"),
                    ("description", "description"),
                    ("created_at", "created_at"),
                    ("updated_at", "updated_at"),
                ],
            ),
        );

        ReadDataSourceResponse { state, diagnostics }
    }
}

#[async_trait]
impl DataSourceWithConfigure for IdentityCenterGroupsDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        ConfigureDataSourceResponse {
            diagnostics: helpers::configure_provider_data(&mut self.provider_data, request.provider_data, "data source"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use crate::HuaweiCloudProviderData;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tfplug::types::{AttributePath, DynamicValue};

    #[tokio::test]
    async fn read_maps_display_name_to_name() {
        let mut server = Server::new_async().await;
        let _list = server
            .mock("GET", "/v1/identity-stores/d-1/groups")
            .match_query(Matcher::Any)
            .with_body(r#"{"groups":[
                {"group_id":"g-1","display_name":"admins","description":"Administrators"},
                {"group_id":"g-2","display_name":"auditors"}
            ],"page_info":{}}"#)
            .create_async()
            .await;

        let data_source = IdentityCenterGroupsDataSource {
            provider_data: Some(HuaweiCloudProviderData::new(create_test_client(&server.url()))),
        };
        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "huaweicloud_identitycenter_groups".to_string(),
                    config: DynamicValue::from_json(json!({"identity_store_id": "d-1"})),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let groups = response.state.get_list(&AttributePath::new("groups")).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].as_map().unwrap()["name"].as_str(), Some("admins"));
        assert!(groups[1].as_map().unwrap()["description"].is_null());
    }
}
