//! Identity Center permission sets data source

use async_trait::async_trait;
use serde_json::Value;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};

use crate::api::path_search;
use crate::helpers;

#[derive(Default)]
pub struct IdentityCenterPermissionSetsDataSource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl IdentityCenterPermissionSetsDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for IdentityCenterPermissionSetsDataSource {
    fn type_name(&self) -> &str {
        "huaweicloud_identitycenter_permission_sets"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Lists the permission sets of an Identity Center instance")
            .id_attribute("The data source ID")
            .attribute(
                AttributeBuilder::new("instance_id", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Only return the permission set with this name")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "permission_sets",
                    AttributeType::list_of(AttributeType::object([
                        ("id", AttributeType::String),
                        ("name", AttributeType::String),
                        ("description", AttributeType::String),
                        ("session_duration", AttributeType::String),
                        ("relay_state", AttributeType::String),
                        ("urn", AttributeType::String),
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

        let instance_id = match helpers::required_string(&request.config, "instance_id") {
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

        let permission_sets = match provider_data
            .client
            .identity_center()
            .list_permission_sets(&instance_id)
            .await
        {
            Ok(sets) => sets,
            Err(e) => {
                diagnostics.push(helpers::api_error("list", "permission sets", &e));
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics,
                };
            }
        };

        let matching = path_search::filter_by_field(permission_sets, "name", name.map(Value::String).as_ref());

        let mut state = request.config;
        helpers::set_results(
            &mut state,
            "permission_sets",
            helpers::object_list(
                &matching,
                &[
                    ("id", "permission_set_id"),
                    ("name", "name"),
                    ("description", "description"),
                    ("session_duration", "session_duration"),
                    ("relay_state", "relay_state"),
                    ("urn", "permission_set_urn"),
                ],
            ),
        );

        ReadDataSourceResponse { state, diagnostics }
    }
}

#[async_trait]
impl DataSourceWithConfigure for IdentityCenterPermissionSetsDataSource {
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
    async fn read_filters_by_name_across_pages() {
        let mut server = Server::new_async().await;
        let _second = server
            .mock("GET", "/v1/instances/ins-1/permission-sets")
            .match_query(Matcher::UrlEncoded("marker".into(), "m2".into()))
            .with_body(r#"{"permission_sets":[{"permission_set_id":"ps-3","name":"auditor"}],"page_info":{}}"#)
            .create_async()
            .await;
        let _first = server
            .mock("GET", "/v1/instances/ins-1/permission-sets")
            .match_query(Matcher::Exact("limit=200".to_string()))
            .with_body(r#"{"permission_sets":[
                {"permission_set_id":"ps-1","name":"admin"},
                {"permission_set_id":"ps-2","name":"developer"}
            ],"page_info":{"next_marker":"m2"}}"#)
            .create_async()
            .await;

        let data_source = IdentityCenterPermissionSetsDataSource {
            provider_data: Some(HuaweiCloudProviderData::new(create_test_client(&server.url()))),
        };
        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "huaweicloud_identitycenter_permission_sets".to_string(),
                    config: DynamicValue::from_json(json!({"instance_id": "ins-1", "name": "auditor"})),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let sets = response.state.get_list(&AttributePath::new("permission_sets")).unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].as_map().unwrap()["id"].as_str(), Some("ps-3"));
    }
}
