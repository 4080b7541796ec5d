//! SFS Turbo permission rules data source

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
pub struct SfsTurboPermRulesDataSource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl SfsTurboPermRulesDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for SfsTurboPermRulesDataSource {
    fn type_name(&self) -> &str {
        "huaweicloud_sfs_turbo_perm_rules"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Lists the permission rules of an SFS Turbo file system")
            .id_attribute("The data source ID")
            .attribute(
                AttributeBuilder::new("share_id", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "rules",
                    AttributeType::list_of(AttributeType::object([
                        ("id", AttributeType::String),
                        ("ip_cidr", AttributeType::String),
                        ("rw_type", AttributeType::String),
                        ("user_type", AttributeType::String),
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

        let share_id = match helpers::required_string(&request.config, "share_id") {
            Ok(id) => id,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics,
                };
            }
        };

        match provider_data.client.sfs_turbo().list_perm_rules(&share_id).await {
            Ok(rules) => {
                let mut state = request.config;
                helpers::set_results(
                    &mut state,
                    "rules",
                    helpers::object_list(
                        &rules,
                        &[
                            ("id", "id"),
                            ("ip_cidr", "ip_cidr"),
                            ("rw_type", "rw_type"),
                            ("user_type", "user_type"),
                        ],
                    ),
                );
                ReadDataSourceResponse { state, diagnostics }
            }
            Err(e) => {
                diagnostics.push(helpers::api_error("list", "SFS Turbo permission rules", &e));
                ReadDataSourceResponse {
                    state: request.config,
                    diagnostics,
                }
            }
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for SfsTurboPermRulesDataSource {
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
    use mockito::Server;
    use serde_json::json;
    use tfplug::types::{AttributePath, DynamicValue};

    #[tokio::test]
    async fn read_lists_rules() {
        let mut server = Server::new_async().await;
        let _list = server
            .mock("GET", "/v1/proj-1/sfs-turbos/share-1/fs/perm-rules")
            .with_body(r#"{"rules":[
                {"id":"r-1","ip_cidr":"10.0.0.0/8","rw_type":"rw","user_type":"no_root_squash"},
                {"id":"r-2","ip_cidr":"192.168.1.10","rw_type":"ro","user_type":"root_squash"}
            ]}"#)
            .create_async()
            .await;

        let data_source = SfsTurboPermRulesDataSource {
            provider_data: Some(HuaweiCloudProviderData::new(create_test_client(&server.url()))),
        };
        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "huaweicloud_sfs_turbo_perm_rules".to_string(),
                    config: DynamicValue::from_json(json!({"share_id": "share-1"})),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let rules = response.state.get_list(&AttributePath::new("rules")).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].as_map().unwrap()["rw_type"].as_str(), Some("ro"));
    }

    #[tokio::test]
    async fn read_requires_share_id() {
        let response = SfsTurboPermRulesDataSource {
            provider_data: Some(HuaweiCloudProviderData::new(create_test_client("http://127.0.0.1:1"))),
        }
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "huaweicloud_sfs_turbo_perm_rules".to_string(),
                config: DynamicValue::from_json(json!({})),
            },
        )
        .await;

        assert_eq!(response.diagnostics[0].summary, "Missing share_id");
    }
}
