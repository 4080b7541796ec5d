//! RGC control catalog data source

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};

use crate::helpers;

const FIELDS: &[&str] = &[
    "identifier",
    "name",
    "description",
    "behavior",
    "owner",
    "severity",
    "control_objective",
    "service",
    "implementation",
    "guidance",
    "version",
];

#[derive(Default)]
pub struct RgcControlsDataSource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl RgcControlsDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for RgcControlsDataSource {
    fn type_name(&self) -> &str {
        "huaweicloud_rgc_controls"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Lists the controls available in RGC")
            .id_attribute("The data source ID")
            .attribute(
                AttributeBuilder::new("identifier", AttributeType::String)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("behavior", AttributeType::String)
                    .description("Preventive, Detective or Proactive")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "controls",
                    AttributeType::list_of(AttributeType::object(
                        FIELDS.iter().map(|name| (*name, AttributeType::String)),
                    )),
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

        let items = match provider_data.client.rgc().list_controls().await {
            Ok(items) => items,
            Err(e) => {
                diagnostics.push(helpers::api_error("list", "controls", &e));
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics,
                };
            }
        };

        let identifier = helpers::optional_string(&request.config, "identifier");
        let behavior = helpers::optional_string(&request.config, "behavior");
        let matching: Vec<_> = items
            .into_iter()
            .filter(|item| {
                helpers::field_matches(item, "identifier", identifier.as_deref())
                    && helpers::field_matches(item, "behavior", behavior.as_deref())
            })
            .collect();

        let fields: Vec<(&str, &str)> = FIELDS.iter().map(|f| (*f, *f)).collect();
        let mut state = request.config;
        helpers::set_results(&mut state, "controls", helpers::object_list(&matching, &fields));

        ReadDataSourceResponse { state, diagnostics }
    }
}

#[async_trait]
impl DataSourceWithConfigure for RgcControlsDataSource {
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
    async fn read_filters_by_behavior() {
        let mut server = Server::new_async().await;
        let _list = server
            .mock("GET", "/v1/governance/controls")
            .match_query(Matcher::Any)
            .with_body(r#"{"controls":[
                {"identifier":"RGC-GR_1","name":"Deny root access keys","behavior":"Preventive","severity":"HIGH"},
                {"identifier":"RGC-GR_2","name":"Detect public buckets","behavior":"Detective","severity":"MEDIUM"}
            ],"page_info":{}}"#)
            .create_async()
            .await;

        let data_source = RgcControlsDataSource {
            provider_data: Some(HuaweiCloudProviderData::new(create_test_client(&server.url()))),
        };
        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "huaweicloud_rgc_controls".to_string(),
                    config: DynamicValue::from_json(json!({"behavior": "Detective"})),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let controls = response.state.get_list(&AttributePath::new("controls")).unwrap();
        assert_eq!(controls.len(), 1);
        assert_eq!(controls[0].as_map().unwrap()["identifier"].as_str(), Some("RGC-GR_2"));
    }
}
