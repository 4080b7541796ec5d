//! SFS Turbo file systems data source

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::Dynamic;

use crate::api::path_search;
use crate::helpers;

const STRING_FIELDS: &[(&str, &str)] = &[
    ("id", "id"),
    ("name", "name"),
    ("share_proto", "share_proto"),
    ("share_type", "share_type"),
    ("status", "status"),
    ("availability_zone", "availability_zone"),
    ("vpc_id", "vpc_id"),
    ("subnet_id", "subnet_id"),
    ("security_group_id", "security_group_id"),
    ("export_location", "export_location"),
    ("enterprise_project_id", "enterprise_project_id"),
];

#[derive(Default)]
pub struct SfsTurbosDataSource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl SfsTurbosDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sizes come back as decimal strings ("500.00")
    fn turbo(item: &Value) -> Dynamic {
        let mut fields: HashMap<String, Dynamic> = STRING_FIELDS
            .iter()
            .map(|(name, expression)| {
                let value = path_search::search_str(expression, item)
                    .map(Dynamic::String)
                    .unwrap_or(Dynamic::Null);
                (name.to_string(), value)
            })
            .collect();
        for (name, expression) in [("size", "size"), ("available_capacity", "avail_capacity")] {
            let value = path_search::search_f64(expression, item)
                .map(Dynamic::Number)
                .unwrap_or(Dynamic::Null);
            fields.insert(name.to_string(), value);
        }
        Dynamic::Map(fields)
    }
}

#[async_trait]
impl DataSource for SfsTurbosDataSource {
    fn type_name(&self) -> &str {
        "huaweicloud_sfs_turbos"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let filter = |name: &str, ty: AttributeType| AttributeBuilder::new(name, ty).optional().build();

        let mut item_fields: Vec<(&str, AttributeType)> =
            STRING_FIELDS.iter().map(|(name, _)| (*name, AttributeType::String)).collect();
        item_fields.push(("size", AttributeType::Number));
        item_fields.push(("available_capacity", AttributeType::Number));

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Lists SFS Turbo file systems")
            .id_attribute("The data source ID")
            .attribute(filter("name", AttributeType::String))
            .attribute(filter("size", AttributeType::Number))
            .attribute(filter("share_proto", AttributeType::String))
            .attribute(filter("share_type", AttributeType::String))
            .attribute(filter("enterprise_project_id", AttributeType::String))
            .attribute(
                AttributeBuilder::new("turbos", AttributeType::list_of(AttributeType::object(item_fields)))
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

        let shares = match provider_data.client.sfs_turbo().list_shares().await {
            Ok(shares) => shares,
            Err(e) => {
                diagnostics.push(helpers::api_error("list", "SFS Turbo file systems", &e));
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics,
                };
            }
        };

        let config = &request.config;
        let name = helpers::optional_string(config, "name");
        let share_proto = helpers::optional_string(config, "share_proto");
        let share_type = helpers::optional_string(config, "share_type");
        let enterprise_project_id = helpers::optional_string(config, "enterprise_project_id");
        let size = helpers::optional_i64(config, "size");

        let turbos: Vec<Dynamic> = shares
            .iter()
            .filter(|share| {
                helpers::field_matches(share, "name", name.as_deref())
                    && helpers::field_matches(share, "share_proto", share_proto.as_deref())
                    && helpers::field_matches(share, "share_type", share_type.as_deref())
                    && helpers::field_matches(share, "enterprise_project_id", enterprise_project_id.as_deref())
                    && size.map_or(true, |size| path_search::search_i64("size", share) == Some(size))
            })
            .map(Self::turbo)
            .collect();

        let mut state = request.config;
        helpers::set_results(&mut state, "turbos", turbos);

        ReadDataSourceResponse { state, diagnostics }
    }
}

#[async_trait]
impl DataSourceWithConfigure for SfsTurbosDataSource {
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

    async fn read(config: Value) -> ReadDataSourceResponse {
        let mut server = Server::new_async().await;
        let _list = server
            .mock("GET", "/v1/proj-1/sfs-turbos/detail")
            .match_query(Matcher::Any)
            .with_body(r#"{"shares":[
                {"id":"s-1","name":"fs-a","size":"500.00","share_proto":"NFS","share_type":"STANDARD","avail_capacity":"480.5"},
                {"id":"s-2","name":"fs-b","size":"1200.00","share_proto":"NFS","share_type":"PERFORMANCE"}
            ],"count":2}"#)
            .create_async()
            .await;

        let data_source = SfsTurbosDataSource {
            provider_data: Some(HuaweiCloudProviderData::new(create_test_client(&server.url()))),
        };
        data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "huaweicloud_sfs_turbos".to_string(),
                    config: DynamicValue::from_json(config),
                },
            )
            .await
    }

    #[tokio::test]
    async fn read_without_filters_returns_everything() {
        let response = read(json!({})).await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let turbos = response.state.get_list(&AttributePath::new("turbos")).unwrap();
        assert_eq!(turbos.len(), 2);
        let first = turbos[0].as_map().unwrap();
        assert_eq!(first["size"].as_number(), Some(500.0));
        assert_eq!(first["available_capacity"].as_number(), Some(480.5));
    }

    #[tokio::test]
    async fn read_filters_by_size_and_type() {
        let response = read(json!({"size": 1200, "share_type": "PERFORMANCE"})).await;

        let turbos = response.state.get_list(&AttributePath::new("turbos")).unwrap();
        assert_eq!(turbos.len(), 1);
        assert_eq!(turbos[0].as_map().unwrap()["id"].as_str(), Some("s-2"));
    }
}
