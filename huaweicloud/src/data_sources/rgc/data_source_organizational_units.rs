//! RGC registered organizational units data source

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
    "organizational_unit_id",
    "organizational_unit_name",
    "organizational_unit_status",
    "organizational_unit_type",
    "parent_organizational_unit_id",
    "parent_organizational_unit_name",
    "created_at",
    "updated_at",
];

#[derive(Default)]
pub struct RgcOrganizationalUnitsDataSource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl RgcOrganizationalUnitsDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for RgcOrganizationalUnitsDataSource {
    fn type_name(&self) -> &str {
        "huaweicloud_rgc_organizational_units"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Lists the organizational units registered with RGC")
            .id_attribute("The data source ID")
            .attribute(
                AttributeBuilder::new("organizational_unit_name", AttributeType::String)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("parent_organizational_unit_id", AttributeType::String)
                    .description("Only return direct children of this OU")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "managed_organizational_units",
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

        let items = match provider_data.client.rgc().list_organizational_units().await {
            Ok(items) => items,
            Err(e) => {
                diagnostics.push(helpers::api_error("list", "organizational units", &e));
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics,
                };
            }
        };

        let organizational_unit_name = helpers::optional_string(&request.config, "organizational_unit_name");
        let parent_organizational_unit_id = helpers::optional_string(&request.config, "parent_organizational_unit_id");
        let matching: Vec<_> = items
            .into_iter()
            .filter(|item| {
                helpers::field_matches(item, "organizational_unit_name", organizational_unit_name.as_deref())
                    && helpers::field_matches(item, "parent_organizational_unit_id", parent_organizational_unit_id.as_deref())
            })
            .collect();

        let fields: Vec<(&str, &str)> = FIELDS.iter().map(|f| (*f, *f)).collect();
        let mut state = request.config;
        helpers::set_results(&mut state, "managed_organizational_units", helpers::object_list(&matching, &fields));

        ReadDataSourceResponse { state, diagnostics }
    }
}

#[async_trait]
impl DataSourceWithConfigure for RgcOrganizationalUnitsDataSource {
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
