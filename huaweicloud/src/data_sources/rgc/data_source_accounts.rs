//! RGC managed accounts data source

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
    "account_id",
    "account_name",
    "account_type",
    "owner",
    "state",
    "parent_organizational_unit_id",
    "parent_organizational_unit_name",
    "identity_store_user_name",
    "created_at",
];

#[derive(Default)]
pub struct RgcAccountsDataSource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl RgcAccountsDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for RgcAccountsDataSource {
    fn type_name(&self) -> &str {
        "huaweicloud_rgc_accounts"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Lists the accounts managed by RGC")
            .id_attribute("The data source ID")
            .attribute(
                AttributeBuilder::new("account_name", AttributeType::String)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("state", AttributeType::String)
                    .description("Only return accounts in this governance state")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "managed_accounts",
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

        let accounts = match provider_data.client.rgc().list_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                diagnostics.push(helpers::api_error("list", "managed accounts", &e));
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics,
                };
            }
        };

        let account_name = helpers::optional_string(&request.config, "account_name");
        let account_state = helpers::optional_string(&request.config, "state");
        let matching: Vec<_> = accounts
            .into_iter()
            .filter(|a| {
                helpers::field_matches(a, "account_name", account_name.as_deref())
                    && helpers::field_matches(a, "state", account_state.as_deref())
            })
            .collect();

        let fields: Vec<(&str, &str)> = FIELDS.iter().map(|f| (*f, *f)).collect();
        let mut state = request.config;
        helpers::set_results(&mut state, "managed_accounts", helpers::object_list(&matching, &fields));

        ReadDataSourceResponse { state, diagnostics }
    }
}

#[async_trait]
impl DataSourceWithConfigure for RgcAccountsDataSource {
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
