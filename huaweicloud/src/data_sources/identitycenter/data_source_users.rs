//! Identity Center users data source

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
pub struct IdentityCenterUsersDataSource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl IdentityCenterUsersDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for IdentityCenterUsersDataSource {
    fn type_name(&self) -> &str {
        "huaweicloud_identitycenter_users"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Lists the users of an Identity Center identity store")
            .id_attribute("The data source ID")
            .attribute(
                AttributeBuilder::new("identity_store_id", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("user_name", AttributeType::String)
                    .description("Only return the user with this name")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "users",
                    AttributeType::list_of(AttributeType::object([
                        ("id", AttributeType::String),
                        ("user_name", AttributeType::String),
                        ("display_name", AttributeType::String),
                        ("family_name", AttributeType::String),
                        ("given_name", AttributeType::String),
                        ("email", AttributeType::String),
                        ("enabled", AttributeType::Bool),
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
        let user_name = helpers::optional_string(&request.config, "user_name");

        let users = match provider_data
            .client
            .identity_store()
            .list_users(&store_id, user_name.as_deref())
            .await
        {
            Ok(users) => users,
            Err(e) => {
                diagnostics.push(helpers::api_error("list", "users", &e));
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics,
                };
            }
        };

        let mut state = request.config;
        helpers::set_results(
            &mut state,
            "users",
            helpers::object_list(
                &users,
                &[
                    ("id", "user_id"),
                    ("user_name", "user_name"),
                    ("display_name", "display_name"),
                    ("family_name", "name.family_name"),
                    ("given_name", "name.given_name"),
                    ("email", "emails[0].email"),
                    ("enabled", "enabled"),
                ],
            ),
        );

        ReadDataSourceResponse { state, diagnostics }
    }
}

#[async_trait]
impl DataSourceWithConfigure for IdentityCenterUsersDataSource {
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
