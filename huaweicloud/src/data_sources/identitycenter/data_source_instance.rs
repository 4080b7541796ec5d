//! Identity Center instance data source

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::Diagnostic;

use crate::helpers;

#[derive(Default)]
pub struct IdentityCenterInstanceDataSource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl IdentityCenterInstanceDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for IdentityCenterInstanceDataSource {
    fn type_name(&self) -> &str {
        "huaweicloud_identitycenter_instance"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let computed = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .computed()
                .build()
        };

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Gets the Identity Center instance of the account")
            .id_attribute("The data source ID")
            .attribute(computed("instance_id", "The ID of the instance"))
            .attribute(computed("identity_store_id", "The ID of the identity store attached to the instance"))
            .attribute(computed("urn", "The URN of the instance"))
            .attribute(computed("alias", "The alias used in the user portal URL"))
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

        let instances = match provider_data.client.identity_center().list_instances().await {
            Ok(instances) => instances,
            Err(e) => {
                diagnostics.push(helpers::api_error("list", "Identity Center instances", &e));
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics,
                };
            }
        };

        let Some(instance) = instances.first() else {
            diagnostics.push(Diagnostic::error(
                "No Identity Center instance found",
                "Identity Center is not enabled in this account",
            ));
            return ReadDataSourceResponse {
                state: request.config,
                diagnostics,
            };
        };

        let mut state = request.config;
        helpers::set_string(&mut state, "id", helpers::random_id());
        helpers::set_string_from(&mut state, "instance_id", instance, "instance_id");
        helpers::set_string_from(&mut state, "identity_store_id", instance, "identity_store_id");
        helpers::set_string_from(&mut state, "urn", instance, "instance_urn");
        helpers::set_string_from(&mut state, "alias", instance, "alias");

        ReadDataSourceResponse { state, diagnostics }
    }
}

#[async_trait]
impl DataSourceWithConfigure for IdentityCenterInstanceDataSource {
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
