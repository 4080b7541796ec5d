//! RGC landing zone resource
//!
//! There is one landing zone per account and no API to decommission it, so
//! destroying the resource only drops it from state.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::rgc::{LoggingConfiguration, OrganizationStructureItem, SetupLandingZoneRequest};
use crate::api::{ApiError, Client};
use crate::helpers;

const SETUP_TIMEOUT: Duration = Duration::from_secs(120 * 60);

#[derive(Default)]
pub struct RgcLandingZoneResource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl RgcLandingZoneResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Sets up the RGC landing zone of the organization")
            .id_attribute("The home region of the landing zone")
            .attribute(
                AttributeBuilder::new("home_region", AttributeType::String)
                    .description("Region hosting the governance resources")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("identity_store_email", AttributeType::String)
                    .description("Email of the Identity Center administrator")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "organization_structure",
                    AttributeType::list_of(AttributeType::object([
                        ("organizational_unit_name", AttributeType::String),
                        ("organizational_unit_type", AttributeType::String),
                    ])),
                )
                .description("Organizational units created by the setup")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("logging_bucket_retention_days", AttributeType::Number)
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("access_logging_bucket_retention_days", AttributeType::Number)
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cloud_trail_enabled", AttributeType::Bool)
                    .description("Whether the organization trail is created")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("landing_zone_status", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("percentage_complete", AttributeType::Number)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("deployed_version", AttributeType::String)
                    .computed()
                    .build(),
            )
            .build()
    }

    fn organization_structure(config: &DynamicValue) -> Vec<OrganizationStructureItem> {
        config
            .get_list(&AttributePath::new("organization_structure"))
            .unwrap_or_default()
            .iter()
            .filter_map(|item| {
                let fields = item.as_map()?;
                Some(OrganizationStructureItem {
                    organizational_unit_name: fields.get("organizational_unit_name")?.as_str()?.to_string(),
                    organizational_unit_type: fields.get("organizational_unit_type")?.as_str()?.to_string(),
                })
            })
            .collect()
    }

    fn setup_request(config: &DynamicValue, home_region: String) -> SetupLandingZoneRequest {
        SetupLandingZoneRequest {
            home_region,
            identity_store_email: helpers::optional_string(config, "identity_store_email"),
            organization_structure: Self::organization_structure(config),
            logging_configuration: LoggingConfiguration {
                logging_bucket_retention_days: helpers::optional_i64(config, "logging_bucket_retention_days"),
                access_logging_bucket_retention_days: helpers::optional_i64(
                    config,
                    "access_logging_bucket_retention_days",
                ),
            },
            cloud_trail_type: helpers::optional_bool(config, "cloud_trail_enabled"),
        }
    }

    async fn setup(ctx: &Context, client: &Client, request: &SetupLandingZoneRequest) -> Result<(), ApiError> {
        let api = client.rgc();
        tracing::info!("Setting up landing zone in {}", request.home_region);
        api.setup_landing_zone(request).await?;
        api.wait_for_landing_zone(ctx, helpers::operation_timeout(ctx, SETUP_TIMEOUT))
            .await?;
        Ok(())
    }

    fn apply_status(state: &mut DynamicValue, status: &Value) {
        helpers::set_string_from(state, "landing_zone_status", status, "landing_zone_status");
        helpers::set_i64_from(state, "percentage_complete", status, "percentage_complete");
        helpers::set_string_from(state, "deployed_version", status, "deployed_version");
    }

    fn apply_configuration(state: &mut DynamicValue, configuration: &Value) {
        helpers::set_string_from(state, "home_region", configuration, "home_region");
        helpers::set_i64_from(
            state,
            "logging_bucket_retention_days",
            configuration,
            "logging_configuration.logging_bucket_retention_days",
        );
        helpers::set_i64_from(
            state,
            "access_logging_bucket_retention_days",
            configuration,
            "logging_configuration.access_logging_bucket_retention_days",
        );
    }

    async fn read_landing_zone(client: &Client, mut state: DynamicValue) -> Result<Option<DynamicValue>, ApiError> {
        let api = client.rgc();
        let status = match api.get_landing_zone_status().await {
            Ok(status) => status,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        if crate::api::path_search::search_str("landing_zone_status", &status).is_none() {
            return Ok(None);
        }
        Self::apply_status(&mut state, &status);

        let configuration = api.get_landing_zone_configuration().await?;
        Self::apply_configuration(&mut state, &configuration);
        Ok(Some(state))
    }
}

#[async_trait]
impl Resource for RgcLandingZoneResource {
    fn type_name(&self) -> &str {
        "huaweicloud_rgc_landing_zone"
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
        ctx: Context,
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

        let home_region = match helpers::required_string(&request.config, "home_region") {
            Ok(region) => region,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let client = &provider_data.client;
        let setup_request = Self::setup_request(&request.config, home_region.clone());
        if let Err(e) = Self::setup(&ctx, client, &setup_request).await {
            diagnostics.push(helpers::api_error("set up", "landing zone", &e));
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        }

        let mut state = request.planned_state;
        helpers::set_string(&mut state, "id", home_region);
        match Self::read_landing_zone(client, state.clone()).await {
            Ok(new_state) => CreateResourceResponse {
                new_state: new_state.unwrap_or(state),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "landing zone", &e));
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

        match Self::read_landing_zone(&provider_data.client, request.current_state.clone()).await {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "landing zone", &e));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                }
            }
        }
    }

    async fn update(
        &self,
        ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(helpers::not_configured());
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        };

        let home_region = match helpers::required_string(&request.config, "home_region") {
            Ok(region) => region,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        let client = &provider_data.client;
        let setup_request = Self::setup_request(&request.config, home_region.clone());
        if let Err(e) = Self::setup(&ctx, client, &setup_request).await {
            diagnostics.push(helpers::api_error("update", "landing zone", &e));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        }

        let mut state = request.planned_state;
        helpers::set_string(&mut state, "id", home_region);
        match Self::read_landing_zone(client, state.clone()).await {
            Ok(new_state) => UpdateResourceResponse {
                new_state: new_state.unwrap_or(state),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "landing zone", &e));
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
        _request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        tracing::warn!("Landing zone removed from state only");
        DeleteResourceResponse {
            diagnostics: vec![Diagnostic::warning(
                "Landing zone not decommissioned",
                "The landing zone cannot be deleted through the API. It was removed from state \
                 but keeps running in the account.",
            )],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for RgcLandingZoneResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        ConfigureResourceResponse {
            diagnostics: helpers::configure_provider_data(&mut self.provider_data, request.provider_data, "resource"),
        }
    }
}
