pub mod api;
pub mod config;
pub mod data_sources;
pub mod helpers;
pub mod logging;
pub mod provider_data;
pub mod resources;

pub use provider_data::HuaweiCloudProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::Diagnostic;

use crate::config::ProviderConfig;

macro_rules! factories {
    ($trait:path; $($name:literal => $ty:ty),* $(,)?) => {{
        let mut map = HashMap::new();
        $(
            let factory: Box<dyn Fn() -> Box<dyn $trait> + Send + Sync> =
                Box::new(|| Box::new(<$ty>::new()) as Box<dyn $trait>);
            map.insert($name.to_string(), factory);
        )*
        map
    }};
}

#[derive(Default)]
pub struct HuaweiCloudProvider {
    provider_data: Option<HuaweiCloudProviderData>,
}

impl HuaweiCloudProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_configured(&self) -> bool {
        self.provider_data.is_some()
    }
}

#[async_trait]
impl Provider for HuaweiCloudProvider {
    fn type_name(&self) -> &str {
        "huaweicloud"
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Huawei Cloud Identity Center, SFS Turbo and RGC")
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .description("Region of the project, falls back to HW_REGION_NAME")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("access_key", AttributeType::String)
                    .description("Access key ID, falls back to HW_ACCESS_KEY")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("secret_key", AttributeType::String)
                    .description("Secret access key, falls back to HW_SECRET_KEY")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("security_token", AttributeType::String)
                    .description("Token for temporary credentials")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project ID; looked up from the region when omitted")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cloud", AttributeType::String)
                    .description("Endpoint suffix, defaults to myhuaweicloud.com")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("insecure", AttributeType::Bool)
                    .description("Skip TLS certificate verification")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_retries", AttributeType::Number)
                    .description("Retries for throttled or failed requests")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("endpoints", AttributeType::map_of(AttributeType::String))
                    .description("Per-service base URL overrides keyed by service name")
                    .optional()
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        logging::init();
        tracing::info!(terraform_version = %request.terraform_version, "configuring provider");

        let config = match ProviderConfig::from_dynamic(&request.config) {
            Ok(config) => config,
            Err(diagnostics) => {
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        };

        match api::Client::new(config.client_config()) {
            Ok(client) => {
                tracing::debug!(region = %config.region, "API client ready");
                let data = HuaweiCloudProviderData::new(client);
                self.provider_data = Some(data.clone());
                ConfigureProviderResponse {
                    diagnostics: vec![],
                    provider_data: Some(Arc::new(data)),
                }
            }
            Err(e) => ConfigureProviderResponse {
                diagnostics: vec![Diagnostic::error(
                    "Failed to create API client",
                    e.to_string(),
                )],
                provider_data: None,
            },
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        use crate::resources::*;

        factories! {
            ResourceWithConfigure;
            "huaweicloud_identitycenter_user" => IdentityCenterUserResource,
            "huaweicloud_identitycenter_group" => IdentityCenterGroupResource,
            "huaweicloud_identitycenter_group_membership" => IdentityCenterGroupMembershipResource,
            "huaweicloud_identitycenter_permission_set" => IdentityCenterPermissionSetResource,
            "huaweicloud_identitycenter_system_policy_attachment" => IdentityCenterSystemPolicyAttachmentResource,
            "huaweicloud_identitycenter_account_assignment" => IdentityCenterAccountAssignmentResource,
            "huaweicloud_sfs_turbo" => SfsTurboResource,
            "huaweicloud_sfs_turbo_dir" => SfsTurboDirResource,
            "huaweicloud_sfs_turbo_dir_quota" => SfsTurboDirQuotaResource,
            "huaweicloud_sfs_turbo_perm_rule" => SfsTurboPermRuleResource,
            "huaweicloud_rgc_landing_zone" => RgcLandingZoneResource,
            "huaweicloud_rgc_account" => RgcAccountResource,
            "huaweicloud_rgc_organizational_unit" => RgcOrganizationalUnitResource,
            "huaweicloud_rgc_control" => RgcControlResource,
            "huaweicloud_rgc_best_practice" => RgcBestPracticeResource,
        }
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        use crate::data_sources::*;

        factories! {
            DataSourceWithConfigure;
            "huaweicloud_identitycenter_instance" => IdentityCenterInstanceDataSource,
            "huaweicloud_identitycenter_users" => IdentityCenterUsersDataSource,
            "huaweicloud_identitycenter_groups" => IdentityCenterGroupsDataSource,
            "huaweicloud_identitycenter_permission_sets" => IdentityCenterPermissionSetsDataSource,
            "huaweicloud_sfs_turbos" => SfsTurbosDataSource,
            "huaweicloud_sfs_turbo_perm_rules" => SfsTurboPermRulesDataSource,
            "huaweicloud_rgc_accounts" => RgcAccountsDataSource,
            "huaweicloud_rgc_organizational_units" => RgcOrganizationalUnitsDataSource,
            "huaweicloud_rgc_controls" => RgcControlsDataSource,
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use tfplug::data_source::{DataSource, DataSourceSchemaRequest};
    use tfplug::resource::{Resource, ResourceSchemaRequest};
    use tfplug::types::DynamicValue;

    fn clear_env() {
        for name in [
            config::ENV_REGION,
            config::ENV_ACCESS_KEY,
            config::ENV_SECRET_KEY,
            config::ENV_PROJECT_ID,
        ] {
            std::env::remove_var(name);
        }
    }

    fn configure_request(config: serde_json::Value) -> ConfigureProviderRequest {
        ConfigureProviderRequest {
            terraform_version: "1.9.0".to_string(),
            config: DynamicValue::from_json(config),
        }
    }

    #[tokio::test]
    #[serial]
    async fn provider_configures_successfully_with_env_vars() {
        clear_env();
        std::env::set_var(config::ENV_REGION, "cn-north-4");
        std::env::set_var(config::ENV_ACCESS_KEY, "ak");
        std::env::set_var(config::ENV_SECRET_KEY, "sk");

        let mut provider = HuaweiCloudProvider::new();
        let response = provider
            .configure(Context::new(), configure_request(json!({"project_id": "proj-1"})))
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert!(provider.is_configured());
        let data = response.provider_data.unwrap();
        assert!(data.downcast_ref::<HuaweiCloudProviderData>().is_some());

        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn provider_configure_requires_credentials() {
        clear_env();

        let mut provider = HuaweiCloudProvider::new();
        let response = provider
            .configure(Context::new(), configure_request(json!({"region": "cn-north-4"})))
            .await;

        assert!(response.provider_data.is_none());
        assert!(!provider.is_configured());
        assert!(response.diagnostics[0].summary.contains("access_key is required"));
        assert!(response.diagnostics[1].summary.contains("secret_key is required"));
    }

    #[tokio::test]
    #[serial]
    async fn provider_rejects_malformed_endpoint() {
        clear_env();

        let mut provider = HuaweiCloudProvider::new();
        let response = provider
            .configure(
                Context::new(),
                configure_request(json!({
                    "region": "cn-north-4",
                    "access_key": "ak",
                    "secret_key": "sk",
                    "endpoints": {"rgc": "not a url"}
                })),
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Failed to create API client");
        assert!(response.provider_data.is_none());
    }

    #[tokio::test]
    async fn factories_cover_every_type() {
        let provider = HuaweiCloudProvider::new();
        let resources = provider.resources();
        let data_sources = provider.data_sources();

        assert_eq!(resources.len(), 15);
        assert_eq!(data_sources.len(), 9);

        for (name, factory) in &resources {
            let resource = factory();
            assert_eq!(resource.type_name(), name);
            let schema = resource.schema(Context::new(), ResourceSchemaRequest).await;
            assert!(schema.schema.attribute("id").is_some(), "{} has no id", name);
        }
        for (name, factory) in &data_sources {
            let data_source = factory();
            assert_eq!(data_source.type_name(), name);
            let schema = data_source.schema(Context::new(), DataSourceSchemaRequest).await;
            assert!(schema.diagnostics.is_empty());
        }
    }

    #[tokio::test]
    async fn provider_schema_marks_secrets_sensitive() {
        let provider = HuaweiCloudProvider::new();
        let response = provider.schema(Context::new(), ProviderSchemaRequest).await;

        for name in ["access_key", "secret_key", "security_token"] {
            assert!(response.schema.attribute(name).unwrap().sensitive, "{}", name);
        }
        assert!(!response.schema.attribute("region").unwrap().sensitive);
    }
}
