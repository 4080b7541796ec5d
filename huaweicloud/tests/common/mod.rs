//! Shared setup: a provider configured against a mock server

#![allow(dead_code)]

use huaweicloud::HuaweiCloudProvider;
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::{ConfigureDataSourceRequest, DataSourceWithConfigure};
use tfplug::provider::{ConfigureProviderRequest, Provider};
use tfplug::resource::{ConfigureResourceRequest, ResourceWithConfigure};
use tfplug::types::DynamicValue;

pub const PROJECT_ID: &str = "proj-9";

pub type ProviderData = Option<Arc<dyn Any + Send + Sync>>;

/// Every service endpoint points at `url`
pub async fn configured_provider(url: &str) -> (HuaweiCloudProvider, ProviderData) {
    let mut provider = HuaweiCloudProvider::new();
    let response = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config: DynamicValue::from_json(json!({
                    "region": "cn-north-4",
                    "access_key": "test-ak",
                    "secret_key": "test-sk",
                    "project_id": PROJECT_ID,
                    "max_retries": 0,
                    "endpoints": {
                        "identitycenter": url,
                        "identitystore": url,
                        "sfs-turbo": url,
                        "rgc": url,
                        "iam": url
                    }
                })),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    (provider, response.provider_data)
}

pub async fn resource(
    provider: &HuaweiCloudProvider,
    provider_data: &ProviderData,
    type_name: &str,
) -> Box<dyn ResourceWithConfigure> {
    let factories = provider.resources();
    let factory = factories.get(type_name).unwrap();
    let mut resource = factory();
    let response = resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: provider_data.clone(),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    resource
}

pub async fn data_source(
    provider: &HuaweiCloudProvider,
    provider_data: &ProviderData,
    type_name: &str,
) -> Box<dyn DataSourceWithConfigure> {
    let factories = provider.data_sources();
    let factory = factories.get(type_name).unwrap();
    let mut data_source = factory();
    let response = data_source
        .configure(
            Context::new(),
            ConfigureDataSourceRequest {
                provider_data: provider_data.clone(),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    data_source
}
