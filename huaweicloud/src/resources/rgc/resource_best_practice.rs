//! RGC best practice detection. Creating the resource runs a detection and
//! records its score; there is nothing to delete on the API side.

use async_trait::async_trait;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};

use crate::api::{ApiError, Client};
use crate::helpers;

const DETECT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Default)]
pub struct RgcBestPracticeResource {
    provider_data: Option<crate::HuaweiCloudProviderData>,
}

impl RgcBestPracticeResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Runs an RGC best practice detection")
            .id_attribute("Random ID of the detection run")
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("message", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("total_score", AttributeType::Number)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("detect_time", AttributeType::String)
                    .computed()
                    .build(),
            )
            .build()
    }

    async fn read_result(client: &Client, mut state: DynamicValue) -> Result<DynamicValue, ApiError> {
        let api = client.rgc();
        let status = api.get_best_practice_status().await?;
        helpers::set_string_from(&mut state, "status", &status, "status");
        helpers::set_string_from(&mut state, "message", &status, "message");

        let overview = api.get_best_practice_overview().await?;
        helpers::set_f64_from(&mut state, "total_score", &overview, "total_score");
        helpers::set_timestamp_from(&mut state, "detect_time", &overview, "detect_time");
        Ok(state)
    }
}

#[async_trait]
impl Resource for RgcBestPracticeResource {
    fn type_name(&self) -> &str {
        "huaweicloud_rgc_best_practice"
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

        let client = &provider_data.client;
        let api = client.rgc();
        let detected = async {
            api.detect_best_practice().await?;
            api.wait_for_best_practice(&ctx, helpers::operation_timeout(&ctx, DETECT_TIMEOUT))
                .await
        };
        if let Err(e) = detected.await {
            diagnostics.push(helpers::api_error("run", "best practice detection", &e));
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        }

        let mut state = request.planned_state;
        helpers::set_string(&mut state, "id", helpers::random_id());
        match Self::read_result(client, state.clone()).await {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "best practice result", &e));
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

        match Self::read_result(&provider_data.client, request.current_state.clone()).await {
            Ok(new_state) => ReadResourceResponse {
                new_state: Some(new_state),
                diagnostics,
            },
            Err(e) if e.is_not_found() => ReadResourceResponse {
                new_state: None,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(helpers::api_error("read", "best practice result", &e));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                }
            }
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.prior_state,
            diagnostics: vec![],
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        _request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        DeleteResourceResponse {
            diagnostics: vec![Diagnostic::warning(
                "Best practice result removed from state",
                "Detection results cannot be deleted and stay visible in the RGC console.",
            )],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for RgcBestPracticeResource {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use crate::HuaweiCloudProviderData;
    use mockito::Server;
    use serde_json::json;
    use tfplug::types::AttributePath;

    #[tokio::test]
    async fn create_detects_and_records_score() {
        let mut server = Server::new_async().await;
        let detect = server
            .mock("POST", "/v1/best-practice/detect")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let _status = server
            .mock("GET", "/v1/best-practice/status")
            .with_body(r#"{"status":"SUCCEEDED","message":""}"#)
            .create_async()
            .await;
        let _overview = server
            .mock("GET", "/v1/best-practice/overview")
            .with_body(r#"{"total_score":87.5,"detect_time":1709280000000}"#)
            .create_async()
            .await;

        let resource = RgcBestPracticeResource {
            provider_data: Some(HuaweiCloudProviderData::new(create_test_client(&server.url()))),
        };
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "huaweicloud_rgc_best_practice".to_string(),
                    planned_state: DynamicValue::from_json(json!({})),
                    config: DynamicValue::from_json(json!({})),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.new_state;
        assert_eq!(state.get_number(&AttributePath::new("total_score")).unwrap(), 87.5);
        assert_eq!(
            state.get_string(&AttributePath::new("detect_time")).unwrap(),
            "2024-03-01T08:00:00Z"
        );
        assert!(!state.get_string(&AttributePath::new("id")).unwrap().is_empty());
        detect.assert_async().await;
    }
}
