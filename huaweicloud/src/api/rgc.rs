//! Resource Governance Center API
//!
//! Most mutating calls are asynchronous: they return an `operation_id`
//! that is polled through `v1/governance/operation/{id}`. Landing zone
//! setup and best-practice detection report progress on their own status
//! endpoints instead.

use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tfplug::Context;

use crate::api::common::{ApiQueryParams, Service};
use crate::api::path_search;
use crate::api::waiter::RefreshResult;
use crate::api::{ApiError, Client};

pub const STATUS_IN_PROGRESS: &str = "IN_PROGRESS";
pub const STATUS_SUCCEEDED: &str = "SUCCEEDED";
pub const STATUS_FAILED: &str = "FAILED";

const ACCOUNTS_PATH: &str = "v1/managed-organization/managed-accounts";
const OUS_PATH: &str = "v1/managed-organization/managed-organizational-units";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrganizationStructureItem {
    pub organizational_unit_name: String,
    pub organizational_unit_type: String,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct LoggingConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging_bucket_retention_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_logging_bucket_retention_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SetupLandingZoneRequest {
    pub home_region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_store_email: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub organization_structure: Vec<OrganizationStructureItem>,
    pub logging_configuration: LoggingConfiguration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_trail_type: Option<bool>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateAccountRequest {
    pub account_name: String,
    pub account_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_store_user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_store_email: Option<String>,
    pub parent_organizational_unit_id: String,
    pub parent_organizational_unit_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateOrganizationalUnitRequest {
    pub organizational_unit_name: String,
    pub parent_organizational_unit_id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ControlParameter {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ControlRequest {
    pub identifier: String,
    pub target_identifier: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ControlParameter>,
}

/// Maps a status field to a refresh result. `FAILED` is an error carrying
/// the body's `message`.
fn status_refresh(body: Value, status_field: &str) -> Result<RefreshResult, ApiError> {
    let status = path_search::search_str(status_field, &body).unwrap_or_default();
    if status == STATUS_FAILED {
        let message = path_search::search_str("message", &body)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "no message reported".to_string());
        return Err(ApiError::OperationFailed { status, message });
    }
    Ok(RefreshResult::new(body, status))
}

fn operation_id(body: &Value) -> Result<String, ApiError> {
    path_search::search_str("operation_id", body)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::MissingField("unable to find the operation ID in the API response".to_string()))
}

pub struct RgcApi<'a> {
    client: &'a Client,
}

impl<'a> RgcApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get_operation(&self, operation_id: &str) -> Result<Value, ApiError> {
        let path = format!("v1/governance/operation/{}", operation_id);
        self.client.get(Service::Rgc, &path).await
    }

    pub async fn wait_for_operation(&self, ctx: &Context, operation_id: &str, timeout: Duration) -> Result<Value, ApiError> {
        tracing::debug!("Waiting for RGC operation {}", operation_id);
        self.client
            .state_change(&[STATUS_IN_PROGRESS], &[STATUS_SUCCEEDED], timeout)
            .wait_for_state(ctx, || async {
                let body = self.get_operation(operation_id).await?;
                status_refresh(body, "status")
            })
            .await
    }

    pub async fn setup_landing_zone(&self, request: &SetupLandingZoneRequest) -> Result<Value, ApiError> {
        self.client
            .post(Service::Rgc, "v1/landing-zone/setup", request)
            .await
    }

    pub async fn get_landing_zone_status(&self) -> Result<Value, ApiError> {
        self.client.get(Service::Rgc, "v1/landing-zone/status").await
    }

    pub async fn wait_for_landing_zone(&self, ctx: &Context, timeout: Duration) -> Result<Value, ApiError> {
        self.client
            .state_change(&[STATUS_IN_PROGRESS], &[STATUS_SUCCEEDED], timeout)
            .wait_for_state(ctx, || async {
                let body = self.get_landing_zone_status().await?;
                status_refresh(body, "landing_zone_status")
            })
            .await
    }

    pub async fn get_landing_zone_configuration(&self) -> Result<Value, ApiError> {
        self.client
            .get(Service::Rgc, "v1/landing-zone/configuration")
            .await
    }

    /// Starts account creation and returns the operation id
    pub async fn create_account(&self, request: &CreateAccountRequest) -> Result<String, ApiError> {
        let body = self.client.post(Service::Rgc, ACCOUNTS_PATH, request).await?;
        operation_id(&body)
    }

    pub async fn get_account(&self, account_id: &str) -> Result<Value, ApiError> {
        let path = format!("{}/{}", ACCOUNTS_PATH, account_id);
        self.client.get(Service::Rgc, &path).await
    }

    pub async fn list_accounts(&self) -> Result<Vec<Value>, ApiError> {
        self.client
            .list_all_by_marker(Service::Rgc, ACCOUNTS_PATH, &ApiQueryParams::new(), "managed_accounts")
            .await
    }

    /// Starts unenrolling an account from governance; returns the operation id
    pub async fn unenroll_account(&self, account_id: &str) -> Result<String, ApiError> {
        let path = format!("{}/{}/unenroll", ACCOUNTS_PATH, account_id);
        let body = self.client.post_empty(Service::Rgc, &path).await?;
        operation_id(&body)
    }

    /// Returns the raw response; it carries `operation_id` and, depending
    /// on the API version, `organizational_unit_id`
    pub async fn create_organizational_unit(&self, request: &CreateOrganizationalUnitRequest) -> Result<Value, ApiError> {
        let body = self.client.post(Service::Rgc, OUS_PATH, request).await?;
        operation_id(&body)?;
        Ok(body)
    }

    pub async fn get_organizational_unit(&self, ou_id: &str) -> Result<Value, ApiError> {
        let path = format!("{}/{}", OUS_PATH, ou_id);
        self.client.get(Service::Rgc, &path).await
    }

    pub async fn list_organizational_units(&self) -> Result<Vec<Value>, ApiError> {
        self.client
            .list_all_by_marker(
                Service::Rgc,
                OUS_PATH,
                &ApiQueryParams::new(),
                "managed_organizational_units",
            )
            .await
    }

    /// Returns the operation id of the deletion
    pub async fn delete_organizational_unit(&self, ou_id: &str) -> Result<String, ApiError> {
        let path = format!("{}/{}", OUS_PATH, ou_id);
        let body = self.client.delete(Service::Rgc, &path).await?;
        operation_id(&body)
    }

    pub async fn enable_control(&self, request: &ControlRequest) -> Result<String, ApiError> {
        let body = self
            .client
            .post(Service::Rgc, "v1/governance/controls/enable", request)
            .await?;
        operation_id(&body)
    }

    pub async fn disable_control(&self, identifier: &str, target_identifier: &str) -> Result<String, ApiError> {
        let body = self
            .client
            .post(
                Service::Rgc,
                "v1/governance/controls/disable",
                &json!({"identifier": identifier, "target_identifier": target_identifier}),
            )
            .await?;
        operation_id(&body)
    }

    /// Controls enabled on an organizational unit
    pub async fn list_enabled_controls(&self, target_identifier: &str) -> Result<Vec<Value>, ApiError> {
        let path = format!(
            "v1/governance/managed-organizational-units/{}/controls",
            target_identifier
        );
        self.client
            .list_all_by_marker(Service::Rgc, &path, &ApiQueryParams::new(), "control_summaries")
            .await
    }

    /// The control catalog
    pub async fn list_controls(&self) -> Result<Vec<Value>, ApiError> {
        self.client
            .list_all_by_marker(Service::Rgc, "v1/governance/controls", &ApiQueryParams::new(), "controls")
            .await
    }

    pub async fn detect_best_practice(&self) -> Result<(), ApiError> {
        self.client
            .post_empty(Service::Rgc, "v1/best-practice/detect")
            .await?;
        Ok(())
    }

    pub async fn get_best_practice_status(&self) -> Result<Value, ApiError> {
        self.client.get(Service::Rgc, "v1/best-practice/status").await
    }

    pub async fn wait_for_best_practice(&self, ctx: &Context, timeout: Duration) -> Result<Value, ApiError> {
        self.client
            .state_change(&[STATUS_IN_PROGRESS], &[STATUS_SUCCEEDED], timeout)
            .wait_for_state(ctx, || async {
                let body = self.get_best_practice_status().await?;
                status_refresh(body, "status")
            })
            .await
    }

    pub async fn get_best_practice_overview(&self) -> Result<Value, ApiError> {
        self.client.get(Service::Rgc, "v1/best-practice/overview").await
    }
}
