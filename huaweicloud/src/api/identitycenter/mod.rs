pub mod store;

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

#[derive(Debug, Clone, Serialize)]
pub struct CreatePermissionSetRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub session_duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay_state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdatePermissionSetRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub session_duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay_state: Option<String>,
}

/// Body of both the create and the delete call of an account assignment
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AccountAssignmentRequest {
    pub permission_set_id: String,
    pub principal_id: String,
    pub principal_type: String,
    pub target_id: String,
    pub target_type: String,
}

/// The two asynchronous account assignment operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperation {
    Creation,
    Deletion,
}

impl AssignmentOperation {
    fn action(&self) -> &'static str {
        match self {
            AssignmentOperation::Creation => "create",
            AssignmentOperation::Deletion => "delete",
        }
    }

    fn status_segment(&self) -> &'static str {
        match self {
            AssignmentOperation::Creation => "creation-status",
            AssignmentOperation::Deletion => "deletion-status",
        }
    }

    fn status_key(&self) -> &'static str {
        match self {
            AssignmentOperation::Creation => "account_assignment_creation_status",
            AssignmentOperation::Deletion => "account_assignment_deletion_status",
        }
    }
}

/// Reads `<key>.status` of an Identity Center status body; `FAILED`
/// becomes an error carrying `<key>.failure_reason`
fn status_refresh(body: Value, key: &str) -> Result<RefreshResult, ApiError> {
    let status = path_search::search_str(&format!("{}.status", key), &body).unwrap_or_default();
    if status == STATUS_FAILED {
        let message = path_search::search_str(&format!("{}.failure_reason", key), &body)
            .unwrap_or_else(|| "no failure reason reported".to_string());
        return Err(ApiError::OperationFailed { status, message });
    }
    Ok(RefreshResult::new(body, status))
}

fn required_id(body: &Value, expression: &str, what: &str) -> Result<String, ApiError> {
    path_search::search_str(expression, body)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::MissingField(format!("unable to find the {} in the API response", what)))
}

/// Identity Center instance operations: permission sets, account
/// assignments and managed policy attachments
pub struct IdentityCenterApi<'a> {
    client: &'a Client,
}

impl<'a> IdentityCenterApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// All instances of the account (normally exactly one)
    pub async fn list_instances(&self) -> Result<Vec<Value>, ApiError> {
        self.client
            .list_all_by_marker(Service::IdentityCenter, "v1/instances", &ApiQueryParams::new(), "instances")
            .await
    }

    /// Returns the new permission set id
    pub async fn create_permission_set(
        &self,
        instance_id: &str,
        request: &CreatePermissionSetRequest,
    ) -> Result<String, ApiError> {
        let path = format!("v1/instances/{}/permission-sets", instance_id);
        let body = self.client.post(Service::IdentityCenter, &path, request).await?;
        required_id(&body, "permission_set.permission_set_id", "permission set ID")
    }

    /// The `permission_set` object
    pub async fn get_permission_set(&self, instance_id: &str, permission_set_id: &str) -> Result<Value, ApiError> {
        let path = format!("v1/instances/{}/permission-sets/{}", instance_id, permission_set_id);
        let body = self.client.get(Service::IdentityCenter, &path).await?;
        Ok(path_search::search("permission_set", &body))
    }

    pub async fn update_permission_set(
        &self,
        instance_id: &str,
        permission_set_id: &str,
        request: &UpdatePermissionSetRequest,
    ) -> Result<(), ApiError> {
        let path = format!("v1/instances/{}/permission-sets/{}", instance_id, permission_set_id);
        self.client.put(Service::IdentityCenter, &path, request).await?;
        Ok(())
    }

    pub async fn delete_permission_set(&self, instance_id: &str, permission_set_id: &str) -> Result<(), ApiError> {
        let path = format!("v1/instances/{}/permission-sets/{}", instance_id, permission_set_id);
        self.client.delete(Service::IdentityCenter, &path).await?;
        Ok(())
    }

    pub async fn list_permission_sets(&self, instance_id: &str) -> Result<Vec<Value>, ApiError> {
        let path = format!("v1/instances/{}/permission-sets", instance_id);
        self.client
            .list_all_by_marker(Service::IdentityCenter, &path, &ApiQueryParams::new(), "permission_sets")
            .await
    }

    /// Pushes the permission set to every account it is provisioned in and
    /// returns the provisioning request id
    pub async fn provision_permission_set(&self, instance_id: &str, permission_set_id: &str) -> Result<String, ApiError> {
        let path = format!(
            "v1/instances/{}/permission-sets/{}/provision",
            instance_id, permission_set_id
        );
        let body = self
            .client
            .post(
                Service::IdentityCenter,
                &path,
                &json!({"target_type": "ALL_PROVISIONED_ACCOUNTS"}),
            )
            .await?;
        required_id(&body, "permission_set_provisioning_status.request_id", "provisioning request ID")
    }

    pub async fn wait_for_provisioning(
        &self,
        ctx: &Context,
        instance_id: &str,
        request_id: &str,
        timeout: Duration,
    ) -> Result<Value, ApiError> {
        let path = format!(
            "v1/instances/{}/permission-sets/provisioning-status/{}",
            instance_id, request_id
        );
        self.client
            .state_change(&[STATUS_IN_PROGRESS], &[STATUS_SUCCEEDED], timeout)
            .wait_for_state(ctx, || async {
                let body = self.client.get(Service::IdentityCenter, &path).await?;
                status_refresh(body, "permission_set_provisioning_status")
            })
            .await
    }

    /// Starts an assignment creation or deletion and returns its request id
    pub async fn start_account_assignment(
        &self,
        instance_id: &str,
        operation: AssignmentOperation,
        request: &AccountAssignmentRequest,
    ) -> Result<String, ApiError> {
        let path = format!("v1/instances/{}/account-assignments/{}", instance_id, operation.action());
        let body = self.client.post(Service::IdentityCenter, &path, request).await?;
        required_id(&body, &format!("{}.request_id", operation.status_key()), "assignment request ID")
    }

    pub async fn wait_for_account_assignment(
        &self,
        ctx: &Context,
        instance_id: &str,
        operation: AssignmentOperation,
        request_id: &str,
        timeout: Duration,
    ) -> Result<Value, ApiError> {
        let path = format!(
            "v1/instances/{}/account-assignments/{}/{}",
            instance_id,
            operation.status_segment(),
            request_id
        );
        self.client
            .state_change(&[STATUS_IN_PROGRESS], &[STATUS_SUCCEEDED], timeout)
            .wait_for_state(ctx, || async {
                let body = self.client.get(Service::IdentityCenter, &path).await?;
                status_refresh(body, operation.status_key())
            })
            .await
    }

    /// Assignments of one permission set within one account
    pub async fn list_account_assignments(
        &self,
        instance_id: &str,
        account_id: &str,
        permission_set_id: &str,
    ) -> Result<Vec<Value>, ApiError> {
        let path = format!("v1/instances/{}/account-assignments", instance_id);
        let params = ApiQueryParams::new()
            .add("account_id", account_id)
            .add("permission_set_id", permission_set_id);
        self.client
            .list_all_by_marker(Service::IdentityCenter, &path, &params, "account_assignments")
            .await
    }

    pub async fn attach_managed_policy(
        &self,
        instance_id: &str,
        permission_set_id: &str,
        policy_id: &str,
    ) -> Result<(), ApiError> {
        self.managed_policy_action(instance_id, permission_set_id, "attach", policy_id)
            .await
    }

    pub async fn detach_managed_policy(
        &self,
        instance_id: &str,
        permission_set_id: &str,
        policy_id: &str,
    ) -> Result<(), ApiError> {
        self.managed_policy_action(instance_id, permission_set_id, "detach", policy_id)
            .await
    }

    async fn managed_policy_action(
        &self,
        instance_id: &str,
        permission_set_id: &str,
        action: &str,
        policy_id: &str,
    ) -> Result<(), ApiError> {
        let path = format!(
            "v1/instances/{}/permission-sets/{}/managed-policies/{}",
            instance_id, permission_set_id, action
        );
        self.client
            .post(Service::IdentityCenter, &path, &json!({"policy_id": policy_id}))
            .await?;
        Ok(())
    }

    /// `{policy_id, policy_name}` objects attached to a permission set
    pub async fn list_managed_policies(&self, instance_id: &str, permission_set_id: &str) -> Result<Vec<Value>, ApiError> {
        let path = format!(
            "v1/instances/{}/permission-sets/{}/managed-policies",
            instance_id, permission_set_id
        );
        self.client
            .list_all_by_marker(
                Service::IdentityCenter,
                &path,
                &ApiQueryParams::new(),
                "attached_managed_policies",
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    #[test]
    fn failed_status_carries_failure_reason() {
        let body = json!({"permission_set_provisioning_status": {"status": "FAILED", "failure_reason": "account suspended"}});
        match status_refresh(body, "permission_set_provisioning_status") {
            Err(ApiError::OperationFailed { status, message }) => {
                assert_eq!(status, "FAILED");
                assert_eq!(message, "account suspended");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn create_permission_set_returns_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/instances/ins-1/permission-sets")
            .match_body(Matcher::Json(json!({"name": "admin", "session_duration": "PT1H"})))
            .with_body(r#"{"permission_set":{"permission_set_id":"ps-1","name":"admin"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let id = client
            .identity_center()
            .create_permission_set(
                "ins-1",
                &CreatePermissionSetRequest {
                    name: "admin".to_string(),
                    description: None,
                    session_duration: "PT1H".to_string(),
                    relay_state: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(id, "ps-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn account_assignment_creation_is_polled() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/v1/instances/ins-1/account-assignments/create")
            .with_body(r#"{"account_assignment_creation_status":{"request_id":"req-1","status":"IN_PROGRESS"}}"#)
            .create_async()
            .await;
        let status = server
            .mock("GET", "/v1/instances/ins-1/account-assignments/creation-status/req-1")
            .with_body(r#"{"account_assignment_creation_status":{"request_id":"req-1","status":"SUCCEEDED"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let api = client.identity_center();
        let request = AccountAssignmentRequest {
            permission_set_id: "ps-1".to_string(),
            principal_id: "u-1".to_string(),
            principal_type: "USER".to_string(),
            target_id: "acc-1".to_string(),
            target_type: "ACCOUNT".to_string(),
        };
        let request_id = api
            .start_account_assignment("ins-1", AssignmentOperation::Creation, &request)
            .await
            .unwrap();
        api.wait_for_account_assignment(
            &Context::new(),
            "ins-1",
            AssignmentOperation::Creation,
            &request_id,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        create.assert_async().await;
        status.assert_async().await;
    }

    #[tokio::test]
    async fn provisioning_failure_is_reported() {
        let mut server = Server::new_async().await;
        let _status = server
            .mock("GET", "/v1/instances/ins-1/permission-sets/provisioning-status/req-9")
            .with_body(r#"{"permission_set_provisioning_status":{"status":"FAILED","failure_reason":"quota exceeded"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .identity_center()
            .wait_for_provisioning(&Context::new(), "ins-1", "req-9", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn managed_policy_attach_posts_policy_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/instances/ins-1/permission-sets/ps-1/managed-policies/attach")
            .match_body(Matcher::Json(json!({"policy_id": "pol-1"})))
            .with_body("{}")
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client
            .identity_center()
            .attach_managed_policy("ins-1", "ps-1", "pol-1")
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
