//! SFS Turbo API: shares, directories, directory quotas and permission rules
//!
//! Share paths are scoped by project id, which is resolved lazily by the
//! client when the provider configuration does not carry one.

use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tfplug::Context;

use crate::api::common::{ApiQueryParams, Service};
use crate::api::path_search;
use crate::api::waiter::{RefreshResult, STATUS_DELETED};
use crate::api::{ApiError, Client};

pub const SHARE_PAGE_LIMIT: u32 = 200;

/// Phases of a share that are waited on, each tracked by one status field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareWait {
    Creation,
    Expansion,
    SecurityGroupChange,
}

impl ShareWait {
    fn field(&self) -> &'static str {
        match self {
            ShareWait::Creation => "status",
            ShareWait::Expansion | ShareWait::SecurityGroupChange => "sub_status",
        }
    }

    /// Right after an action the share may still report no sub status or
    /// the result of the previous action, so those count as pending too
    fn pending(&self) -> &'static [&'static str] {
        match self {
            ShareWait::Creation => &["100"],
            ShareWait::Expansion => &["", "121", "223"],
            ShareWait::SecurityGroupChange => &["", "123", "221"],
        }
    }

    /// Actions on an existing share take a moment to show up in its sub status
    fn settles_first(&self) -> bool {
        !matches!(self, ShareWait::Creation)
    }

    fn target(&self) -> &'static [&'static str] {
        match self {
            ShareWait::Creation => &["200"],
            ShareWait::Expansion => &["221"],
            ShareWait::SecurityGroupChange => &["223"],
        }
    }

    fn failed(&self) -> &'static [&'static str] {
        match self {
            ShareWait::Creation => &["303"],
            ShareWait::Expansion => &["232"],
            ShareWait::SecurityGroupChange => &["233"],
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ShareMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crypt_key_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateShareRequest {
    pub name: String,
    pub share_proto: String,
    pub share_type: String,
    pub size: i64,
    pub availability_zone: String,
    pub vpc_id: String,
    pub subnet_id: String,
    pub security_group_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enterprise_project_id: Option<String>,
    pub metadata: ShareMetadata,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DirRequest {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DirQuotaRequest {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inode: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PermRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_cidr: Option<String>,
    pub rw_type: String,
    pub user_type: String,
}

pub struct SfsTurboApi<'a> {
    client: &'a Client,
}

impl<'a> SfsTurboApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// `v1/{project_id}/sfs-turbo/shares[/{share_id}]`
    async fn shares_path(&self, share_id: Option<&str>) -> Result<String, ApiError> {
        let project_id = self.client.project_id().await?;
        Ok(match share_id {
            Some(id) => format!("v1/{}/sfs-turbo/shares/{}", project_id, id),
            None => format!("v1/{}/sfs-turbo/shares", project_id),
        })
    }

    /// `v1/{project_id}/sfs-turbos/{share_id}`, the detail and rule paths
    async fn turbo_path(&self, share_id: &str) -> Result<String, ApiError> {
        let project_id = self.client.project_id().await?;
        Ok(format!("v1/{}/sfs-turbos/{}", project_id, share_id))
    }

    /// Returns the new share id
    pub async fn create_share(&self, request: &CreateShareRequest) -> Result<String, ApiError> {
        let path = self.shares_path(None).await?;
        let body = self
            .client
            .post(Service::SfsTurbo, &path, &json!({ "share": request }))
            .await?;
        path_search::search_str("id", &body)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::MissingField("unable to find the share ID in the API response".to_string()))
    }

    pub async fn get_share(&self, share_id: &str) -> Result<Value, ApiError> {
        let path = self.turbo_path(share_id).await?;
        self.client.get(Service::SfsTurbo, &path).await
    }

    pub async fn list_shares(&self) -> Result<Vec<Value>, ApiError> {
        let project_id = self.client.project_id().await?;
        let path = format!("v1/{}/sfs-turbos/detail", project_id);
        self.client
            .list_all_by_offset(Service::SfsTurbo, &path, &ApiQueryParams::new(), "shares", SHARE_PAGE_LIMIT)
            .await
    }

    pub async fn extend_share(&self, share_id: &str, new_size: i64) -> Result<(), ApiError> {
        self.share_action(share_id, json!({"extend": {"new_size": new_size}}))
            .await
    }

    pub async fn change_security_group(&self, share_id: &str, security_group_id: &str) -> Result<(), ApiError> {
        self.share_action(
            share_id,
            json!({"change_security_group": {"security_group_id": security_group_id}}),
        )
        .await
    }

    async fn share_action(&self, share_id: &str, action: Value) -> Result<(), ApiError> {
        let path = format!("{}/action", self.shares_path(Some(share_id)).await?);
        self.client.post(Service::SfsTurbo, &path, &action).await?;
        Ok(())
    }

    pub async fn delete_share(&self, share_id: &str) -> Result<(), ApiError> {
        let path = self.shares_path(Some(share_id)).await?;
        self.client.delete(Service::SfsTurbo, &path).await?;
        Ok(())
    }

    /// Waits for the status field of `phase` to reach its target and
    /// returns the share detail read last
    pub async fn wait_for_share(
        &self,
        ctx: &Context,
        share_id: &str,
        phase: ShareWait,
        timeout: Duration,
    ) -> Result<Value, ApiError> {
        let path = self.turbo_path(share_id).await?;
        let mut conf = self.client.state_change(phase.pending(), phase.target(), timeout);
        if phase.settles_first() {
            conf = conf.with_delay(self.client.poll_interval());
        }
        conf.wait_for_state(ctx, || async {
            let body = self.client.get(Service::SfsTurbo, &path).await?;
            let status = path_search::search_str(phase.field(), &body).unwrap_or_default();
            if phase.failed().contains(&status.as_str()) {
                return Err(ApiError::OperationFailed {
                    message: format!("share {} reported {} {}", share_id, phase.field(), status),
                    status,
                });
            }
            Ok(RefreshResult::new(body, status))
        })
        .await
    }

    /// Waits until reading the share answers not found
    pub async fn wait_for_share_deleted(&self, ctx: &Context, share_id: &str, timeout: Duration) -> Result<(), ApiError> {
        let path = self.turbo_path(share_id).await?;
        self.client
            .state_change(&["100", "200", "300", "303", "800"], &[STATUS_DELETED], timeout)
            .wait_for_state(ctx, || async {
                match self.client.get(Service::SfsTurbo, &path).await {
                    Ok(body) => {
                        let status = path_search::search_str("status", &body).unwrap_or_default();
                        Ok(RefreshResult::new(body, status))
                    }
                    Err(e) if e.is_not_found() => Ok(RefreshResult::deleted()),
                    Err(e) => Err(e),
                }
            })
            .await?;
        Ok(())
    }

    fn fs_path(shares_path: &str, kind: &str) -> String {
        format!("{}/fs/{}", shares_path, kind)
    }

    pub async fn create_dir(&self, share_id: &str, request: &DirRequest) -> Result<(), ApiError> {
        let path = Self::fs_path(&self.shares_path(Some(share_id)).await?, "dir");
        self.client.post(Service::SfsTurbo, &path, request).await?;
        Ok(())
    }

    pub async fn get_dir(&self, share_id: &str, dir_path: &str) -> Result<Value, ApiError> {
        let path = Self::fs_path(&self.shares_path(Some(share_id)).await?, "dir");
        self.client
            .get_with_params(Service::SfsTurbo, &path, &ApiQueryParams::new().add("path", dir_path))
            .await
    }

    pub async fn delete_dir(&self, share_id: &str, dir_path: &str) -> Result<(), ApiError> {
        let path = Self::fs_path(&self.shares_path(Some(share_id)).await?, "dir");
        self.client
            .delete_with_body(Service::SfsTurbo, &path, &json!({"path": dir_path}))
            .await?;
        Ok(())
    }

    pub async fn create_dir_quota(&self, share_id: &str, request: &DirQuotaRequest) -> Result<(), ApiError> {
        let path = Self::fs_path(&self.shares_path(Some(share_id)).await?, "dir-quota");
        self.client.post(Service::SfsTurbo, &path, request).await?;
        Ok(())
    }

    pub async fn get_dir_quota(&self, share_id: &str, dir_path: &str) -> Result<Value, ApiError> {
        let path = Self::fs_path(&self.shares_path(Some(share_id)).await?, "dir-quota");
        self.client
            .get_with_params(Service::SfsTurbo, &path, &ApiQueryParams::new().add("path", dir_path))
            .await
    }

    pub async fn update_dir_quota(&self, share_id: &str, request: &DirQuotaRequest) -> Result<(), ApiError> {
        let path = Self::fs_path(&self.shares_path(Some(share_id)).await?, "dir-quota");
        self.client.put(Service::SfsTurbo, &path, request).await?;
        Ok(())
    }

    pub async fn delete_dir_quota(&self, share_id: &str, dir_path: &str) -> Result<(), ApiError> {
        let path = Self::fs_path(&self.shares_path(Some(share_id)).await?, "dir-quota");
        self.client
            .delete_with_body(Service::SfsTurbo, &path, &json!({"path": dir_path}))
            .await?;
        Ok(())
    }

    async fn perm_rules_path(&self, share_id: &str) -> Result<String, ApiError> {
        Ok(format!("{}/fs/perm-rules", self.turbo_path(share_id).await?))
    }

    /// Returns the id of the created rule
    pub async fn create_perm_rule(&self, share_id: &str, rule: &PermRule) -> Result<String, ApiError> {
        let path = self.perm_rules_path(share_id).await?;
        let body = self
            .client
            .post(Service::SfsTurbo, &path, &json!({ "rules": [rule] }))
            .await?;
        path_search::search_str("rules[0].id", &body)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::MissingField("unable to find the rule ID in the API response".to_string()))
    }

    pub async fn get_perm_rule(&self, share_id: &str, rule_id: &str) -> Result<Value, ApiError> {
        let path = format!("{}/{}", self.perm_rules_path(share_id).await?, rule_id);
        self.client.get(Service::SfsTurbo, &path).await
    }

    pub async fn update_perm_rule(&self, share_id: &str, rule_id: &str, rule: &PermRule) -> Result<(), ApiError> {
        let path = format!("{}/{}", self.perm_rules_path(share_id).await?, rule_id);
        self.client.put(Service::SfsTurbo, &path, rule).await?;
        Ok(())
    }

    pub async fn delete_perm_rule(&self, share_id: &str, rule_id: &str) -> Result<(), ApiError> {
        let path = format!("{}/{}", self.perm_rules_path(share_id).await?, rule_id);
        self.client.delete(Service::SfsTurbo, &path).await?;
        Ok(())
    }

    pub async fn list_perm_rules(&self, share_id: &str) -> Result<Vec<Value>, ApiError> {
        let path = self.perm_rules_path(share_id).await?;
        let body = self.client.get(Service::SfsTurbo, &path).await?;
        Ok(path_search::search_list("rules", &body))
    }
}
