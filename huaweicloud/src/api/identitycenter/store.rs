//! Identity store API: users, groups and group memberships

use serde::Serialize;
use serde_json::{json, Value};

use super::required_id;
use crate::api::common::{ApiQueryParams, Service};
use crate::api::{ApiError, Client};

#[derive(Debug, Clone, Serialize)]
pub struct UserName {
    pub family_name: String,
    pub given_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserEmail {
    pub email: String,
    pub primary: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateUserRequest {
    pub user_name: String,
    pub password_mode: String,
    pub name: UserName,
    pub display_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<UserEmail>,
}

/// One attribute replacement in a user update
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserOperation {
    pub attribute_path: String,
    pub attribute_value: String,
}

impl UserOperation {
    pub fn new(attribute_path: &str, attribute_value: &str) -> Self {
        Self {
            attribute_path: attribute_path.to_string(),
            attribute_value: attribute_value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateUserRequest {
    pub operations: Vec<UserOperation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub struct IdentityStoreApi<'a> {
    client: &'a Client,
}

impl<'a> IdentityStoreApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn users_path(store_id: &str) -> String {
        format!("v1/identity-stores/{}/users", store_id)
    }

    fn groups_path(store_id: &str) -> String {
        format!("v1/identity-stores/{}/groups", store_id)
    }

    fn memberships_path(store_id: &str) -> String {
        format!("v1/identity-stores/{}/group-memberships", store_id)
    }

    /// Returns the new user id
    pub async fn create_user(&self, store_id: &str, request: &CreateUserRequest) -> Result<String, ApiError> {
        let body = self
            .client
            .post(Service::IdentityStore, &Self::users_path(store_id), request)
            .await?;
        required_id(&body, "user_id", "user ID")
    }

    pub async fn get_user(&self, store_id: &str, user_id: &str) -> Result<Value, ApiError> {
        let path = format!("{}/{}", Self::users_path(store_id), user_id);
        self.client.get(Service::IdentityStore, &path).await
    }

    pub async fn update_user(&self, store_id: &str, user_id: &str, request: &UpdateUserRequest) -> Result<(), ApiError> {
        let path = format!("{}/{}", Self::users_path(store_id), user_id);
        self.client.put(Service::IdentityStore, &path, request).await?;
        Ok(())
    }

    pub async fn delete_user(&self, store_id: &str, user_id: &str) -> Result<(), ApiError> {
        let path = format!("{}/{}", Self::users_path(store_id), user_id);
        self.client.delete(Service::IdentityStore, &path).await?;
        Ok(())
    }

    /// Users of the store, optionally narrowed server-side by exact user name
    pub async fn list_users(&self, store_id: &str, user_name: Option<&str>) -> Result<Vec<Value>, ApiError> {
        let params = ApiQueryParams::new().add_optional("user_name", user_name);
        self.client
            .list_all_by_marker(Service::IdentityStore, &Self::users_path(store_id), &params, "users")
            .await
    }

    /// Returns the new group id
    pub async fn create_group(&self, store_id: &str, request: &GroupRequest) -> Result<String, ApiError> {
        let body = self
            .client
            .post(Service::IdentityStore, &Self::groups_path(store_id), request)
            .await?;
        required_id(&body, "group_id", "group ID")
    }

    pub async fn get_group(&self, store_id: &str, group_id: &str) -> Result<Value, ApiError> {
        let path = format!("{}/{}", Self::groups_path(store_id), group_id);
        self.client.get(Service::IdentityStore, &path).await
    }

    pub async fn update_group(&self, store_id: &str, group_id: &str, request: &GroupRequest) -> Result<(), ApiError> {
        let path = format!("{}/{}", Self::groups_path(store_id), group_id);
        self.client.put(Service::IdentityStore, &path, request).await?;
        Ok(())
    }

    pub async fn delete_group(&self, store_id: &str, group_id: &str) -> Result<(), ApiError> {
        let path = format!("{}/{}", Self::groups_path(store_id), group_id);
        self.client.delete(Service::IdentityStore, &path).await?;
        Ok(())
    }

    pub async fn list_groups(&self, store_id: &str, name: Option<&str>) -> Result<Vec<Value>, ApiError> {
        let params = ApiQueryParams::new().add_optional("display_name", name);
        self.client
            .list_all_by_marker(Service::IdentityStore, &Self::groups_path(store_id), &params, "groups")
            .await
    }

    /// Adds a user to a group and returns the membership id
    pub async fn create_group_membership(&self, store_id: &str, group_id: &str, user_id: &str) -> Result<String, ApiError> {
        let request = json!({
            "group_id": group_id,
            "member_id": {"user_id": user_id},
        });
        let body = self
            .client
            .post(Service::IdentityStore, &Self::memberships_path(store_id), &request)
            .await?;
        required_id(&body, "membership_id", "membership ID")
    }

    pub async fn get_group_membership(&self, store_id: &str, membership_id: &str) -> Result<Value, ApiError> {
        let path = format!("{}/{}", Self::memberships_path(store_id), membership_id);
        self.client.get(Service::IdentityStore, &path).await
    }

    pub async fn delete_group_membership(&self, store_id: &str, membership_id: &str) -> Result<(), ApiError> {
        let path = format!("{}/{}", Self::memberships_path(store_id), membership_id);
        self.client.delete(Service::IdentityStore, &path).await?;
        Ok(())
    }
}
