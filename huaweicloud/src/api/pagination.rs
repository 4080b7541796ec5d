//! Collection listing across pages
//!
//! Most control planes page with an opaque marker returned in
//! `page_info.next_marker`; SFS Turbo pages with `limit`/`offset`. Both
//! helpers accumulate every page into one list.

use serde_json::Value;

use super::client::Client;
use super::common::{ApiQueryParams, Service};
use super::error::ApiError;
use super::path_search;

pub const DEFAULT_PAGE_LIMIT: u32 = 200;
pub const NEXT_MARKER_PATH: &str = "page_info.next_marker";

#[derive(Debug, Clone, Default)]
pub struct PaginationParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub marker: Option<String>,
}

impl PaginationParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_marker(mut self, marker: Option<String>) -> Self {
        self.marker = marker;
        self
    }

    /// Appends the paging parameters after the caller's own filters
    pub fn apply(&self, params: &ApiQueryParams) -> ApiQueryParams {
        params
            .clone()
            .add_optional("limit", self.limit)
            .add_optional("offset", self.offset)
            .add_optional("marker", self.marker.as_deref())
    }
}

impl Client {
    /// Follows `page_info.next_marker` until it is absent or empty and
    /// returns the items found at `items_path` on every page
    pub async fn list_all_by_marker(
        &self,
        service: Service,
        path: &str,
        params: &ApiQueryParams,
        items_path: &str,
    ) -> Result<Vec<Value>, ApiError> {
        let mut items = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let query = PaginationParams::new()
                .with_limit(DEFAULT_PAGE_LIMIT)
                .with_marker(marker.take())
                .apply(params);
            let body = self.get_with_params(service, path, &query).await?;

            let page = path_search::search_list(items_path, &body);
            tracing::debug!("Fetched {} items from {} (total {})", page.len(), path, items.len() + page.len());
            items.extend(page);

            marker = path_search::search_str(NEXT_MARKER_PATH, &body).filter(|m| !m.is_empty());
            if marker.is_none() {
                break;
            }
        }

        Ok(items)
    }

    /// Pages with `limit`/`offset` until a page comes back shorter than
    /// `limit`
    pub async fn list_all_by_offset(
        &self,
        service: Service,
        path: &str,
        params: &ApiQueryParams,
        items_path: &str,
        limit: u32,
    ) -> Result<Vec<Value>, ApiError> {
        let limit = limit.max(1);
        let mut items = Vec::new();
        let mut offset = 0u32;

        loop {
            let query = PaginationParams::new()
                .with_limit(limit)
                .with_offset(offset)
                .apply(params);
            let body = self.get_with_params(service, path, &query).await?;

            let page = path_search::search_list(items_path, &body);
            let count = page.len() as u32;
            tracing::debug!("Fetched {} items from {} at offset {}", count, path, offset);
            items.extend(page);

            if count < limit {
                break;
            }
            offset += count;
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    #[test]
    fn pagination_params_follow_filters() {
        let params = ApiQueryParams::new().add("user_name", "alice");
        let query = PaginationParams::new()
            .with_limit(200)
            .with_marker(Some("m1".to_string()))
            .apply(&params)
            .to_query_string();

        assert_eq!(query, "?user_name=alice&limit=200&marker=m1");
    }

    #[tokio::test]
    async fn marker_pagination_follows_next_marker() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/v1/managed-organization/managed-accounts")
            .match_query(Matcher::Exact("limit=200".into()))
            .with_body(r#"{"managed_accounts":[{"account_id":"a1"},{"account_id":"a2"}],"page_info":{"next_marker":"a2","current_count":2}}"#)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/v1/managed-organization/managed-accounts")
            .match_query(Matcher::Exact("limit=200&marker=a2".into()))
            .with_body(r#"{"managed_accounts":[{"account_id":"a3"}],"page_info":{"current_count":1}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let items = client
            .list_all_by_marker(
                Service::Rgc,
                "v1/managed-organization/managed-accounts",
                &ApiQueryParams::new(),
                "managed_accounts",
            )
            .await
            .unwrap();

        let ids: Vec<&str> = items.iter().filter_map(|i| i["account_id"].as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn marker_pagination_stops_on_empty_marker() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/instances")
            .match_query(Matcher::Any)
            .with_body(r#"{"instances":[{"instance_id":"i1"}],"page_info":{"next_marker":""}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let items = client
            .list_all_by_marker(Service::IdentityCenter, "v1/instances", &ApiQueryParams::new(), "instances")
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn offset_pagination_stops_on_short_page() {
        let mut server = Server::new_async().await;
        let full = server
            .mock("GET", "/v1/proj-1/sfs-turbos/detail")
            .match_query(Matcher::Exact("limit=2&offset=0".into()))
            .with_body(r#"{"shares":[{"id":"s1"},{"id":"s2"}],"count":3}"#)
            .create_async()
            .await;
        let short = server
            .mock("GET", "/v1/proj-1/sfs-turbos/detail")
            .match_query(Matcher::Exact("limit=2&offset=2".into()))
            .with_body(r#"{"shares":[{"id":"s3"}],"count":3}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let items = client
            .list_all_by_offset(
                Service::SfsTurbo,
                "v1/proj-1/sfs-turbos/detail",
                &ApiQueryParams::new(),
                "shares",
                2,
            )
            .await
            .unwrap();

        assert_eq!(items.len(), 3);
        full.assert_async().await;
        short.assert_async().await;
    }
}
