use chrono::Utc;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

use super::common::{ApiErrorResponse, ApiQueryParams, Service};
use super::error::ApiError;
use super::path_search;
use super::pool::{ConnectionPoolConfig, ConnectionStats, RequestCounters};
use super::signer::Signer;

pub const DEFAULT_CLOUD: &str = "myhuaweicloud.com";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Upper bound accepted for `max_retries`
pub const MAX_RETRIES_LIMIT: u32 = 20;

/// Huawei Cloud API client shared by all resources and data sources.
/// Cloning is cheap; clones share the connection pool and the resolved
/// project id.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
    poll_interval: Duration,
}

struct ClientInner {
    http_client: reqwest::Client,
    signer: Signer,
    region: String,
    endpoints: HashMap<Service, Url>,
    retry_config: RetryConfig,
    project_id: OnceCell<String>,
    counters: RequestCounters,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 60,
        }
    }
}

impl RetryConfig {
    /// Exponential backoff before retry `attempt` (starting at 1), capped
    /// at `max_backoff_ms`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let ms = 2_u64
            .checked_pow(attempt.saturating_sub(1))
            .map_or(u64::MAX, |factor| self.initial_backoff_ms.saturating_mul(factor));
        Duration::from_millis(ms.min(self.max_backoff_ms))
    }
}

#[derive(Clone)]
pub struct ClientConfig {
    pub region: String,
    pub cloud: String,
    pub access_key: String,
    pub secret_key: String,
    pub security_token: Option<String>,
    pub project_id: Option<String>,
    /// Base URL overrides; services not listed use the default endpoint
    pub endpoints: HashMap<Service, String>,
    pub insecure: bool,
    pub retry: RetryConfig,
}

impl ClientConfig {
    pub fn new(region: &str, access_key: &str, secret_key: &str) -> Self {
        Self {
            region: region.to_string(),
            cloud: DEFAULT_CLOUD.to_string(),
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            security_token: None,
            project_id: None,
            endpoints: HashMap::new(),
            insecure: false,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_endpoint(mut self, service: Service, url: &str) -> Self {
        self.endpoints.insert(service, url.to_string());
        self
    }

    pub fn with_project_id(mut self, project_id: &str) -> Self {
        self.project_id = Some(project_id.to_string());
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let pool_config = ConnectionPoolConfig {
            request_timeout: Duration::from_secs(config.retry.timeout_seconds),
            ..Default::default()
        };
        let http_client = pool_config.build_client(config.insecure)?;

        let mut endpoints = HashMap::new();
        for service in Service::ALL {
            let raw = config
                .endpoints
                .get(&service)
                .cloned()
                .unwrap_or_else(|| service.default_endpoint(&config.region, &config.cloud));
            endpoints.insert(service, parse_endpoint(&raw)?);
        }

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                signer: Signer::new(
                    &config.access_key,
                    &config.secret_key,
                    config.security_token.as_deref(),
                ),
                region: config.region,
                endpoints,
                retry_config: config.retry,
                project_id: OnceCell::new_with(config.project_id.filter(|p| !p.is_empty())),
                counters: RequestCounters::default(),
            }),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Interval between status polls of asynchronous operations
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn region(&self) -> &str {
        &self.inner.region
    }

    pub fn endpoint(&self, service: Service) -> Option<&Url> {
        self.inner.endpoints.get(&service)
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        self.inner.counters.snapshot()
    }

    /// Project id from configuration, or looked up once through IAM by
    /// region name and cached for the lifetime of the client
    pub async fn project_id(&self) -> Result<String, ApiError> {
        self.inner
            .project_id
            .get_or_try_init(|| async {
                let region = self.inner.region.clone();
                let params = ApiQueryParams::new().add("name", &region);
                let body = self
                    .get_with_params(Service::Iam, "v3/projects", &params)
                    .await?;
                let project_id = path_search::search_str("projects[0].id", &body)
                    .ok_or_else(|| {
                        ApiError::MissingField(format!("no IAM project found for region {}", region))
                    })?;
                tracing::debug!("Resolved project id {} for region {}", project_id, region);
                Ok::<String, ApiError>(project_id)
            })
            .await
            .cloned()
    }

    /// Identity Center (SSO administration) operations
    pub fn identity_center(&self) -> crate::api::identitycenter::IdentityCenterApi<'_> {
        crate::api::identitycenter::IdentityCenterApi::new(self)
    }

    /// Identity store (users, groups, memberships) operations
    pub fn identity_store(&self) -> crate::api::identitycenter::store::IdentityStoreApi<'_> {
        crate::api::identitycenter::store::IdentityStoreApi::new(self)
    }

    /// SFS Turbo file system operations
    pub fn sfs_turbo(&self) -> crate::api::sfsturbo::SfsTurboApi<'_> {
        crate::api::sfsturbo::SfsTurboApi::new(self)
    }

    /// Resource Governance Center operations
    pub fn rgc(&self) -> crate::api::rgc::RgcApi<'_> {
        crate::api::rgc::RgcApi::new(self)
    }

    /// Execute a GET request with retry logic
    pub async fn get(&self, service: Service, path: &str) -> Result<Value, ApiError> {
        self.execute_with_retry::<()>(Method::GET, service, path, &ApiQueryParams::new(), None)
            .await
    }

    /// Execute a GET request with query parameters
    pub async fn get_with_params(
        &self,
        service: Service,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<Value, ApiError> {
        self.execute_with_retry::<()>(Method::GET, service, path, params, None)
            .await
    }

    /// Execute a POST request with a JSON body
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        service: Service,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        self.execute_with_retry(Method::POST, service, path, &ApiQueryParams::new(), Some(body))
            .await
    }

    /// Execute a POST request that carries no body
    pub async fn post_empty(&self, service: Service, path: &str) -> Result<Value, ApiError> {
        self.execute_with_retry::<()>(Method::POST, service, path, &ApiQueryParams::new(), None)
            .await
    }

    /// Execute a PUT request with a JSON body
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        service: Service,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        self.execute_with_retry(Method::PUT, service, path, &ApiQueryParams::new(), Some(body))
            .await
    }

    /// Execute a DELETE request
    pub async fn delete(&self, service: Service, path: &str) -> Result<Value, ApiError> {
        self.execute_with_retry::<()>(Method::DELETE, service, path, &ApiQueryParams::new(), None)
            .await
    }

    /// Execute a DELETE request that identifies its target in the body
    pub async fn delete_with_body<B: Serialize + ?Sized>(
        &self,
        service: Service,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        self.execute_with_retry(Method::DELETE, service, path, &ApiQueryParams::new(), Some(body))
            .await
    }

    fn build_url(
        &self,
        service: Service,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<Url, ApiError> {
        let base = self
            .inner
            .endpoints
            .get(&service)
            .ok_or_else(|| ApiError::InvalidEndpoint(service.to_string()))?;
        let mut url = base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidEndpoint(format!("{}{}: {}", base, path, e)))?;

        if !params.is_empty() {
            let query = params.to_query_string();
            url.set_query(Some(query.trim_start_matches('?')));
        }
        Ok(url)
    }

    /// Sign and send a request, retrying rate limits and connection
    /// failures with exponential backoff. Server errors and timeouts may
    /// have been acted on, so only idempotent methods retry those. The
    /// signature is recomputed for every attempt since it covers the
    /// request date.
    async fn execute_with_retry<B: Serialize + ?Sized>(
        &self,
        method: Method,
        service: Service,
        path: &str,
        params: &ApiQueryParams,
        body: Option<&B>,
    ) -> Result<Value, ApiError> {
        let url = self.build_url(service, path, params)?;
        let payload = match body {
            Some(body) => serde_json::to_vec(body)
                .map_err(|e| ApiError::ParseError(format!("Failed to encode request body: {}", e)))?,
            None => Vec::new(),
        };

        let retry = &self.inner.retry_config;
        let max_retries = retry.max_retries.min(MAX_RETRIES_LIMIT);
        let idempotent = method.is_idempotent();
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= max_retries {
            if attempt > 0 {
                let backoff = retry.backoff(attempt);
                tracing::warn!(
                    "Retrying {} {} after {}ms (attempt {})",
                    method,
                    url,
                    backoff.as_millis(),
                    attempt
                );
                tokio::time::sleep(backoff).await;
            }

            tracing::debug!("{} request to: {}", method, url);

            let mut request = self.inner.http_client.request(method.clone(), url.clone());
            for (name, value) in self
                .inner
                .signer
                .sign(method.as_str(), &url, &payload, Utc::now())
            {
                request = request.header(name, value);
            }
            if !payload.is_empty() {
                request = request.body(payload.clone());
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        self.inner.counters.record(true);
                        return self.parse_success_response(response).await;
                    }

                    self.inner.counters.record(false);

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() && idempotent {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(self.handle_error_response(response).await);
                    }
                }
                Err(e) => {
                    self.inner.counters.record(false);

                    if e.is_timeout() {
                        if !idempotent {
                            return Err(ApiError::Timeout(retry.timeout_seconds));
                        }
                        last_error = Some(ApiError::Timeout(retry.timeout_seconds));
                    } else if e.is_connect() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Empty bodies become `Value::Null`
    async fn parse_success_response(&self, response: reqwest::Response) -> Result<Value, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    async fn handle_error_response(&self, response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let (error_code, message) = serde_json::from_str::<ApiErrorResponse>(&text)
            .ok()
            .and_then(ApiErrorResponse::into_parts)
            .unwrap_or_else(|| (String::new(), text.clone()));

        if status == 401 {
            return ApiError::AuthError(message);
        }

        ApiError::ApiError {
            status,
            error_code,
            message,
        }
    }
}

/// Parses an endpoint and makes its path end in `/` so relative API paths
/// append to it instead of replacing the last segment
fn parse_endpoint(raw: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(raw).map_err(|e| ApiError::InvalidEndpoint(format!("{}: {}", raw, e)))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[test]
    fn retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.max_backoff_ms, 10000);
        assert_eq!(config.timeout_seconds, 60);
    }

    #[test]
    fn default_endpoints_follow_region_and_cloud() {
        let client = Client::new(ClientConfig::new("cn-north-4", "ak", "sk")).unwrap();
        assert_eq!(
            client.endpoint(Service::Rgc).unwrap().as_str(),
            "https://rgc.cn-north-4.myhuaweicloud.com/"
        );
        assert_eq!(
            client.endpoint(Service::IdentityStore).unwrap().as_str(),
            "https://identitystore.cn-north-4.myhuaweicloud.com/"
        );
        assert_eq!(client.poll_interval(), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn endpoint_overrides_keep_their_path_prefix() {
        let config = ClientConfig::new("cn-north-4", "ak", "sk")
            .with_endpoint(Service::SfsTurbo, "http://127.0.0.1:9000/prefix");
        let client = Client::new(config).unwrap();

        let url = client
            .build_url(
                Service::SfsTurbo,
                "v1/p1/sfs-turbos/s1",
                &ApiQueryParams::new().add("limit", 10),
            )
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/prefix/v1/p1/sfs-turbos/s1?limit=10");
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let config = ClientConfig::new("cn-north-4", "ak", "sk").with_endpoint(Service::Rgc, "not a url");
        assert!(matches!(Client::new(config), Err(ApiError::InvalidEndpoint(_))));
    }

    #[tokio::test]
    async fn requests_are_signed() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/instances")
            .match_query(Matcher::UrlEncoded("limit".into(), "200".into()))
            .match_header(
                "authorization",
                Matcher::Regex(
                    r"^SDK-HMAC-SHA256 Access=test-ak, SignedHeaders=content-type;host;x-sdk-date, Signature=[0-9a-f]{64}$".to_string(),
                ),
            )
            .match_header("x-sdk-date", Matcher::Regex(r"^\d{8}T\d{6}Z$".to_string()))
            .with_body(r#"{"instances":[]}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let body = client
            .get_with_params(
                Service::IdentityCenter,
                "v1/instances",
                &ApiQueryParams::new().add("limit", 200),
            )
            .await
            .unwrap();

        assert_eq!(body, json!({"instances": []}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_success_body_is_null() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/v1/instances/i-1/permission-sets/ps-1")
            .with_status(204)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let body = client
            .delete(Service::IdentityCenter, "v1/instances/i-1/permission-sets/ps-1")
            .await
            .unwrap();
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn vendor_error_bodies_are_parsed() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/governance/operation/op-1")
            .with_status(400)
            .with_body(r#"{"error_code":"RGC.0025","error_msg":"operation does not exist"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .get(Service::Rgc, "v1/governance/operation/op-1")
            .await
            .unwrap_err();

        match &err {
            ApiError::ApiError {
                status,
                error_code,
                message,
            } => {
                assert_eq!(*status, 400);
                assert_eq!(error_code, "RGC.0025");
                assert_eq!(message, "operation does not exist");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/instances")
            .with_status(401)
            .with_body(r#"{"error":{"code":"APIGW.0301","message":"Incorrect IAM authentication information"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        match client.get(Service::IdentityCenter, "v1/instances").await {
            Err(ApiError::AuthError(message)) => {
                assert_eq!(message, "Incorrect IAM authentication information")
            }
            other => panic!("expected auth error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("GET", "/v1/landing-zone/status")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let config = ClientConfig::new("cn-north-4", "ak", "sk")
            .with_endpoint(Service::Rgc, &server.url())
            .with_retry(RetryConfig {
                max_retries: 2,
                initial_backoff_ms: 1,
                max_backoff_ms: 5,
                timeout_seconds: 5,
            });
        let client = Client::new(config).unwrap();

        let result = client.get(Service::Rgc, "v1/landing-zone/status").await;
        assert!(matches!(result, Err(ApiError::ServiceUnavailable)));
        failing.assert_async().await;

        let stats = client.connection_stats();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.failed_requests, 3);
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff(1), Duration::from_millis(100));
        assert_eq!(retry.backoff(3), Duration::from_millis(400));
        assert_eq!(retry.backoff(70), Duration::from_millis(10000));
        assert_eq!(retry.backoff(u32::MAX), Duration::from_millis(10000));
    }

    #[tokio::test]
    async fn retries_are_capped() {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("GET", "/v1/landing-zone/status")
            .with_status(503)
            .expect(MAX_RETRIES_LIMIT as usize + 1)
            .create_async()
            .await;

        let config = ClientConfig::new("cn-north-4", "ak", "sk")
            .with_endpoint(Service::Rgc, &server.url())
            .with_retry(RetryConfig {
                max_retries: 70,
                initial_backoff_ms: 1,
                max_backoff_ms: 1,
                timeout_seconds: 5,
            });
        let client = Client::new(config).unwrap();

        let result = client.get(Service::Rgc, "v1/landing-zone/status").await;
        assert!(matches!(result, Err(ApiError::ServiceUnavailable)));
        failing.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_on_post_are_not_retried() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/v1/managed-organization/managed-accounts")
            .with_status(502)
            .with_body(r#"{"error_code":"APIGW.0201","error_msg":"bad gateway"}"#)
            .expect(1)
            .create_async()
            .await;

        let config = ClientConfig::new("cn-north-4", "ak", "sk")
            .with_endpoint(Service::Rgc, &server.url())
            .with_retry(RetryConfig {
                max_retries: 3,
                initial_backoff_ms: 1,
                max_backoff_ms: 1,
                timeout_seconds: 5,
            });
        let client = Client::new(config).unwrap();

        let result = client
            .post(Service::Rgc, "v1/managed-organization/managed-accounts", &json!({"account_name": "a"}))
            .await;
        assert!(matches!(result, Err(ApiError::ApiError { status: 502, .. })));
        create.assert_async().await;
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/landing-zone/setup")
            .with_status(400)
            .with_body(r#"{"error_code":"RGC.0001","error_msg":"invalid home region"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result = client
            .post(Service::Rgc, "v1/landing-zone/setup", &json!({"home_region": "x"}))
            .await;
        assert!(matches!(result, Err(ApiError::ApiError { status: 400, .. })));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn post_sends_json_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/best-practice/detect")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({"force": true})))
            .with_body("{}")
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client
            .post(Service::Rgc, "v1/best-practice/detect", &json!({"force": true}))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn project_id_is_resolved_once_through_iam() {
        let mut server = Server::new_async().await;
        let iam = server
            .mock("GET", "/v3/projects")
            .match_query(Matcher::UrlEncoded("name".into(), "cn-north-4".into()))
            .with_body(r#"{"projects":[{"id":"0970dd7a1300f5672ff2c003c60ae115","name":"cn-north-4"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let config = ClientConfig::new("cn-north-4", "ak", "sk").with_endpoint(Service::Iam, &server.url());
        let client = Client::new(config).unwrap();

        assert_eq!(client.project_id().await.unwrap(), "0970dd7a1300f5672ff2c003c60ae115");
        let clone = client.clone();
        assert_eq!(clone.project_id().await.unwrap(), "0970dd7a1300f5672ff2c003c60ae115");
        iam.assert_async().await;
    }

    #[tokio::test]
    async fn configured_project_id_skips_iam() {
        let config = ClientConfig::new("cn-north-4", "ak", "sk")
            .with_endpoint(Service::Iam, "http://127.0.0.1:1")
            .with_project_id("proj-1");
        let client = Client::new(config).unwrap();
        assert_eq!(client.project_id().await.unwrap(), "proj-1");
    }

    #[tokio::test]
    async fn missing_iam_project_is_an_error() {
        let mut server = Server::new_async().await;
        let _iam = server
            .mock("GET", "/v3/projects")
            .match_query(Matcher::Any)
            .with_body(r#"{"projects":[]}"#)
            .create_async()
            .await;

        let config = ClientConfig::new("cn-north-4", "ak", "sk").with_endpoint(Service::Iam, &server.url());
        let client = Client::new(config).unwrap();
        assert!(matches!(client.project_id().await, Err(ApiError::MissingField(_))));
    }
}
