//! Test helpers for the Huawei Cloud API

use std::time::Duration;

use super::client::{Client, ClientConfig, RetryConfig};
use super::common::Service;

pub const TEST_PROJECT_ID: &str = "proj-1";

/// A client whose every service points at `url`, with a fixed project id,
/// no retries and a short poll interval
pub fn create_test_client(url: &str) -> Client {
    let mut config = ClientConfig::new("cn-north-4", "test-ak", "test-sk")
        .with_project_id(TEST_PROJECT_ID)
        .with_retry(RetryConfig {
            max_retries: 0,
            initial_backoff_ms: 1,
            max_backoff_ms: 1,
            timeout_seconds: 5,
        });
    for service in Service::ALL {
        config = config.with_endpoint(service, url);
    }
    Client::new(config)
        .expect("test client")
        .with_poll_interval(Duration::from_millis(10))
}
