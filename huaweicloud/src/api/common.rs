//! Common types and utilities for the Huawei Cloud REST APIs

use serde::Deserialize;
use std::fmt;

/// Control-plane services reached by this provider. The name is both the
/// key of the `endpoints` override map and the host prefix of the default
/// endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    IdentityCenter,
    IdentityStore,
    SfsTurbo,
    Rgc,
    Iam,
}

impl Service {
    pub const ALL: [Service; 5] = [
        Service::IdentityCenter,
        Service::IdentityStore,
        Service::SfsTurbo,
        Service::Rgc,
        Service::Iam,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Service::IdentityCenter => "identitycenter",
            Service::IdentityStore => "identitystore",
            Service::SfsTurbo => "sfs-turbo",
            Service::Rgc => "rgc",
            Service::Iam => "iam",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// `https://<service>.<region>.<cloud>`
    pub fn default_endpoint(&self, region: &str, cloud: &str) -> String {
        format!("https://{}.{}.{}", self.name(), region, cloud)
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Vendor error bodies come in two shapes:
/// `{"error_code": "...", "error_msg": "..."}` and
/// `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error_code: Option<String>,
    pub error_msg: Option<String>,
    pub error: Option<NestedError>,
}

#[derive(Debug, Deserialize)]
pub struct NestedError {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ApiErrorResponse {
    /// (code, message) from whichever shape the body used
    pub fn into_parts(self) -> Option<(String, String)> {
        if let Some(code) = self.error_code {
            return Some((code, self.error_msg.unwrap_or_default()));
        }
        let nested = self.error?;
        Some((
            nested.code.unwrap_or_default(),
            nested.message.unwrap_or_default(),
        ))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}
