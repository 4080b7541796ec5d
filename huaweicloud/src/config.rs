//! Provider configuration
//!
//! Every attribute may be omitted from the provider block and taken from
//! its environment variable instead. Values in the block win.

use std::collections::HashMap;
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::client::DEFAULT_CLOUD;
use crate::api::{ClientConfig, RetryConfig, Service, MAX_RETRIES_LIMIT};

pub const ENV_REGION: &str = "HW_REGION_NAME";
pub const ENV_ACCESS_KEY: &str = "HW_ACCESS_KEY";
pub const ENV_SECRET_KEY: &str = "HW_SECRET_KEY";
pub const ENV_SECURITY_TOKEN: &str = "HW_SECURITY_TOKEN";
pub const ENV_PROJECT_ID: &str = "HW_PROJECT_ID";
pub const ENV_CLOUD: &str = "HW_CLOUD";
pub const ENV_INSECURE: &str = "HW_INSECURE";
pub const ENV_MAX_RETRIES: &str = "HW_MAX_RETRIES";

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub security_token: Option<String>,
    pub project_id: Option<String>,
    pub cloud: String,
    pub insecure: bool,
    pub max_retries: u32,
    pub endpoints: HashMap<Service, String>,
}

impl ProviderConfig {
    /// Resolves the provider block against the environment. All problems
    /// are reported together.
    pub fn from_dynamic(config: &DynamicValue) -> Result<Self, Vec<Diagnostic>> {
        let mut diagnostics = vec![];

        let region = required(config, "region", ENV_REGION, &mut diagnostics);
        let access_key = required(config, "access_key", ENV_ACCESS_KEY, &mut diagnostics);
        let secret_key = required(config, "secret_key", ENV_SECRET_KEY, &mut diagnostics);
        let security_token = string_or_env(config, "security_token", ENV_SECURITY_TOKEN);
        let project_id = string_or_env(config, "project_id", ENV_PROJECT_ID);
        let cloud = string_or_env(config, "cloud", ENV_CLOUD).unwrap_or_else(|| DEFAULT_CLOUD.to_string());

        let insecure = match config.get_bool(&AttributePath::new("insecure")) {
            Ok(value) => value,
            Err(_) => match std::env::var(ENV_INSECURE) {
                Ok(raw) => raw.trim().parse::<bool>().unwrap_or_else(|_| {
                    diagnostics.push(Diagnostic::error(
                        "Invalid insecure value",
                        format!("{} must be true or false, got '{}'", ENV_INSECURE, raw),
                    ));
                    false
                }),
                Err(_) => false,
            },
        };

        let default_retries = RetryConfig::default().max_retries;
        let max_retries = match config.get_i64(&AttributePath::new("max_retries")) {
            Ok(value) => match u32::try_from(value).ok().filter(|v| *v <= MAX_RETRIES_LIMIT) {
                Some(value) => value,
                None => {
                    diagnostics.push(
                        Diagnostic::error(
                            "Invalid max_retries",
                            format!("max_retries must be between 0 and {}, got {}", MAX_RETRIES_LIMIT, value),
                        )
                        .with_attribute(AttributePath::new("max_retries")),
                    );
                    default_retries
                }
            },
            Err(_) => match std::env::var(ENV_MAX_RETRIES) {
                Ok(raw) => match raw.trim().parse::<u32>().ok().filter(|v| *v <= MAX_RETRIES_LIMIT) {
                    Some(value) => value,
                    None => {
                        diagnostics.push(Diagnostic::error(
                            "Invalid max_retries",
                            format!(
                                "{} must be an integer between 0 and {}, got '{}'",
                                ENV_MAX_RETRIES, MAX_RETRIES_LIMIT, raw
                            ),
                        ));
                        default_retries
                    }
                },
                Err(_) => default_retries,
            },
        };

        let mut endpoints = HashMap::new();
        if let Ok(map) = config.get_map(&AttributePath::new("endpoints")) {
            for (name, value) in map {
                let path = AttributePath::new("endpoints").key(&name);
                match (Service::from_name(&name), value.as_str()) {
                    (Some(service), Some(url)) if !url.is_empty() => {
                        endpoints.insert(service, url.to_string());
                    }
                    (None, _) => diagnostics.push(
                        Diagnostic::error(
                            "Unknown endpoint service",
                            format!(
                                "'{}' is not a supported service, expected one of: {}",
                                name,
                                Service::ALL.map(|s| s.name()).join(", ")
                            ),
                        )
                        .with_attribute(path),
                    ),
                    (Some(_), _) => diagnostics.push(
                        Diagnostic::error("Invalid endpoint", format!("endpoint for '{}' must be a URL", name))
                            .with_attribute(path),
                    ),
                }
            }
        }

        match (region, access_key, secret_key) {
            (Some(region), Some(access_key), Some(secret_key)) if diagnostics.is_empty() => Ok(Self {
                region,
                access_key,
                secret_key,
                security_token,
                project_id,
                cloud,
                insecure,
                max_retries,
                endpoints,
            }),
            _ => Err(diagnostics),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.region, &self.access_key, &self.secret_key).with_retry(RetryConfig {
            max_retries: self.max_retries,
            ..RetryConfig::default()
        });
        config.cloud = self.cloud.clone();
        config.security_token = self.security_token.clone();
        config.project_id = self.project_id.clone();
        config.insecure = self.insecure;
        for (service, url) in &self.endpoints {
            config = config.with_endpoint(*service, url);
        }
        config
    }
}

fn string_or_env(config: &DynamicValue, name: &str, env: &str) -> Option<String> {
    config
        .get_string(&AttributePath::new(name))
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var(env).ok().filter(|v| !v.is_empty()))
}

fn required(config: &DynamicValue, name: &str, env: &str, diagnostics: &mut Vec<Diagnostic>) -> Option<String> {
    let value = string_or_env(config, name, env);
    if value.is_none() {
        diagnostics.push(
            Diagnostic::error(
                format!("{} is required (set in provider config or {} env var)", name, env),
                format!("The provider cannot call Huawei Cloud without '{}'", name),
            )
            .with_attribute(AttributePath::new(name)),
        );
    }
    value
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    const ALL_ENV: [&str; 8] = [
        ENV_REGION,
        ENV_ACCESS_KEY,
        ENV_SECRET_KEY,
        ENV_SECURITY_TOKEN,
        ENV_PROJECT_ID,
        ENV_CLOUD,
        ENV_INSECURE,
        ENV_MAX_RETRIES,
    ];

    fn clear_env() {
        for name in ALL_ENV {
            std::env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn config_values_take_precedence_over_env() {
        clear_env();
        std::env::set_var(ENV_REGION, "cn-south-1");
        std::env::set_var(ENV_ACCESS_KEY, "env-ak");
        std::env::set_var(ENV_SECRET_KEY, "env-sk");

        let config = ProviderConfig::from_dynamic(&DynamicValue::from_json(json!({
            "region": "cn-north-4",
            "access_key": "cfg-ak"
        })))
        .unwrap();

        assert_eq!(config.region, "cn-north-4");
        assert_eq!(config.access_key, "cfg-ak");
        assert_eq!(config.secret_key, "env-sk");
        assert_eq!(config.cloud, DEFAULT_CLOUD);
        assert_eq!(config.max_retries, 5);
        assert!(!config.insecure);

        clear_env();
    }

    #[test]
    #[serial]
    fn missing_credentials_are_all_reported() {
        clear_env();

        let errors = ProviderConfig::from_dynamic(&DynamicValue::empty()).unwrap_err();
        let summaries: Vec<&str> = errors.iter().map(|d| d.summary.as_str()).collect();

        assert_eq!(errors.len(), 3);
        assert!(summaries[0].contains("region is required"));
        assert!(summaries[1].contains("access_key is required"));
        assert!(summaries[2].contains("secret_key is required"));
    }

    #[test]
    #[serial]
    fn env_flags_are_parsed() {
        clear_env();
        std::env::set_var(ENV_INSECURE, "true");
        std::env::set_var(ENV_MAX_RETRIES, "2");
        std::env::set_var(ENV_PROJECT_ID, "proj-9");

        let config = ProviderConfig::from_dynamic(&DynamicValue::from_json(json!({
            "region": "cn-north-4",
            "access_key": "ak",
            "secret_key": "sk"
        })))
        .unwrap();

        assert!(config.insecure);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.project_id.as_deref(), Some("proj-9"));

        std::env::set_var(ENV_MAX_RETRIES, "many");
        let errors = ProviderConfig::from_dynamic(&DynamicValue::from_json(json!({
            "region": "cn-north-4",
            "access_key": "ak",
            "secret_key": "sk"
        })))
        .unwrap_err();
        assert_eq!(errors[0].summary, "Invalid max_retries");

        std::env::set_var(ENV_MAX_RETRIES, "70");
        let errors = ProviderConfig::from_dynamic(&DynamicValue::from_json(json!({
            "region": "cn-north-4",
            "access_key": "ak",
            "secret_key": "sk"
        })))
        .unwrap_err();
        assert!(errors[0].detail.contains("between 0 and 20"), "{:?}", errors);

        clear_env();
    }

    #[test]
    #[serial]
    fn max_retries_outside_range_is_rejected() {
        clear_env();

        for value in [json!(-1), json!(21), json!(5_000_000_000i64)] {
            let errors = ProviderConfig::from_dynamic(&DynamicValue::from_json(json!({
                "region": "cn-north-4",
                "access_key": "ak",
                "secret_key": "sk",
                "max_retries": value
            })))
            .unwrap_err();
            assert_eq!(errors[0].summary, "Invalid max_retries");
        }
    }

    #[test]
    #[serial]
    fn endpoint_overrides_map_to_services() {
        clear_env();

        let config = ProviderConfig::from_dynamic(&DynamicValue::from_json(json!({
            "region": "cn-north-4",
            "access_key": "ak",
            "secret_key": "sk",
            "endpoints": {"sfs-turbo": "http://127.0.0.1:9000", "rgc": "http://127.0.0.1:9001"}
        })))
        .unwrap();

        assert_eq!(
            config.endpoints.get(&Service::SfsTurbo).map(String::as_str),
            Some("http://127.0.0.1:9000")
        );
        let client_config = config.client_config();
        assert_eq!(client_config.endpoints.len(), 2);
        assert_eq!(client_config.retry.max_retries, 5);
    }

    #[test]
    #[serial]
    fn unknown_endpoint_service_is_rejected() {
        clear_env();

        let errors = ProviderConfig::from_dynamic(&DynamicValue::from_json(json!({
            "region": "cn-north-4",
            "access_key": "ak",
            "secret_key": "sk",
            "endpoints": {"ecs": "http://127.0.0.1:9000"}
        })))
        .unwrap_err();

        assert_eq!(errors[0].summary, "Unknown endpoint service");
        assert!(errors[0].attribute.is_some());
    }
}
