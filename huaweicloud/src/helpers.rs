//! Helpers shared by resources and data sources: provider data wiring,
//! attribute access and mapping response fields into state

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::schema::Schema;
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::{path_search, ApiError};
use crate::HuaweiCloudProviderData;

/// Stores the provider data handed to `configure`, or explains why it
/// could not be used
pub fn configure_provider_data(
    target: &mut Option<HuaweiCloudProviderData>,
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
    kind: &str,
) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];

    if let Some(data) = provider_data {
        if let Some(provider_data) = data.downcast_ref::<HuaweiCloudProviderData>() {
            *target = Some(provider_data.clone());
        } else {
            tracing::error!("Failed to downcast provider data to HuaweiCloudProviderData");
            diagnostics.push(Diagnostic::error(
                "Invalid provider data",
                "Failed to extract HuaweiCloudProviderData from provider data",
            ));
        }
    } else {
        tracing::warn!("No provider data provided to {}", kind);
        diagnostics.push(Diagnostic::error(
            "No provider data",
            format!("No provider data was provided to the {}", kind),
        ));
    }

    diagnostics
}

pub fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

/// "Failed to <action> <what>" with the error as detail
pub fn api_error(action: &str, what: &str, error: &ApiError) -> Diagnostic {
    Diagnostic::error(format!("Failed to {} {}", action, what), error.to_string())
}

pub fn required_string(value: &DynamicValue, name: &str) -> Result<String, Diagnostic> {
    value
        .get_string(&AttributePath::new(name))
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            Diagnostic::error(
                format!("Missing {}", name),
                format!("The '{}' attribute is required", name),
            )
            .with_attribute(AttributePath::new(name))
        })
}

/// Every attribute in `names`, in the same order, or one diagnostic per
/// missing attribute
pub fn required_strings<const N: usize>(
    value: &DynamicValue,
    names: [&str; N],
) -> Result<[String; N], Vec<Diagnostic>> {
    let mut missing = vec![];
    let values = names.map(|name| {
        required_string(value, name).unwrap_or_else(|diag| {
            missing.push(diag);
            String::new()
        })
    });
    if missing.is_empty() {
        Ok(values)
    } else {
        Err(missing)
    }
}

/// A set, non-empty string attribute
pub fn optional_string(value: &DynamicValue, name: &str) -> Option<String> {
    value
        .get_string(&AttributePath::new(name))
        .ok()
        .filter(|s| !s.is_empty())
}

pub fn optional_i64(value: &DynamicValue, name: &str) -> Option<i64> {
    value.get_i64(&AttributePath::new(name)).ok()
}

pub fn optional_bool(value: &DynamicValue, name: &str) -> Option<bool> {
    value.get_bool(&AttributePath::new(name)).ok()
}

pub fn string_or(value: &DynamicValue, name: &str, default: &str) -> String {
    optional_string(value, name).unwrap_or_else(|| default.to_string())
}

pub fn set_string(state: &mut DynamicValue, name: &str, value: impl Into<String>) {
    let _ = state.set_string(&AttributePath::new(name), value.into());
}

pub fn set_optional_string(state: &mut DynamicValue, name: &str, value: Option<String>) {
    let path = AttributePath::new(name);
    let _ = match value {
        Some(v) => state.set_string(&path, v),
        None => state.set_null(&path),
    };
}

/// Copies the string found at `expression` in `body`, or null
pub fn set_string_from(state: &mut DynamicValue, name: &str, body: &Value, expression: &str) {
    set_optional_string(state, name, path_search::search_str(expression, body));
}

pub fn set_i64_from(state: &mut DynamicValue, name: &str, body: &Value, expression: &str) {
    let path = AttributePath::new(name);
    let _ = match path_search::search_i64(expression, body) {
        Some(v) => state.set_number(&path, v as f64),
        None => state.set_null(&path),
    };
}

pub fn set_f64_from(state: &mut DynamicValue, name: &str, body: &Value, expression: &str) {
    let path = AttributePath::new(name);
    let _ = match path_search::search_f64(expression, body) {
        Some(v) => state.set_number(&path, v),
        None => state.set_null(&path),
    };
}

pub fn set_bool_from(state: &mut DynamicValue, name: &str, body: &Value, expression: &str) {
    let path = AttributePath::new(name);
    let _ = match path_search::search_bool(expression, body) {
        Some(v) => state.set_bool(&path, v),
        None => state.set_null(&path),
    };
}

/// Copies a timestamp, rendering epoch milliseconds as RFC 3339
pub fn set_timestamp_from(state: &mut DynamicValue, name: &str, body: &Value, expression: &str) {
    set_optional_string(state, name, format_timestamp(&path_search::search(expression, body)));
}

pub fn format_timestamp(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Builds list elements from JSON objects, keeping only `fields`. Missing
/// fields become null.
pub fn object_list(items: &[Value], fields: &[(&str, &str)]) -> Vec<Dynamic> {
    items
        .iter()
        .map(|item| {
            Dynamic::Map(
                fields
                    .iter()
                    .map(|(name, expression)| {
                        (name.to_string(), Dynamic::from(path_search::search(expression, item)))
                    })
                    .collect(),
            )
        })
        .collect()
}

/// Errors for force-new attributes changed in an update
pub fn requires_replace_diagnostics(schema: &Schema, prior: &DynamicValue, planned: &DynamicValue) -> Vec<Diagnostic> {
    schema
        .requires_replace(prior, planned)
        .into_iter()
        .map(|path| {
            Diagnostic::error(
                "Attribute requires replacement",
                format!("'{}' cannot be changed in place, the resource must be replaced", path),
            )
            .with_attribute(path)
        })
        .collect()
}

/// Time left on the request context, or `default` when it has no deadline
pub fn operation_timeout(ctx: &Context, default: Duration) -> Duration {
    ctx.remaining().unwrap_or(default)
}

/// Random id for data source results
pub fn random_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Fills a data source result: a fresh random `id` plus the list attribute
pub fn set_results(state: &mut DynamicValue, name: &str, items: Vec<Dynamic>) {
    tracing::debug!("Data source found {} {}", items.len(), name);
    set_string(state, "id", random_id());
    let _ = state.set_list(&AttributePath::new(name), items);
}

/// True if `expected` is unset or equals the field of `item`
pub fn field_matches(item: &Value, field: &str, expected: Option<&str>) -> bool {
    match expected {
        None => true,
        Some(expected) => path_search::search_str(field, item).as_deref() == Some(expected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};

    #[test]
    fn timestamps_from_epoch_millis_and_strings() {
        assert_eq!(
            format_timestamp(&json!(1700000000000i64)).as_deref(),
            Some("2023-11-14T22:13:20Z")
        );
        assert_eq!(
            format_timestamp(&json!("2024-01-01T00:00:00Z")).as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
        assert_eq!(format_timestamp(&json!("")), None);
        assert_eq!(format_timestamp(&Value::Null), None);
    }

    #[test]
    fn missing_response_fields_become_null() {
        let body = json!({"status": "200", "size": "500.00", "flag": true});
        let mut state = DynamicValue::from_json(json!({"status": "unknown", "stale": "x"}));

        set_string_from(&mut state, "status", &body, "status");
        set_i64_from(&mut state, "size", &body, "size");
        set_bool_from(&mut state, "flag", &body, "flag");
        set_string_from(&mut state, "stale", &body, "missing");

        assert_eq!(state.get_string(&AttributePath::new("status")).unwrap(), "200");
        assert_eq!(state.get_i64(&AttributePath::new("size")).unwrap(), 500);
        assert!(state.get_bool(&AttributePath::new("flag")).unwrap());
        assert!(state.get_string(&AttributePath::new("stale")).unwrap_err().is_missing());
    }

    #[test]
    fn object_list_projects_selected_fields() {
        let items = vec![json!({"policy_id": "p1", "policy_name": "ReadOnly", "extra": 1})];
        let list = object_list(&items, &[("id", "policy_id"), ("name", "policy_name")]);

        let map = list[0].as_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["id"].as_str(), Some("p1"));
        assert_eq!(map["name"].as_str(), Some("ReadOnly"));
    }

    #[test]
    fn force_new_changes_are_reported() {
        let schema = SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .optional()
                    .build(),
            )
            .build();
        let prior = DynamicValue::from_json(json!({"name": "a", "description": "x"}));
        let planned = DynamicValue::from_json(json!({"name": "b", "description": "y"}));

        let diags = requires_replace_diagnostics(&schema, &prior, &planned);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.contains("name"));

        let planned = DynamicValue::from_json(json!({"name": "a", "description": "y"}));
        assert!(requires_replace_diagnostics(&schema, &prior, &planned).is_empty());
    }

    #[test]
    fn required_strings_keep_name_order() {
        let config = DynamicValue::from_json(json!({"path": "/data", "share_id": "share-1"}));
        let [share_id, path] = required_strings(&config, ["share_id", "path"]).unwrap();
        assert_eq!(share_id, "share-1");
        assert_eq!(path, "/data");

        let errors = required_strings(&config, ["share_id", "mode", "uid"]).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].summary, "Missing mode");
        assert_eq!(errors[1].summary, "Missing uid");
    }

    #[test]
    fn field_matching_treats_unset_filter_as_match() {
        let item = json!({"state": "ENROLLED"});
        assert!(field_matches(&item, "state", None));
        assert!(field_matches(&item, "state", Some("ENROLLED")));
        assert!(!field_matches(&item, "state", Some("SUSPENDED")));
    }

    #[test]
    fn operation_timeout_prefers_context_deadline() {
        let ctx = Context::with_timeout(Duration::from_secs(5));
        assert!(operation_timeout(&ctx, Duration::from_secs(600)) <= Duration::from_secs(5));
        assert_eq!(
            operation_timeout(&Context::new(), Duration::from_secs(600)),
            Duration::from_secs(600)
        );
    }
}
