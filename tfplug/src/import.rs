//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, DynamicValue};

/// Sets the import ID to a specific attribute in state
///
/// Example: ID "share-123" -> state.id = "share-123"
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::empty();

    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!("Could not set attribute '{}' to value '{}'", attr_path, request.id),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
    });
}

/// Splits a composite import ID such as "<instance_id>/<permission_set_id>"
/// into one attribute per part. The full ID is kept in `id`.
///
/// The last attribute receives the remainder, so paths containing the
/// separator survive: "share/a/b" with two parts gives ("share", "a/b").
pub fn import_state_split_id(
    _ctx: &Context,
    parts: &[&str],
    separator: char,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let values: Vec<&str> = request.id.splitn(parts.len(), separator).collect();

    if values.len() != parts.len() || values.iter().any(|v| v.is_empty()) {
        let expected = parts
            .iter()
            .map(|p| format!("<{}>", p))
            .collect::<Vec<_>>()
            .join(&separator.to_string());
        response.diagnostics.push(Diagnostic::error(
            "Invalid import ID",
            format!("Expected import ID in the form {}, got '{}'", expected, request.id),
        ));
        return;
    }

    let mut state = DynamicValue::empty();
    let _ = state.set_string(&AttributePath::new("id"), request.id.clone());
    for (name, value) in parts.iter().zip(values) {
        let _ = state.set_string(&AttributePath::new(name), value.to_string());
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
    });
}
