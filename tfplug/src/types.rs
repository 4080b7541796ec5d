//! Core type system for tfplug
//!
//! Dynamic values carry configuration and state between the host and a
//! provider. They are loosely typed on purpose: every provider reads them
//! through the typed accessors on [`DynamicValue`].

use crate::error::{Result, TfplugError};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Dynamic represents Terraform values that can be of any type
/// IMPORTANT: Always use type-safe accessors instead of matching directly
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    Null,
    Bool(bool),
    /// All numbers are f64 to match Terraform
    Number(f64),
    String(String),
    List(Vec<Dynamic>),
    /// Objects are represented as maps
    Map(HashMap<String, Dynamic>),
    /// Value not yet known (during planning)
    Unknown,
}

impl Dynamic {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Dynamic::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Dynamic::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Dynamic>> {
        match self {
            Dynamic::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }

    /// Converts back to JSON. Unknown values have no JSON form and become null.
    pub fn to_json(&self) -> Value {
        match self {
            Dynamic::Null | Dynamic::Unknown => Value::Null,
            Dynamic::Bool(b) => Value::Bool(*b),
            Dynamic::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(Value::Number)
                        .unwrap_or(Value::Null)
                }
            }
            Dynamic::String(s) => Value::String(s.clone()),
            Dynamic::List(l) => Value::Array(l.iter().map(Dynamic::to_json).collect()),
            Dynamic::Map(m) => Value::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for Dynamic {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Dynamic::Null,
            Value::Bool(b) => Dynamic::Bool(b),
            Value::Number(n) => Dynamic::Number(n.as_f64().unwrap_or_default()),
            Value::String(s) => Dynamic::String(s),
            Value::Array(items) => Dynamic::List(items.into_iter().map(Dynamic::from).collect()),
            Value::Object(map) => Dynamic::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Dynamic::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

/// DynamicValue wraps the root Dynamic of a config, plan or state
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub value: Dynamic,
}

impl DynamicValue {
    pub fn new(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn null() -> Self {
        Self {
            value: Dynamic::Null,
        }
    }

    /// An empty object, the usual starting point when building state
    pub fn empty() -> Self {
        Self {
            value: Dynamic::Map(HashMap::new()),
        }
    }

    pub fn from_json(value: Value) -> Self {
        Self {
            value: Dynamic::from(value),
        }
    }

    pub fn encode_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.value)
            .map_err(|e| TfplugError::EncodingError(format!("json encoding failed: {}", e)))
    }

    /// Type-safe accessors - ALWAYS use these instead of pattern matching.
    /// A null attribute is reported as missing.
    pub fn get_string(&self, path: &AttributePath) -> Result<String> {
        match self.navigate_path(path)? {
            Dynamic::String(s) => Ok(s.clone()),
            other => Err(mismatch("string", other)),
        }
    }

    pub fn get_number(&self, path: &AttributePath) -> Result<f64> {
        match self.navigate_path(path)? {
            Dynamic::Number(n) => Ok(*n),
            other => Err(mismatch("number", other)),
        }
    }

    pub fn get_i64(&self, path: &AttributePath) -> Result<i64> {
        self.get_number(path).map(|n| n as i64)
    }

    pub fn get_bool(&self, path: &AttributePath) -> Result<bool> {
        match self.navigate_path(path)? {
            Dynamic::Bool(b) => Ok(*b),
            other => Err(mismatch("bool", other)),
        }
    }

    pub fn get_list(&self, path: &AttributePath) -> Result<Vec<Dynamic>> {
        match self.navigate_path(path)? {
            Dynamic::List(l) => Ok(l.clone()),
            other => Err(mismatch("list", other)),
        }
    }

    pub fn get_map(&self, path: &AttributePath) -> Result<HashMap<String, Dynamic>> {
        match self.navigate_path(path)? {
            Dynamic::Map(m) => Ok(m.clone()),
            other => Err(mismatch("map", other)),
        }
    }

    /// Strings of a list or set attribute; non-string elements are skipped
    pub fn get_string_list(&self, path: &AttributePath) -> Result<Vec<String>> {
        Ok(self
            .get_list(path)?
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect())
    }

    pub fn get_dynamic(&self, path: &AttributePath) -> Result<Dynamic> {
        self.navigate_path(path).cloned()
    }

    /// Type-safe setters - Use for building state/config objects
    pub fn set_string(&mut self, path: &AttributePath, value: String) -> Result<()> {
        self.set_value(path, Dynamic::String(value))
    }

    pub fn set_number(&mut self, path: &AttributePath, value: f64) -> Result<()> {
        self.set_value(path, Dynamic::Number(value))
    }

    pub fn set_bool(&mut self, path: &AttributePath, value: bool) -> Result<()> {
        self.set_value(path, Dynamic::Bool(value))
    }

    pub fn set_list(&mut self, path: &AttributePath, value: Vec<Dynamic>) -> Result<()> {
        self.set_value(path, Dynamic::List(value))
    }

    pub fn set_null(&mut self, path: &AttributePath) -> Result<()> {
        self.set_value(path, Dynamic::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, Dynamic::Null)
    }

    fn navigate_path<'a>(&'a self, path: &AttributePath) -> Result<&'a Dynamic> {
        let mut current = &self.value;

        for step in &path.steps {
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => m
                    .get(name)
                    .ok_or_else(|| TfplugError::AttributeNotFound(name.clone()))?,
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                    l.get(*idx as usize).ok_or_else(|| {
                        TfplugError::AttributeNotFound(format!("{}[{}]", path, idx))
                    })?
                }
                (Dynamic::Null, _) => {
                    return Err(TfplugError::AttributeNotFound(path.to_string()))
                }
                _ => return Err(TfplugError::Custom("invalid path navigation".to_string())),
            };
        }

        if current.is_null() && !path.steps.is_empty() {
            return Err(TfplugError::AttributeNotFound(path.to_string()));
        }

        Ok(current)
    }

    fn set_value(&mut self, path: &AttributePath, new_value: Dynamic) -> Result<()> {
        let Some((last, parents)) = path.steps.split_last() else {
            self.value = new_value;
            return Ok(());
        };

        if !matches!(self.value, Dynamic::Map(_)) {
            self.value = Dynamic::Map(HashMap::new());
        }

        let mut current = &mut self.value;
        for (idx, step) in parents.iter().enumerate() {
            let next_is_index = matches!(
                path.steps.get(idx + 1),
                Some(AttributePathStep::ElementKeyInt(_))
            );
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => {
                    let entry = m.entry(name.clone()).or_insert(Dynamic::Null);
                    if entry.is_null() {
                        *entry = if next_is_index {
                            Dynamic::List(Vec::new())
                        } else {
                            Dynamic::Map(HashMap::new())
                        };
                    }
                    entry
                }
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                    let len = l.len();
                    l.get_mut(*idx as usize).ok_or_else(|| {
                        TfplugError::Custom(format!("list index {} out of bounds ({})", idx, len))
                    })?
                }
                _ => return Err(TfplugError::Custom("invalid path navigation".to_string())),
            };
        }

        match (current, last) {
            (Dynamic::Map(m), AttributePathStep::AttributeName(name))
            | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => {
                m.insert(name.clone(), new_value);
                Ok(())
            }
            (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                let idx = *idx as usize;
                if idx < l.len() {
                    l[idx] = new_value;
                    Ok(())
                } else if idx == l.len() {
                    l.push(new_value);
                    Ok(())
                } else {
                    Err(TfplugError::Custom(format!(
                        "list index {} out of bounds",
                        idx
                    )))
                }
            }
            _ => Err(TfplugError::Custom("invalid path navigation".to_string())),
        }
    }
}

impl Default for DynamicValue {
    fn default() -> Self {
        Self::empty()
    }
}

fn mismatch(expected: &str, actual: &Dynamic) -> TfplugError {
    TfplugError::TypeMismatch {
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
    }
}

/// AttributePath represents a path to an attribute within a DynamicValue
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePath {
    pub steps: Vec<AttributePathStep>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![AttributePathStep::AttributeName(name.to_string())],
        }
    }

    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps
            .push(AttributePathStep::AttributeName(name.to_string()));
        self
    }

    pub fn index(mut self, idx: i64) -> Self {
        self.steps.push(AttributePathStep::ElementKeyInt(idx));
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.steps
            .push(AttributePathStep::ElementKeyString(key.to_string()));
        self
    }
}

impl std::fmt::Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                AttributePathStep::AttributeName(name) if i == 0 => write!(f, "{}", name)?,
                AttributePathStep::AttributeName(name) => write!(f, ".{}", name)?,
                AttributePathStep::ElementKeyString(key) => write!(f, "[\"{}\"]", key)?,
                AttributePathStep::ElementKeyInt(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

/// Individual step in an AttributePath
#[derive(Debug, Clone, PartialEq)]
pub enum AttributePathStep {
    AttributeName(String),
    ElementKeyString(String),
    ElementKeyInt(i64),
}

/// Diagnostic represents a warning or error from the provider
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, path: AttributePath) -> Self {
        self.attribute = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// True if any diagnostic in the slice is an error
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Config represents configuration values
pub type Config = DynamicValue;

/// State represents resource state values
pub type State = DynamicValue;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dynamic_value_string_access() {
        let mut dv = DynamicValue::empty();
        dv.set_string(&AttributePath::new("name"), "test".to_string())
            .unwrap();

        let result = dv.get_string(&AttributePath::new("name")).unwrap();
        assert_eq!(result, "test");
    }

    #[test]
    fn dynamic_value_nested_access() {
        let mut dv = DynamicValue::empty();
        let path = AttributePath::new("config").attribute("endpoint");
        dv.set_string(&path, "https://example.com".to_string())
            .unwrap();

        let result = dv.get_string(&path).unwrap();
        assert_eq!(result, "https://example.com");
    }

    #[test]
    fn null_attribute_reads_as_missing() {
        let mut dv = DynamicValue::empty();
        dv.set_null(&AttributePath::new("description")).unwrap();

        let err = dv.get_string(&AttributePath::new("description")).unwrap_err();
        assert!(err.is_missing());
        assert!(dv
            .get_string(&AttributePath::new("absent"))
            .unwrap_err()
            .is_missing());
    }

    #[test]
    fn json_objects_convert_to_maps() {
        let dv = DynamicValue::from_json(json!({
            "name": "share-01",
            "size": 500,
            "tags": ["a", "b"],
            "rules": [{"ip_cidr": "10.0.0.0/8"}]
        }));

        assert_eq!(dv.get_string(&AttributePath::new("name")).unwrap(), "share-01");
        assert_eq!(dv.get_i64(&AttributePath::new("size")).unwrap(), 500);
        assert_eq!(
            dv.get_string_list(&AttributePath::new("tags")).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(
            dv.get_string(&AttributePath::new("rules").index(0).attribute("ip_cidr"))
                .unwrap(),
            "10.0.0.0/8"
        );
    }

    #[test]
    fn type_mismatch_is_reported() {
        let dv = DynamicValue::from_json(json!({"size": 10}));
        match dv.get_string(&AttributePath::new("size")) {
            Err(TfplugError::TypeMismatch { expected, actual }) => {
                assert_eq!(expected, "string");
                assert_eq!(actual, "number");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn json_encoding_keeps_integers() {
        let dv = DynamicValue::from_json(json!({"uid": 1000, "ratio": 0.5}));
        let bytes = dv.encode_json().unwrap();
        let back: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back["uid"], json!(1000));
        assert_eq!(back["ratio"], json!(0.5));
    }

    #[test]
    fn setting_list_elements_appends_at_end() {
        let mut dv = DynamicValue::empty();
        dv.set_list(&AttributePath::new("ids"), vec![]).unwrap();
        dv.set_string(&AttributePath::new("ids").index(0), "a".to_string())
            .unwrap();
        assert_eq!(
            dv.get_string_list(&AttributePath::new("ids")).unwrap(),
            vec!["a".to_string()]
        );
        assert!(dv
            .set_string(&AttributePath::new("ids").index(5), "b".to_string())
            .is_err());
    }

    #[test]
    fn attribute_path_display() {
        let path = AttributePath::new("rules").index(2).attribute("rw_type");
        assert_eq!(path.to_string(), "rules[2].rw_type");
    }
}
