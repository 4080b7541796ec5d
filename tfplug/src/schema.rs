//! Schema types and builders for tfplug
//!
//! Resources and data sources describe their attributes with [`SchemaBuilder`]
//! and [`AttributeBuilder`]. The schema is flat: nested objects are expressed
//! through [`AttributeType::Object`] inside lists and sets.

use crate::types::{AttributePath, DynamicValue};
use std::collections::HashMap;

/// AttributeType defines the type system for Terraform attributes
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>),               // Ordered, allows duplicates
    Set(Box<AttributeType>),                // Unordered, no duplicates
    Map(Box<AttributeType>),                // String keys only
    Object(HashMap<String, AttributeType>), // Fixed structure
}

impl AttributeType {
    pub fn list_of(inner: AttributeType) -> Self {
        AttributeType::List(Box::new(inner))
    }

    pub fn set_of(inner: AttributeType) -> Self {
        AttributeType::Set(Box::new(inner))
    }

    pub fn map_of(inner: AttributeType) -> Self {
        AttributeType::Map(Box::new(inner))
    }

    /// Object type from (name, type) pairs
    pub fn object<'a>(fields: impl IntoIterator<Item = (&'a str, AttributeType)>) -> Self {
        AttributeType::Object(
            fields
                .into_iter()
                .map(|(name, ty)| (name.to_string(), ty))
                .collect(),
        )
    }
}

/// Schema is returned by providers/resources/data sources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.iter().find(|a| a.name == name)
    }

    /// Paths of force-new attributes whose value differs between prior and
    /// planned state. An empty result means the change can be applied in place.
    pub fn requires_replace(&self, prior: &DynamicValue, planned: &DynamicValue) -> Vec<AttributePath> {
        self.block
            .attributes
            .iter()
            .filter(|a| a.force_new)
            .filter_map(|a| {
                let path = AttributePath::new(&a.name);
                let before = prior.get_dynamic(&path).ok();
                let after = planned.get_dynamic(&path).ok();
                (before != after).then_some(path)
            })
            .collect()
    }
}

/// Block represents the root configuration block
#[derive(Debug, Clone)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub description: String,
    pub deprecated: bool,
}

/// Attribute represents a single configuration attribute
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// Changing the value replaces the remote object
    pub force_new: bool,
    pub deprecated: bool,
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                force_new: false,
                deprecated: false,
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    /// Changes to this attribute require replacing the resource
    pub fn force_new(mut self) -> Self {
        self.attribute.force_new = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides fluent API for building schemas
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block {
                    version: 0,
                    attributes: Vec::new(),
                    description: String::new(),
                    deprecated: false,
                },
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    /// Adds the computed string `id` every resource and data source carries
    pub fn id_attribute(self, description: &str) -> Self {
        self.attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description(description)
                .computed()
                .build(),
        )
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attribute_builder_creates_required_string() {
        let attr = AttributeBuilder::new("name", AttributeType::String)
            .description("The name of the resource")
            .required()
            .force_new()
            .build();

        assert_eq!(attr.name, "name");
        assert!(matches!(attr.r#type, AttributeType::String));
        assert!(attr.required);
        assert!(!attr.optional);
        assert!(attr.force_new);
        assert_eq!(attr.description, "The name of the resource");
    }

    #[test]
    fn schema_builder_creates_schema_with_attributes() {
        let schema = SchemaBuilder::new()
            .version(1)
            .description("Test resource schema")
            .id_attribute("Resource ID")
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .build(),
            )
            .build();

        assert_eq!(schema.version, 1);
        assert_eq!(schema.block.attributes.len(), 2);
        assert!(schema.attribute("id").unwrap().computed);
        assert!(schema.attribute("missing").is_none());
    }

    #[test]
    fn object_list_attribute_type() {
        let ty = AttributeType::list_of(AttributeType::object([
            ("key", AttributeType::String),
            ("value", AttributeType::String),
        ]));

        match ty {
            AttributeType::List(inner) => match *inner {
                AttributeType::Object(fields) => {
                    assert_eq!(fields.len(), 2);
                    assert_eq!(fields.get("key"), Some(&AttributeType::String));
                }
                other => panic!("expected object, got {:?}", other),
            },
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn requires_replace_only_reports_changed_force_new_attributes() {
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
        let in_place = DynamicValue::from_json(json!({"name": "a", "description": "y"}));
        let replace = DynamicValue::from_json(json!({"name": "b", "description": "x"}));

        assert!(schema.requires_replace(&prior, &in_place).is_empty());
        assert_eq!(
            schema.requires_replace(&prior, &replace),
            vec![AttributePath::new("name")]
        );
    }
}
