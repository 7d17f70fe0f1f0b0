//! Schema types and builders
//!
//! Resources and data sources describe their attribute surface with these
//! types; the host engine uses them for configuration decoding and diff
//! computation.

use crate::plan_modifier::PlanModifier;
use crate::validator::Validator;
use std::collections::HashMap;
use std::sync::Arc;

/// The attribute type system. Must match the host's exactly.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // always f64
    Bool,
    /// Ordered, allows duplicates
    List(Box<AttributeType>),
    /// Unordered, no duplicates
    Set(Box<AttributeType>),
    /// String keys only
    Map(Box<AttributeType>),
    /// Fixed structure
    Object(HashMap<String, AttributeType>),
}

/// Schema for a resource, data source or the provider block itself.
#[derive(Clone)]
pub struct Schema {
    /// Incremented when changes require state migration
    pub version: i64,
    pub description: String,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("version", &self.version)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// A single configuration attribute.
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// A change to this attribute forces delete-then-create
    pub force_new: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    /// Element schema for List/Set of Object attributes
    pub nested: Option<NestedType>,
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("force_new", &self.force_new)
            .field("validators", &self.validators.len())
            .field("plan_modifiers", &self.plan_modifiers.len())
            .field("nested", &self.nested.is_some())
            .finish()
    }
}

/// Nested element structure for collection attributes.
#[derive(Clone)]
pub struct NestedType {
    pub attributes: Vec<Attribute>,
    pub nesting: NestingMode,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    Single,
    List,
    Set,
}

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
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                nested: None,
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

    pub fn force_new(mut self) -> Self {
        self.attribute.force_new = true;
        self
    }

    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.attribute.validators.push(validator);
        self
    }

    pub fn plan_modifier(mut self, modifier: Arc<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(modifier);
        self
    }

    pub fn nested(mut self, attributes: Vec<Attribute>, nesting: NestingMode) -> Self {
        self.attribute.nested = Some(NestedType {
            attributes,
            nesting,
        });
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                description: String::new(),
                attributes: Vec::new(),
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.description = desc.to_string();
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.attributes.push(attr);
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

    #[test]
    fn builder_sets_flags() {
        let attr = AttributeBuilder::new("name", AttributeType::String)
            .description("entity name")
            .required()
            .force_new()
            .build();

        assert!(attr.required);
        assert!(!attr.optional);
        assert!(attr.force_new);
        assert_eq!(attr.description, "entity name");
    }

    #[test]
    fn optional_and_required_are_exclusive() {
        let attr = AttributeBuilder::new("lock", AttributeType::Bool)
            .required()
            .optional()
            .build();
        assert!(attr.optional);
        assert!(!attr.required);
    }

    #[test]
    fn schema_lookup_by_name() {
        let schema = SchemaBuilder::new()
            .version(0)
            .attribute(AttributeBuilder::new("id", AttributeType::String).computed().build())
            .attribute(AttributeBuilder::new("name", AttributeType::String).required().build())
            .build();

        assert!(schema.attribute("name").is_some());
        assert!(schema.attribute("missing").is_none());
    }

    #[test]
    fn clone_keeps_validators() {
        use crate::validator::StringLengthValidator;

        let attr = AttributeBuilder::new("name", AttributeType::String)
            .validator(Arc::new(StringLengthValidator {
                min: Some(3),
                max: Some(30),
            }))
            .build();

        assert_eq!(attr.clone().validators.len(), 1);
    }
}
