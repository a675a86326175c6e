//! JSON Schema generation for template inputs.
//!
//! The schema is advisory: it tells a host which inputs a template expects so
//! that it can offer one field per variable. Names used as the source of a
//! `for` loop are typed `array`, everything else is typed `string`.

use crate::error::SchemaError;
use crate::loops::{extract_for_loop_arrays, is_array_variable};
use crate::variables::extract_variables;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// The `$schema` URI emitted for every generated document.
pub const DRAFT_04_SCHEMA: &str = "http://json-schema.org/draft-04/schema#";

/// A key-value settings bag as handed over by a host.
pub type Settings = serde_json::Map<String, Value>;

/// JSON Schema `type` keyword values used by generated documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Array,
    Object,
}

/// Describes the elements of an `array` property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsDescriptor {
    #[serde(rename = "type")]
    pub kind: PropertyType,
    #[serde(rename = "additionalProperties")]
    pub additional_properties: bool,
}

/// Describes one template variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    #[serde(rename = "type")]
    pub kind: PropertyType,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<ItemsDescriptor>,
}

impl PropertyDescriptor {
    /// A plain placeholder variable.
    pub fn string(name: &str) -> Self {
        Self {
            kind: PropertyType::String,
            description: format!("Template variable: {{{{ {} }}}}", name),
            items: None,
        }
    }

    /// An array iterated by a `for` loop. Elements are free-form objects.
    pub fn array(name: &str) -> Self {
        Self {
            kind: PropertyType::Array,
            description: format!("Array variable used in for loop: {{{{ {} }}}}", name),
            items: Some(ItemsDescriptor {
                kind: PropertyType::Object,
                additional_properties: true,
            }),
        }
    }

    pub fn is_array(&self) -> bool {
        self.kind == PropertyType::Array
    }
}

/// A draft-04 JSON Schema describing the input object of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(rename = "$schema")]
    pub schema: String,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    pub properties: BTreeMap<String, PropertyDescriptor>,
}

impl SchemaDocument {
    /// Creates a document with no properties.
    pub fn new() -> Self {
        Self {
            schema: DRAFT_04_SCHEMA.to_string(),
            kind: PropertyType::Object,
            properties: BTreeMap::new(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Serializes the document to compact JSON.
    pub fn to_json(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Converts the document into a `serde_json::Value`.
    pub fn to_value(&self) -> Result<Value, SchemaError> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Default for SchemaDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the input schema for a template.
///
/// Every placeholder variable becomes a property. Loop arrays that are never
/// referenced through a placeholder are appended so that each one is present,
/// and any name that is a loop source is typed `array`.
///
/// # Examples
///
/// ```
/// use prompt_schema::{build_schema, PropertyType};
///
/// let schema = build_schema("{% for t in tasks %}{{ t }}{% endfor %} for {{ owner }}");
/// assert_eq!(schema.property("tasks").unwrap().kind, PropertyType::Array);
/// assert_eq!(schema.property("owner").unwrap().kind, PropertyType::String);
/// ```
pub fn build_schema(template: &str) -> SchemaDocument {
    let mut variables = extract_variables(template);
    let for_loop_arrays = extract_for_loop_arrays(template);

    for array in &for_loop_arrays {
        if !variables.contains(array) {
            variables.push(array.clone());
        }
    }

    let properties = variables
        .into_iter()
        .map(|variable| {
            let descriptor = if is_array_variable(&variable, &for_loop_arrays) {
                PropertyDescriptor::array(&variable)
            } else {
                PropertyDescriptor::string(&variable)
            };
            (variable, descriptor)
        })
        .collect();

    SchemaDocument {
        properties,
        ..SchemaDocument::new()
    }
}

/// Builds the input schema for a template and serializes it.
///
/// Serialization failures degrade to `"{}"`. An empty template still produces
/// the full document shape with no properties.
pub fn build_schema_json(template: &str) -> String {
    match build_schema(template).to_json() {
        Ok(json) => json,
        Err(err) => {
            warn!("Failed to serialize template schema: {}", err);
            "{}".to_string()
        }
    }
}

/// Generates the input schema from a settings bag.
///
/// Returns `Ok(None)` when `settings["template"]` is missing, is not a string,
/// or is empty; schema generation is optional for hosts.
pub fn get_input_schema(settings: &Settings) -> Result<Option<SchemaDocument>, SchemaError> {
    let Some(template) = settings.get("template").and_then(Value::as_str) else {
        debug!("No template string in settings; skipping schema generation");
        return Ok(None);
    };
    if template.is_empty() {
        debug!("Empty template in settings; skipping schema generation");
        return Ok(None);
    }

    Ok(Some(build_schema(template)))
}

/// A source of input schemas computed from host settings.
pub trait SchemaProvider {
    /// Returns the input schema for the given settings, if one applies.
    fn input_schema(&self, settings: &Settings) -> Result<Option<SchemaDocument>, SchemaError>;
}

/// Derives the input schema from the `template` setting.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSchemaProvider;

impl SchemaProvider for TemplateSchemaProvider {
    fn input_schema(&self, settings: &Settings) -> Result<Option<SchemaDocument>, SchemaError> {
        get_input_schema(settings)
    }
}

/// Returns the template schema as JSON text by way of [`TemplateSchemaProvider`].
///
/// Unlike [`build_schema_json`], an empty template counts as "no template"
/// here and yields `"{}"`.
pub fn template_schema_json(template: &str) -> String {
    let mut settings = Settings::new();
    settings.insert("template".to_string(), Value::String(template.to_string()));

    let schema = match TemplateSchemaProvider.input_schema(&settings) {
        Ok(Some(schema)) => schema,
        Ok(None) => return "{}".to_string(),
        Err(err) => {
            warn!("Failed to generate template schema: {}", err);
            return "{}".to_string();
        }
    };

    schema.to_json().unwrap_or_else(|err| {
        warn!("Failed to serialize template schema: {}", err);
        "{}".to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_descriptor_shape() {
        let value = serde_json::to_value(PropertyDescriptor::string("name")).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "string",
                "description": "Template variable: {{ name }}"
            })
        );
    }

    #[test]
    fn test_array_descriptor_shape() {
        let value = serde_json::to_value(PropertyDescriptor::array("tasks")).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "array",
                "description": "Array variable used in for loop: {{ tasks }}",
                "items": {
                    "type": "object",
                    "additionalProperties": true
                }
            })
        );
    }

    #[test]
    fn test_build_schema_simple() {
        let schema = build_schema("Hello {{ name }}! You are {{ age }} years old.");
        assert_eq!(schema.schema, DRAFT_04_SCHEMA);
        assert_eq!(schema.kind, PropertyType::Object);
        assert_eq!(schema.properties.len(), 2);
        assert_eq!(schema.property("name"), Some(&PropertyDescriptor::string("name")));
        assert_eq!(schema.property("age"), Some(&PropertyDescriptor::string("age")));
    }

    #[test]
    fn test_build_schema_unions_loop_arrays() {
        let schema = build_schema("{% for var in variables %}{{ var.name }}{% endfor %}");
        assert_eq!(schema.properties.len(), 2);
        assert!(schema.property("variables").unwrap().is_array());
        assert!(!schema.property("var.name").unwrap().is_array());
    }

    #[test]
    fn test_build_schema_array_referenced_by_placeholder() {
        let template = "{{ tasks|length }} tasks: {% for t in tasks %}{{ t }}{% endfor %}";
        let schema = build_schema(template);
        assert_eq!(schema.properties.len(), 2);
        assert!(schema.property("tasks").unwrap().is_array());
        assert!(!schema.property("t").unwrap().is_array());
    }

    #[test]
    fn test_build_schema_json_for_empty_template() {
        let value: Value = serde_json::from_str(&build_schema_json("")).unwrap();
        assert_eq!(
            value,
            json!({
                "$schema": DRAFT_04_SCHEMA,
                "type": "object",
                "properties": {}
            })
        );
    }

    #[test]
    fn test_to_value_round_trips_through_serde() {
        let schema = build_schema("{{ a }}{% for x in xs %}{% endfor %}");
        let value = schema.to_value().unwrap();
        let back: SchemaDocument = serde_json::from_value(value).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn test_get_input_schema_without_template() {
        let settings = Settings::new();
        assert!(get_input_schema(&settings).unwrap().is_none());
    }

    #[test]
    fn test_get_input_schema_with_non_string_template() {
        let mut settings = Settings::new();
        settings.insert("template".to_string(), json!(42));
        assert!(get_input_schema(&settings).unwrap().is_none());

        settings.insert("template".to_string(), json!(""));
        assert!(get_input_schema(&settings).unwrap().is_none());
    }

    #[test]
    fn test_provider_delegates_to_template() {
        let mut settings = Settings::new();
        settings.insert(
            "template".to_string(),
            json!("Hello {{ name }}! You are {{ age }} years old and have {{ experience }} years of experience."),
        );

        let schema = TemplateSchemaProvider
            .input_schema(&settings)
            .unwrap()
            .expect("schema for a non-empty template");
        assert!(schema.property("name").is_some());
        assert!(schema.property("age").is_some());
        assert!(schema.property("experience").is_some());
    }

    #[test]
    fn test_template_schema_json() {
        assert_eq!(template_schema_json(""), "{}");

        let json = template_schema_json("Hello {{ name }}! You work as a {{ role }}.");
        assert!(json.contains("\"$schema\""));
        assert!(json.contains("\"name\""));
        assert!(json.contains("\"role\""));
    }
}
