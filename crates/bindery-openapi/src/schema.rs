//! JSON Schema types for OpenAPI 3.0.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

use bindery_types::Describe;
use serde::{Deserialize, Serialize};

/// A schema as it appears in an OpenAPI 3.0 document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Schema {
    /// `$ref` to a component.
    Ref(Reference),
    /// Object schema.
    Object(ObjectSchema),
    /// Array schema.
    Array(ArraySchema),
    /// string, integer, number or boolean.
    Primitive(PrimitiveSchema),
    /// Unconstrained schema (`{}`).
    Any(AnySchema),
}

impl Schema {
    /// Create a string schema.
    pub fn string() -> Self {
        Schema::Primitive(PrimitiveSchema::string())
    }

    /// Create a string schema with a format (`byte`, `date-time`, ...).
    pub fn string_with_format(format: &str) -> Self {
        Schema::Primitive(PrimitiveSchema {
            format: Some(format.to_string()),
            ..PrimitiveSchema::string()
        })
    }

    /// `{type: integer}`, with `format` when given.
    pub fn integer(format: Option<&str>) -> Self {
        Schema::Primitive(PrimitiveSchema::integer(format))
    }

    /// `{type: number}`, with `format` when given.
    pub fn number(format: Option<&str>) -> Self {
        Schema::Primitive(PrimitiveSchema::number(format))
    }

    /// `{type: boolean}`.
    pub fn boolean() -> Self {
        Schema::Primitive(PrimitiveSchema::boolean())
    }

    /// Create a reference to `#/components/schemas/{name}`.
    pub fn reference(name: &str) -> Self {
        Schema::Ref(Reference::schema(name))
    }

    /// `{type: array, items}`.
    pub fn array(items: Schema) -> Self {
        Schema::Array(ArraySchema {
            schema_type: SchemaType::Array,
            items: Box::new(items),
            min_items: None,
            max_items: None,
        })
    }

    /// `{type: object}` with `properties` and `required`.
    pub fn object(properties: BTreeMap<String, Schema>, required: Vec<String>) -> Self {
        Schema::Object(ObjectSchema {
            properties,
            required,
            ..ObjectSchema::default()
        })
    }

    /// Create a map schema whose values follow `values`.
    pub fn map(values: Schema) -> Self {
        Schema::Object(ObjectSchema {
            additional_properties: Some(Box::new(values)),
            ..ObjectSchema::default()
        })
    }

    /// Create a string enum schema.
    pub fn string_enum<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Schema::Primitive(PrimitiveSchema {
            enum_values: values.into_iter().map(Into::into).collect(),
            ..PrimitiveSchema::string()
        })
    }

    /// Create an unconstrained schema.
    pub fn any() -> Self {
        Schema::Any(AnySchema {})
    }

    /// Mark a primitive nullable; other schemas are returned unchanged.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        if let Schema::Primitive(ref mut p) = self {
            p.nullable = true;
        }
        self
    }

    /// Title an object schema; other schemas are returned unchanged.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        if let Schema::Object(ref mut o) = self {
            o.title = Some(title.into());
        }
        self
    }

    /// Describe an object schema; other schemas are returned unchanged.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        if let Schema::Object(ref mut o) = self {
            o.description = Some(description.into());
        }
        self
    }

    /// Replace the required list (if object).
    #[must_use]
    pub fn with_required(mut self, required: Vec<String>) -> Self {
        if let Schema::Object(ref mut o) = self {
            o.required = required;
        }
        self
    }
}

/// A `$ref` pointer into the document's components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Pointer such as `#/components/schemas/Item`.
    #[serde(rename = "$ref")]
    pub reference: String,
}

impl Reference {
    /// Reference to `#/components/schemas/{name}`.
    #[must_use]
    pub fn schema(name: &str) -> Self {
        Self {
            reference: format!("#/components/schemas/{name}"),
        }
    }

    /// Reference to `#/components/parameters/{name}`.
    #[must_use]
    pub fn parameter(name: &str) -> Self {
        Self {
            reference: format!("#/components/parameters/{name}"),
        }
    }
}

/// Object schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSchema {
    /// Always `object`.
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    /// Schema title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Schema description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Object properties, sorted by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,
    /// Required property names, in field declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Value schema for map-like objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
}

impl Default for ObjectSchema {
    fn default() -> Self {
        Self {
            schema_type: SchemaType::Object,
            title: None,
            description: None,
            properties: BTreeMap::new(),
            required: Vec::new(),
            additional_properties: None,
        }
    }
}

/// Array schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArraySchema {
    /// Always `array`.
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    /// Item schema.
    pub items: Box<Schema>,
    /// Minimum items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    /// Maximum items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

/// A scalar schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveSchema {
    /// JSON Schema type.
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    /// Format hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Inclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Inclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Allowed values.
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    /// Nullable flag (OpenAPI 3.0).
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
}

impl PrimitiveSchema {
    fn of(schema_type: SchemaType, format: Option<&str>) -> Self {
        Self {
            schema_type,
            format: format.map(String::from),
            minimum: None,
            maximum: None,
            enum_values: Vec::new(),
            nullable: false,
        }
    }

    /// Create a string schema.
    pub fn string() -> Self {
        Self::of(SchemaType::String, None)
    }

    /// Create an integer schema with optional format.
    pub fn integer(format: Option<&str>) -> Self {
        Self::of(SchemaType::Integer, format)
    }

    /// Create a number schema with optional format.
    pub fn number(format: Option<&str>) -> Self {
        Self::of(SchemaType::Number, format)
    }

    /// Create a boolean schema.
    pub fn boolean() -> Self {
        Self::of(SchemaType::Boolean, None)
    }
}

/// The empty schema, which accepts any value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnySchema {}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}

/// JSON Schema types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// String type.
    String,
    /// Number type (float).
    Number,
    /// Integer type.
    Integer,
    /// Boolean type.
    Boolean,
    /// Object type.
    Object,
    /// Array type.
    Array,
}

/// Types with a structural schema.
///
/// Every schema-bearing type also describes its shape, so that the
/// synthesizer can name it and compute its required list.
pub trait JsonSchema: Describe {
    /// The full schema of this type, nested types inlined.
    fn schema() -> Schema;

    /// Component name when the type is named.
    #[must_use]
    fn schema_name() -> Option<&'static str> {
        None
    }
}

impl JsonSchema for String {
    fn schema() -> Schema {
        Schema::string()
    }
}

impl JsonSchema for char {
    fn schema() -> Schema {
        Schema::string()
    }
}

impl JsonSchema for bool {
    fn schema() -> Schema {
        Schema::boolean()
    }
}

macro_rules! signed_schema {
    ($($ty:ty => $format:literal),* $(,)?) => {
        $(
            impl JsonSchema for $ty {
                fn schema() -> Schema {
                    Schema::integer(Some($format))
                }
            }
        )*
    };
}

signed_schema! {
    i8 => "int8",
    i16 => "int16",
    i32 => "int32",
    i64 => "int64",
    isize => "int64",
}

// Unsigned integers carry their range instead of a format.
macro_rules! unsigned_schema {
    ($($ty:ty),* $(,)?) => {
        $(
            impl JsonSchema for $ty {
                #[allow(clippy::cast_precision_loss)]
                fn schema() -> Schema {
                    Schema::Primitive(PrimitiveSchema {
                        minimum: Some(0.0),
                        maximum: Some(<$ty>::MAX as f64),
                        ..PrimitiveSchema::integer(None)
                    })
                }
            }
        )*
    };
}

unsigned_schema!(u8, u16, u32, u64, usize);

impl JsonSchema for f32 {
    fn schema() -> Schema {
        Schema::number(Some("float"))
    }
}

impl JsonSchema for f64 {
    fn schema() -> Schema {
        Schema::number(Some("double"))
    }
}

impl JsonSchema for () {
    fn schema() -> Schema {
        Schema::any()
    }
}

impl JsonSchema for serde_json::Value {
    fn schema() -> Schema {
        Schema::any()
    }
}

// Optionality is expressed through the required list, not the schema.
impl<T: JsonSchema> JsonSchema for Option<T> {
    fn schema() -> Schema {
        T::schema()
    }
}

impl<T: JsonSchema + ?Sized> JsonSchema for Box<T> {
    fn schema() -> Schema {
        T::schema()
    }
}

impl<T: JsonSchema + ?Sized> JsonSchema for Arc<T> {
    fn schema() -> Schema {
        T::schema()
    }
}

impl<T: JsonSchema + ?Sized> JsonSchema for Rc<T> {
    fn schema() -> Schema {
        T::schema()
    }
}

impl<T: JsonSchema> JsonSchema for Vec<T> {
    fn schema() -> Schema {
        Schema::array(T::schema())
    }
}

impl<T: JsonSchema> JsonSchema for VecDeque<T> {
    fn schema() -> Schema {
        Schema::array(T::schema())
    }
}

impl<T: JsonSchema, const N: usize> JsonSchema for [T; N] {
    fn schema() -> Schema {
        Schema::Array(ArraySchema {
            schema_type: SchemaType::Array,
            items: Box::new(T::schema()),
            min_items: Some(N),
            max_items: Some(N),
        })
    }
}

impl<K, V: JsonSchema, S> JsonSchema for HashMap<K, V, S> {
    fn schema() -> Schema {
        Schema::map(V::schema())
    }
}

impl<K, V: JsonSchema> JsonSchema for BTreeMap<K, V> {
    fn schema() -> Schema {
        Schema::map(V::schema())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(schema: &Schema) -> String {
        serde_json::to_string(schema).unwrap()
    }

    #[test]
    fn test_unsigned_schema_carries_range() {
        let schema = u8::schema();
        assert_eq!(
            json(&schema),
            r#"{"type":"integer","minimum":0.0,"maximum":255.0}"#
        );
        let Schema::Primitive(p) = u64::schema() else {
            panic!("expected primitive");
        };
        assert_eq!(p.minimum, Some(0.0));
        assert!(p.maximum.is_some());
        assert!(p.format.is_none());
    }

    #[test]
    fn test_option_schema_is_inner_schema() {
        assert_eq!(Option::<String>::schema(), String::schema());
        assert_eq!(Option::<u64>::schema(), u64::schema());
    }

    #[test]
    fn test_collections() {
        assert_eq!(
            json(&Vec::<bool>::schema()),
            r#"{"type":"array","items":{"type":"boolean"}}"#
        );
        assert_eq!(
            json(&BTreeMap::<String, i32>::schema()),
            r#"{"type":"object","additionalProperties":{"type":"integer","format":"int32"}}"#
        );
        assert_eq!(
            json(&<[f32; 2]>::schema()),
            r#"{"type":"array","items":{"type":"number","format":"float"},"minItems":2,"maxItems":2}"#
        );
    }

    #[test]
    fn test_any_schema_is_empty_object() {
        assert_eq!(json(&serde_json::Value::schema()), "{}");
    }

    #[test]
    fn test_reference_paths() {
        assert_eq!(
            json(&Schema::reference("Item")),
            "{\"$ref\":\"#/components/schemas/Item\"}"
        );
        assert_eq!(
            Reference::parameter("id").reference,
            "#/components/parameters/id"
        );
    }

    #[test]
    fn test_object_properties_are_sorted() {
        let mut properties = BTreeMap::new();
        properties.insert("zeta".to_string(), Schema::string());
        properties.insert("alpha".to_string(), Schema::boolean());
        let schema = Schema::object(properties, vec!["zeta".to_string()]);
        assert_eq!(
            json(&schema),
            r#"{"type":"object","properties":{"alpha":{"type":"boolean"},"zeta":{"type":"string"}},"required":["zeta"]}"#
        );
    }

    #[test]
    fn test_string_enum_and_builders() {
        let schema = Schema::string_enum(["Red", "Green"]);
        assert_eq!(json(&schema), r#"{"type":"string","enum":["Red","Green"]}"#);
        let schema = Schema::string_with_format("byte").nullable();
        assert_eq!(
            json(&schema),
            r#"{"type":"string","format":"byte","nullable":true}"#
        );
        let schema = Schema::object(BTreeMap::new(), Vec::new())
            .with_title("T")
            .with_required(vec!["a".to_string()]);
        assert_eq!(
            json(&schema),
            r#"{"type":"object","title":"T","required":["a"]}"#
        );
    }
}
