//! Recursive schema model describing a field's shape.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::utils::OrderedMap;

/// Primitive or structural type of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// Text value.
    String,
    /// Whole number.
    Integer,
    /// Any numeric value.
    Number,
    /// `true` / `false`.
    Boolean,
    /// Sequence; see [`SchemaNode::items`].
    Array,
    /// Map; see [`SchemaNode::children`].
    Object,
    /// Shape could not be determined.
    #[default]
    Unknown,
}

impl SchemaType {
    /// Lower-case name used in JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Unknown => "unknown",
        }
    }

    /// Maps a declared parameter or attribute type name to a schema type.
    ///
    /// Accepts common spellings across languages (`int`, `i64`, `float`,
    /// `bool`, `Vec<..>`, `map`, ...). A leading `?` (nullable marker) is
    /// ignored here; see [`SchemaType::is_nullable_type_name`].
    #[must_use]
    pub fn from_type_name(name: &str) -> Self {
        let name = name.trim().trim_start_matches('?').to_ascii_lowercase();
        let base = name.split('<').next().unwrap_or("").trim();
        match base {
            "string" | "str" | "&str" | "text" | "char" => Self::String,
            "int" | "integer" | "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64"
            | "usize" | "isize" | "long" => Self::Integer,
            "float" | "double" | "number" | "numeric" | "decimal" | "f32" | "f64" => Self::Number,
            "bool" | "boolean" => Self::Boolean,
            "array" | "list" | "vec" | "iterable" | "sequence" => Self::Array,
            "object" | "map" | "hashmap" | "btreemap" | "dict" | "stdclass" => Self::Object,
            _ => Self::Unknown,
        }
    }

    /// True for `?type` and `Option<..>` spellings.
    #[must_use]
    pub fn is_nullable_type_name(name: &str) -> bool {
        let name = name.trim();
        name.starts_with('?') || name.starts_with("Option<")
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable description of a field's shape.
///
/// Only object nodes carry children and only array nodes carry items; the
/// constructors make any other combination unrepresentable, and
/// deserialization rejects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSchemaNode")]
pub struct SchemaNode {
    #[serde(rename = "type")]
    schema_type: SchemaType,
    required: bool,
    nullable: bool,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    children: OrderedMap<String, SchemaNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<Box<SchemaNode>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    constraints: BTreeMap<String, String>,
}

impl SchemaNode {
    /// Creates a childless node of the given type.
    #[must_use]
    pub fn new(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            required: false,
            nullable: false,
            children: OrderedMap::new(),
            items: None,
            constraints: BTreeMap::new(),
        }
    }

    /// Creates an object node with the given fields.
    #[must_use]
    pub fn object(children: OrderedMap<String, SchemaNode>) -> Self {
        Self {
            children,
            ..Self::new(SchemaType::Object)
        }
    }

    /// Creates an object node with no fields.
    #[must_use]
    pub fn empty_object() -> Self {
        Self::new(SchemaType::Object)
    }

    /// Creates an array node, optionally describing its elements.
    #[must_use]
    pub fn array(items: Option<SchemaNode>) -> Self {
        Self {
            items: items.map(Box::new),
            ..Self::new(SchemaType::Array)
        }
    }

    /// Sets the required flag.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets the nullable flag.
    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Adds a constraint such as `max` → `255`.
    #[must_use]
    pub fn with_constraint(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.constraints.insert(key.into(), value.into());
        self
    }

    /// Node type.
    #[must_use]
    pub fn schema_type(&self) -> SchemaType {
        self.schema_type
    }

    /// Whether the field must be present.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether the field may be `null`.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Object fields in declaration order; empty for non-objects.
    #[must_use]
    pub fn children(&self) -> &OrderedMap<String, SchemaNode> {
        &self.children
    }

    /// Looks up a direct child.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&SchemaNode> {
        self.children.get(name)
    }

    /// Follows a dotted path of child names (`*` steps into items).
    #[must_use]
    pub fn at_path(&self, path: &str) -> Option<&SchemaNode> {
        path.split('.')
            .filter(|s| !s.is_empty())
            .try_fold(self, |node, segment| {
                if segment == "*" {
                    node.items()
                } else {
                    node.child(segment)
                }
            })
    }

    /// Element schema for arrays.
    #[must_use]
    pub fn items(&self) -> Option<&SchemaNode> {
        self.items.as_deref()
    }

    /// All constraints, sorted by key.
    #[must_use]
    pub fn constraints(&self) -> &BTreeMap<String, String> {
        &self.constraints
    }

    /// A single constraint value.
    #[must_use]
    pub fn constraint(&self, key: &str) -> Option<&str> {
        self.constraints.get(key).map(String::as_str)
    }

    /// True for an object node without fields.
    #[must_use]
    pub fn is_empty_object(&self) -> bool {
        self.schema_type == SchemaType::Object && self.children.is_empty()
    }

    /// JSON form of this node.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Default for SchemaNode {
    fn default() -> Self {
        Self::empty_object()
    }
}

/// Wire form checked before becoming a [`SchemaNode`].
#[derive(Deserialize)]
struct RawSchemaNode {
    #[serde(rename = "type", default)]
    schema_type: SchemaType,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    nullable: bool,
    #[serde(default)]
    children: OrderedMap<String, SchemaNode>,
    #[serde(default)]
    items: Option<Box<SchemaNode>>,
    #[serde(default)]
    constraints: BTreeMap<String, String>,
}

impl TryFrom<RawSchemaNode> for SchemaNode {
    type Error = String;

    fn try_from(raw: RawSchemaNode) -> Result<Self, Self::Error> {
        if !raw.children.is_empty() && raw.schema_type != SchemaType::Object {
            return Err(format!(
                "schema node of type '{}' cannot have children",
                raw.schema_type
            ));
        }
        if raw.items.is_some() && raw.schema_type != SchemaType::Array {
            return Err(format!(
                "schema node of type '{}' cannot have items",
                raw.schema_type
            ));
        }
        Ok(Self {
            schema_type: raw.schema_type,
            required: raw.required,
            nullable: raw.nullable,
            children: raw.children,
            items: raw.items,
            constraints: raw.constraints,
        })
    }
}

/// Mutable node used while folding rules or values into a tree.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeBuilder {
    pub(crate) schema_type: SchemaType,
    pub(crate) required: bool,
    pub(crate) nullable: bool,
    pub(crate) children: OrderedMap<String, NodeBuilder>,
    pub(crate) items: Option<Box<NodeBuilder>>,
    pub(crate) constraints: BTreeMap<String, String>,
}

impl NodeBuilder {
    pub(crate) fn new(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            ..Self::default()
        }
    }

    /// Turns this node into an object (dropping items) and returns the named child.
    pub(crate) fn child_mut(&mut self, name: &str) -> &mut NodeBuilder {
        if self.schema_type != SchemaType::Object {
            self.schema_type = SchemaType::Object;
            self.items = None;
        }
        self.children
            .get_or_insert_with(name.to_string(), NodeBuilder::default)
    }

    /// Turns this node into an array (dropping children) and returns its items.
    pub(crate) fn items_mut(&mut self) -> &mut NodeBuilder {
        if self.schema_type != SchemaType::Array {
            self.schema_type = SchemaType::Array;
            self.children = OrderedMap::new();
        }
        self.items.get_or_insert_with(Box::default)
    }

    /// True when children or items were already folded in.
    pub(crate) fn has_structure(&self) -> bool {
        !self.children.is_empty() || self.items.is_some()
    }

    pub(crate) fn build(self) -> SchemaNode {
        let base = match self.schema_type {
            SchemaType::Object => SchemaNode::object(
                self.children
                    .into_iter()
                    .map(|(name, child)| (name, child.build()))
                    .collect(),
            ),
            SchemaType::Array => SchemaNode::array(self.items.map(|items| items.build())),
            other => SchemaNode::new(other),
        };
        SchemaNode {
            required: self.required,
            nullable: self.nullable,
            constraints: self.constraints,
            ..base
        }
    }
}
