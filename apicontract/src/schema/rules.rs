//! Validation rule grammar.
//!
//! Rule sets map a field name to either a `|`-delimited rule string
//! (`"required|string|max:255"`) or a list of rule strings. Field names may
//! be dotted (`address.city`), wildcarded (`items.*.sku`) or bracketed
//! (`items[][sku]`).

use serde_json::Value;

use super::node::{NodeBuilder, SchemaNode, SchemaType};

/// Tokens that carry a parameter after `:` and are kept as constraints.
const PARAMETRIZED: &[&str] = &[
    "min",
    "max",
    "in",
    "not_in",
    "size",
    "between",
    "regex",
    "digits",
    "date_format",
    "mimes",
];

/// Tokens that describe a string format.
const FORMATS: &[&str] = &["email", "url", "uuid", "date", "ip", "file", "image"];

/// Result of parsing one field's rule tokens.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedRule {
    /// First recognised type token, if any.
    pub schema_type: Option<SchemaType>,
    /// `required` was present.
    pub required: bool,
    /// `nullable` was present.
    pub nullable: bool,
    /// Parametrised tokens and formats, in token order.
    pub constraints: Vec<(String, String)>,
}

impl ParsedRule {
    /// Effective type: declared type, else `string` when a format was
    /// given, else `unknown`.
    #[must_use]
    pub fn effective_type(&self) -> SchemaType {
        match self.schema_type {
            Some(t) => t,
            None if self.constraints.iter().any(|(k, _)| k == "format") => SchemaType::String,
            None => SchemaType::Unknown,
        }
    }
}

fn type_token(token: &str) -> Option<SchemaType> {
    match token {
        "string" => Some(SchemaType::String),
        "integer" | "int" => Some(SchemaType::Integer),
        "numeric" | "number" | "decimal" | "float" => Some(SchemaType::Number),
        "boolean" | "bool" => Some(SchemaType::Boolean),
        "array" | "list" => Some(SchemaType::Array),
        "object" | "json" => Some(SchemaType::Object),
        _ => None,
    }
}

/// Splits a rule value into tokens.
///
/// Strings split on `|`; arrays keep their string elements and skip
/// anything else (rule objects, closures serialized as maps). Any other
/// value yields no tokens.
#[must_use]
pub fn tokenize(rule: &Value) -> Vec<String> {
    match rule {
        Value::String(text) => text
            .split('|')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .flat_map(|s| tokenize(&Value::String(s.to_string())))
            .collect(),
        _ => Vec::new(),
    }
}

/// Parses tokens into flags, type and constraints.
///
/// Unknown tokens are ignored.
#[must_use]
pub fn parse_tokens<S: AsRef<str>>(tokens: &[S]) -> ParsedRule {
    let mut parsed = ParsedRule::default();
    for token in tokens {
        let token = token.as_ref();
        let (name, param) = match token.split_once(':') {
            Some((name, param)) => (name.trim(), Some(param)),
            None => (token, None),
        };
        let name = name.to_ascii_lowercase();

        match (name.as_str(), param) {
            ("required", None) => parsed.required = true,
            ("nullable", None) => parsed.nullable = true,
            (n, Some(p)) if PARAMETRIZED.contains(&n) => {
                parsed.constraints.push((n.to_string(), p.to_string()));
            }
            (n, None) if FORMATS.contains(&n) => {
                parsed.constraints.push(("format".to_string(), n.to_string()));
            }
            (n, None) => {
                if parsed.schema_type.is_none() {
                    parsed.schema_type = type_token(n);
                }
            }
            _ => {}
        }
    }
    parsed
}

/// Normalises a field name to dotted segments.
///
/// `items[][sku]` → `["items", "*", "sku"]`, `tags.0` → `["tags", "*"]`.
#[must_use]
pub fn field_segments(field: &str) -> Vec<String> {
    let dotted = field.replace("[]", ".*").replace('[', ".").replace(']', "");
    dotted
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.chars().all(|c| c.is_ascii_digit()) {
                "*".to_string()
            } else {
                s.to_string()
            }
        })
        .collect()
}

/// Applies a parsed rule to the node it names.
fn apply_rule(node: &mut NodeBuilder, rule: &ParsedRule) {
    node.required |= rule.required;
    node.nullable |= rule.nullable;
    for (key, value) in &rule.constraints {
        node.constraints.insert(key.clone(), value.clone());
    }

    let declared = rule.effective_type();
    if declared == SchemaType::Unknown {
        return;
    }
    // Folded children/items win over a conflicting declaration.
    if node.has_structure() && declared != node.schema_type {
        return;
    }
    node.schema_type = declared;
}

/// Folds a whole rule set into an object schema.
///
/// Returns `None` when `rules` is not a JSON object.
#[must_use]
pub fn schema_from_rules(rules: &Value) -> Option<SchemaNode> {
    let map = rules.as_object()?;
    let mut root = NodeBuilder::new(SchemaType::Object);

    for (field, rule) in map {
        let segments = field_segments(field);
        if segments.is_empty() {
            continue;
        }
        let mut cursor = &mut root;
        for segment in &segments {
            cursor = if segment == "*" {
                cursor.items_mut()
            } else {
                cursor.child_mut(segment)
            };
        }
        let parsed = parse_tokens(&tokenize(rule));
        apply_rule(cursor, &parsed);
    }

    root.schema_type = SchemaType::Object;
    Some(root.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_tokenize_string_and_list() {
        assert_eq!(tokenize(&json!("required|string|max:255")), vec!["required", "string", "max:255"]);
        assert_eq!(
            tokenize(&json!(["required", {"rule": "custom"}, "integer|min:1"])),
            vec!["required", "integer", "min:1"]
        );
        assert!(tokenize(&json!(42)).is_empty());
    }

    #[test]
    fn test_parse_tokens() {
        let parsed = parse_tokens(&["required", "string", "integer", "max:255", "in:a,b,c", "bogus"]);
        assert_eq!(parsed.schema_type, Some(SchemaType::String));
        assert!(parsed.required);
        assert!(!parsed.nullable);
        assert_eq!(
            parsed.constraints,
            vec![
                ("max".to_string(), "255".to_string()),
                ("in".to_string(), "a,b,c".to_string())
            ]
        );
    }

    #[test]
    fn test_format_implies_string_only_without_type() {
        let parsed = parse_tokens(&["email"]);
        assert_eq!(parsed.schema_type, None);
        assert_eq!(parsed.effective_type(), SchemaType::String);

        let parsed = parse_tokens(&["nullable", "bogus"]);
        assert_eq!(parsed.effective_type(), SchemaType::Unknown);
        assert!(parsed.nullable);
    }

    #[test]
    fn test_field_segments() {
        assert_eq!(field_segments("address.city"), vec!["address", "city"]);
        assert_eq!(field_segments("items.*.sku"), vec!["items", "*", "sku"]);
        assert_eq!(field_segments("items[][sku]"), vec!["items", "*", "sku"]);
        assert_eq!(field_segments("address[city]"), vec!["address", "city"]);
        assert_eq!(field_segments("tags.0"), vec!["tags", "*"]);
    }

    #[test]
    fn test_rule_parsing_determinism() {
        let schema = schema_from_rules(&json!({
            "title": "required|string|max:255",
            "tags.*": "string"
        }))
        .unwrap();

        let title = schema.child("title").unwrap();
        assert_eq!(title.schema_type(), SchemaType::String);
        assert!(title.is_required());
        assert_eq!(title.constraint("max"), Some("255"));
        assert_eq!(title.constraints().len(), 1);

        let tags = schema.child("tags").unwrap();
        assert_eq!(tags.schema_type(), SchemaType::Array);
        assert!(!tags.is_required());
        assert_eq!(tags.items().unwrap().schema_type(), SchemaType::String);
    }

    #[test]
    fn test_nested_objects_and_arrays() {
        let schema = schema_from_rules(&json!({
            "address": "required|array",
            "address.city": "required|string",
            "items": "required|array|min:1",
            "items.*.sku": "required|string",
            "items.*.qty": "integer|min:1"
        }))
        .unwrap();

        let address = schema.child("address").unwrap();
        assert_eq!(address.schema_type(), SchemaType::Object);
        assert!(address.is_required());
        assert_eq!(address.child("city").unwrap().schema_type(), SchemaType::String);

        let items = schema.child("items").unwrap();
        assert_eq!(items.schema_type(), SchemaType::Array);
        assert_eq!(items.constraint("min"), Some("1"));
        let element = items.items().unwrap();
        assert_eq!(element.schema_type(), SchemaType::Object);
        assert!(element.child("sku").unwrap().is_required());
        assert_eq!(element.child("qty").unwrap().schema_type(), SchemaType::Integer);
    }

    #[test]
    fn test_child_rule_before_parent_rule() {
        let schema = schema_from_rules(&json!({
            "meta.version": "integer",
            "meta": "required"
        }))
        .unwrap();

        let meta = schema.child("meta").unwrap();
        assert_eq!(meta.schema_type(), SchemaType::Object);
        assert!(meta.is_required());
        assert_eq!(meta.child("version").unwrap().schema_type(), SchemaType::Integer);
    }

    #[test]
    fn test_unknown_tokens_still_emit_field() {
        let schema = schema_from_rules(&json!({"avatar": "sometimes|dimensions:min_width=100"})).unwrap();
        let avatar = schema.child("avatar").unwrap();
        assert_eq!(avatar.schema_type(), SchemaType::Unknown);
        assert!(!avatar.is_required());
        assert!(avatar.constraints().is_empty());
    }

    #[test]
    fn test_non_object_rules_rejected() {
        assert!(schema_from_rules(&json!(["required"])).is_none());
        assert!(schema_from_rules(&json!("required")).is_none());
    }
}
