//! Structural comparison of contracts.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

use super::result::{DiffResult, FieldChange, ModifiedEntry};
use crate::contract::{Contract, ContractEntry, ContractStore, RouteKey};
use crate::events::ErrorSink;
use crate::routes::RouteDescriptor;
use crate::schema::SchemaNode;

/// Compares contracts entry by entry and field by field.
///
/// Output order is deterministic: `added` follows the newer contract,
/// `removed` and `modified` follow the older one, and field changes follow
/// a fixed traversal (top-level fields, path parameters, request schema,
/// response schema).
#[derive(Debug, Clone, Copy, Default)]
pub struct ContractDiffEngine;

impl ContractDiffEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Differences from `before` to `after`.
    #[must_use]
    pub fn diff(&self, before: &Contract, after: &Contract) -> DiffResult {
        let mut result = DiffResult::default();

        for (path, method, old) in before.iter() {
            match after.get(path, method) {
                None => result.removed.push(RouteKey::new(path, method)),
                Some(new) => {
                    let field_changes = diff_entries(old, new);
                    if !field_changes.is_empty() {
                        result.modified.push(ModifiedEntry {
                            path: path.to_string(),
                            method,
                            field_changes,
                        });
                    }
                }
            }
        }

        result.added = after
            .iter()
            .filter(|(path, method, _)| !before.contains(path, *method))
            .map(|(path, method, _)| RouteKey::new(path, method))
            .collect();

        debug!(summary = %result.summary(), "Contracts compared");
        result
    }

    /// Compares a stored contract with one built from the live routes.
    pub fn validate(
        &self,
        live_routes: &[RouteDescriptor],
        stored: &Contract,
        store: &ContractStore,
        sink: &dyn ErrorSink,
    ) -> DiffResult {
        let live = store.build(live_routes, sink);
        self.diff(stored, &live)
    }
}

/// Accumulates changes under dotted paths.
#[derive(Default)]
struct Changes {
    changes: Vec<FieldChange>,
}

impl Changes {
    /// Records a change when the two sides differ.
    fn compare(&mut self, path: String, before: Option<Value>, after: Option<Value>) {
        if before != after {
            self.changes.push(FieldChange {
                field_path: path,
                before,
                after,
            });
        }
    }

    fn leaf(&mut self, path: String, before: Value, after: Value) {
        self.compare(path, Some(before), Some(after));
    }
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Names in `before`'s order followed by names only in `after`.
fn union_names<'a>(
    before: impl Iterator<Item = &'a str>,
    after: impl Iterator<Item = &'a str>,
) -> Vec<&'a str> {
    let mut names: Vec<&str> = before.collect();
    for name in after {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

fn diff_entries(before: &ContractEntry, after: &ContractEntry) -> Vec<FieldChange> {
    let mut changes = Changes::default();

    changes.leaf(
        "description".into(),
        Value::from(before.description.as_str()),
        Value::from(after.description.as_str()),
    );
    changes.leaf(
        "auth.type".into(),
        Value::from(before.auth.auth_type.as_str()),
        Value::from(after.auth.auth_type.as_str()),
    );
    changes.compare(
        "api_version".into(),
        before.api_version.as_deref().map(Value::from),
        after.api_version.as_deref().map(Value::from),
    );

    match (&before.rate_limit, &after.rate_limit) {
        (Some(old), Some(new)) => {
            changes.leaf(
                "rate_limit.name".into(),
                Value::from(old.name.as_str()),
                Value::from(new.name.as_str()),
            );
            changes.leaf(
                "rate_limit.description".into(),
                Value::from(old.description.as_str()),
                Value::from(new.description.as_str()),
            );
        }
        (old, new) => changes.compare(
            "rate_limit".into(),
            old.as_ref().map(to_json),
            new.as_ref().map(to_json),
        ),
    }

    changes.compare(
        "status_codes".into(),
        before.status_codes.as_ref().map(to_json),
        after.status_codes.as_ref().map(to_json),
    );

    let header_names = union_names(
        before.custom_headers.iter().map(|h| h.name.as_str()),
        after.custom_headers.iter().map(|h| h.name.as_str()),
    );
    for name in header_names {
        let old = before.custom_headers.iter().find(|h| h.name == name);
        let new = after.custom_headers.iter().find(|h| h.name == name);
        let base = format!("custom_headers.{name}");
        match (old, new) {
            (Some(old), Some(new)) => {
                changes.leaf(
                    format!("{base}.required"),
                    Value::Bool(old.required),
                    Value::Bool(new.required),
                );
                changes.leaf(
                    format!("{base}.description"),
                    Value::from(old.description.as_str()),
                    Value::from(new.description.as_str()),
                );
            }
            (old, new) => changes.compare(base, old.map(to_json), new.map(to_json)),
        }
    }

    let param_names = union_names(
        before.path_parameters.keys().map(String::as_str),
        after.path_parameters.keys().map(String::as_str),
    );
    for name in param_names {
        let base = format!("path_parameters.{name}");
        match (before.path_parameters.get(name), after.path_parameters.get(name)) {
            (Some(old), Some(new)) => {
                changes.leaf(
                    format!("{base}.type"),
                    Value::from(old.param_type.as_str()),
                    Value::from(new.param_type.as_str()),
                );
                changes.leaf(
                    format!("{base}.required"),
                    Value::Bool(old.required),
                    Value::Bool(new.required),
                );
            }
            (old, new) => changes.compare(base, old.map(to_json), new.map(to_json)),
        }
    }

    diff_nodes(&mut changes, "request_schema", &before.request_schema, &after.request_schema);
    diff_nodes(&mut changes, "response_schema", &before.response_schema, &after.response_schema);

    changes.changes
}

/// Pre-order walk of two schema trees present on both sides.
///
/// Node attributes sit directly under the node's path. Fields go under
/// `{path}.children.{name}` and the element schema under `{path}.items`,
/// so a field named `type` never shares a path with the node's own type.
fn diff_nodes(changes: &mut Changes, path: &str, before: &SchemaNode, after: &SchemaNode) {
    changes.leaf(
        format!("{path}.type"),
        Value::from(before.schema_type().as_str()),
        Value::from(after.schema_type().as_str()),
    );
    changes.leaf(
        format!("{path}.required"),
        Value::Bool(before.is_required()),
        Value::Bool(after.is_required()),
    );
    changes.leaf(
        format!("{path}.nullable"),
        Value::Bool(before.is_nullable()),
        Value::Bool(after.is_nullable()),
    );

    let keys: BTreeSet<&String> = before
        .constraints()
        .keys()
        .chain(after.constraints().keys())
        .collect();
    for key in keys {
        changes.compare(
            format!("{path}.constraints.{key}"),
            before.constraint(key).map(Value::from),
            after.constraint(key).map(Value::from),
        );
    }

    let items_path = format!("{path}.items");
    match (before.items(), after.items()) {
        (Some(old), Some(new)) => diff_nodes(changes, &items_path, old, new),
        (old, new) => changes.compare(
            items_path,
            old.map(SchemaNode::to_value),
            new.map(SchemaNode::to_value),
        ),
    }

    let names = union_names(
        before.children().keys().map(String::as_str),
        after.children().keys().map(String::as_str),
    );
    for name in names {
        let child_path = format!("{path}.children.{name}");
        match (before.child(name), after.child(name)) {
            (Some(old), Some(new)) => diff_nodes(changes, &child_path, old, new),
            (old, new) => changes.compare(
                child_path,
                old.map(SchemaNode::to_value),
                new.map(SchemaNode::to_value),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::AuthInfo;
    use crate::routes::{AuthType, HeaderRequirement, HttpMethod, RateLimit};
    use crate::schema::SchemaType;
    use crate::utils::OrderedMap;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn object(fields: Vec<(&str, SchemaNode)>) -> SchemaNode {
        SchemaNode::object(fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    fn entry(request: SchemaNode) -> ContractEntry {
        ContractEntry {
            request_schema: request,
            ..ContractEntry::new("Create a post")
        }
    }

    fn contract(entries: Vec<(&str, HttpMethod, ContractEntry)>) -> Contract {
        let mut contract = Contract::new();
        for (path, method, entry) in entries {
            contract.insert(path, method, entry);
        }
        contract
    }

    fn paths(changes: &[FieldChange]) -> Vec<&str> {
        changes.iter().map(|c| c.field_path.as_str()).collect()
    }

    #[test]
    fn test_identity() {
        let c = contract(vec![
            ("/posts", HttpMethod::Get, ContractEntry::new("List")),
            ("/posts", HttpMethod::Post, entry(object(vec![("title", SchemaNode::new(SchemaType::String))]))),
        ]);
        assert!(ContractDiffEngine::new().diff(&c, &c).is_empty());
    }

    #[test]
    fn test_added_removed_ordering() {
        let before = contract(vec![
            ("/a", HttpMethod::Get, ContractEntry::new("a")),
            ("/b", HttpMethod::Get, ContractEntry::new("b")),
            ("/c", HttpMethod::Get, ContractEntry::new("c")),
        ]);
        let after = contract(vec![
            ("/z", HttpMethod::Get, ContractEntry::new("z")),
            ("/b", HttpMethod::Get, ContractEntry::new("b")),
            ("/y", HttpMethod::Post, ContractEntry::new("y")),
        ]);

        let diff = ContractDiffEngine::new().diff(&before, &after);
        assert_eq!(
            diff.added,
            vec![RouteKey::new("/z", HttpMethod::Get), RouteKey::new("/y", HttpMethod::Post)]
        );
        assert_eq!(
            diff.removed,
            vec![RouteKey::new("/a", HttpMethod::Get), RouteKey::new("/c", HttpMethod::Get)]
        );
        assert!(diff.modified.is_empty());
    }

    #[test]
    fn test_symmetry() {
        let before = contract(vec![
            ("/a", HttpMethod::Get, ContractEntry::new("a")),
            ("/b", HttpMethod::Post, entry(object(vec![("x", SchemaNode::new(SchemaType::String))]))),
        ]);
        let after = contract(vec![
            ("/b", HttpMethod::Post, entry(object(vec![("x", SchemaNode::new(SchemaType::Integer))]))),
            ("/c", HttpMethod::Get, ContractEntry::new("c")),
        ]);

        let engine = ContractDiffEngine::new();
        let forward = engine.diff(&before, &after);
        let backward = engine.diff(&after, &before);

        assert_eq!(forward.added, backward.removed);
        assert_eq!(forward.removed, backward.added);
        assert_eq!(forward.modified.len(), backward.modified.len());
        for (f, b) in forward.modified.iter().zip(&backward.modified) {
            assert_eq!(paths(&f.field_changes), paths(&b.field_changes));
            for (fc, bc) in f.field_changes.iter().zip(&b.field_changes) {
                assert_eq!(fc.before, bc.after);
                assert_eq!(fc.after, bc.before);
            }
        }
    }

    #[test]
    fn test_field_change_ordering() {
        let mut old = entry(object(vec![
            ("title", SchemaNode::new(SchemaType::String).required(true).with_constraint("max", "255")),
            (
                "tags",
                SchemaNode::array(Some(SchemaNode::new(SchemaType::String))),
            ),
            ("gone", SchemaNode::new(SchemaType::Boolean)),
        ]));
        old.response_schema = object(vec![("id", SchemaNode::new(SchemaType::Integer))]);
        old.path_parameters = [("post".to_string(), crate::routes::PathParameter {
            param_type: SchemaType::String,
            required: true,
        })]
        .into_iter()
        .collect::<OrderedMap<_, _>>();

        let mut new = entry(object(vec![
            ("fresh", SchemaNode::new(SchemaType::String)),
            (
                "title",
                SchemaNode::new(SchemaType::String)
                    .required(true)
                    .with_constraint("max", "120")
                    .with_constraint("min", "3"),
            ),
            (
                "tags",
                SchemaNode::array(Some(SchemaNode::new(SchemaType::Integer))),
            ),
        ]));
        new.description = "Publish a post".into();
        new.auth = AuthInfo { auth_type: AuthType::Bearer };
        new.api_version = Some("v1".into());
        new.rate_limit = Some(RateLimit { name: "api".into(), description: "API".into() });
        new.custom_headers = vec![HeaderRequirement {
            name: "X-Tenant-Id".into(),
            required: true,
            description: String::new(),
        }];
        new.response_schema = object(vec![("id", SchemaNode::new(SchemaType::String))]);
        new.path_parameters = [("post".to_string(), crate::routes::PathParameter {
            param_type: SchemaType::Integer,
            required: true,
        })]
        .into_iter()
        .collect::<OrderedMap<_, _>>();

        let before = contract(vec![("/posts/{post}", HttpMethod::Put, old)]);
        let after = contract(vec![("/posts/{post}", HttpMethod::Put, new)]);
        let diff = ContractDiffEngine::new().diff(&before, &after);

        assert_eq!(diff.modified.len(), 1);
        let changes = &diff.modified[0].field_changes;
        assert_eq!(
            paths(changes),
            vec![
                "description",
                "auth.type",
                "api_version",
                "rate_limit",
                "custom_headers.X-Tenant-Id",
                "path_parameters.post.type",
                "request_schema.children.title.constraints.max",
                "request_schema.children.title.constraints.min",
                "request_schema.children.tags.items.type",
                "request_schema.children.gone",
                "request_schema.children.fresh",
                "response_schema.children.id.type",
            ]
        );
        assert_eq!(changes[2].before, None);
        assert_eq!(changes[2].after, Some(json!("v1")));
        assert_eq!(changes[9].after, None);
        assert_eq!(changes[9].before.as_ref().unwrap()["type"], "boolean");
        assert_eq!(changes[11].before, Some(json!("integer")));
    }

    #[test]
    fn test_items_presence_recorded_as_subtree() {
        let before = contract(vec![("/a", HttpMethod::Get, entry(object(vec![("l", SchemaNode::array(None))])))]);
        let after = contract(vec![(
            "/a",
            HttpMethod::Get,
            entry(object(vec![("l", SchemaNode::array(Some(SchemaNode::new(SchemaType::String))))])),
        )]);

        let diff = ContractDiffEngine::new().diff(&before, &after);
        let changes = &diff.modified[0].field_changes;
        assert_eq!(paths(changes), vec!["request_schema.children.l.items"]);
        assert_eq!(changes[0].after.as_ref().unwrap()["type"], "string");
    }

    #[test]
    fn test_field_named_type_does_not_collide_with_node_type() {
        let before = contract(vec![(
            "/a",
            HttpMethod::Post,
            entry(object(vec![("type", SchemaNode::new(SchemaType::String))])),
        )]);
        let after = contract(vec![(
            "/a",
            HttpMethod::Post,
            entry(SchemaNode::array(Some(SchemaNode::new(SchemaType::String)))),
        )]);

        let diff = ContractDiffEngine::new().diff(&before, &after);
        let changes = &diff.modified[0].field_changes;
        assert_eq!(
            paths(changes),
            vec![
                "request_schema.type",
                "request_schema.items",
                "request_schema.children.type",
            ]
        );
        assert_eq!(changes[2].after, None);
        assert_eq!(changes[2].before.as_ref().unwrap()["type"], "string");
    }
}
