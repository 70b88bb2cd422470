//! Diff output and compatibility classification.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::contract::RouteKey;
use crate::routes::HttpMethod;
use crate::utils::OrderedMap;

/// One differing leaf (or subtree, when presence differs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Dotted path inside the entry (`request_schema.children.title.type`).
    pub field_path: String,
    /// Value before; `None` when the field was absent.
    pub before: Option<Value>,
    /// Value after; `None` when the field was removed.
    pub after: Option<Value>,
}

impl FieldChange {
    /// The field exists only in the newer contract.
    #[must_use]
    pub fn is_addition(&self) -> bool {
        self.before.is_none() && self.after.is_some()
    }

    /// The field exists only in the older contract.
    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.before.is_some() && self.after.is_none()
    }
}

/// Field changes of one (path, method) present on both sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifiedEntry {
    /// URI template.
    pub path: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Changes in traversal order.
    pub field_changes: Vec<FieldChange>,
}

impl ModifiedEntry {
    /// Route key of the entry.
    #[must_use]
    pub fn key(&self) -> RouteKey {
        RouteKey::new(self.path.clone(), self.method)
    }
}

/// Methods gained or lost by one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSetChange {
    /// URI template.
    pub path: String,
    /// Methods only in the newer contract.
    pub added: Vec<HttpMethod>,
    /// Methods only in the older contract.
    pub removed: Vec<HttpMethod>,
}

/// Result of comparing two contracts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Pairs only in the newer contract, in its order.
    pub added: Vec<RouteKey>,
    /// Pairs only in the older contract, in its order.
    pub removed: Vec<RouteKey>,
    /// Pairs in both whose entries differ, in the older contract's order.
    pub modified: Vec<ModifiedEntry>,
}

impl DiffResult {
    /// True when the contracts are equivalent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// `"2 added, 1 removed, 3 modified"`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} added, {} removed, {} modified",
            self.added.len(),
            self.removed.len(),
            self.modified.len()
        )
    }

    /// Added and removed methods grouped by path.
    #[must_use]
    pub fn method_set_changes(&self) -> Vec<MethodSetChange> {
        let mut by_path: OrderedMap<String, MethodSetChange> = OrderedMap::new();
        for key in &self.removed {
            by_path
                .get_or_insert_with(key.path.clone(), || MethodSetChange::empty(&key.path))
                .removed
                .push(key.method);
        }
        for key in &self.added {
            by_path
                .get_or_insert_with(key.path.clone(), || MethodSetChange::empty(&key.path))
                .added
                .push(key.method);
        }
        by_path.into_iter().map(|(_, change)| change).collect()
    }

    /// Splits the differences into breaking changes and warnings.
    #[must_use]
    pub fn compatibility(&self) -> CompatibilityReport {
        let mut report = CompatibilityReport::default();

        for key in &self.removed {
            report.breaking.push(format!("Route {key} removed"));
        }
        for key in &self.added {
            report.warnings.push(format!("Route {key} added"));
        }
        for entry in &self.modified {
            let key = entry.key();
            for change in &entry.field_changes {
                let message = describe_change(&key, change);
                if is_breaking(change) {
                    report.breaking.push(message);
                } else {
                    report.warnings.push(message);
                }
            }
        }
        report
    }
}

impl MethodSetChange {
    fn empty(path: &str) -> Self {
        Self {
            path: path.to_string(),
            added: Vec::new(),
            removed: Vec::new(),
        }
    }
}

/// Breaking changes and warnings derived from a [`DiffResult`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityReport {
    /// Changes that can break existing clients.
    pub breaking: Vec<String>,
    /// Everything else.
    pub warnings: Vec<String>,
}

impl CompatibilityReport {
    /// True when nothing breaking was found.
    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.breaking.is_empty()
    }

    /// Human readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let status = if self.is_compatible() {
            "compatible"
        } else {
            "breaking"
        };
        format!(
            "{status} (breaking={}, warnings={})",
            self.breaking.len(),
            self.warnings.len()
        )
    }
}

fn describe_change(key: &RouteKey, change: &FieldChange) -> String {
    let path = &change.field_path;
    match (&change.before, &change.after) {
        (None, Some(_)) => format!("{key}: '{path}' added"),
        (Some(_), None) => format!("{key}: '{path}' removed"),
        (Some(before), Some(after)) => format!("{key}: '{path}' changed {before} -> {after}"),
        (None, None) => format!("{key}: '{path}' changed"),
    }
}

const SHAPE_ROOTS: &[&str] = &[
    "request_schema.",
    "response_schema.",
    "path_parameters.",
    "custom_headers.",
];

/// Attribute a leaf path ends in. Schema paths skip `children.{name}` and
/// `items` steps, so a field called `type` is never read as an attribute.
fn attribute(path: &str) -> Option<&str> {
    if !(path.starts_with("request_schema.") || path.starts_with("response_schema.")) {
        return path.rsplit('.').next();
    }
    let mut steps = path.split('.').skip(1);
    loop {
        match steps.next()? {
            "children" => {
                steps.next()?;
            }
            "items" => {}
            attr => return Some(attr),
        }
    }
}

fn is_breaking(change: &FieldChange) -> bool {
    let path = change.field_path.as_str();
    let in_request_body = path.starts_with("request_schema.");

    if change.is_removal() {
        return SHAPE_ROOTS.iter().any(|root| path.starts_with(root));
    }
    if change.is_addition() {
        let required = change
            .after
            .as_ref()
            .and_then(|v| v.get("required"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        return required && (in_request_body || path.starts_with("custom_headers."));
    }
    match attribute(path) {
        Some("type") => true,
        Some("required") if change.after == Some(Value::Bool(true)) => {
            in_request_body
                || path.starts_with("custom_headers.")
                || path.starts_with("path_parameters.")
        }
        _ => false,
    }
}
