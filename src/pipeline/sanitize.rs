//! Sanitisation: strip engine-internal fields from a block tree.
//!
//! The engine's JSON renderer annotates every block with layout geometry
//! (`polygon`, `bbox`) and the document root with bookkeeping (`metadata`,
//! `block_type`). None of it is content, so it is removed before the tree
//! is written.
//!
//! Two policies apply and must stay distinct:
//!
//! | Fields | Removed from |
//! |--------|--------------|
//! | `metadata`, `block_type` | the root mapping only |
//! | `polygon`, `bbox` | every mapping at every depth |
//!
//! Nested `block_type` values identify headings, tables, list items, … and
//! are kept.
//!
//! Removal is keyed on the field name alone. A domain field that happens to
//! be called `polygon` or `bbox` deep in the tree is removed too; use a
//! custom [`Sanitizer`] if your schema needs those names.

use serde_json::{Map, Value};
use tracing::debug;

/// Removed from the root mapping only.
pub const ROOT_FIELDS: &[&str] = &["metadata", "block_type"];

/// Removed from every mapping in the tree.
pub const GEOMETRY_FIELDS: &[&str] = &["polygon", "bbox"];

/// Sanitise `value` in place with the default field lists.
///
/// Idempotent: a second pass finds nothing left to remove.
pub fn sanitize(value: &mut Value) {
    Sanitizer::default().apply(value);
}

/// Configurable field-removal policy.
///
/// ```rust
/// use pdf2struct::pipeline::sanitize::Sanitizer;
/// use serde_json::json;
///
/// let mut tree = json!({"block_type": "Document", "children": [{"html": "<p>Hi</p>", "bbox": [0, 0, 1, 1]}]});
/// Sanitizer::default().apply(&mut tree);
/// assert_eq!(tree, json!({"children": [{"html": "<p>Hi</p>"}]}));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitizer {
    root_fields: Vec<String>,
    node_fields: Vec<String>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self {
            root_fields: ROOT_FIELDS.iter().map(|s| s.to_string()).collect(),
            node_fields: GEOMETRY_FIELDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Sanitizer {
    /// A sanitiser that removes nothing.
    pub fn empty() -> Self {
        Self {
            root_fields: Vec::new(),
            node_fields: Vec::new(),
        }
    }

    /// Also remove `field` from the root mapping.
    pub fn strip_root(mut self, field: impl Into<String>) -> Self {
        self.root_fields.push(field.into());
        self
    }

    /// Also remove `field` from every mapping in the tree.
    pub fn strip_everywhere(mut self, field: impl Into<String>) -> Self {
        self.node_fields.push(field.into());
        self
    }

    /// Stop removing `field` under either policy.
    pub fn keep(mut self, field: &str) -> Self {
        self.root_fields.retain(|f| f != field);
        self.node_fields.retain(|f| f != field);
        self
    }

    /// Run both policies over `value`.
    pub fn apply(&self, value: &mut Value) {
        if let Value::Object(root) = value {
            remove_fields(root, &self.root_fields);
        }

        let mut removed = 0usize;
        walk_maps_mut(value, &mut |map| {
            removed += remove_fields(map, &self.node_fields);
        });
        debug!("Sanitised tree: {} nested fields removed", removed);
    }
}

/// Remove `fields` from `map`, keeping the order of what remains.
fn remove_fields(map: &mut Map<String, Value>, fields: &[String]) -> usize {
    fields
        .iter()
        .filter(|field| map.shift_remove(field.as_str()).is_some())
        .count()
}

/// Depth-first visitor over every mapping in a JSON tree.
///
/// `visit` sees a mapping before its values are walked, so keys it removes
/// are never descended into. Sequences are walked element by element;
/// scalars end the descent.
pub fn walk_maps_mut<F>(value: &mut Value, visit: &mut F)
where
    F: FnMut(&mut Map<String, Value>),
{
    match value {
        Value::Object(map) => {
            visit(map);
            for child in map.values_mut() {
                walk_maps_mut(child, visit);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_maps_mut(item, visit);
            }
        }
        _ => {}
    }
}
