//! Parent/child tree shaping for the menu and function-tree endpoints.

use gridgate_core::{Row, SqlValue};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};

/// Where the top level of a tree hangs.
#[derive(Debug, Clone, Copy)]
pub enum TreeRoot<'a> {
    /// Rows whose parent column is null or blank.
    Orphans,
    /// Rows whose parent column equals this key (case-insensitive).
    Key(&'a str),
}

fn key_of(row: &Row, column: &str) -> Option<String> {
    row.get_ignore_case(column).and_then(SqlValue::key_text)
}

/// Groups rows by parent key and shapes each node with `shape(row, depth, children)`.
///
/// Row order is kept within every level. A row already on the current path
/// is not descended into again.
pub struct TreeBuilder<'a> {
    id_column: &'a str,
    children: HashMap<Option<String>, Vec<&'a Row>>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(rows: &'a [Row], id_column: &'a str, parent_column: &str) -> Self {
        let mut children: HashMap<Option<String>, Vec<&'a Row>> = HashMap::new();
        for row in rows {
            children
                .entry(key_of(row, parent_column))
                .or_default()
                .push(row);
        }
        Self {
            id_column,
            children,
        }
    }

    pub fn build<F>(&self, root: TreeRoot<'_>, shape: F) -> Vec<Value>
    where
        F: Fn(&Row, usize, Vec<Value>) -> Value,
    {
        let root_key = match root {
            TreeRoot::Orphans => None,
            TreeRoot::Key(key) => SqlValue::from(key).key_text(),
        };
        let mut path = HashSet::new();
        self.level(&root_key, 0, &mut path, &shape)
    }

    fn level<F>(
        &self,
        parent: &Option<String>,
        depth: usize,
        path: &mut HashSet<String>,
        shape: &F,
    ) -> Vec<Value>
    where
        F: Fn(&Row, usize, Vec<Value>) -> Value,
    {
        let Some(rows) = self.children.get(parent) else {
            return Vec::new();
        };

        let mut nodes = Vec::with_capacity(rows.len());
        for row in rows {
            let id = key_of(row, self.id_column);
            let children = match &id {
                Some(id) if path.insert(id.clone()) => {
                    let nested = self.level(&Some(id.clone()), depth + 1, path, shape);
                    path.remove(id);
                    nested
                }
                Some(id) => {
                    tracing::warn!(id = %id, "cycle in tree data, children skipped");
                    Vec::new()
                }
                None => Vec::new(),
            };
            nodes.push(shape(row, depth, children));
        }
        nodes
    }
}

fn cell(row: &Row, column: &str) -> Value {
    row.get_ignore_case(column)
        .map(SqlValue::to_json)
        .unwrap_or(Value::Null)
}

/// The `meta` column holds a JSON object; anything else becomes `{}`.
pub fn parse_meta(raw: Option<&SqlValue>) -> Value {
    match raw {
        Some(SqlValue::Text(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Value::Object(map),
            _ => Value::Object(Map::new()),
        },
        _ => Value::Object(Map::new()),
    }
}

/// Menu rows to `{name, path, component, meta, children}`.
///
/// Top-level entries are layout routes and carry no component.
pub fn menu_tree(rows: &[Row]) -> Vec<Value> {
    TreeBuilder::new(rows, "id", "parent_id").build(TreeRoot::Orphans, |row, depth, children| {
        let mut node = Map::new();
        node.insert("name".into(), cell(row, "name"));
        node.insert("path".into(), cell(row, "path"));
        if depth > 0 {
            node.insert("component".into(), cell(row, "component"));
        }
        node.insert("meta".into(), parse_meta(row.get_ignore_case("meta")));
        node.insert("children".into(), Value::Array(children));
        Value::Object(node)
    })
}

/// Function rows (`id`, `parent_id`, `title`) to `{key, id, title, children}`.
pub fn function_tree(rows: &[Row], root: &str) -> Vec<Value> {
    TreeBuilder::new(rows, "id", "parent_id").build(TreeRoot::Key(root), |row, _, children| {
        json!({
            "key": cell(row, "id"),
            "id": cell(row, "id"),
            "title": cell(row, "title"),
            "children": children,
        })
    })
}
