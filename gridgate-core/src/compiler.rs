//! Condition tree → parameterized WHERE fragment.
//!
//! The fragment never contains a value: every accepted leaf binds its
//! value through a [`ParamBinder`], whose counter is unique across the
//! whole tree so one flat parameter list serves the statement.

use tracing::debug;

use crate::error::{GridError, GridResult};
use crate::ident::{is_valid_identifier, quote};
use crate::model::{Operator, WhereNode};
use crate::value::{Param, SqlValue};

/// A compiled WHERE fragment (without the `WHERE` keyword) and its
/// parameters in emission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    pub sql: String,
    pub params: Vec<Param>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// ` WHERE <fragment>` or nothing.
    pub fn as_suffix(&self) -> String {
        if self.sql.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.sql)
        }
    }
}

/// Allocates sequential parameter names (`p0`, `p1`, ...) and collects
/// the bound values.
#[derive(Debug)]
pub struct ParamBinder {
    prefix: &'static str,
    next: usize,
    params: Vec<Param>,
}

impl ParamBinder {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: 0,
            params: Vec::new(),
        }
    }

    /// Bind a value and return its placeholder text.
    pub fn bind(&mut self, value: SqlValue) -> String {
        let param = Param {
            name: format!("{}{}", self.prefix, self.next),
            value,
        };
        self.next += 1;
        let placeholder = param.placeholder();
        self.params.push(param);
        placeholder
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn into_params(self) -> Vec<Param> {
        self.params
    }
}

/// Compile one leaf after validating its field.
pub(crate) fn compile_leaf(
    field: &str,
    op: Operator,
    value: &str,
    binder: &mut ParamBinder,
) -> GridResult<String> {
    if !is_valid_identifier(field) {
        return Err(GridError::InvalidField(field.to_string()));
    }
    let placeholder = binder.bind(SqlValue::Text(op.bind_value(value)));
    Ok(format!(
        "{} {} {}{}",
        quote(field),
        op.as_sql(),
        placeholder,
        op.escape_clause()
    ))
}

/// Compile a whole tree with a fresh parameter counter.
pub fn compile_where(node: &WhereNode) -> GridResult<WhereClause> {
    let mut binder = ParamBinder::new("p");
    let sql = compile_node(node, &mut binder)?;
    debug!(sql = %sql, params = binder.len(), "compiled where tree");
    Ok(WhereClause {
        sql,
        params: binder.into_params(),
    })
}

/// Compile one level. The returned fragment is empty when nothing at this
/// level (or below) survived.
pub fn compile_node(node: &WhereNode, binder: &mut ParamBinder) -> GridResult<String> {
    let mut clauses = Vec::new();

    for cond in node.conditions.iter().filter(|c| c.is_active()) {
        let op = Operator::from_name(&cond.operator)?;
        let value = cond.value.as_deref().unwrap_or_default();
        clauses.push(compile_leaf(cond.field.trim(), op, value, binder)?);
    }

    for group in &node.groups {
        let sub = compile_node(group, binder)?;
        if !sub.is_empty() {
            clauses.push(format!("({})", sub));
        }
    }

    Ok(clauses.join(&format!(" {} ", node.logic.as_sql())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Condition, Logic};

    fn cond(field: &str, op: &str, value: &str) -> Condition {
        Condition::new(field, op, Some(value))
    }

    fn texts(clause: &WhereClause) -> Vec<String> {
        clause.params.iter().map(|p| p.value.to_string()).collect()
    }

    #[test]
    fn test_empty_tree_compiles_to_nothing() {
        let node = WhereNode::new(Logic::Or)
            .with_condition(Condition::new("name", "eq", None))
            .with_condition(Condition::new("", "eq", Some("x")))
            .with_group(WhereNode::default())
            .with_group(WhereNode::default().with_group(WhereNode::default()));

        let clause = compile_where(&node).unwrap();
        assert_eq!(clause.sql, "");
        assert!(clause.params.is_empty());
        assert_eq!(clause.as_suffix(), "");
    }

    #[test]
    fn test_operators_wrap_bound_value() {
        let node = WhereNode::default()
            .with_condition(cond("a", "eq", "v"))
            .with_condition(cond("b", "contains", "v"))
            .with_condition(cond("c", "startswith", "v"))
            .with_condition(cond("d", "endswith", "v"));

        let clause = compile_where(&node).unwrap();
        assert_eq!(
            clause.sql,
            "[a] = @p0 AND [b] LIKE @p1 ESCAPE '\\' AND [c] LIKE @p2 ESCAPE '\\' AND [d] LIKE @p3 ESCAPE '\\'"
        );
        assert_eq!(texts(&clause), vec!["v", "%v%", "v%", "%v"]);
    }

    #[test]
    fn test_nested_groups_keep_their_own_logic() {
        let node = WhereNode::new(Logic::And)
            .with_condition(cond("status", "eq", "1"))
            .with_group(
                WhereNode::new(Logic::Or)
                    .with_condition(cond("code", "contains", "SY"))
                    .with_condition(cond("location", "contains", "广东")),
            );

        let clause = compile_where(&node).unwrap();
        assert_eq!(
            clause.sql,
            "[status] = @p0 AND ([code] LIKE @p1 ESCAPE '\\' OR [location] LIKE @p2 ESCAPE '\\')"
        );
        assert_eq!(texts(&clause), vec!["1", "%SY%", "%广东%"]);
    }

    #[test]
    fn test_parameter_names_unique_depth_first() {
        let node = WhereNode::new(Logic::Or)
            .with_condition(cond("a", "eq", "1"))
            .with_group(
                WhereNode::default()
                    .with_condition(cond("b", "eq", "2"))
                    .with_group(WhereNode::default().with_condition(cond("c", "eq", "3"))),
            )
            .with_group(WhereNode::default().with_condition(cond("d", "eq", "4")));

        let clause = compile_where(&node).unwrap();
        let names: Vec<&str> = clause.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["p0", "p1", "p2", "p3"]);
        assert_eq!(texts(&clause), vec!["1", "2", "3", "4"]);
        assert_eq!(
            clause.sql,
            "[a] = @p0 OR ([b] = @p1 AND ([c] = @p2)) OR ([d] = @p3)"
        );
    }

    #[test]
    fn test_injection_stays_in_parameter() {
        let node = WhereNode::default().with_condition(cond("name", "eq", "x' OR '1'='1"));
        let clause = compile_where(&node).unwrap();
        assert_eq!(clause.sql, "[name] = @p0");
        assert_eq!(texts(&clause), vec!["x' OR '1'='1"]);
    }

    #[test]
    fn test_invalid_field_fails_whole_compile() {
        let node = WhereNode::default()
            .with_condition(cond("ok", "eq", "1"))
            .with_group(WhereNode::default().with_condition(cond("bad;drop", "eq", "1")));
        match compile_where(&node) {
            Err(GridError::InvalidField(f)) => assert_eq!(f, "bad;drop"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_operator_fails_whole_compile() {
        let node = WhereNode::default().with_condition(cond("age", "gt", "1"));
        match compile_where(&node) {
            Err(GridError::UnsupportedOperator(op)) => assert_eq!(op, "gt"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_operator_case_insensitive() {
        let node = WhereNode::default().with_condition(cond("name", "StartsWith", "Al"));
        let clause = compile_where(&node).unwrap();
        assert_eq!(clause.sql, "[name] LIKE @p0 ESCAPE '\\'");
        assert_eq!(texts(&clause), vec!["Al%"]);
    }
}
