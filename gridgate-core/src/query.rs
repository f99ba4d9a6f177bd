//! Query assembly: table whitelist, field list, WHERE, ORDER BY and paging
//! combined into a data statement and a matching COUNT statement.

use serde::Deserialize;
use tracing::debug;

use crate::compiler::{compile_where, WhereClause};
use crate::error::{GridError, GridResult};
use crate::filter::{compile_flat_params, parse_filter};
use crate::ident::{is_valid_identifier, is_valid_object_name, quote};
use crate::model::{SimpleWhere, WhereNode};
use crate::select::SelectFields;
use crate::value::Param;

/// Statically configured set of queryable tables.
///
/// Membership is case-insensitive; SQL always uses the configured spelling.
#[derive(Debug, Clone, Default)]
pub struct TableWhitelist {
    tables: Vec<String>,
}

impl TableWhitelist {
    pub fn new<I, S>(tables: I) -> GridResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list: Vec<String> = Vec::new();
        for table in tables {
            let table = table.as_ref().trim();
            if !is_valid_object_name(table) {
                return Err(GridError::InvalidIdentifier(table.to_string()));
            }
            if !list.iter().any(|t| t.eq_ignore_ascii_case(table)) {
                list.push(table.to_string());
            }
        }
        Ok(Self { tables: list })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        self.tables
            .iter()
            .find(|t| t.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    /// Canonical spelling of an allowed table.
    pub fn resolve(&self, name: &str) -> GridResult<&str> {
        if name.trim().is_empty() {
            return Err(GridError::BadRequest("tableName is required".to_string()));
        }
        self.lookup(name)
            .ok_or_else(|| GridError::TableNotAllowed(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub max_page_size: i64,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_page_size: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `desc` in any case, everything else ascending.
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some(s) if s.trim().eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A structured query request as sent by the grid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub query_field: Option<String>,
    #[serde(default, rename = "where")]
    pub where_node: Option<WhereNode>,
    #[serde(default)]
    pub simple_where: Option<SimpleWhere>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
}

impl QuerySpec {
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            ..Default::default()
        }
    }

    /// Build from query-string pairs. Known keys fill the query; every other
    /// key becomes a `simpleWhere` entry.
    pub fn from_pairs(pairs: &[(String, String)]) -> GridResult<Self> {
        let mut request = QuerySpec::default();
        let mut simple = SimpleWhere::new();

        for (key, value) in pairs {
            match key.to_ascii_lowercase().as_str() {
                "tablename" => request.table_name = value.clone(),
                "queryfield" => request.query_field = Some(value.clone()),
                "sortby" => request.sort_by = Some(value.clone()),
                "sortorder" => request.sort_order = Some(value.clone()),
                "page" => request.page = parse_number("page", value)?,
                "pagesize" => request.page_size = parse_number("pageSize", value)?,
                _ => {
                    simple.insert(key.clone(), value.clone());
                }
            }
        }

        if !simple.is_empty() {
            request.simple_where = Some(simple);
        }
        Ok(request)
    }
}

fn parse_number(name: &str, value: &str) -> GridResult<Option<i64>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<i64>()
        .map(Some)
        .map_err(|_| GridError::InvalidPaging(format!("{} must be an integer, got {}", name, value)))
}

/// The legacy GET listing: either a filter expression or flat parameters,
/// plus `orderBy` and `top`.
#[derive(Debug, Clone, Default)]
pub struct ListingRequest {
    pub table_name: String,
    pub filter: Option<String>,
    pub order_by: Option<String>,
    pub top: Option<i64>,
    pub params: Vec<(String, String)>,
}

impl ListingRequest {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> GridResult<Self> {
        let mut req = ListingRequest::default();
        for (key, value) in &pairs {
            if key.eq_ignore_ascii_case("tableName") {
                req.table_name = value.clone();
            } else if key.eq_ignore_ascii_case("filter") {
                req.filter = Some(value.clone());
            } else if key.eq_ignore_ascii_case("orderBy") {
                req.order_by = Some(value.clone());
            } else if key.eq_ignore_ascii_case("top") {
                req.top = parse_number("top", value)?;
            }
        }
        req.params = pairs;
        Ok(req)
    }
}

/// A ready-to-run statement pair sharing one parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub data_sql: String,
    pub count_sql: String,
    pub params: Vec<Param>,
}

/// Turns requests into parameterized statements.
#[derive(Debug, Clone, Default)]
pub struct QueryAssembler {
    tables: TableWhitelist,
    limits: QueryLimits,
}

impl QueryAssembler {
    pub fn new(tables: TableWhitelist, limits: QueryLimits) -> Self {
        Self { tables, limits }
    }

    pub fn tables(&self) -> &TableWhitelist {
        &self.tables
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    /// Paged listing with a total count.
    pub fn build(&self, request: &QuerySpec) -> GridResult<BuiltQuery> {
        let table = self.tables.resolve(&request.table_name)?;
        let fields = SelectFields::parse(request.query_field.as_deref())?;
        let clause = where_clause(request)?;
        let order = sort_clause(request)?;
        let window = self.page_window(request.page, request.page_size)?;

        Ok(self.assemble(table, &fields, clause, order, window))
    }

    /// First column of the first match. Exactly one plain field is allowed.
    pub fn build_scalar(&self, request: &QuerySpec) -> GridResult<BuiltQuery> {
        let table = self.tables.resolve(&request.table_name)?;
        let fields = SelectFields::parse(request.query_field.as_deref())?;
        match fields.items() {
            [item] if item.alias.is_none() => {}
            _ => {
                return Err(GridError::BadRequest(
                    "scalar query needs exactly one field without alias".to_string(),
                ))
            }
        }
        let clause = where_clause(request)?;
        let order = sort_clause(request)?;

        Ok(self.assemble(table, &fields, clause, order, Some((0, 1))))
    }

    /// Full matched row set, paging ignored.
    pub fn build_export(&self, request: &QuerySpec) -> GridResult<BuiltQuery> {
        let table = self.tables.resolve(&request.table_name)?;
        let fields = SelectFields::parse(request.query_field.as_deref())?;
        let clause = where_clause(request)?;
        let order = sort_clause(request)?;

        Ok(self.assemble(table, &fields, clause, order, None))
    }

    /// The GET listing path.
    pub fn build_listing(&self, req: &ListingRequest) -> GridResult<BuiltQuery> {
        let table = self.tables.resolve(&req.table_name)?;

        let clause = match req.filter.as_deref().map(str::trim) {
            Some(expr) if !expr.is_empty() => parse_filter(expr)?,
            _ => compile_flat_params(&req.params)?,
        };
        let order = parse_order_by(req.order_by.as_deref())?;

        let window = match req.top {
            Some(top) => {
                self.check_page_size("top", top)?;
                Some((0, top))
            }
            None => None,
        };

        Ok(self.assemble(table, &SelectFields::all(), clause, order, window))
    }

    fn check_page_size(&self, name: &str, size: i64) -> GridResult<()> {
        if size < 1 {
            return Err(GridError::InvalidPaging(format!(
                "{} must be at least 1, got {}",
                name, size
            )));
        }
        if size > self.limits.max_page_size {
            return Err(GridError::InvalidPaging(format!(
                "{} must not exceed {}, got {}",
                name, self.limits.max_page_size, size
            )));
        }
        Ok(())
    }

    /// `(offset, rows)` when both page values are present.
    fn page_window(&self, page: Option<i64>, page_size: Option<i64>) -> GridResult<Option<(i64, i64)>> {
        if let Some(page) = page {
            if page < 1 {
                return Err(GridError::InvalidPaging(format!(
                    "page must be at least 1, got {}",
                    page
                )));
            }
        }
        if let Some(size) = page_size {
            self.check_page_size("pageSize", size)?;
        }

        match (page, page_size) {
            (Some(page), Some(size)) => {
                let offset = (page - 1)
                    .checked_mul(size)
                    .ok_or_else(|| GridError::InvalidPaging(format!("page {} is out of range", page)))?;
                Ok(Some((offset, size)))
            }
            _ => Ok(None),
        }
    }

    fn assemble(
        &self,
        table: &str,
        fields: &SelectFields,
        clause: WhereClause,
        order: Option<String>,
        window: Option<(i64, i64)>,
    ) -> BuiltQuery {
        let table = quote(table);
        let filter = clause.as_suffix();

        let count_sql = format!("SELECT COUNT(*) FROM {}{}", table, filter);
        let mut data_sql = format!("SELECT {} FROM {}{}", fields.to_sql(), table, filter);

        match (&order, window) {
            (Some(order), _) => {
                data_sql.push_str(" ORDER BY ");
                data_sql.push_str(order);
            }
            (None, Some(_)) => data_sql.push_str(" ORDER BY (SELECT NULL)"),
            (None, None) => {}
        }
        if let Some((offset, rows)) = window {
            data_sql.push_str(&format!(
                " OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
                offset, rows
            ));
        }

        debug!(sql = %data_sql, params = clause.params.len(), "assembled query");
        BuiltQuery {
            data_sql,
            count_sql,
            params: clause.params,
        }
    }
}

/// A present structured tree wins over `simpleWhere`.
fn where_clause(request: &QuerySpec) -> GridResult<WhereClause> {
    if let Some(node) = &request.where_node {
        return compile_where(node);
    }
    match request.simple_where.as_ref().and_then(WhereNode::from_simple) {
        Some(node) => compile_where(&node),
        None => Ok(WhereClause::default()),
    }
}

fn sort_clause(request: &QuerySpec) -> GridResult<Option<String>> {
    let field = match request.sort_by.as_deref().map(str::trim) {
        Some(field) if !field.is_empty() => field,
        _ => return Ok(None),
    };
    if !is_valid_identifier(field) {
        return Err(GridError::InvalidField(field.to_string()));
    }
    let direction = SortDirection::parse(request.sort_order.as_deref());
    Ok(Some(format!("{} {}", quote(field), direction.as_sql())))
}

/// `a, b desc` → `[a] ASC, [b] DESC`.
pub fn parse_order_by(raw: Option<&str>) -> GridResult<Option<String>> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let mut parts = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let mut segments = part.splitn(2, char::is_whitespace);
        let field = segments.next().unwrap_or_default();
        if !is_valid_identifier(field) {
            return Err(GridError::InvalidField(field.to_string()));
        }
        let direction = SortDirection::parse(segments.next());
        parts.push(format!("{} {}", quote(field), direction.as_sql()));
    }

    if parts.is_empty() {
        Ok(None)
    } else {
        Ok(Some(parts.join(", ")))
    }
}
