//! gridgate-core - storage-independent query compilation and batch
//! reconciliation for data-grid backends.
//!
//! Nothing in this crate talks to a database directly. It produces
//! bracket-quoted SQL with `@name` parameters and runs it through the
//! [`Connection`] trait, so a server can plug in any driver.
//!
//! # Main Components
//!
//! - **Identifier checks**: the gate for every name written into SQL text
//! - **Compiler**: structured condition trees to parameterized WHERE fragments
//! - **Filter**: the legacy string expression and flat query parameters
//! - **Query assembler**: whitelist, field list, sort and paging
//! - **Batch engine**: delete / classify / upsert inside one transaction
//!
//! # Example
//!
//! ```rust
//! use gridgate_core::{QueryAssembler, QueryLimits, QuerySpec, TableWhitelist};
//! use gridgate_core::{Condition, WhereNode};
//!
//! let assembler = QueryAssembler::new(
//!     TableWhitelist::new(["t_product"]).unwrap(),
//!     QueryLimits::default(),
//! );
//!
//! let request = QuerySpec {
//!     where_node: Some(WhereNode::default().with_condition(Condition::new("name", "contains", Some("ab")))),
//!     ..QuerySpec::new("t_product")
//! };
//!
//! let built = assembler.build(&request).unwrap();
//! assert_eq!(built.data_sql, "SELECT * FROM [t_product] WHERE [name] LIKE @p0 ESCAPE '\\'");
//! assert_eq!(built.params[0].value.to_string(), "%ab%");
//! ```

pub mod batch;
pub mod compiler;
pub mod error;
pub mod executor;
pub mod filter;
pub mod ident;
pub mod model;
pub mod query;
pub mod select;
pub mod value;

// Re-export main types for convenience
pub use batch::{BatchEngine, BatchOutcome, BatchRequest, DeleteItem};
pub use compiler::{compile_where, ParamBinder, WhereClause};
pub use error::{GridError, GridResult};
pub use executor::{
    fetch_page, fetch_rows, fetch_scalar, in_transaction, Connection, Database, KeyGenerator, Page,
    ScriptedConnection, UuidKeyGenerator,
};
pub use filter::{compile_flat_params, parse_filter};
pub use ident::{is_valid_alias, is_valid_identifier, is_valid_object_name};
pub use model::{Condition, Logic, Operator, SimpleWhere, WhereNode};
pub use query::{
    parse_order_by, BuiltQuery, ListingRequest, QueryAssembler, QueryLimits, QuerySpec,
    SortDirection, TableWhitelist,
};
pub use select::{SelectFields, SelectItem};
pub use value::{Param, Row, SqlValue};
