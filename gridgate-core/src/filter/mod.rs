//! Legacy string filters.
//!
//! Two inputs share the compiler's leaf rendering and parameter naming:
//! the single-string expression (`name eq 'x' and (a co 'y' or b sw 'z')`)
//! and flat `key=value` query parameters.

pub mod legacy;
pub mod lexer;
pub mod parser;

pub use legacy::{compile_flat_params, is_reserved_key, RESERVED_KEYS};
pub use lexer::{tokenize, FilterLexer};
pub use parser::{parse_filter, FilterParser};
