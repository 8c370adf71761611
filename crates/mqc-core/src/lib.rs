//! Leaf-level primitives shared by the query compiler: the dynamically
//! typed operand sum, the `TRUE`/`FALSE`/`Empty`/`Sql` fragment algebra,
//! identifier/literal quoting, JSONB accessor-path construction, and the
//! compile-time error taxonomy.
//!
//! Nothing in this crate touches SQL statement assembly or I/O — see
//! `mqc-compiler` and `mqc-model` for those.

pub mod error;
pub mod fragment;
pub mod operand;
pub mod path;
pub mod quoting;

pub use error::MqcError;
pub use fragment::Fragment;
pub use operand::{Operand, OperandGroups};
pub use path::AccessPath;
