//! Connection front end: schema import with view validation, and statement
//! preparation against the committed catalog.

pub mod connection;
pub mod errors;

pub use connection::{
    Connection, ImportSummary, PreparedStatement, SchemaImport, Session, SessionOptions,
};
pub use errors::{ImportError, StatementError};
