//! Core contracts shared across the geniebot workspace: configuration
//! loading, the query-result data model, and the layered error taxonomy.

pub mod config;
pub mod errors;
pub mod result;

pub use errors::{ApplicationError, InterfaceError};
pub use result::{QueryOutcome, QueryResult};
