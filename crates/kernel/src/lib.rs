//! Relata association query engine.
//!
//! Compiles composable predicates over many-to-many element associations
//! into a single bounded SQL statement, runs it through a host-supplied
//! executor and shapes the rows into ids, associations or elements.

pub mod config;
pub mod error;
pub mod host;
pub mod models;
pub mod query;

pub use config::EngineConfig;
pub use error::{ErrorKind, QueryError, QueryResult};
pub use host::HostServices;
pub use query::{AssociationQuery, Condition, QueryDraft};
