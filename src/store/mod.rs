//! Persistence layer: libSQL-backed storage behind the `Store` trait.

pub mod libsql_backend;
pub mod migrations;
pub mod model;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use traits::Store;
