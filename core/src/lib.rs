pub mod bind_value;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod mysql;
pub mod query_builder;

pub use bind_value::BindValue;
pub use config::ConnectionConfig;
pub use connection::{ConnectionState, Database};
pub use error::{Result, SqlChainError};
pub use executor::{Connector, DbExecutor, Record};
pub use mysql::MySqlConnector;
pub use query_builder::{Clause, ClauseKind, QueryBuilder, QueryKind, POSITIONAL_MARKER};
