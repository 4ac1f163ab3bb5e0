pub mod client;
pub mod error;
pub mod models;
pub mod params;

pub use crate::client::Neo4jHttpSink;
pub use crate::params::Neo4jParams;
