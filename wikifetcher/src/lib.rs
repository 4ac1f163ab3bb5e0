pub mod sparql;

pub use sparql::{SparqlClient, SparqlError, SparqlResults, WIKIDATA_SPARQL_URL};
