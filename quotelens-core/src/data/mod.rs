//! Data acquisition: remote fetch and file upload

pub mod acquire;
pub mod catalog;
pub mod circuit_breaker;
pub mod ingest;
pub mod interval;
pub mod provider;
pub mod yahoo;

pub use acquire::{fetch_remote, Acquired};
pub use catalog::{Catalog, CatalogEntry};
pub use circuit_breaker::CircuitBreaker;
pub use ingest::{load_file, load_path, FileFormat, FileParseError};
pub use interval::{Coercion, Interval, IntervalPolicy, Period};
pub use provider::{AcquisitionError, DataProvider, DataSource, FetchResult, RawBar};
pub use yahoo::YahooProvider;
