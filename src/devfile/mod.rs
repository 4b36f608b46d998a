//! Devfile discovery, parsing and retrieval

pub mod fetch;
pub mod locator;
pub mod schema;

pub use fetch::{DevfileFetcher, FetchError, HttpFetcher, StaticFetcher};
pub use locator::{locate, LocatedArtifacts, LocatedDevfile, LocatorError};
pub use schema::Devfile;
