//! Remote bucket access.
//!
//! This module provides the HTTP client with retry ([`http`]), listing
//! parsers ([`listing`]) and the [`RemoteStore`] seam with its HTTP and
//! in-memory implementations ([`store`]).

pub mod http;
pub mod listing;
pub mod store;

pub use http::{HttpFetcher, RetryPolicy};
pub use listing::{parse_listing, parse_timestamp, ListingPage, RemoteEntry};
pub use store::{HttpRemote, MemoryRemote, RemoteStore};
