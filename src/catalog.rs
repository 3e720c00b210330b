//! Catalog provider contract and the scatter-gather aggregator.
//!
//! A [`CatalogProvider`] is any third-party music catalog reachable through `search` and
//! `recommend`. The [`Aggregator`] fans one request out to every configured provider, merges
//! the answers in provider order, and only fails when every provider failed.

pub mod aggregator;
pub mod context;
pub mod namespace;
pub mod provider;
pub mod track;

pub use aggregator::*;
pub use context::*;
pub use namespace::*;
pub use provider::*;
pub use track::*;
