//! # Catalog Module
//!
//! Read-only access to the remote heritage media catalog.
//!
//! ## Overview
//!
//! This crate models the catalog domain (content items, performers,
//! categories) and provides:
//! - `CatalogSource`: the trait boundary over the remote catalog API
//! - `HttpCatalogSource`: a `reqwest`-backed implementation of that boundary
//! - `ContentRepository`: the read façade used by the rest of the core
//!
//! Every operation is a single round trip to the remote source. There is no
//! caching and no retry at this layer; transient failures surface to the
//! caller as `CatalogError::RemoteUnavailable` and missing entities as
//! `CatalogError::NotFound`.

pub mod error;
pub mod http;
pub mod models;
pub mod repository;
pub mod source;

pub use error::{CatalogError, Result};
pub use http::HttpCatalogSource;
pub use models::{
    Category, ContentId, ContentItem, ContentKind, PageRequest, Performer, PerformerId,
};
pub use repository::ContentRepository;
pub use source::CatalogSource;
