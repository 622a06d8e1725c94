//! Resource abstraction layer
//!
//! Normalized resource records and everything that works on them before the
//! deletion engine takes over.
//!
//! # Architecture
//!
//! - [`model`] - `ResourceRecord` and `Account`
//! - [`id`] - ARM resource ID decomposition
//! - [`registry`] - Static per-type tables (priority, API version, detach step)
//! - [`discovery`] - Listing resources per subscription
//! - [`filter`] - Exclusion rules and partitioning

pub mod discovery;
pub mod filter;
pub mod id;
pub mod model;
pub mod registry;

pub use id::{ParsedResourceId, ResourceIdError};
pub use model::{Account, ResourceRecord};
