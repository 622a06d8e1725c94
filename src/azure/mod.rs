//! Azure API interaction module
//!
//! This module provides the core functionality for talking to Azure Resource
//! Manager: authentication, HTTP client, long-running operations, and the
//! provider operations the deletion engine depends on.
//!
//! # Module Structure
//!
//! - [`auth`] - Token acquisition (`AZURE_ACCESS_TOKEN` or Azure CLI) and caching
//! - [`client`] - Subscription-scoped ARM client with operation polling
//! - [`http`] - HTTP utilities and ARM error decoding
//! - [`ops`] - Traits the engine consumes, plus the ARM client factory
//! - [`subscriptions`] - Subscription listing
//!
//! # Example
//!
//! ```ignore
//! use aznuke::azure::{auth::AzureCredentials, ops::AzureClientFactory};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let factory = AzureClientFactory::new(AzureCredentials::from_environment())?;
//!     let client = factory.client("00000000-0000-0000-0000-000000000000");
//!     let subs = aznuke::azure::subscriptions::list_subscriptions(&client).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
mod compute;
pub mod http;
mod network;
pub mod ops;
pub mod resources;
pub mod subscriptions;
