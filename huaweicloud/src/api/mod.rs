//! Huawei Cloud API client
//!
//! Service accessors on [`Client`] return small API structs that borrow the
//! client, e.g. `client.sfs_turbo().get_share(id)`. Responses stay
//! `serde_json::Value` and are read with [`path_search`].

pub mod client;
pub mod common;
pub mod error;
pub mod identitycenter;
pub mod pagination;
pub mod path_search;
pub mod pool;
pub mod rgc;
pub mod sfsturbo;
pub mod signer;
pub mod waiter;

#[cfg(test)]
pub mod test_helpers;

pub use client::{Client, ClientConfig, RetryConfig, MAX_RETRIES_LIMIT};
pub use common::{ApiQueryParams, Service};
pub use error::ApiError;
