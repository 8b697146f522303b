//! Shared pieces of the referral client: data model, API client,
//! configuration and tree statistics.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod stats;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
