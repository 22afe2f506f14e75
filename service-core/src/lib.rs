//! service-core: Shared infrastructure for the Ward Data Bucket services.
//!
//! HTTP error mapping, base configuration, tracing setup and the request-id
//! middleware used by every service router.

pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
