//! geo-service: hierarchical geographic taxonomy for Ward Data Bucket.
//!
//! Maintains the PNG, ABG and MKA structures as one tree per structure,
//! with materialized paths, cascading renames and moves, and an audit
//! trail of every move.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

pub use startup::{AppState, Application};
