//! Services layer for geo-service.

pub mod assembler;
pub mod error;
mod geo_tree;
pub mod hierarchy;
pub mod metrics;
pub mod path;
pub mod resolver;
pub mod seed;
pub mod store;

pub use error::GeoError;
pub use geo_tree::{AddNode, DeleteOutcome, DeletePolicy, GeoTreeService, UpdateNode};
pub use store::{GeoStore, GeoTx, MemoryStore, PgStore};
