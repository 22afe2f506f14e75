//! Domain models for geo-service.

mod movement;
mod node;
mod principal;
mod tree;

pub use movement::{NodeMovement, NodeMovementRow};
pub use node::{GeoNode, GeoNodeRow, NodeKind, ParentRef, Structure};
pub use principal::{Principal, Role};
pub use tree::{GeoNodeResponse, GeoNodeSummary, GeoTreeNode};
