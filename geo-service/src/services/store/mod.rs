//! Record store for geo nodes and their movement history.
//!
//! One store serves every kind: records carry their `kind`, so lookups take
//! it as a parameter instead of going through a table per kind. All reads
//! and writes of a tree operation go through a single [`GeoTx`], which is
//! rolled back when dropped without [`GeoTx::commit`].

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use super::error::GeoError;
use crate::models::{GeoNode, NodeKind, NodeMovement, Structure};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait GeoStore: Send + Sync {
    /// Backend name for logs and readiness output.
    fn backend(&self) -> &'static str;

    async fn begin(&self) -> Result<Box<dyn GeoTx>, GeoError>;

    /// Every node of every structure, unordered.
    async fn load_all(&self) -> Result<Vec<GeoNode>, GeoError>;

    async fn health_check(&self) -> Result<(), GeoError>;
}

#[async_trait]
pub trait GeoTx: Send {
    /// Serialize writers of a structure until the transaction ends.
    async fn lock_structure(&mut self, structure: Structure) -> Result<(), GeoError>;

    async fn find_by_id(&mut self, kind: NodeKind, id: Uuid) -> Result<Option<GeoNode>, GeoError>;

    /// Lookup by the sibling uniqueness key.
    async fn find_by_key(
        &mut self,
        kind: NodeKind,
        parent_id: Uuid,
        name: &str,
    ) -> Result<Option<GeoNode>, GeoError>;

    async fn find_region(&mut self, structure: Structure) -> Result<Option<GeoNode>, GeoError>;

    /// Direct children ordered by `order`, then name.
    async fn children(&mut self, parent_id: Uuid) -> Result<Vec<GeoNode>, GeoError>;

    async fn count_children(&mut self, parent_id: Uuid) -> Result<u64, GeoError>;

    /// Fails with `Conflict` when the sibling key is taken.
    async fn insert(&mut self, node: &GeoNode) -> Result<(), GeoError>;

    /// Overwrites name, code, path, level, order, structure and parent.
    async fn update(&mut self, node: &GeoNode) -> Result<(), GeoError>;

    /// Re-roots every node strictly below `old_path` onto `new_path` and
    /// shifts its level. Returns the number of rows rewritten.
    async fn rewrite_descendants(
        &mut self,
        old_path: &str,
        new_path: &str,
        level_delta: i32,
    ) -> Result<u64, GeoError>;

    /// Deletes the node and everything below `path`.
    async fn delete_subtree(&mut self, id: Uuid, path: &str) -> Result<u64, GeoError>;

    async fn delete(&mut self, id: Uuid) -> Result<bool, GeoError>;

    async fn record_movement(&mut self, movement: &NodeMovement) -> Result<(), GeoError>;

    /// Movement history of a node, newest first.
    async fn movements_for(&mut self, node_id: Uuid) -> Result<Vec<NodeMovement>, GeoError>;

    async fn commit(self: Box<Self>) -> Result<(), GeoError>;
}
