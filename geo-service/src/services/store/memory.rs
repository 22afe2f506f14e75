//! In-process store used by tests and `GEO_STORE=memory`.
//!
//! A transaction holds the store mutex for its whole lifetime and works on a
//! copy of the state; commit swaps the copy in, drop discards it. Writers
//! are therefore fully serialized and `lock_structure` has nothing to do.

use super::{GeoStore, GeoTx};
use crate::models::{GeoNode, NodeKind, NodeMovement, Structure};
use crate::services::error::GeoError;
use crate::services::path::{is_same_or_descendant, rebase};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    nodes: HashMap<Uuid, GeoNode>,
    movements: Vec<NodeMovement>,
}

impl MemoryState {
    fn check_unique(&self, node: &GeoNode) -> Result<(), GeoError> {
        let clash = self.nodes.values().any(|other| {
            other.id != node.id
                && match (node.parent_id(), other.parent_id()) {
                    (Some(a), Some(b)) => a == b && other.kind == node.kind && other.name == node.name,
                    (None, None) => other.structure == node.structure,
                    _ => false,
                }
        });
        if clash {
            return Err(GeoError::Conflict(format!(
                "{} '{}' already exists under this parent",
                node.kind, node.name
            )));
        }
        Ok(())
    }

    fn check_parent(&self, node: &GeoNode) -> Result<(), GeoError> {
        match node.parent_id() {
            Some(parent_id) if !self.nodes.contains_key(&parent_id) => Err(GeoError::database(
                "Foreign key violation",
                format!("parent {} does not exist", parent_id),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GeoStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> Result<Box<dyn GeoTx>, GeoError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn load_all(&self) -> Result<Vec<GeoNode>, GeoError> {
        let state = self.state.lock().await;
        Ok(state.nodes.values().cloned().collect())
    }

    async fn health_check(&self) -> Result<(), GeoError> {
        Ok(())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl GeoTx for MemoryTx {
    async fn lock_structure(&mut self, _structure: Structure) -> Result<(), GeoError> {
        Ok(())
    }

    async fn find_by_id(&mut self, kind: NodeKind, id: Uuid) -> Result<Option<GeoNode>, GeoError> {
        Ok(self
            .working
            .nodes
            .get(&id)
            .filter(|n| n.kind == kind)
            .cloned())
    }

    async fn find_by_key(
        &mut self,
        kind: NodeKind,
        parent_id: Uuid,
        name: &str,
    ) -> Result<Option<GeoNode>, GeoError> {
        Ok(self
            .working
            .nodes
            .values()
            .find(|n| n.kind == kind && n.parent_id() == Some(parent_id) && n.name == name)
            .cloned())
    }

    async fn find_region(&mut self, structure: Structure) -> Result<Option<GeoNode>, GeoError> {
        Ok(self
            .working
            .nodes
            .values()
            .find(|n| n.is_root() && n.structure == structure)
            .cloned())
    }

    async fn children(&mut self, parent_id: Uuid) -> Result<Vec<GeoNode>, GeoError> {
        let mut children: Vec<GeoNode> = self
            .working
            .nodes
            .values()
            .filter(|n| n.parent_id() == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        Ok(children)
    }

    async fn count_children(&mut self, parent_id: Uuid) -> Result<u64, GeoError> {
        Ok(self
            .working
            .nodes
            .values()
            .filter(|n| n.parent_id() == Some(parent_id))
            .count() as u64)
    }

    async fn insert(&mut self, node: &GeoNode) -> Result<(), GeoError> {
        if self.working.nodes.contains_key(&node.id) {
            return Err(GeoError::Conflict(format!("Node {} already exists", node.id)));
        }
        self.working.check_unique(node)?;
        self.working.check_parent(node)?;
        self.working.nodes.insert(node.id, node.clone());
        Ok(())
    }

    async fn update(&mut self, node: &GeoNode) -> Result<(), GeoError> {
        if !self.working.nodes.contains_key(&node.id) {
            return Err(GeoError::NotFound {
                entity: "Node",
                id: node.id,
            });
        }
        self.working.check_unique(node)?;
        self.working.check_parent(node)?;
        let mut stored = node.clone();
        stored.updated_utc = Utc::now();
        self.working.nodes.insert(node.id, stored);
        Ok(())
    }

    async fn rewrite_descendants(
        &mut self,
        old_path: &str,
        new_path: &str,
        level_delta: i32,
    ) -> Result<u64, GeoError> {
        let now = Utc::now();
        let mut rewritten = 0;
        for node in self.working.nodes.values_mut() {
            if let Some(path) = rebase(&node.path, old_path, new_path) {
                node.path = path;
                node.level += level_delta;
                node.updated_utc = now;
                rewritten += 1;
            }
        }
        Ok(rewritten)
    }

    async fn delete_subtree(&mut self, id: Uuid, path: &str) -> Result<u64, GeoError> {
        let before = self.working.nodes.len();
        self.working
            .nodes
            .retain(|node_id, node| *node_id != id && !is_same_or_descendant(&node.path, path));
        Ok((before - self.working.nodes.len()) as u64)
    }

    async fn delete(&mut self, id: Uuid) -> Result<bool, GeoError> {
        if self.working.nodes.values().any(|n| n.parent_id() == Some(id)) {
            return Err(GeoError::database(
                "Foreign key violation",
                format!("node {} is still referenced by its children", id),
            ));
        }
        Ok(self.working.nodes.remove(&id).is_some())
    }

    async fn record_movement(&mut self, movement: &NodeMovement) -> Result<(), GeoError> {
        self.working.movements.push(movement.clone());
        Ok(())
    }

    async fn movements_for(&mut self, node_id: Uuid) -> Result<Vec<NodeMovement>, GeoError> {
        let mut movements: Vec<NodeMovement> = self
            .working
            .movements
            .iter()
            .filter(|m| m.node_id == node_id)
            .cloned()
            .collect();
        // Pushed in commit order; stable sort keeps it for equal timestamps.
        movements.reverse();
        movements.sort_by(|a, b| b.moved_utc.cmp(&a.moved_utc));
        Ok(movements)
    }

    async fn commit(self: Box<Self>) -> Result<(), GeoError> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = MemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert(&GeoNode::root(Structure::Png)).await.unwrap();
        }
        assert!(store.load_all().await.unwrap().is_empty());

        let mut tx = store.begin().await.unwrap();
        tx.insert(&GeoNode::root(Structure::Png)).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sibling_names_are_unique_per_kind() {
        let store = MemoryStore::new();
        let root = GeoNode::root(Structure::Png);
        let first = GeoNode::new_child(
            &root,
            NodeKind::Province,
            "Morobe".into(),
            None,
            "PNG/Morobe".into(),
            0,
        );
        let second = GeoNode::new_child(
            &root,
            NodeKind::Province,
            "Morobe".into(),
            None,
            "PNG/Morobe".into(),
            1,
        );

        let mut tx = store.begin().await.unwrap();
        tx.insert(&root).await.unwrap();
        tx.insert(&first).await.unwrap();
        assert!(matches!(
            tx.insert(&second).await,
            Err(GeoError::Conflict(_))
        ));
        assert!(matches!(
            tx.insert(&GeoNode::root(Structure::Png)).await,
            Err(GeoError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn rewrite_leaves_prefix_lookalikes_alone() {
        let store = MemoryStore::new();
        let root = GeoNode::root(Structure::Png);
        let morobe = GeoNode::new_child(
            &root,
            NodeKind::Province,
            "Morobe".into(),
            None,
            "PNG/Morobe".into(),
            0,
        );
        let lae = GeoNode::new_child(
            &morobe,
            NodeKind::District,
            "Lae".into(),
            None,
            "PNG/Morobe/Lae".into(),
            0,
        );
        let lookalike = GeoNode::new_child(
            &root,
            NodeKind::Province,
            "Morobe East".into(),
            None,
            "PNG/Morobe East".into(),
            1,
        );

        let mut tx = store.begin().await.unwrap();
        for node in [&root, &morobe, &lae, &lookalike] {
            tx.insert(node).await.unwrap();
        }
        let rewritten = tx
            .rewrite_descendants("PNG/Morobe", "PNG/Morobe Province", 0)
            .await
            .unwrap();
        assert_eq!(rewritten, 1);
        let lae = tx.find_by_id(NodeKind::District, lae.id).await.unwrap().unwrap();
        assert_eq!(lae.path, "PNG/Morobe Province/Lae");
        let lookalike = tx
            .find_by_id(NodeKind::Province, lookalike.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lookalike.path, "PNG/Morobe East");
    }
}
