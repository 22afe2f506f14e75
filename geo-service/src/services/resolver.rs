//! Resolve an id to its node without knowing the kind up front.

use super::error::GeoError;
use super::store::GeoTx;
use crate::models::{GeoNode, NodeKind};
use uuid::Uuid;

/// Probe `kinds` in order and return the first match.
pub async fn resolve_among(
    tx: &mut dyn GeoTx,
    kinds: &[NodeKind],
    id: Uuid,
) -> Result<Option<GeoNode>, GeoError> {
    for kind in kinds {
        if let Some(node) = tx.find_by_id(*kind, id).await? {
            return Ok(Some(node));
        }
    }
    Ok(None)
}

/// Resolve a non-root node, probing kinds in [`NodeKind::RESOLVE_ORDER`].
pub async fn resolve(tx: &mut dyn GeoTx, id: Uuid) -> Result<Option<GeoNode>, GeoError> {
    resolve_among(tx, &NodeKind::RESOLVE_ORDER, id).await
}

/// Like [`resolve`], but also accepts the structure roots, which are valid
/// parents for first-level nodes.
pub async fn resolve_parent(tx: &mut dyn GeoTx, id: Uuid) -> Result<Option<GeoNode>, GeoError> {
    match resolve(tx, id).await? {
        Some(node) => Ok(Some(node)),
        None => tx.find_by_id(NodeKind::GeoRegion, id).await,
    }
}

/// Resolve a node that is about to be changed. Roots are never resolved;
/// naming one fails with `RootImmutable` rather than `NotFound`.
pub async fn resolve_mutable(tx: &mut dyn GeoTx, id: Uuid) -> Result<GeoNode, GeoError> {
    if let Some(node) = resolve(tx, id).await? {
        return Ok(node);
    }
    match tx.find_by_id(NodeKind::GeoRegion, id).await? {
        Some(root) => Err(GeoError::RootImmutable(root.structure)),
        None => Err(GeoError::NotFound { entity: "Node", id }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Structure;
    use crate::services::store::{GeoStore, MemoryStore};

    #[tokio::test]
    async fn resolves_any_kind_but_not_roots() {
        let store = MemoryStore::new();
        let root = GeoNode::root(Structure::Mka);
        let region = GeoNode::new_child(
            &root,
            NodeKind::MkaRegion,
            "Hohola".into(),
            None,
            "MKA/Hohola".into(),
            0,
        );

        let mut tx = store.begin().await.unwrap();
        tx.insert(&root).await.unwrap();
        tx.insert(&region).await.unwrap();

        let found = resolve(tx.as_mut(), region.id).await.unwrap().unwrap();
        assert_eq!(found.kind, NodeKind::MkaRegion);

        assert!(resolve(tx.as_mut(), root.id).await.unwrap().is_none());
        assert!(resolve_parent(tx.as_mut(), root.id).await.unwrap().is_some());
        assert!(matches!(
            resolve_mutable(tx.as_mut(), root.id).await,
            Err(GeoError::RootImmutable(Structure::Mka))
        ));
        assert!(matches!(
            resolve_mutable(tx.as_mut(), Uuid::new_v4()).await,
            Err(GeoError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn resolve_among_limits_the_probe() {
        let store = MemoryStore::new();
        let root = GeoNode::root(Structure::Png);
        let province = GeoNode::new_child(
            &root,
            NodeKind::Province,
            "Madang".into(),
            Some("5".into()),
            "PNG/Madang".into(),
            5,
        );

        let mut tx = store.begin().await.unwrap();
        tx.insert(&root).await.unwrap();
        tx.insert(&province).await.unwrap();

        let only_wards = [NodeKind::Ward, NodeKind::MkaWard];
        assert!(resolve_among(tx.as_mut(), &only_wards, province.id)
            .await
            .unwrap()
            .is_none());
    }
}
