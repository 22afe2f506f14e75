use crate::{
    models::{
        GeoNode, GeoNodeSummary, GeoTreeNode, NodeKind, NodeMovement, ParentRef, Structure,
    },
    services::{
        assembler::{assemble_forest, assemble_subtree},
        error::GeoError,
        hierarchy::{ensure_child_allowed, ensure_move_allowed},
        metrics::{record_operation, NODES_REWRITTEN},
        path::{
            build_path, is_same_or_descendant, last_segment, parent_path, replace_last_segment,
            validate_code, validate_name,
        },
        resolver::{resolve_mutable, resolve_parent},
        store::{GeoStore, GeoTx},
    },
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// What happens to the children of a deleted node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Refuse to delete a node that still has children.
    #[default]
    Reject,
    /// Delete the node together with its whole subtree.
    Cascade,
}

impl std::str::FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(DeletePolicy::Reject),
            "cascade" => Ok(DeletePolicy::Cascade),
            _ => Err(format!("Unknown delete policy: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddNode {
    pub name: String,
    pub code: Option<String>,
    pub node_type: String,
    pub parent_id: Option<Uuid>,
    /// Structure name, used when `parent_id` is absent.
    pub region: Option<String>,
    pub order: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct UpdateNode {
    pub id: Uuid,
    pub name: String,
    /// `None` keeps the current code, an empty string clears it.
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOutcome {
    pub id: Uuid,
    pub kind: NodeKind,
    pub path: String,
    /// Rows removed, the node itself included.
    pub deleted: u64,
}

fn finish<T>(operation: &'static str, result: Result<T, GeoError>) -> Result<T, GeoError> {
    record_operation(operation, &result);
    match &result {
        Err(e @ (GeoError::Database(_) | GeoError::Internal(_))) => {
            tracing::error!(operation, error = %e, "Geo operation failed");
        }
        Err(e) => {
            tracing::warn!(operation, error = %e, "Geo operation rejected");
        }
        Ok(_) => {}
    }
    result
}

/// Lock structures in a fixed order so concurrent writers cannot deadlock.
async fn lock_structures(tx: &mut dyn GeoTx, structures: &[Structure]) -> Result<(), GeoError> {
    let mut sorted = structures.to_vec();
    sorted.sort();
    sorted.dedup();
    for structure in sorted {
        tx.lock_structure(structure).await?;
    }
    Ok(())
}

async fn reload(tx: &mut dyn GeoTx, node: &GeoNode, entity: &'static str) -> Result<GeoNode, GeoError> {
    tx.find_by_id(node.kind, node.id)
        .await?
        .ok_or(GeoError::NotFound {
            entity,
            id: node.id,
        })
}

/// Geo hierarchy operations. Every mutation runs in one store transaction
/// holding the lock of each structure it touches.
#[derive(Clone)]
pub struct GeoTreeService {
    store: Arc<dyn GeoStore>,
    delete_policy: DeletePolicy,
}

impl GeoTreeService {
    pub fn new(store: Arc<dyn GeoStore>, delete_policy: DeletePolicy) -> Self {
        Self {
            store,
            delete_policy,
        }
    }

    pub fn store(&self) -> &Arc<dyn GeoStore> {
        &self.store
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    /// Create the three structure roots if they are missing.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_roots(&self) -> Result<Vec<GeoNode>, GeoError> {
        let mut tx = self.store.begin().await?;
        lock_structures(tx.as_mut(), &Structure::ALL).await?;

        let mut roots = Vec::with_capacity(Structure::ALL.len());
        for structure in Structure::ALL {
            let root = match tx.find_region(structure).await? {
                Some(root) => root,
                None => {
                    let root = GeoNode::root(structure);
                    tx.insert(&root).await?;
                    tracing::info!(node_id = %root.id, structure = %structure, "Geo region created");
                    root
                }
            };
            roots.push(root);
        }

        tx.commit().await?;
        Ok(roots)
    }

    #[tracing::instrument(skip(self, input), fields(name = %input.name, node_type = %input.node_type))]
    pub async fn add(&self, input: AddNode) -> Result<GeoNode, GeoError> {
        finish("add", self.add_node(input).await)
    }

    async fn add_node(&self, input: AddNode) -> Result<GeoNode, GeoError> {
        let name = validate_name(&input.name)?;
        let code = validate_code(input.code.as_deref())?;
        let node_type = input.node_type.trim();
        if node_type.is_empty() {
            return Err(GeoError::MissingField("type"));
        }
        let region = input
            .region
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty());

        let mut tx = self.store.begin().await?;

        let parent = match input.parent_id {
            Some(parent_id) => {
                let parent = resolve_parent(tx.as_mut(), parent_id)
                    .await?
                    .ok_or(GeoError::ParentNotFound(parent_id))?;
                if let Some(region) = region {
                    if !region.eq_ignore_ascii_case(parent.structure.as_str()) {
                        return Err(GeoError::InvalidParent(format!(
                            "parent {} belongs to {}, not {}",
                            parent.id, parent.structure, region
                        )));
                    }
                }
                parent
            }
            None => {
                let region = region.ok_or(GeoError::MissingField("region"))?;
                let structure: Structure = region
                    .parse()
                    .map_err(|_| GeoError::RegionNotFound(region.to_string()))?;
                tx.find_region(structure)
                    .await?
                    .ok_or_else(|| GeoError::RegionNotFound(structure.to_string()))?
            }
        };

        let structure = parent.structure;
        let kind = NodeKind::from_type(node_type, structure).ok_or_else(|| {
            GeoError::InvalidType(format!("'{}' is not a {} node type", node_type, structure))
        })?;
        ensure_child_allowed(structure, parent.kind, kind)?;

        tx.lock_structure(structure).await?;
        let parent = reload(tx.as_mut(), &parent, "Parent node").await?;

        if tx.find_by_key(kind, parent.id, &name).await?.is_some() {
            return Err(GeoError::Conflict(format!(
                "{} '{}' already exists under {}",
                kind, name, parent.path
            )));
        }

        let order = match input
            .order
            .or_else(|| code.as_deref().and_then(|c| c.parse().ok()))
        {
            Some(order) => order,
            None => tx.count_children(parent.id).await? as i32,
        };

        let path = build_path(parent_path(&parent)?, &name);
        let node = GeoNode::new_child(&parent, kind, name, code, path, order);
        tx.insert(&node).await?;
        tx.commit().await?;

        tracing::info!(
            node_id = %node.id,
            kind = %node.kind,
            path = %node.path,
            level = node.level,
            "Geo node created"
        );

        Ok(node)
    }

    #[tracing::instrument(skip(self, input), fields(node_id = %input.id))]
    pub async fn update(&self, input: UpdateNode) -> Result<GeoNode, GeoError> {
        finish("update", self.update_node(input).await)
    }

    async fn update_node(&self, input: UpdateNode) -> Result<GeoNode, GeoError> {
        let name = validate_name(&input.name)?;

        let mut tx = self.store.begin().await?;
        let found = resolve_mutable(tx.as_mut(), input.id).await?;
        tx.lock_structure(found.structure).await?;
        let mut node = reload(tx.as_mut(), &found, "Node").await?;

        let parent = match node.parent {
            Some(p) => tx.find_by_id(p.kind, p.id).await?,
            None => None,
        };
        let new_path = match &parent {
            Some(parent) => build_path(parent_path(parent)?, &name),
            None => replace_last_segment(&node.path, &name),
        };

        if let Some(parent_id) = node.parent_id() {
            if let Some(existing) = tx.find_by_key(node.kind, parent_id, &name).await? {
                if existing.id != node.id {
                    return Err(GeoError::Conflict(format!(
                        "{} '{}' already exists under this parent",
                        node.kind, name
                    )));
                }
            }
        }

        let old_path = std::mem::replace(&mut node.path, new_path);
        node.name = name;
        if input.code.is_some() {
            node.code = validate_code(input.code.as_deref())?;
        }
        node.updated_utc = Utc::now();
        tx.update(&node).await?;

        let rewritten = if old_path != node.path {
            tx.rewrite_descendants(&old_path, &node.path, 0).await?
        } else {
            0
        };
        tx.commit().await?;

        NODES_REWRITTEN
            .with_label_values(&["update"])
            .inc_by(rewritten as f64);
        tracing::info!(
            node_id = %node.id,
            kind = %node.kind,
            old_path = %old_path,
            path = %node.path,
            descendants = rewritten,
            "Geo node updated"
        );

        Ok(node)
    }

    /// Delete a node. `cascade` overrides the configured [`DeletePolicy`].
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, cascade: Option<bool>) -> Result<DeleteOutcome, GeoError> {
        finish("delete", self.delete_node(id, cascade).await)
    }

    async fn delete_node(&self, id: Uuid, cascade: Option<bool>) -> Result<DeleteOutcome, GeoError> {
        let policy = match cascade {
            Some(true) => DeletePolicy::Cascade,
            Some(false) => DeletePolicy::Reject,
            None => self.delete_policy,
        };

        let mut tx = self.store.begin().await?;
        let found = resolve_mutable(tx.as_mut(), id).await?;
        tx.lock_structure(found.structure).await?;
        let node = reload(tx.as_mut(), &found, "Node").await?;

        let children = tx.count_children(node.id).await?;
        let deleted = match (children, policy) {
            (0, _) => u64::from(tx.delete(node.id).await?),
            (count, DeletePolicy::Reject) => {
                return Err(GeoError::HasChildren { id: node.id, count });
            }
            (_, DeletePolicy::Cascade) => tx.delete_subtree(node.id, &node.path).await?,
        };
        tx.commit().await?;

        tracing::info!(
            node_id = %node.id,
            kind = %node.kind,
            path = %node.path,
            deleted,
            "Geo node deleted"
        );

        Ok(DeleteOutcome {
            id: node.id,
            kind: node.kind,
            path: node.path,
            deleted,
        })
    }

    /// Re-parent a node, rewriting the paths below it and recording the move.
    #[tracing::instrument(skip(self))]
    pub async fn move_node(
        &self,
        node_id: Uuid,
        new_parent_id: Uuid,
        moved_by: &str,
    ) -> Result<GeoNode, GeoError> {
        finish("move", self.move_inner(node_id, new_parent_id, moved_by).await)
    }

    async fn move_inner(
        &self,
        node_id: Uuid,
        new_parent_id: Uuid,
        moved_by: &str,
    ) -> Result<GeoNode, GeoError> {
        if node_id == new_parent_id {
            return Err(GeoError::InvalidMove(
                "A node cannot be moved under itself".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let found = resolve_mutable(tx.as_mut(), node_id).await?;
        let found_parent = resolve_parent(tx.as_mut(), new_parent_id)
            .await?
            .ok_or(GeoError::NotFound {
                entity: "New parent",
                id: new_parent_id,
            })?;

        lock_structures(tx.as_mut(), &[found.structure, found_parent.structure]).await?;
        let mut node = reload(tx.as_mut(), &found, "Node").await?;
        let parent = reload(tx.as_mut(), &found_parent, "New parent").await?;

        let new_parent_path = parent_path(&parent)?.to_string();
        if is_same_or_descendant(&new_parent_path, &node.path) {
            return Err(GeoError::InvalidMove(format!(
                "Cannot move {} into its own subtree",
                node.path
            )));
        }
        ensure_move_allowed(node.structure, node.kind, parent.structure, parent.kind)?;

        if node.parent_id() == Some(parent.id) {
            tracing::info!(node_id = %node.id, "Geo node already under requested parent");
            return Ok(node);
        }

        if let Some(existing) = tx.find_by_key(node.kind, parent.id, &node.name).await? {
            if existing.id != node.id {
                return Err(GeoError::Conflict(format!(
                    "{} '{}' already exists under {}",
                    node.kind, node.name, parent.path
                )));
            }
        }

        let old_path = node.path.clone();
        let new_path = build_path(&new_parent_path, last_segment(&old_path));
        let new_level = parent.level + 1;
        let level_delta = new_level - node.level;

        let movement = NodeMovement::new(
            node.id,
            node.kind,
            node.parent_id(),
            parent.id,
            moved_by.to_string(),
            old_path.clone(),
            new_path.clone(),
        );
        tx.record_movement(&movement).await?;

        node.parent = Some(ParentRef {
            kind: parent.kind,
            id: parent.id,
        });
        node.structure = parent.structure;
        node.path = new_path;
        node.level = new_level;
        node.updated_utc = Utc::now();
        tx.update(&node).await?;

        let rewritten = tx
            .rewrite_descendants(&old_path, &node.path, level_delta)
            .await?;
        tx.commit().await?;

        NODES_REWRITTEN
            .with_label_values(&["move"])
            .inc_by(rewritten as f64);
        tracing::info!(
            node_id = %node.id,
            kind = %node.kind,
            old_path = %old_path,
            path = %node.path,
            moved_by,
            descendants = rewritten,
            "Geo node moved"
        );

        Ok(node)
    }

    /// A node with its subtree. Roots are included.
    pub async fn get(&self, id: Uuid) -> Result<GeoTreeNode, GeoError> {
        let node = {
            let mut tx = self.store.begin().await?;
            resolve_parent(tx.as_mut(), id)
                .await?
                .ok_or(GeoError::NotFound { entity: "Node", id })?
        };

        let descendants = self
            .store
            .load_all()
            .await?
            .into_iter()
            .filter(|n| n.id != node.id && is_same_or_descendant(&n.path, &node.path))
            .collect();

        Ok(assemble_subtree(node, descendants))
    }

    /// Movement history of a node, newest first. History outlives the node.
    pub async fn history(&self, node_id: Uuid) -> Result<Vec<NodeMovement>, GeoError> {
        let mut tx = self.store.begin().await?;
        let movements = tx.movements_for(node_id).await?;
        Ok(movements)
    }

    /// The whole forest, one tree per structure.
    #[tracing::instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<GeoTreeNode>, GeoError> {
        let nodes = self.store.load_all().await?;
        for structure in Structure::ALL {
            if !nodes.iter().any(|n| n.is_root() && n.structure == structure) {
                return finish("list_all", Err(GeoError::FixedRegionMissing(structure)));
            }
        }
        Ok(assemble_forest(nodes))
    }

    /// PNG provinces sorted by name.
    pub async fn provinces(&self) -> Result<Vec<GeoNodeSummary>, GeoError> {
        let mut tx = self.store.begin().await?;
        let root = tx
            .find_region(Structure::Png)
            .await?
            .ok_or(GeoError::FixedRegionMissing(Structure::Png))?;
        let children = tx.children(root.id).await?;
        Ok(summaries(children, NodeKind::Province))
    }

    /// Districts of a province sorted by name.
    pub async fn districts(&self, province_id: Uuid) -> Result<Vec<GeoNodeSummary>, GeoError> {
        let mut tx = self.store.begin().await?;
        let province = tx
            .find_by_id(NodeKind::Province, province_id)
            .await?
            .ok_or(GeoError::NotFound {
                entity: "Province",
                id: province_id,
            })?;
        let children = tx.children(province.id).await?;
        Ok(summaries(children, NodeKind::District))
    }
}

fn summaries(nodes: Vec<GeoNode>, kind: NodeKind) -> Vec<GeoNodeSummary> {
    let mut nodes: Vec<GeoNode> = nodes.into_iter().filter(|n| n.kind == kind).collect();
    nodes.sort_by(|a, b| a.name.cmp(&b.name));
    nodes.into_iter().map(GeoNodeSummary::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::MemoryStore;

    async fn service(policy: DeletePolicy) -> GeoTreeService {
        let service = GeoTreeService::new(Arc::new(MemoryStore::new()), policy);
        service.ensure_roots().await.unwrap();
        service
    }

    fn add(name: &str, code: Option<&str>, node_type: &str, parent_id: Option<Uuid>) -> AddNode {
        AddNode {
            name: name.to_string(),
            code: code.map(str::to_string),
            node_type: node_type.to_string(),
            parent_id,
            region: parent_id.is_none().then(|| "PNG".to_string()),
            order: None,
        }
    }

    async fn find(service: &GeoTreeService, id: Uuid) -> GeoNode {
        service
            .store()
            .load_all()
            .await
            .unwrap()
            .into_iter()
            .find(|n| n.id == id)
            .unwrap()
    }

    #[tokio::test]
    async fn ensure_roots_is_idempotent() {
        let service = service(DeletePolicy::Reject).await;
        let again = service.ensure_roots().await.unwrap();
        assert_eq!(again.len(), 3);
        assert_eq!(service.store().load_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn morobe_lae_madang_scenario() {
        let service = service(DeletePolicy::Reject).await;

        let morobe = service.add(add("Morobe", Some("7"), "province", None)).await.unwrap();
        assert_eq!(morobe.path, "PNG/Morobe");
        assert_eq!(morobe.level, 1);
        assert_eq!(morobe.order, 7);

        let lae = service
            .add(add("Lae", Some("701"), "district", Some(morobe.id)))
            .await
            .unwrap();
        assert_eq!(lae.path, "PNG/Morobe/Lae");
        assert_eq!(lae.level, 2);
        assert_eq!(lae.kind, NodeKind::District);

        let madang = service.add(add("Madang", Some("5"), "province", None)).await.unwrap();

        let moved = service.move_node(lae.id, madang.id, "root-user").await.unwrap();
        assert_eq!(moved.path, "PNG/Madang/Lae");
        assert_eq!(moved.parent_id(), Some(madang.id));

        let history = service.history(lae.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].old_path, "PNG/Morobe/Lae");
        assert_eq!(history[0].new_path, "PNG/Madang/Lae");
        assert_eq!(history[0].old_parent_id, Some(morobe.id));
        assert_eq!(history[0].moved_by, "root-user");

        let cycle = service.move_node(madang.id, moved.id, "root-user").await;
        assert!(matches!(cycle, Err(GeoError::InvalidMove(_))));
        let province_under_district = service.move_node(morobe.id, lae.id, "root-user").await;
        assert!(matches!(province_under_district, Err(GeoError::InvalidMove(_))));
        assert_eq!(service.history(madang.id).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn move_into_self_is_rejected() {
        let service = service(DeletePolicy::Reject).await;
        let morobe = service.add(add("Morobe", None, "province", None)).await.unwrap();

        let result = service.move_node(morobe.id, morobe.id, "root-user").await;
        assert!(matches!(result, Err(GeoError::InvalidMove(_))));
    }

    #[tokio::test]
    async fn add_rejects_wrong_level_and_unknown_parent() {
        let service = service(DeletePolicy::Reject).await;
        let morobe = service.add(add("Morobe", None, "province", None)).await.unwrap();

        let llg_under_province = service.add(add("Lae Urban", None, "llg", Some(morobe.id))).await;
        assert!(matches!(llg_under_province, Err(GeoError::InvalidType(_))));

        let abg_type = service.add(add("Bougainville", None, "constituency", Some(morobe.id))).await;
        assert!(matches!(abg_type, Err(GeoError::InvalidType(_))));

        let missing = service
            .add(add("Lae", None, "district", Some(Uuid::new_v4())))
            .await;
        assert!(matches!(missing, Err(GeoError::ParentNotFound(_))));

        let mut no_region = add("Central", None, "province", None);
        no_region.region = None;
        assert!(matches!(
            service.add(no_region).await,
            Err(GeoError::MissingField("region"))
        ));

        let mut blank = add("  ", None, "province", None);
        blank.region = Some("PNG".into());
        assert!(matches!(
            service.add(blank).await,
            Err(GeoError::MissingField("name"))
        ));
    }

    #[tokio::test]
    async fn retried_add_is_a_conflict() {
        let service = service(DeletePolicy::Reject).await;
        service.add(add("Morobe", Some("7"), "province", None)).await.unwrap();
        let retry = service.add(add("Morobe", Some("7"), "province", None)).await;
        assert!(matches!(retry, Err(GeoError::Conflict(_))));
    }

    #[tokio::test]
    async fn order_falls_back_to_sibling_count() {
        let service = service(DeletePolicy::Reject).await;
        service.add(add("Central", Some("C"), "province", None)).await.unwrap();
        let second = service.add(add("Gulf", None, "province", None)).await.unwrap();
        assert_eq!(second.order, 1);
    }

    #[tokio::test]
    async fn rename_rewrites_descendant_paths() {
        let service = service(DeletePolicy::Reject).await;
        let morobe = service.add(add("Morobe", None, "province", None)).await.unwrap();
        let lae = service.add(add("Lae", None, "district", Some(morobe.id))).await.unwrap();
        let llg = service.add(add("Lae Urban", None, "llg", Some(lae.id))).await.unwrap();

        let renamed = service
            .update(UpdateNode {
                id: morobe.id,
                name: "Morobe Province".into(),
                code: Some("12".into()),
            })
            .await
            .unwrap();
        assert_eq!(renamed.path, "PNG/Morobe Province");
        assert_eq!(renamed.code.as_deref(), Some("12"));

        assert_eq!(find(&service, lae.id).await.path, "PNG/Morobe Province/Lae");
        assert_eq!(
            find(&service, llg.id).await.path,
            "PNG/Morobe Province/Lae/Lae Urban"
        );
    }

    #[tokio::test]
    async fn update_without_code_keeps_it() {
        let service = service(DeletePolicy::Reject).await;
        let morobe = service.add(add("Morobe", Some("7"), "province", None)).await.unwrap();
        let updated = service
            .update(UpdateNode {
                id: morobe.id,
                name: "Morobe".into(),
                code: None,
            })
            .await
            .unwrap();
        assert_eq!(updated.code.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn roots_cannot_be_changed() {
        let service = service(DeletePolicy::Cascade).await;
        let png = service.store().load_all().await.unwrap().into_iter().find(|n| n.is_root()).unwrap();

        assert!(matches!(
            service.delete(png.id, None).await,
            Err(GeoError::RootImmutable(_))
        ));
        assert!(matches!(
            service
                .update(UpdateNode {
                    id: png.id,
                    name: "Other".into(),
                    code: None
                })
                .await,
            Err(GeoError::RootImmutable(_))
        ));
    }

    #[tokio::test]
    async fn delete_follows_policy() {
        let service = service(DeletePolicy::Reject).await;
        let morobe = service.add(add("Morobe", None, "province", None)).await.unwrap();
        let lae = service.add(add("Lae", None, "district", Some(morobe.id))).await.unwrap();
        service.add(add("Lae Urban", None, "llg", Some(lae.id))).await.unwrap();

        assert!(matches!(
            service.delete(morobe.id, None).await,
            Err(GeoError::HasChildren { count: 1, .. })
        ));

        let outcome = service.delete(morobe.id, Some(true)).await.unwrap();
        assert_eq!(outcome.deleted, 3);
        assert_eq!(service.store().load_all().await.unwrap().len(), 3);

        assert!(matches!(
            service.delete(morobe.id, None).await,
            Err(GeoError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn deleting_a_village_drops_it_from_the_ward_listing() {
        let service = service(DeletePolicy::Reject).await;
        let province = service.add(add("Morobe", None, "province", None)).await.unwrap();
        let district = service.add(add("Lae", None, "district", Some(province.id))).await.unwrap();
        let llg = service.add(add("Lae Urban", None, "llg", Some(district.id))).await.unwrap();
        let ward = service.add(add("Ward 1", Some("1"), "ward", Some(llg.id))).await.unwrap();
        let village = service.add(add("Butibam", None, "village", Some(ward.id))).await.unwrap();
        assert_eq!(village.kind, NodeKind::Location);
        assert_eq!(village.parent_field(), Some("wardId"));

        let tree = service.get(ward.id).await.unwrap();
        assert_eq!(tree.villages, Some(vec!["Butibam".to_string()]));

        service.delete(village.id, None).await.unwrap();
        let tree = service.get(ward.id).await.unwrap();
        assert_eq!(tree.villages, Some(Vec::new()));
    }

    #[tokio::test]
    async fn location_moves_across_structures() {
        let service = service(DeletePolicy::Reject).await;
        let province = service.add(add("Morobe", None, "province", None)).await.unwrap();
        let district = service.add(add("Lae", None, "district", Some(province.id))).await.unwrap();
        let llg = service.add(add("Lae Urban", None, "llg", Some(district.id))).await.unwrap();
        let ward = service.add(add("Ward 1", None, "ward", Some(llg.id))).await.unwrap();
        let village = service.add(add("Butibam", None, "village", Some(ward.id))).await.unwrap();
        assert_eq!(village.level, 5);

        let mut region = add("Hohola", None, "region", None);
        region.region = Some("MKA".into());
        let region = service.add(region).await.unwrap();
        let mka_ward = service.add(add("Ward 3", None, "ward", Some(region.id))).await.unwrap();
        assert_eq!(mka_ward.kind, NodeKind::MkaWard);

        let moved = service.move_node(village.id, mka_ward.id, "root-user").await.unwrap();
        assert_eq!(moved.path, "MKA/Hohola/Ward 3/Butibam");
        assert_eq!(moved.level, 3);
        assert_eq!(moved.structure, Structure::Mka);
        assert_eq!(moved.parent_field(), Some("mkaWardId"));

        let wrong = service.move_node(district.id, region.id, "root-user").await;
        assert!(matches!(wrong, Err(GeoError::InvalidMove(_))));
    }

    #[tokio::test]
    async fn province_cannot_move_to_another_structure_root() {
        let service = service(DeletePolicy::Reject).await;
        let roots = service.ensure_roots().await.unwrap();
        let abg = roots.iter().find(|r| r.structure == Structure::Abg).unwrap();
        let mka = roots.iter().find(|r| r.structure == Structure::Mka).unwrap();
        let morobe = service.add(add("Morobe", None, "province", None)).await.unwrap();
        let lae = service.add(add("Lae", None, "district", Some(morobe.id))).await.unwrap();

        for root in [abg, mka] {
            let result = service.move_node(morobe.id, root.id, "root-user").await;
            assert!(matches!(result, Err(GeoError::InvalidMove(_))));
        }

        let morobe = find(&service, morobe.id).await;
        assert_eq!(morobe.structure, Structure::Png);
        assert_eq!(morobe.path, "PNG/Morobe");
        let lae = find(&service, lae.id).await;
        assert_eq!(lae.structure, Structure::Png);
        assert_eq!(lae.path, "PNG/Morobe/Lae");
        assert!(service.history(morobe.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn descendants_share_the_structure_of_a_moved_node() {
        let service = service(DeletePolicy::Reject).await;
        let morobe = service.add(add("Morobe", None, "province", None)).await.unwrap();
        let madang = service.add(add("Madang", None, "province", None)).await.unwrap();
        let lae = service.add(add("Lae", None, "district", Some(morobe.id))).await.unwrap();
        let llg = service.add(add("Lae Urban", None, "llg", Some(lae.id))).await.unwrap();
        let ward = service.add(add("Ward 1", None, "ward", Some(llg.id))).await.unwrap();

        let moved = service.move_node(lae.id, madang.id, "root-user").await.unwrap();
        for id in [llg.id, ward.id] {
            let descendant = find(&service, id).await;
            assert_eq!(descendant.structure, moved.structure);
            assert!(descendant.path.starts_with("PNG/Madang/Lae/"));
        }

        let mut region = add("Central", None, "region", None);
        region.region = Some("ABG".into());
        let abg_region = service.add(region).await.unwrap();
        let result = service.move_node(lae.id, abg_region.id, "root-user").await;
        assert!(matches!(result, Err(GeoError::InvalidMove(_))));
        assert_eq!(find(&service, ward.id).await.structure, Structure::Png);
    }

    #[tokio::test]
    async fn move_cascades_to_descendants() {
        let service = service(DeletePolicy::Reject).await;
        let morobe = service.add(add("Morobe", None, "province", None)).await.unwrap();
        let madang = service.add(add("Madang", None, "province", None)).await.unwrap();
        let lae = service.add(add("Lae", None, "district", Some(morobe.id))).await.unwrap();
        let llg = service.add(add("Lae Urban", None, "llg", Some(lae.id))).await.unwrap();

        service.move_node(lae.id, madang.id, "root-user").await.unwrap();
        let llg = find(&service, llg.id).await;
        assert_eq!(llg.path, "PNG/Madang/Lae/Lae Urban");
        assert_eq!(llg.level, 3);
    }

    #[tokio::test]
    async fn move_to_current_parent_records_nothing() {
        let service = service(DeletePolicy::Reject).await;
        let morobe = service.add(add("Morobe", None, "province", None)).await.unwrap();
        let lae = service.add(add("Lae", None, "district", Some(morobe.id))).await.unwrap();

        let same = service.move_node(lae.id, morobe.id, "root-user").await.unwrap();
        assert_eq!(same.path, lae.path);
        assert!(service.history(lae.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn move_onto_a_taken_name_is_a_conflict() {
        let service = service(DeletePolicy::Reject).await;
        let morobe = service.add(add("Morobe", None, "province", None)).await.unwrap();
        let madang = service.add(add("Madang", None, "province", None)).await.unwrap();
        let lae = service.add(add("Lae", None, "district", Some(morobe.id))).await.unwrap();
        service.add(add("Lae", None, "district", Some(madang.id))).await.unwrap();

        let result = service.move_node(lae.id, madang.id, "root-user").await;
        assert!(matches!(result, Err(GeoError::Conflict(_))));
        assert!(service.history(lae.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_all_requires_every_region() {
        let store = Arc::new(MemoryStore::new());
        let service = GeoTreeService::new(store.clone(), DeletePolicy::Reject);
        assert!(matches!(
            service.list_all().await,
            Err(GeoError::FixedRegionMissing(Structure::Png))
        ));

        service.ensure_roots().await.unwrap();
        let forest = service.list_all().await.unwrap();
        let names: Vec<&str> = forest.iter().map(|t| t.node.name.as_str()).collect();
        assert_eq!(names, ["PNG", "ABG", "MKA"]);
    }

    #[tokio::test]
    async fn lookups_sort_by_name() {
        let service = service(DeletePolicy::Reject).await;
        let morobe = service.add(add("Morobe", Some("1"), "province", None)).await.unwrap();
        service.add(add("Central", Some("2"), "province", None)).await.unwrap();
        service.add(add("Lae", None, "district", Some(morobe.id))).await.unwrap();
        service.add(add("Bulolo", None, "district", Some(morobe.id))).await.unwrap();

        let provinces: Vec<String> = service
            .provinces()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(provinces, ["Central", "Morobe"]);

        let districts: Vec<String> = service
            .districts(morobe.id)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(districts, ["Bulolo", "Lae"]);

        assert!(matches!(
            service.districts(Uuid::new_v4()).await,
            Err(GeoError::NotFound { .. })
        ));
    }
}
