//! Bulk loading of reference data.
//!
//! A seed document maps structure names to nested node lists:
//!
//! ```json
//! { "PNG": [{ "name": "Morobe", "code": "7", "children": [{ "name": "Lae" }] }] }
//! ```
//!
//! Nesting depth selects the kind from the structure's kind sequence.
//! Existing nodes are matched by kind, parent and name and reused, so a
//! document can be loaded repeatedly.

use crate::models::{GeoNode, Structure};
use crate::services::error::GeoError;
use crate::services::path::{build_path, parent_path, validate_code, validate_name};
use crate::services::store::GeoStore;
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct SeedNode {
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub children: Vec<SeedNode>,
}

pub type SeedDocument = BTreeMap<Structure, Vec<SeedNode>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: u64,
    pub updated: u64,
    pub unchanged: u64,
}

pub async fn load_seed_file(path: &Path) -> Result<SeedDocument, GeoError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    let document = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse seed file {}", path.display()))?;
    Ok(document)
}

/// Load a seed document, one transaction per structure.
#[tracing::instrument(skip_all)]
pub async fn seed(store: &dyn GeoStore, document: &SeedDocument) -> Result<SeedReport, GeoError> {
    let mut report = SeedReport::default();

    for (structure, nodes) in document {
        let mut tx = store.begin().await?;
        tx.lock_structure(*structure).await?;
        let root = tx
            .find_region(*structure)
            .await?
            .ok_or(GeoError::FixedRegionMissing(*structure))?;

        let sequence = structure.kind_sequence();
        let mut pending: Vec<(GeoNode, usize, &SeedNode)> = nodes
            .iter()
            .enumerate()
            .rev()
            .map(|(position, node)| (root.clone(), position, node))
            .collect();

        while let Some((parent, position, entry)) = pending.pop() {
            let kind = *sequence
                .get(parent.level as usize + 1)
                .ok_or(GeoError::UnexpectedDepth {
                    kind: "seed entry",
                    parent: parent.kind,
                })?;
            let name = validate_name(&entry.name)?;
            let code = validate_code(entry.code.as_deref())?;
            let order = code
                .as_deref()
                .and_then(|c| c.parse().ok())
                .unwrap_or(position as i32);

            let node = match tx.find_by_key(kind, parent.id, &name).await? {
                Some(mut existing) => {
                    if existing.code != code || existing.order != order {
                        existing.code = code;
                        existing.order = order;
                        tx.update(&existing).await?;
                        report.updated += 1;
                    } else {
                        report.unchanged += 1;
                    }
                    existing
                }
                None => {
                    let path = build_path(parent_path(&parent)?, &name);
                    let node = GeoNode::new_child(&parent, kind, name, code, path, order);
                    tx.insert(&node).await?;
                    report.created += 1;
                    node
                }
            };

            for (child_position, child) in entry.children.iter().enumerate().rev() {
                pending.push((node.clone(), child_position, child));
            }
        }

        tx.commit().await?;
        tracing::info!(structure = %structure, "Seeded geo structure");
    }

    tracing::info!(
        created = report.created,
        updated = report.updated,
        unchanged = report.unchanged,
        "Geo seed completed"
    );
    Ok(report)
}
