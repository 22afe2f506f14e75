//! Node movement history - append-only audit of re-parenting.

use super::NodeKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMovement {
    pub id: Uuid,
    pub node_id: Uuid,
    pub node_kind: NodeKind,
    pub old_parent_id: Option<Uuid>,
    pub new_parent_id: Uuid,
    pub moved_by: String,
    pub old_path: String,
    pub new_path: String,
    pub moved_utc: DateTime<Utc>,
}

impl NodeMovement {
    pub fn new(
        node_id: Uuid,
        node_kind: NodeKind,
        old_parent_id: Option<Uuid>,
        new_parent_id: Uuid,
        moved_by: String,
        old_path: String,
        new_path: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            node_id,
            node_kind,
            old_parent_id,
            new_parent_id,
            moved_by,
            old_path,
            new_path,
            moved_utc: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct NodeMovementRow {
    pub id: Uuid,
    pub node_id: Uuid,
    pub node_kind: String,
    pub old_parent_id: Option<Uuid>,
    pub new_parent_id: Uuid,
    pub moved_by: String,
    pub old_path: String,
    pub new_path: String,
    pub moved_utc: DateTime<Utc>,
}

impl TryFrom<NodeMovementRow> for NodeMovement {
    type Error = String;

    fn try_from(row: NodeMovementRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            node_id: row.node_id,
            node_kind: NodeKind::parse(&row.node_kind)
                .ok_or_else(|| format!("Unknown node kind: {}", row.node_kind))?,
            old_parent_id: row.old_parent_id,
            new_parent_id: row.new_parent_id,
            moved_by: row.moved_by,
            old_path: row.old_path,
            new_path: row.new_path,
            moved_utc: row.moved_utc,
        })
    }
}
