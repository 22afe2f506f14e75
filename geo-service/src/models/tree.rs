//! Read-side views of geo nodes.

use super::{GeoNode, NodeKind, Structure};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Geo node response for API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoNodeResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub structure: Structure,
    pub name: String,
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub path: String,
    pub level: i32,
    pub order: i32,
    pub parent_id: Option<Uuid>,
    pub parent_kind: Option<NodeKind>,
    pub parent_field: Option<&'static str>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<GeoNode> for GeoNodeResponse {
    fn from(n: GeoNode) -> Self {
        let parent_field = n.parent_field();
        Self {
            id: n.id,
            kind: n.kind,
            structure: n.structure,
            name: n.name,
            code: n.code,
            label: n.label,
            path: n.path,
            level: n.level,
            order: n.order,
            parent_id: n.parent.map(|p| p.id),
            parent_kind: n.parent.map(|p| p.kind),
            parent_field,
            created_utc: n.created_utc,
            updated_utc: n.updated_utc,
        }
    }
}

/// Tree node with children for hierarchical response.
///
/// Wards and constituencies carry `villages`, MKA wards carry `sections`:
/// the names of their live location children in display order.
#[derive(Debug, Clone, Serialize)]
pub struct GeoTreeNode {
    #[serde(flatten)]
    pub node: GeoNodeResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub villages: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<String>>,
    pub children: Vec<GeoTreeNode>,
}

/// Compact listing entry used by the lookup endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoNodeSummary {
    pub id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub parent_id: Option<Uuid>,
}

impl From<GeoNode> for GeoNodeSummary {
    fn from(n: GeoNode) -> Self {
        Self {
            id: n.id,
            parent_id: n.parent_id(),
            name: n.name,
            code: n.code,
        }
    }
}
