use crate::models::{GeoNodeResponse, GeoNodeSummary, GeoTreeNode, NodeKind, NodeMovement};
use crate::services::{AddNode, DeleteOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// Required fields are optional here so that a missing one is reported as a
// domain error naming the field, not as a body rejection.

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddNodeRequest {
    #[validate(length(max = 200, message = "Name must be at most 200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 50, message = "Code must be at most 50 characters"))]
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub node_type: Option<String>,
    pub parent_id: Option<Uuid>,
    pub region: Option<String>,
    pub order: Option<i32>,
}

impl From<AddNodeRequest> for AddNode {
    fn from(req: AddNodeRequest) -> Self {
        Self {
            name: req.name.unwrap_or_default(),
            code: req.code,
            node_type: req.node_type.unwrap_or_default(),
            parent_id: req.parent_id,
            region: req.region,
            order: req.order,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodeRequest {
    pub id: Option<Uuid>,
    #[validate(length(max = 200, message = "Name must be at most 200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 50, message = "Code must be at most 50 characters"))]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteNodeRequest {
    pub id: Option<Uuid>,
    pub cascade: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MoveNodeRequest {
    pub node_id: Option<Uuid>,
    pub new_parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictsParams {
    pub province_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct NodeResponse {
    pub message: String,
    pub node: GeoNodeResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteNodeResponse {
    pub message: String,
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub path: String,
    pub deleted: u64,
}

impl From<DeleteOutcome> for DeleteNodeResponse {
    fn from(outcome: DeleteOutcome) -> Self {
        Self {
            message: format!("{} deleted successfully", outcome.kind),
            id: outcome.id,
            kind: outcome.kind,
            path: outcome.path,
            deleted: outcome.deleted,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AllLocationsResponse {
    pub locations: Vec<GeoTreeNode>,
}

#[derive(Debug, Serialize)]
pub struct ProvincesResponse {
    pub provinces: Vec<GeoNodeSummary>,
}

#[derive(Debug, Serialize)]
pub struct DistrictsResponse {
    pub districts: Vec<GeoNodeSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementResponse {
    pub id: Uuid,
    pub node_id: Uuid,
    #[serde(rename = "nodeType")]
    pub node_kind: NodeKind,
    pub old_parent_id: Option<Uuid>,
    pub new_parent_id: Uuid,
    pub moved_by: String,
    pub old_path: String,
    pub new_path: String,
    pub moved_utc: DateTime<Utc>,
}

impl From<NodeMovement> for MovementResponse {
    fn from(m: NodeMovement) -> Self {
        Self {
            id: m.id,
            node_id: m.node_id,
            node_kind: m.node_kind,
            old_parent_id: m.old_parent_id,
            new_parent_id: m.new_parent_id,
            moved_by: m.moved_by,
            old_path: m.old_path,
            new_path: m.new_path,
            moved_utc: m.moved_utc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<MovementResponse>,
}
