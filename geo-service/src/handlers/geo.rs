use crate::dtos::{
    AddNodeRequest, AllLocationsResponse, DeleteNodeRequest, DeleteNodeResponse, HistoryResponse,
    MoveNodeRequest, NodeResponse, UpdateNodeRequest,
};
use crate::middleware::RootPrincipal;
use crate::models::GeoTreeNode;
use crate::services::{AddNode, GeoError, UpdateNode};
use crate::startup::AppState;
use crate::utils::ValidatedJson;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

pub async fn add_node(
    State(state): State<AppState>,
    RootPrincipal(principal): RootPrincipal,
    ValidatedJson(req): ValidatedJson<AddNodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let node = state.geo.add(AddNode::from(req)).await?;

    tracing::info!(user_id = %principal.user_id, node_id = %node.id, "Geo node added");

    Ok((
        StatusCode::CREATED,
        Json(NodeResponse {
            message: format!("{} created successfully", node.kind),
            node: node.into(),
        }),
    ))
}

pub async fn update_node(
    State(state): State<AppState>,
    RootPrincipal(principal): RootPrincipal,
    ValidatedJson(req): ValidatedJson<UpdateNodeRequest>,
) -> Result<Json<NodeResponse>, AppError> {
    let id = req.id.ok_or(GeoError::MissingField("id"))?;

    let node = state
        .geo
        .update(UpdateNode {
            id,
            name: req.name.unwrap_or_default(),
            code: req.code,
        })
        .await?;

    tracing::info!(user_id = %principal.user_id, node_id = %node.id, "Geo node updated");

    Ok(Json(NodeResponse {
        message: format!("{} updated successfully", node.kind),
        node: node.into(),
    }))
}

pub async fn delete_node(
    State(state): State<AppState>,
    RootPrincipal(principal): RootPrincipal,
    ValidatedJson(req): ValidatedJson<DeleteNodeRequest>,
) -> Result<Json<DeleteNodeResponse>, AppError> {
    let id = req.id.ok_or(GeoError::MissingField("id"))?;

    let outcome = state.geo.delete(id, req.cascade).await?;

    tracing::info!(user_id = %principal.user_id, node_id = %id, "Geo node deleted");

    Ok(Json(outcome.into()))
}

pub async fn move_node(
    State(state): State<AppState>,
    RootPrincipal(principal): RootPrincipal,
    ValidatedJson(req): ValidatedJson<MoveNodeRequest>,
) -> Result<Json<NodeResponse>, AppError> {
    let node_id = req.node_id.ok_or(GeoError::MissingField("nodeId"))?;
    let new_parent_id = req.new_parent_id.ok_or(GeoError::MissingField("newParentId"))?;

    let node = state
        .geo
        .move_node(node_id, new_parent_id, &principal.user_id)
        .await?;

    Ok(Json(NodeResponse {
        message: format!("{} moved successfully", node.kind),
        node: node.into(),
    }))
}

pub async fn all_locations(
    State(state): State<AppState>,
    _root: RootPrincipal,
) -> Result<Json<AllLocationsResponse>, AppError> {
    let locations = state.geo.list_all().await?;
    Ok(Json(AllLocationsResponse { locations }))
}

pub async fn get_node(
    State(state): State<AppState>,
    _root: RootPrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<GeoTreeNode>, AppError> {
    Ok(Json(state.geo.get(id).await?))
}

pub async fn node_history(
    State(state): State<AppState>,
    _root: RootPrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, AppError> {
    let history = state
        .geo
        .history(id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(HistoryResponse { history }))
}
