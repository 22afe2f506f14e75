//! Read-only lookups for forms, open to any authenticated caller.

use crate::dtos::{DistrictsParams, DistrictsResponse, ProvincesResponse};
use crate::models::Principal;
use crate::services::GeoError;
use crate::startup::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use service_core::error::AppError;

pub async fn provinces(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<ProvincesResponse>, AppError> {
    let provinces = state.geo.provinces().await?;
    Ok(Json(ProvincesResponse { provinces }))
}

pub async fn districts(
    State(state): State<AppState>,
    _principal: Principal,
    Query(params): Query<DistrictsParams>,
) -> Result<Json<DistrictsResponse>, AppError> {
    let province_id = params
        .province_id
        .ok_or(GeoError::MissingField("provinceId"))?;
    let districts = state.geo.districts(province_id).await?;
    Ok(Json(DistrictsResponse { districts }))
}
