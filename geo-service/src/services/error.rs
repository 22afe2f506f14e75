use crate::models::{NodeKind, Structure};
use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid code: {0}")]
    InvalidCode(String),

    #[error("Invalid node type: {0}")]
    InvalidType(String),

    #[error("Parent node {0} not found")]
    ParentNotFound(Uuid),

    #[error("Invalid parent: {0}")]
    InvalidParent(String),

    #[error("Region {0} not found")]
    RegionNotFound(String),

    #[error("Required geo region {0} is missing")]
    FixedRegionMissing(Structure),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{0}")]
    InvalidMove(String),

    #[error("Parent path could not be determined for {0}")]
    ParentPathUndetermined(Uuid),

    #[error("{0}")]
    Conflict(String),

    #[error("Node {id} has {count} children; delete them first or request a cascading delete")]
    HasChildren { id: Uuid, count: u64 },

    #[error("Root region {0} cannot be modified")]
    RootImmutable(Structure),

    #[error("Unexpected {kind} below {parent}")]
    UnexpectedDepth { kind: &'static str, parent: NodeKind },

    #[error("Database error: {0}")]
    Database(anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GeoError {
    pub fn database(context: &str, err: impl std::fmt::Display) -> Self {
        GeoError::Database(anyhow::anyhow!("{}: {}", context, err))
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GeoError::MissingField(_)
            | GeoError::InvalidName(_)
            | GeoError::InvalidCode(_)
            | GeoError::InvalidType(_)
            | GeoError::InvalidParent(_)
            | GeoError::UnexpectedDepth { .. } => "validation_error",
            GeoError::ParentNotFound(_)
            | GeoError::RegionNotFound(_)
            | GeoError::FixedRegionMissing(_)
            | GeoError::NotFound { .. } => "not_found",
            GeoError::InvalidMove(_) => "invalid_move",
            GeoError::Conflict(_) | GeoError::HasChildren { .. } => "conflict",
            GeoError::RootImmutable(_) => "root_immutable",
            GeoError::ParentPathUndetermined(_) | GeoError::Internal(_) => "internal_error",
            GeoError::Database(_) => "db_error",
        }
    }
}

impl From<GeoError> for AppError {
    fn from(err: GeoError) -> Self {
        let message = err.to_string();
        match err {
            GeoError::MissingField(_)
            | GeoError::InvalidName(_)
            | GeoError::InvalidCode(_)
            | GeoError::InvalidType(_)
            | GeoError::ParentNotFound(_)
            | GeoError::InvalidParent(_)
            | GeoError::RegionNotFound(_)
            | GeoError::RootImmutable(_)
            | GeoError::UnexpectedDepth { .. } => AppError::BadRequest(anyhow::anyhow!(message)),
            GeoError::FixedRegionMissing(_) | GeoError::NotFound { .. } => {
                AppError::NotFound(anyhow::anyhow!(message))
            }
            GeoError::InvalidMove(_) => AppError::InvalidMove(anyhow::anyhow!(message)),
            GeoError::Conflict(_) | GeoError::HasChildren { .. } => {
                AppError::Conflict(anyhow::anyhow!(message))
            }
            GeoError::ParentPathUndetermined(_) => {
                AppError::InternalError(anyhow::anyhow!(message))
            }
            GeoError::Database(e) => AppError::DatabaseError(e),
            GeoError::Internal(e) => AppError::InternalError(e),
        }
    }
}
