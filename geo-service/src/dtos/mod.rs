pub mod geo;

pub use geo::{
    AddNodeRequest, AllLocationsResponse, DeleteNodeRequest, DeleteNodeResponse,
    DistrictsParams, DistrictsResponse, HistoryResponse, MoveNodeRequest, MovementResponse,
    NodeResponse, ProvincesResponse, UpdateNodeRequest,
};
