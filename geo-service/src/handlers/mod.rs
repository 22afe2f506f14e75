pub mod geo;
pub mod health;
pub mod lookup;

pub use geo::{
    add_node, all_locations, delete_node, get_node, move_node, node_history, update_node,
};
pub use health::{health_check, metrics_endpoint, readiness_check};
pub use lookup::{districts, provinces};
