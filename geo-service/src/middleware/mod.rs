pub mod metrics;
pub mod principal;

pub use metrics::metrics_middleware;
pub use principal::RootPrincipal;
