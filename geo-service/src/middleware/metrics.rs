use crate::services::metrics::HTTP_REQUESTS_TOTAL;
use axum::{extract::Request, middleware::Next, response::Response};

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let method = req.method().to_string();

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), status.as_str()])
        .inc();

    response
}
