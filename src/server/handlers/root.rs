use axum::Json;
use serde::Serialize;

const SERVICE_NAME: &str = "Wallet Backend API";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceIndex {
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
}

pub async fn home() -> Json<ServiceIndex> {
    Json(ServiceIndex {
        message: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            "GET /api/healthz",
            "POST /api/create-onramp-session",
            "GET /api/onramp-providers",
            "GET /api/onramp-session/{id}",
            "POST /api/protected-create-encryption-session",
            "POST /webhook",
            "GET /ws",
        ],
    })
}
