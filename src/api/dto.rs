use serde::Serialize;

/// GET /health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub catalog_records: usize,
    pub retrieval_ready: bool,
}
