//! `/health` (§10.2).

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "service name and version string"),
    ),
    tag = "health",
)]
pub async fn health() -> &'static str {
    concat!("video-digest-api ", env!("CARGO_PKG_VERSION"))
}
