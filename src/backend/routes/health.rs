/**
 * Health Check
 *
 * Liveness probe for load balancers and orchestration. It does not touch
 * the store or the hub.
 */

/// Returns `200 OK` with the body `OK`
pub async fn health_check() -> &'static str {
    "OK"
}
