use actix_web::{web, HttpResponse};

use qd_core::repositories::RevocationStore;

use crate::app::AppState;
use crate::middleware::auth::AuthContext;

/// Handler for GET /api/v1/admin/status
///
/// Operational view of the authentication subsystem. Admins only.
pub async fn status<R>(state: web::Data<AppState<R>>, auth: AuthContext) -> HttpResponse
where
    R: RevocationStore + 'static,
{
    let token_config = state.token_service.config();
    let rate_limit = match &state.rate_limiter {
        Some(limiter) => serde_json::json!({
            "enabled": true,
            "burst": limiter.burst(),
            "tracked_keys": limiter.len(),
        }),
        None => serde_json::json!({ "enabled": false }),
    };

    HttpResponse::Ok().json(serde_json::json!({
        "requested_by": auth.username,
        "revocation_store": state.health.revocation_backend,
        "revocation_fail_closed": state.auth.revocation.fail_closed,
        "tokens": {
            "issuer": token_config.issuer,
            "audience": token_config.audience,
            "access_token_ttl": token_config.access_token_ttl,
            "refresh_token_ttl": token_config.refresh_token_ttl,
            "rotate_refresh_tokens": token_config.rotate_refresh_tokens,
        },
        "rate_limit": rate_limit,
    }))
}
