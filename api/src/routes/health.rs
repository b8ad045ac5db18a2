use actix_web::{web, HttpResponse};

use qd_core::repositories::RevocationStore;

use crate::app::AppState;

/// Health check endpoint handler
///
/// Reports 200 when every configured dependency answers and 503 otherwise.
/// Dependencies that are not configured are reported as `"disabled"`.
pub async fn health_check<R>(state: web::Data<AppState<R>>) -> HttpResponse
where
    R: RevocationStore + 'static,
{
    let probes = &state.health;

    let redis = match &probes.redis {
        Some(client) => probe(client.health_check().await),
        None => "disabled",
    };
    let database = match &probes.database {
        Some(pool) => probe(pool.health_check().await),
        None => "disabled",
    };

    let healthy = redis != "down" && database != "down";
    let body = serde_json::json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "service": "querydesk-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "checks": {
            "revocation_store": probes.revocation_backend,
            "redis": redis,
            "database": database,
        },
    });

    if healthy {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

fn probe<E: std::fmt::Display>(result: Result<bool, E>) -> &'static str {
    match result {
        Ok(true) => "up",
        Ok(false) => "down",
        Err(e) => {
            tracing::warn!(error = %e, "Health probe failed");
            "down"
        }
    }
}
