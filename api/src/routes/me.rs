use actix_web::{HttpRequest, HttpResponse};

use crate::dto::MeResponse;
use crate::handlers::ApiError;
use crate::middleware::auth::RequestAuthExt;
use qd_core::errors::AuthError;

/// Handler for GET /api/v1/me
///
/// Returns the identity carried by the caller's access token.
pub async fn me(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let ctx = req.auth_context().ok_or(AuthError::MissingRole)?;

    Ok(HttpResponse::Ok().json(MeResponse {
        user_id: ctx.user_id,
        username: ctx.username,
        role: ctx.role,
        expires_at: ctx.claims.expires_at(),
    }))
}
