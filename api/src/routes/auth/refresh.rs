use actix_web::{web, HttpResponse};
use validator::Validate;

use qd_core::repositories::RevocationStore;

use crate::app::AppState;
use crate::dto::{RefreshTokenRequest, TokenResponse};
use crate::handlers::ApiError;

/// Handler for POST /api/v1/auth/refresh
///
/// Exchanges a refresh token for a new token pair. With rotation enabled
/// the presented refresh token cannot be used again.
///
/// # Request Body
///
/// ```json
/// {
///     "refresh_token": "eyJ..."
/// }
/// ```
///
/// # Response
///
/// ## Success (200 OK)
/// ```json
/// {
///     "access_token": "eyJ...",
///     "refresh_token": "eyJ...",
///     "token_type": "Bearer",
///     "expires_in": 3600,
///     "expires_at": "2025-01-01T12:00:00Z"
/// }
/// ```
///
/// ## Errors
/// - 400 Bad Request: Missing or empty refresh token
/// - 401 Unauthorized: Invalid, expired, reused or revoked refresh token
/// - 503 Service Unavailable: Revocation store unreachable
pub async fn refresh_token<R>(
    state: web::Data<AppState<R>>,
    request: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse, ApiError>
where
    R: RevocationStore + 'static,
{
    request.validate()?;

    let pair = state
        .token_service
        .refresh_token_pair(&request.refresh_token)
        .await?;

    Ok(HttpResponse::Ok().json(TokenResponse::from(pair)))
}
