use actix_web::{web, HttpResponse};

use qd_core::errors::TokenError;
use qd_core::repositories::RevocationStore;

use crate::app::AppState;
use crate::dto::{LogoutRequest, LogoutResponse};
use crate::handlers::ApiError;
use crate::middleware::auth::AuthContext;

/// Handler for POST /api/v1/auth/logout
///
/// Revokes the access token the request was authenticated with. When the
/// body carries a refresh token belonging to the same user, it is revoked
/// as well. An invalid or foreign refresh token fails the whole request and
/// leaves the access token untouched.
///
/// # Headers
///
/// ```text
/// Authorization: Bearer {access_token}
/// ```
///
/// # Errors
/// - 401 Unauthorized: Missing or invalid access token, or a refresh token
///   of another user
/// - 503 Service Unavailable: Revocation store unreachable
pub async fn logout<R>(
    state: web::Data<AppState<R>>,
    auth: AuthContext,
    body: Option<web::Json<LogoutRequest>>,
) -> Result<HttpResponse, ApiError>
where
    R: RevocationStore + 'static,
{
    let service = &state.token_service;

    // Reject a bad refresh token before anything is revoked
    let refresh_claims = match body.and_then(|body| body.into_inner().refresh_token) {
        Some(refresh_token) => {
            let claims = service.validate_refresh_token(&refresh_token)?;
            if claims.uid != auth.user_id {
                return Err(TokenError::ClaimsInvalid {
                    reason: "refresh token belongs to another user".into(),
                }
                .into());
            }
            Some(claims)
        }
        None => None,
    };

    service.revoke_claims(&auth.claims).await?;
    if let Some(claims) = &refresh_claims {
        service.revoke_claims(claims).await?;
    }

    tracing::info!(user_id = auth.user_id, jti = %auth.claims.jti, "User logged out");

    Ok(HttpResponse::Ok().json(LogoutResponse {
        message: "Logged out successfully".to_string(),
    }))
}
