//! JWT authentication middleware for protecting API endpoints.
//!
//! This middleware extracts the bearer token from the Authorization header,
//! validates it as an access token, consults the revocation store and
//! injects the caller's identity into the request extensions.

use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION},
    Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
    sync::Arc,
    task::{Context, Poll},
};

use qd_core::{
    domain::entities::token::Claims,
    errors::{AuthError, DomainResult, TokenError},
    repositories::RevocationStore,
    services::token::TokenService,
};
use qd_shared::config::AuthConfig;

use crate::handlers::ApiError;

/// Response header set when the access token is close to expiry
pub const TOKEN_EXPIRING_HEADER: &str = "x-token-expiring";

/// Authenticated caller, stored in request extensions by [`JwtAuth`]
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub claims: Claims,
}

impl AuthContext {
    /// Creates a new authentication context from validated claims
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            user_id: claims.uid,
            username: claims.username.clone(),
            role: claims.role.clone(),
            claims,
        }
    }
}

/// Read access to the authenticated identity on any request
///
/// Every accessor returns `None` when the request did not pass through
/// [`JwtAuth`].
pub trait RequestAuthExt {
    fn auth_context(&self) -> Option<AuthContext>;
    fn user_id(&self) -> Option<i64>;
    fn username(&self) -> Option<String>;
    fn role(&self) -> Option<String>;
    fn claims(&self) -> Option<Claims>;
}

impl<T: HttpMessage> RequestAuthExt for T {
    fn auth_context(&self) -> Option<AuthContext> {
        self.extensions().get::<AuthContext>().cloned()
    }

    fn user_id(&self) -> Option<i64> {
        self.extensions().get::<AuthContext>().map(|ctx| ctx.user_id)
    }

    fn username(&self) -> Option<String> {
        self.extensions()
            .get::<AuthContext>()
            .map(|ctx| ctx.username.clone())
    }

    fn role(&self) -> Option<String> {
        self.extensions().get::<AuthContext>().map(|ctx| ctx.role.clone())
    }

    fn claims(&self) -> Option<Claims> {
        self.extensions()
            .get::<AuthContext>()
            .map(|ctx| ctx.claims.clone())
    }
}

/// The part of the token service the middleware needs
///
/// Object safe so the middleware does not carry the store type.
pub trait AccessTokenVerifier: Send + Sync {
    fn validate_access_token(&self, token: &str) -> DomainResult<Claims>;

    fn is_token_revoked<'a>(&'a self, jti: &'a str) -> LocalBoxFuture<'a, DomainResult<bool>>;

    fn is_token_expiring_soon(&self, claims: &Claims, threshold_secs: i64) -> bool;
}

impl<R: RevocationStore + 'static> AccessTokenVerifier for TokenService<R> {
    fn validate_access_token(&self, token: &str) -> DomainResult<Claims> {
        TokenService::validate_access_token(self, token)
    }

    fn is_token_revoked<'a>(&'a self, jti: &'a str) -> LocalBoxFuture<'a, DomainResult<bool>> {
        Box::pin(TokenService::is_token_revoked(self, jti))
    }

    fn is_token_expiring_soon(&self, claims: &Claims, threshold_secs: i64) -> bool {
        TokenService::is_token_expiring_soon(self, claims, threshold_secs)
    }
}

/// JWT authentication middleware factory
#[derive(Clone)]
pub struct JwtAuth {
    verifier: Arc<dyn AccessTokenVerifier>,
    fail_closed: bool,
    expiring_threshold: i64,
}

impl JwtAuth {
    /// Degrade-open middleware with the default 300 s expiry warning
    pub fn new(verifier: Arc<dyn AccessTokenVerifier>) -> Self {
        Self {
            verifier,
            fail_closed: false,
            expiring_threshold: 300,
        }
    }

    /// Takes the revocation policy and expiry warning threshold from config
    pub fn from_config(verifier: Arc<dyn AccessTokenVerifier>, config: &AuthConfig) -> Self {
        Self::new(verifier)
            .fail_closed(config.revocation.fail_closed)
            .expiring_threshold(config.jwt.expiring_threshold)
    }

    /// Deny with 503 instead of allowing when the revocation store cannot answer
    pub fn fail_closed(mut self, fail_closed: bool) -> Self {
        self.fail_closed = fail_closed;
        self
    }

    pub fn expiring_threshold(mut self, secs: i64) -> Self {
        self.expiring_threshold = secs;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddleware {
            service: Rc::new(service),
            settings: self.clone(),
        }))
    }
}

/// JWT authentication middleware service
pub struct JwtAuthMiddleware<S> {
    service: Rc<S>,
    settings: JwtAuth,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let settings = self.settings.clone();

        Box::pin(async move {
            let token = match extract_bearer_token(req.headers()) {
                Some(token) => token,
                None => return Ok(reject(req, AuthError::MissingAuthHeader.into())),
            };

            let claims = match settings.verifier.validate_access_token(&token) {
                Ok(claims) => claims,
                Err(e) => return Ok(reject(req, e.into())),
            };

            match settings.verifier.is_token_revoked(&claims.jti).await {
                Ok(false) => {}
                Ok(true) => return Ok(reject(req, TokenError::Revoked.into())),
                Err(e) if settings.fail_closed => return Ok(reject(req, e.into())),
                Err(e) => {
                    tracing::warn!(
                        path = %req.path(),
                        jti = %claims.jti,
                        error = %e,
                        "Revocation check unavailable, allowing request"
                    );
                }
            }

            let expiring = settings
                .verifier
                .is_token_expiring_soon(&claims, settings.expiring_threshold);

            tracing::debug!(user_id = claims.uid, jti = %claims.jti, "Request authenticated");
            req.extensions_mut().insert(AuthContext::from_claims(claims));

            let mut response = service.call(req).await?;
            if expiring {
                response.headers_mut().insert(
                    HeaderName::from_static(TOKEN_EXPIRING_HEADER),
                    HeaderValue::from_static("true"),
                );
            }
            Ok(response.map_into_left_body())
        })
    }
}

/// Ends the request with the error envelope, logging where it came from
pub(crate) fn reject<B>(req: ServiceRequest, err: ApiError) -> ServiceResponse<EitherBody<B>> {
    tracing::warn!(
        path = %req.path(),
        peer = ?req.peer_addr(),
        error = %err,
        "Request rejected"
    );
    let response = err.error_response();
    req.into_response(response).map_into_right_body()
}

/// Extracts the token from `Authorization: Bearer <token>`
///
/// The scheme is case-sensitive, followed by exactly one space and a
/// non-empty token without whitespace.
pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let token = headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;

    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return None;
    }
    Some(token.to_string())
}

/// Extractor for required authentication
impl FromRequest for AuthContext {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let result = req
            .auth_context()
            .ok_or_else(|| ApiError::from(AuthError::MissingRole).into());

        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn headers_with(value: &str) -> HeaderMap {
        TestRequest::default()
            .insert_header((AUTHORIZATION, value))
            .to_srv_request()
            .headers()
            .clone()
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(
            extract_bearer_token(&headers_with("Bearer test_token_123")),
            Some("test_token_123".to_string())
        );

        for bad in [
            "test_token_123",
            "bearer test_token_123",
            "BEARER test_token_123",
            "Bearer",
            "Bearer ",
            "Bearer  test_token_123",
            "Bearer abc def",
            "Basic dXNlcjpwYXNz",
        ] {
            assert_eq!(extract_bearer_token(&headers_with(bad)), None, "{bad:?}");
        }

        let no_header = TestRequest::default().to_srv_request();
        assert_eq!(extract_bearer_token(no_header.headers()), None);
    }
}
