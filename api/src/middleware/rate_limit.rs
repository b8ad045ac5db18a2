//! Rate limiting middleware for API endpoints
//!
//! Admission is decided by a shared in-process [`RateLimiter`]. Requests are
//! keyed by the authenticated user when [`JwtAuth`](super::auth::JwtAuth)
//! ran first, and by client address otherwise.

use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
    sync::Arc,
    task::{Context, Poll},
};

use qd_core::errors::AuthError;
use qd_core::services::rate_limit::{RateLimitDecision, RateLimiter};

use super::auth::{reject, RequestAuthExt};

/// Rate limit middleware factory
///
/// All clones share the same limiter, so every worker and every route
/// draws from the same buckets.
#[derive(Clone)]
pub struct RateLimit {
    limiter: Option<Arc<RateLimiter>>,
}

impl RateLimit {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self {
            limiter: Some(limiter),
        }
    }

    /// Middleware that admits every request
    pub fn disabled() -> Self {
        Self { limiter: None }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    limiter: Option<Arc<RateLimiter>>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
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
        let limiter = self.limiter.clone();

        Box::pin(async move {
            if let Some(limiter) = limiter {
                let key = rate_limit_key(&req);
                if let RateLimitDecision::Limited { retry_after } = limiter.check(&key) {
                    tracing::debug!(key = %key, retry_after, "Rate limit exceeded");
                    return Ok(reject(req, AuthError::RateLimitExceeded { retry_after }.into()));
                }
            }

            let response = service.call(req).await?;
            Ok(response.map_into_left_body())
        })
    }
}

/// Bucket key: `user:<id>` when authenticated, else `ip:<addr>`
pub(crate) fn rate_limit_key(req: &ServiceRequest) -> String {
    if let Some(user_id) = req.user_id() {
        return format!("user:{}", user_id);
    }

    let addr = req
        .peer_addr()
        .map(|addr| addr.ip().to_string())
        .or_else(|| req.connection_info().peer_addr().map(str::to_owned))
        .unwrap_or_else(|| "unknown".to_string());
    format!("ip:{}", addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use actix_web::HttpMessage;
    use qd_core::domain::entities::token::{Claims, TokenType};

    use crate::middleware::auth::AuthContext;

    #[test]
    fn test_key_prefers_user() {
        let req = TestRequest::default()
            .peer_addr("10.1.2.3:5555".parse().unwrap())
            .to_srv_request();
        assert_eq!(rate_limit_key(&req), "ip:10.1.2.3");

        let claims = Claims::new(
            42,
            "dana",
            "user",
            TokenType::Access,
            "querydesk",
            "querydesk-api",
            60,
        );
        req.extensions_mut().insert(AuthContext::from_claims(claims));
        assert_eq!(rate_limit_key(&req), "user:42");
    }

    #[test]
    fn test_key_without_address() {
        let req = TestRequest::default().to_srv_request();
        assert!(rate_limit_key(&req).starts_with("ip:"));
    }
}
