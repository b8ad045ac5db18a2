//! Role-based access middleware
//!
//! Must run after [`JwtAuth`](super::auth::JwtAuth): it only reads the role
//! that authentication placed in the request extensions.

use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
    task::{Context, Poll},
};

use qd_core::services::access::RoleGate;

use super::auth::{reject, RequestAuthExt};

/// Middleware factory admitting only the given roles (plus `admin`)
#[derive(Debug, Clone)]
pub struct RequireRole {
    gate: RoleGate,
}

impl RequireRole {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            gate: RoleGate::new(roles),
        }
    }

    pub fn admin() -> Self {
        Self {
            gate: RoleGate::admin_only(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireRole
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireRoleMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireRoleMiddleware {
            service: Rc::new(service),
            gate: Rc::new(self.gate.clone()),
        }))
    }
}

pub struct RequireRoleMiddleware<S> {
    service: Rc<S>,
    gate: Rc<RoleGate>,
}

impl<S, B> Service<ServiceRequest> for RequireRoleMiddleware<S>
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
        let gate = Rc::clone(&self.gate);

        Box::pin(async move {
            let role = req.role();
            if let Err(e) = gate.check(role.as_deref()) {
                return Ok(reject(req, e.into()));
            }

            let response = service.call(req).await?;
            Ok(response.map_into_left_body())
        })
    }
}
