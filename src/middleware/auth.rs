use crate::{
    models::Role,
    services::auth_service::{self, AuthContext},
    state::AppState,
    utils::AppError,
};
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

/// Verifies the bearer token and stores an `AuthContext` in the request
/// extensions. With `admin_only` the token's role must be `Admin`.
#[derive(Clone, Copy)]
pub struct AuthMiddleware {
    admin_only: bool,
}

impl AuthMiddleware {
    pub fn authenticated() -> Self {
        Self { admin_only: false }
    }

    pub fn admin_only() -> Self {
        Self { admin_only: true }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            admin_only: self.admin_only,
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    admin_only: bool,
}

impl<S> AuthMiddlewareService<S> {
    fn authorize(&self, req: &ServiceRequest) -> Result<AuthContext, AppError> {
        let state = req
            .app_data::<web::Data<AppState>>()
            .ok_or_else(|| AppError::Unauthorized("Auth is not configured".to_string()))?;

        let token = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(auth_service::bearer_token)
            .ok_or_else(|| AppError::Unauthorized("No token, authorization denied".to_string()))?;

        let ctx = auth_service::verify_token(token, &state.jwt)?;

        match (self.admin_only, ctx.role) {
            (true, Role::Student) => Err(AppError::Forbidden("Access denied. Admin only.".to_string())),
            (true, Role::Admin) | (false, _) => Ok(ctx),
        }
    }
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.authorize(&req) {
            Ok(ctx) => {
                log::debug!("🔐 {} {} as {} ({})", req.method(), req.path(), ctx.email, ctx.role);
                req.extensions_mut().insert(ctx);

                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res)
                })
            }
            Err(e) => {
                log::warn!("❌ {} {} rejected: {}", req.method(), req.path(), e);
                Box::pin(async move { Err(e.into()) })
            }
        }
    }
}
