use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage, HttpRequest,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::{extractors::AuthenticatedUser, token::TokenService};
use crate::error::AppError;
use crate::store::Store;

/// Auth guard for protected routes.
///
/// Resolves `Authorization: Bearer <token>` to the owning user and stores an
/// [`AuthenticatedUser`] in the request extensions. Any failure short-circuits
/// with 401 before the handler runs.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let session = authenticate(req.request()).await?;
            req.extensions_mut().insert(session);
            service.call(req).await
        })
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

async fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let token = bearer_token(req).ok_or_else(please_authenticate)?;

    let tokens = req
        .app_data::<web::Data<TokenService>>()
        .cloned()
        .ok_or_else(|| AppError::InternalServerError("Token service not configured".into()))?;
    let store = req
        .app_data::<web::Data<dyn Store>>()
        .cloned()
        .ok_or_else(|| AppError::InternalServerError("Store not configured".into()))?;

    match tokens.validate(store.get_ref(), &token).await {
        Ok(user) => Ok(AuthenticatedUser { user, token }),
        Err(AppError::Unauthorized(reason)) => {
            log::debug!("rejected bearer token on {}: {}", req.path(), reason);
            Err(please_authenticate())
        }
        Err(err) => Err(err),
    }
}

fn please_authenticate() -> AppError {
    AppError::Unauthorized("Please authenticate".into())
}
