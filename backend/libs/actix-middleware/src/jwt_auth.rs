use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    Error, HttpMessage, HttpResponse, ResponseError,
};
use crypto_core::JwtKeys;
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

/// Authenticated user resolved from a validated token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// The actor behind a request. Reads are open to anonymous principals;
/// writes are decided by each service's permission checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    User(AuthUser),
}

impl Principal {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Principal::User(user) => Some(user),
            Principal::Anonymous => None,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.user().map(|u| u.id)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Principal::User(_))
    }
}

impl From<AuthUser> for Principal {
    fn from(user: AuthUser) -> Self {
        Principal::User(user)
    }
}

/// Authentication failures, rendered as `{"detail": ...}` with 401
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication credentials were not provided.")]
    MissingCredentials,

    #[error("Invalid Authorization header format.")]
    InvalidScheme,

    #[error("Invalid or expired token.")]
    InvalidToken,
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(("WWW-Authenticate", "Bearer"))
            .json(serde_json::json!({ "detail": self.to_string() }))
    }
}

/// JWT Authentication Middleware
///
/// A request without an `Authorization` header passes through as an
/// anonymous principal. A header that is present but unusable is rejected
/// with 401 before the handler runs.
#[derive(Clone)]
pub struct JwtAuthMiddleware {
    keys: Arc<JwtKeys>,
}

impl JwtAuthMiddleware {
    pub fn new(keys: Arc<JwtKeys>) -> Self {
        Self { keys }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = JwtAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            keys: self.keys.clone(),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    keys: Arc<JwtKeys>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let keys = self.keys.clone();

        Box::pin(async move {
            let header = req
                .headers()
                .get("Authorization")
                .map(|h| h.to_str().map(str::to_owned));

            if let Some(header) = header {
                let resolved = header
                    .map_err(|_| AuthError::InvalidScheme)
                    .and_then(|value| authenticate(&keys, &value));

                match resolved {
                    Ok(user) => {
                        req.extensions_mut().insert(user);
                    }
                    Err(err) => {
                        let response = err.error_response().map_into_right_body();
                        return Ok(req.into_response(response));
                    }
                }
            }

            service
                .call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        })
    }
}

/// Resolve an `Authorization` header value into an authenticated user.
///
/// Both `Bearer <jwt>` and `Token <jwt>` are accepted.
fn authenticate(keys: &JwtKeys, header: &str) -> Result<AuthUser, AuthError> {
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("Token "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidScheme)?;

    let token_data = keys.validate_token(token).map_err(|e| {
        tracing::warn!("JWT validation failed: {}", e);
        AuthError::InvalidToken
    })?;

    let id = token_data.claims.user_id().map_err(|e| {
        tracing::warn!("Malformed token subject: {}", e);
        AuthError::InvalidToken
    })?;

    Ok(AuthUser {
        id,
        username: token_data.claims.username,
    })
}

/// Always succeeds; anonymous when the middleware found no credentials
impl actix_web::FromRequest for Principal {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        let principal = req
            .extensions()
            .get::<AuthUser>()
            .cloned()
            .map(Principal::User)
            .unwrap_or(Principal::Anonymous);
        ready(Ok(principal))
    }
}

/// Fails with 401 when the request is anonymous
impl actix_web::FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        match req.extensions().get::<AuthUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(AuthError::MissingCredentials.into())),
        }
    }
}
