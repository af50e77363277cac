//! Axum middleware for authentication and authorization.

use axum::{
    body::Body,
    extract::{Extension, State},
    http::{header::AUTHORIZATION, Method, Request},
    middleware::Next,
    response::Response,
};
use tracing::{field, info_span, warn, Instrument};

use crate::api::error::ApiError;
use crate::auth::access::{bearer_token, require_role, AccessControl};
use crate::auth::jwt::{Claims, Role};

/// Authenticates the bearer token and stores its [`Claims`] in request extensions.
pub async fn authenticate(
    State(access): State<AccessControl>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let correlation_id = uuid::Uuid::new_v4();
    let span = info_span!(
        "auth_middleware.authenticate",
        http.method = %request.method(),
        http.path = %request.uri().path(),
        account_id = field::Empty,
        correlation_id = %correlation_id
    );

    let header =
        request.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok()).unwrap_or("");

    let result = async {
        let token = bearer_token(header)?;
        access.authenticate(token).await
    }
    .instrument(span.clone())
    .await;

    match result {
        Ok(claims) => {
            span.record("account_id", field::display(&claims.sub));
            tracing::Span::current().record("account_id", field::display(&claims.sub));
            request.extensions_mut().insert(claims);
            Ok(next.run(request).instrument(span).await)
        }
        Err(err) => {
            warn!(%correlation_id, error = %err, "authentication failed");
            Err(err.into())
        }
    }
}

/// Rejects authenticated callers whose role does not permit `required`.
pub async fn ensure_role(
    State(required): State<Role>,
    Extension(claims): Extension<Claims>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if let Err(err) = require_role(&claims, required) {
        warn!(account_id = %claims.sub, required = %required, "role check failed");
        return Err(err.into());
    }

    Ok(next.run(request).await)
}
