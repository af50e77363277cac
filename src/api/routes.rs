use std::sync::Arc;

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{
    access::AccessControl,
    activation::ActivationService,
    jwt::{Role, TokenIssuer},
    middleware::{authenticate, ensure_role},
    session_service::SessionService,
};
use crate::config::AppConfig;
use crate::errors::Result;
use crate::notify::Notifier;
use crate::storage::{AccountRepository, DbPool, SqlxAccountRepository};

use super::handlers::{
    activate_handler, delete_account_handler, health_handler, list_accounts_handler,
    login_handler, logout_handler, me_handler, register_handler, restore_password_handler,
    restore_request_handler, update_me_handler,
};

#[derive(Clone)]
pub struct ApiState {
    pub session: SessionService,
    pub activation: ActivationService,
    pub access: AccessControl,
    /// Where activation redirects the browser
    pub client_url: String,
}

impl ApiState {
    /// Wire the services over one pool and notifier.
    pub fn new(pool: DbPool, config: &AppConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let repository: Arc<dyn AccountRepository> = Arc::new(SqlxAccountRepository::new(pool));
        let issuer = Arc::new(TokenIssuer::from_config(&config.auth)?);

        Ok(Self {
            session: SessionService::new(
                repository.clone(),
                notifier,
                issuer.clone(),
                Arc::new(config.auth.clone()),
                config.notification.api_base_url.clone(),
            ),
            activation: ActivationService::new(repository.clone()),
            access: AccessControl::new(issuer, repository),
            client_url: config.notification.client_url.clone(),
        })
    }
}

pub fn build_router(state: ApiState, enable_cors: bool) -> Router {
    let auth_layer = middleware::from_fn_with_state(state.access.clone(), authenticate);
    let admin_layer = middleware::from_fn_with_state(Role::Admin, ensure_role);

    let secured_api = Router::new()
        .route("/api/v1/me", get(me_handler).put(update_me_handler))
        .route(
            "/api/v1/users",
            get(list_accounts_handler).route_layer(admin_layer).delete(delete_account_handler),
        )
        .route_layer(auth_layer);

    let public_api = Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/registration", post(register_handler))
        .route("/api/v1/activate/{link}", get(activate_handler))
        .route("/api/v1/login", post(login_handler))
        .route("/api/v1/logout", post(logout_handler))
        .route("/api/v1/password/restore-request", post(restore_request_handler))
        .route("/api/v1/password/restore", post(restore_password_handler));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            crate::request_span!(request.method(), request.uri().path())
        });

    let router = public_api.merge(secured_api).with_state(state).layer(trace_layer);

    if enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
