//! HTTP API
//! Mission: Translate HTTP requests into store/verifier/gate calls

pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::CredentialVerifier;
use crate::store::UserStore;
use crate::validation::ValidationPolicy;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub verifier: Arc<CredentialVerifier>,
    pub policy: ValidationPolicy,
    pub bcrypt_cost: u32,
}

/// Assemble the service router: a public health probe plus the
/// Basic-auth-protected /users subtree.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/:user_id",
            get(handlers::get_user)
                .put(handlers::put_user)
                .patch(handlers::patch_user)
                .delete(handlers::delete_user),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::basic_auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .route("/ping", get(handlers::ping))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
