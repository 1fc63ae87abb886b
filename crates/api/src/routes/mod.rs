//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth_middleware};

pub mod codes;
pub mod documents;
pub mod health;
pub mod public;
pub mod shares;

/// Creates the API router; protected routes get the auth middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(documents::routes())
        .merge(shares::routes())
        .merge(codes::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(public::routes())
        .merge(protected_routes)
}
