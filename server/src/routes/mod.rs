pub mod extract;
pub mod health;
pub mod proxy;

use axum::Router;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest("/proxy", proxy::router())
        .nest("/extract", extract::router())
        .with_state(state)
}
