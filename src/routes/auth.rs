use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::middleware::auth::customer_guard;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(crate::handlers::auth::register))
        .route("/login", post(crate::handlers::auth::login))
        .route("/logout", post(crate::handlers::auth::logout))
        .route(
            "/profile",
            get(crate::handlers::auth::profile)
                .layer(from_fn_with_state(state, customer_guard)),
        )
}
