use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::session::session_layer;

mod auth;
mod error;
mod form;
pub mod render;
mod routes;
mod state;
mod users;
mod videos;

pub use error::*;
pub use state::AppState;

/// Builds every route of the site. Uploads larger than `upload_limit` bytes are rejected.
pub fn create_router(state: AppState, upload_limit: usize) -> Router {
    let media = ServeDir::new(state.storage.root());

    Router::new()
        .route("/", get(videos::home))
        .route("/search", get(videos::search))
        .route(
            "/videos/upload",
            get(videos::upload_form)
                .post(videos::upload)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/videos/:id", get(videos::detail).delete(videos::remove))
        .route("/videos/:id/edit", get(videos::edit_form).post(videos::edit))
        .route("/videos/:id/delete", post(videos::remove))
        .route("/api/videos/:id/view", post(videos::register_view))
        .route("/join", get(auth::join_form).post(auth::join))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/users/:id", get(users::profile))
        .nest_service("/uploads", media)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(state.clone(), session_layer)),
        )
        .with_state(state)
}
