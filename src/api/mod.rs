mod handlers;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;
use crate::roster::RosterPublisher;

pub use handlers::BranchDetail;

/// Shared state for the admin API.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub publisher: RosterPublisher,
}

/// Admin API. Every mutation re-renders the affected branch before responding.
pub fn create_router(db: Database, publisher: RosterPublisher) -> Router {
    let api = Router::new()
        // Branches
        .route("/branches", get(handlers::list_branches))
        .route("/branches", post(handlers::create_branch))
        .route("/branches/{id}", get(handlers::get_branch))
        .route("/branches/{id}", put(handlers::update_branch))
        .route("/branches/{id}", delete(handlers::delete_branch))
        .route("/branches/{id}/ranks", get(handlers::list_ranks))
        .route("/branches/{id}/ranks", post(handlers::create_rank))
        .route("/branches/{id}/sub-branches", get(handlers::list_sub_branches))
        .route("/branches/{id}/sub-branches", post(handlers::create_sub_branch))
        .route("/branches/{id}/members", get(handlers::list_members))
        .route("/branches/{id}/members", post(handlers::create_member))
        .route("/branches/{id}/roster", get(handlers::preview_roster))
        .route("/branches/{id}/refresh", post(handlers::refresh_branch))
        // Ranks, sub-branches and members by their own id
        .route("/ranks/{id}", put(handlers::update_rank))
        .route("/ranks/{id}", delete(handlers::delete_rank))
        .route("/sub-branches/{id}", delete(handlers::delete_sub_branch))
        .route("/members", delete(handlers::remove_members_by_name))
        .route("/members/{id}", delete(handlers::delete_member))
        // Whole roster
        .route("/refresh", post(handlers::refresh_all))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { db, publisher })
}
