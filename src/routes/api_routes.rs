use axum::{Router, routing::{get, post}};
use crate::controllers::recommend_controller::{
    compute_bill, health, list_subsidies, recommend,
};
use crate::shared_state::AppState;

/// Build the `/api/*` sub-router.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health",       get(health))
        .route("/recommend",    post(recommend))
        .route("/tariff/bill",  post(compute_bill))
        .route("/subsidies",    get(list_subsidies))
        .with_state(state)
}
