//! HTTP layer: shared state, router assembly, and request handlers.

pub mod admin;
pub mod auth;
pub mod public;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use tower_http::cors::CorsLayer;

use crate::config::AdminAuthConfig;
use crate::integrations::sweepandgo::SweepAndGoClient;
use crate::notify::WaitlistNotifier;
use crate::onboarding::Orchestrator;
use crate::pricing::QuoteCalculator;
use crate::store::Store;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub calculator: Arc<QuoteCalculator>,
    pub orchestrator: Arc<Orchestrator>,
    pub sweepandgo: Option<Arc<SweepAndGoClient>>,
    pub notifier: Arc<WaitlistNotifier>,
    pub admin_auth: Option<AdminAuthConfig>,
}

/// Assemble the full application router: public routes plus the
/// bearer-token-guarded admin surface, with permissive CORS for the
/// browser frontends.
pub fn app_router(state: AppState) -> Router {
    let admin = admin::admin_routes(state.clone()).layer(middleware::from_fn_with_state(
        state.admin_auth.clone(),
        auth::require_admin,
    ));

    Router::new()
        .merge(public::public_routes(state))
        .merge(admin)
        .layer(CorsLayer::permissive())
}
