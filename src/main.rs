use std::sync::Arc;

use tracing::{info, warn};

use scooped::config::{
    AdminAuthConfig, MailerConfig, ServerConfig, StripeConfig, SupabaseConfig, SweepAndGoConfig,
};
use scooped::http::{AppState, app_router};
use scooped::integrations::stripe::{StripeClient, UnconfiguredCheckout};
use scooped::integrations::supabase::{OfflineAuth, SupabaseClient};
use scooped::integrations::sweepandgo::SweepAndGoClient;
use scooped::notify::WaitlistNotifier;
use scooped::onboarding::{
    AuthProvider, CheckoutProvider, Orchestrator, TimeoutBudgets,
};
use scooped::pricing::{CURRENT_POLICY, QuoteCalculator, RemotePricing};
use scooped::store::{LibSqlStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let server = ServerConfig::from_env();

    let store: Arc<dyn Store> =
        Arc::new(LibSqlStore::new_local(std::path::Path::new(&server.db_path)).await?);
    info!(path = %server.db_path, "Database ready");

    // Integrations are optional; each missing credential disables one and
    // the service degrades to its local fallback.
    let sweepandgo = SweepAndGoConfig::from_env().map(|cfg| Arc::new(SweepAndGoClient::new(cfg)));
    if sweepandgo.is_none() {
        warn!("SWEEPANDGO_API_TOKEN not set; quotes use the local price table only");
    }

    let auth: Arc<dyn AuthProvider> = match SupabaseConfig::from_env() {
        Some(cfg) => Arc::new(SupabaseClient::new(cfg)),
        None => {
            warn!("SUPABASE_URL/SUPABASE_SERVICE_ROLE_KEY not set; issuing local account ids");
            Arc::new(OfflineAuth)
        }
    };

    let checkout: Arc<dyn CheckoutProvider> = match StripeConfig::from_env() {
        Some(cfg) => Arc::new(StripeClient::new(cfg)),
        None => {
            warn!("STRIPE_SECRET_KEY not set; checkout-session creation disabled");
            Arc::new(UnconfiguredCheckout)
        }
    };

    let admin_auth = AdminAuthConfig::from_env();
    if admin_auth.is_none() {
        warn!("JWT_SECRET not set; admin API disabled");
    }

    let remote: Option<Arc<dyn RemotePricing>> =
        sweepandgo.clone().map(|c| c as Arc<dyn RemotePricing>);
    let calculator = Arc::new(QuoteCalculator::new(CURRENT_POLICY, remote));

    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        auth,
        checkout,
        CURRENT_POLICY,
        TimeoutBudgets::default(),
    ));

    let notifier = Arc::new(WaitlistNotifier::new(
        MailerConfig::from_env(),
        &server.fallback_log_path,
    ));

    let state = AppState {
        store,
        calculator,
        orchestrator,
        sweepandgo,
        notifier,
        admin_auth,
    };

    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", server.port)).await?;
    info!(port = server.port, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}
