//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeouts, body limits)
//! - Guard each lead endpoint with its rate limit policy
//! - Apply hot-reloaded configuration
//! - Run background tasks (limiter sweep, admin API) until shutdown

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin;
use crate::config::schema::{
    ROUTE_ARTIST_SIGNUP, ROUTE_INVESTOR_INVESTMENT, ROUTE_LISTENER_SIGNUP, ROUTE_SUBSCRIBE,
};
use crate::config::{IntakeConfig, NotificationConfig, RateLimitConfig};
use crate::http::handlers;
use crate::http::middleware::{rate_limit_middleware, RouteGuard};
use crate::http::request::{make_span, propagate_request_id_layer, set_request_id_layer};
use crate::leads::Notifier;
use crate::security::rate_limit::{spawn_sweeper, FixedWindowLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<FixedWindowLimiter>,
    pub limits: Arc<ArcSwap<RateLimitConfig>>,
    pub notifications: Arc<ArcSwap<NotificationConfig>>,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(config: &IntakeConfig) -> Self {
        let notifications = Arc::new(ArcSwap::from_pointee(config.notifications.clone()));
        Self {
            limiter: Arc::new(FixedWindowLimiter::new()),
            limits: Arc::new(ArcSwap::from_pointee(config.rate_limit.clone())),
            notifier: Notifier::new(notifications.clone()),
            notifications,
        }
    }

    /// Swap in the hot-reloadable sections of a new config.
    pub fn apply_config(&self, config: &IntakeConfig) {
        self.limits.store(Arc::new(config.rate_limit.clone()));
        self.notifications.store(Arc::new(config.notifications.clone()));
        tracing::info!(
            rate_limit_enabled = config.rate_limit.enabled,
            webhook = config.notifications.webhook_url.is_some(),
            "Configuration reloaded"
        );
    }
}

/// HTTP server for lead intake.
pub struct HttpServer {
    router: Router,
    state: AppState,
    config: IntakeConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: IntakeConfig) -> Self {
        let state = AppState::new(&config);
        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            state,
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &IntakeConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route(
                "/api/subscribe",
                post(handlers::subscribe).route_layer(from_fn_with_state(
                    RouteGuard::new(&state, ROUTE_SUBSCRIBE),
                    rate_limit_middleware,
                )),
            )
            .route(
                "/api/artist-signup",
                post(handlers::artist_signup).route_layer(from_fn_with_state(
                    RouteGuard::new(&state, ROUTE_ARTIST_SIGNUP),
                    rate_limit_middleware,
                )),
            )
            .route(
                "/api/listener-signup",
                post(handlers::listener_signup).route_layer(from_fn_with_state(
                    RouteGuard::new(&state, ROUTE_LISTENER_SIGNUP),
                    rate_limit_middleware,
                )),
            )
            .route(
                "/api/investor-investment",
                post(handlers::investor_investment).route_layer(from_fn_with_state(
                    RouteGuard::new(&state, ROUTE_INVESTOR_INVESTMENT),
                    rate_limit_middleware,
                )),
            )
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(make_span))
                    .layer(propagate_request_id_layer())
                    .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.security.request_timeout_secs))),
            )
    }

    /// Shared state, for embedding or inspection.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    /// Run the server until a shutdown signal arrives.
    ///
    /// Configs received on `config_updates` replace the rate limit policies
    /// and notification settings of the running server.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<IntakeConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        spawn_sweeper(
            self.state.limiter.clone(),
            Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
            shutdown.resubscribe(),
        );

        let reload_state = self.state.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(config) => reload_state.apply_config(&config),
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            let admin_router = admin::setup_admin_router(self.state.clone(), &self.config.admin.api_key);
            let mut admin_shutdown = shutdown.resubscribe();
            tracing::info!(address = %self.config.admin.bind_address, "Admin API listening");
            tokio::spawn(async move {
                let result = axum::serve(admin_listener, admin_router)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "Admin API stopped with error");
                }
            });
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        let grace = Duration::from_secs(self.state.notifications.load().shutdown_grace_secs);
        self.state.notifier.drain(grace).await;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
