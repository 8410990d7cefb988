//! # nirvanist: backend for The Nirvanist
//!
//! `nirvanist` serves the account, newsletter, contact and chatbot endpoints behind The Nirvanist
//! website. Content (meetups, retreats, wisdom articles) is read by the frontend straight from the
//! managed database; this service owns the flows that need secrets or side effects.
//!
//! ## Overview
//!
//! - **Accounts** ([`auth`]): registration with Argon2id password hashing, signed session tokens,
//!   email verification and password reset through single-use opaque tokens whose digests are
//!   stored, never the tokens themselves.
//! - **Newsletter** ([`newsletter`]): double opt-in. A subscribe request stores the address as
//!   `pending` and mails a confirmation link; following it activates the subscription.
//! - **Contact form** ([`contact`]): stored, then optionally forwarded to a staff inbox.
//! - **Chatbot** ([`chat`]): canned reply, or a proxy to an OpenAI-compatible completions API.
//!
//! Public forms are gated by a Turnstile CAPTCHA ([`captcha`]) that fails open when the
//! verification service is unreachable. Email goes out through Resend, SMTP or a file sink
//! ([`email`]).
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum). Handlers in [`api`] unpack the
//! request, call a service borrowing the shared [`AppState`], and map [`errors::Error`] to a status
//! code and a `{ "message": ... }` body. Services reach storage through the store traits in [`db`],
//! backed by PostgreSQL in production and by in-memory maps in tests and local development.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use nirvanist::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = nirvanist::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     nirvanist::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod auth;
pub mod captcha;
pub mod chat;
pub mod config;
pub mod contact;
pub mod db;
pub mod email;
pub mod errors;
pub mod newsletter;
mod openapi;
pub mod telemetry;
pub mod types;
mod validation;

#[cfg(test)]
pub mod test_utils;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    auth::session::SessionIssuer, captcha::CaptchaVerifier, chat::ChatService, config::CorsOrigin, db::Stores, email::EmailService,
    openapi::ApiDoc,
};

/// Application state shared across all request handlers.
///
/// Everything here is cheap to clone: stores and clients are behind `Arc`s.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .stores(stores)
///     .email(email)
///     .captcha(captcha)
///     .chat(chat)
///     .sessions(sessions)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub stores: Stores,
    pub email: EmailService,
    pub captcha: CaptchaVerifier,
    pub chat: ChatService,
    pub sessions: SessionIssuer,
}

impl AppState {
    /// Build the outbound clients described by `config` around already-opened stores.
    pub fn from_config(config: Config, stores: Stores) -> anyhow::Result<Self> {
        Ok(Self::builder()
            .email(EmailService::from_config(&config)?)
            .captcha(CaptchaVerifier::new(&config.captcha)?)
            .chat(ChatService::from_config(&config.chat)?)
            .sessions(SessionIssuer::from_config(&config)?)
            .stores(stores)
            .config(config)
            .build())
    }
}

/// Get the nirvanist database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.security.cors;

    let allow_origin = if cors_config
        .allowed_origins
        .iter()
        .any(|origin| matches!(origin, CorsOrigin::Wildcard))
    {
        AllowOrigin::any()
    } else {
        let mut origins: Vec<HeaderValue> = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Browsers send the bare origin, without a trailing slash or path
                origins.push(url.origin().ascii_serialization().parse()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// Routes:
/// - `/api/auth/*`: registration, login, verification, password reset, profile
/// - `/api/newsletter/*`: subscribe, re-send confirmation, confirm
/// - `/api/contact`, `/api/chat`
/// - `/healthz` liveness probe, `/docs` API reference
/// - `/internal/metrics` when `enable_metrics` is set
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    use api::handlers::{auth, chat, contact, newsletter};

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/verify-email", get(auth::verify_email_link).post(auth::verify_email))
        .route("/resend-verification", post(auth::resend_verification))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/user", get(auth::current_user));

    let newsletter_routes = Router::new()
        .route("/subscribe", post(newsletter::subscribe))
        .route("/send-confirmation", post(newsletter::send_confirmation))
        .route("/confirm", get(newsletter::confirm_link).post(newsletter::confirm));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/newsletter", newsletter_routes)
        .route("/contact", post(contact::submit_contact))
        .route("/chat", post(chat::chat));

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api", api_routes)
        .with_state(state.clone())
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let mut router = router.layer(create_cors_layer(&state.config)?);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns the router, state and database pool.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] opens storage (running migrations for PostgreSQL), builds
///    the outbound clients and the router
/// 2. **Serve**: [`Application::serve`] binds to the configured address and handles requests
/// 3. **Shutdown**: when the shutdown future resolves, in-flight requests drain, the pool is
///    closed and pending spans are flushed
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting nirvanist with configuration: {:#?}", config);

        let (stores, pool) = db::setup_database(&config).await?;
        let app_state = AppState::from_config(config.clone(), stores)?;
        let router = build_router(&app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Nirvanist listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
