//! LifeStream Portal - blood donor and recipient portal.
//!
//! Serves the JSON API on port 3000 by default.
//!
//! # Storage
//!
//! With `PORTAL_DATABASE_URL` (or `DATABASE_URL`) set, records and
//! credentials live in `PostgreSQL` and migrations run at startup. Without
//! it, everything is kept in memory for the life of the process.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use lifestream_portal::config::{MailConfig, PortalConfig};
use lifestream_portal::identity::{IdentityProvider, MemoryIdentityProvider, PgIdentityProvider};
use lifestream_portal::notify::transport::{ConsoleTransport, SmtpTransport};
use lifestream_portal::notify::{MailTransport, Notifier};
use lifestream_portal::state::AppState;
use lifestream_portal::store::{MemoryStore, PgRecordStore, RecordStore, postgres, seed};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &PortalConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            // Donor records carry health data
            send_default_pii: false,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(config: &PortalConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lifestream_portal=info,tower_http=debug".into());

    let json_layer = config
        .log_json
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!config.log_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

/// Pick the record store and identity provider.
async fn open_backends(
    config: &PortalConfig,
) -> Result<(Arc<dyn RecordStore>, Arc<dyn IdentityProvider>), BoxError> {
    if let Some(database_url) = &config.database_url {
        let pool = postgres::create_pool(database_url).await?;
        tracing::info!("Database pool created");
        postgres::migrate(&pool).await?;
        tracing::info!("Migrations applied");

        Ok((
            Arc::new(PgRecordStore::new(pool.clone())),
            Arc::new(PgIdentityProvider::new(pool)),
        ))
    } else {
        tracing::warn!("No database configured, records are kept in memory");
        Ok((
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryIdentityProvider::new()),
        ))
    }
}

fn mail_transport(config: &PortalConfig) -> Result<Arc<dyn MailTransport>, BoxError> {
    Ok(match &config.mail {
        MailConfig::Console => Arc::new(ConsoleTransport),
        MailConfig::Smtp(smtp) => Arc::new(SmtpTransport::new(smtp)?),
    })
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = PortalConfig::from_env()?;

    // Sentry before the subscriber so the tracing layer has a client
    let _sentry_guard = init_sentry(&config);
    init_tracing(&config);

    let (store, identity) = open_backends(&config).await?;

    if config.seed_demo_data {
        seed::seed_demo_data(store.as_ref()).await?;
    }

    let notifier = Notifier::new(mail_transport(&config)?, config.admin_email.clone());
    let state = AppState::new(store, identity, notifier).await?;

    let app = lifestream_portal::app(state, config.secure_cookies)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("portal listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
