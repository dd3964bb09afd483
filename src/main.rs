use axum::http::{header, HeaderValue, Method};
use axum::Router;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hjertebro::config::Config;
use hjertebro::handlers;
use hjertebro::poller;
use hjertebro::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "hjertebro")]
#[command(about = "Donation session gateway for Støt med Hjerte")]
struct Cli {
    /// Run one reconciliation pass, print the JSON summary, and exit
    #[arg(long)]
    poll_once: bool,
}

/// CORS allow-list for the donation frontend origins.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let mut origins: Vec<HeaderValue> = Vec::new();
    for origin in allowed_origins {
        match origin.parse() {
            Ok(value) => origins.push(value),
            Err(_) => tracing::warn!("Ignoring invalid CORS origin: {}", origin),
        }
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hjertebro=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    let state = AppState::from_config(&config);

    // One-off reconciliation run (the scheduled job, triggered by hand)
    if cli.poll_once {
        match poller::reconcile_pending(&state).await {
            Ok(summary) => {
                let json = serde_json::to_string_pretty(&summary)
                    .expect("Failed to serialize poll summary");
                println!("{}", json);
            }
            Err(e) => {
                eprintln!("Reconciliation failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // Start the scheduled reconciliation loop
    if config.poll_interval_secs > 0 {
        poller::spawn_poller_task(state.clone(), config.poll_interval_secs);
    } else {
        tracing::warn!("Background poller disabled (POLL_INTERVAL_SECS=0)");
    }

    // Build the application router
    let app = Router::new()
        // Session creation + record proxies (rate limited per tier)
        .merge(handlers::public_router(config.rate_limit))
        // Frisbii webhook (always answers 200)
        .merge(handlers::webhook_router())
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Hjertebro server listening on {}", addr);

    // Run server with graceful shutdown.
    // Use into_make_service_with_connect_info to enable IP-based rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
