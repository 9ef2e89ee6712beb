use std::{
    env::{self},
    error::Error,
    fs::OpenOptions,
    net::SocketAddr,
    sync::Arc,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use finance_tracker::{
    AppState, LogPasswordResetNotifier, build_router, graceful_shutdown, spawn_auth_event_logger,
};

/// The web server for the finance tracker.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// Directory where uploaded receipt images are stored.
    #[arg(long, default_value = "receipts")]
    receipts_dir: String,

    /// The port to serve the app from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The canonical timezone used for "today" and "this month", e.g. "Pacific/Auckland".
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,

    /// The URL users reach the app at, used in password reset links.
    /// Defaults to `http://localhost:{port}`.
    #[arg(long)]
    public_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    setup_logging()?;

    let args = Args::parse();

    if time_tz::timezones::get_by_name(&args.timezone).is_none() {
        return Err(format!("\"{}\" is not a canonical timezone name", args.timezone).into());
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    let public_url = args
        .public_url
        .unwrap_or_else(|| format!("http://localhost:{}", args.port));

    let secret = env::var("SECRET")
        .map_err(|_| "The environment variable 'SECRET' must be set".to_owned())?;

    let connection = Connection::open(&args.db_path)?;
    let state = AppState::new(
        connection,
        &secret,
        &args.timezone,
        &args.receipts_dir,
        &public_url,
        Arc::new(LogPasswordResetNotifier),
    )?;

    spawn_auth_event_logger(&state.auth_events);

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(state));

    #[cfg(debug_assertions)]
    let router = router.layer(LiveReloadLayer::new());

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    Ok(())
}

fn setup_logging() -> Result<(), Box<dyn Error>> {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")?;

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();

    Ok(())
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Errors are logged by the handlers, so skip the default 5xx logging.
        .on_failure(());

    router.layer(tracing_layer)
}
