use std::{env, fs::OpenOptions, net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use ledgerly::{
    AppState, DEFAULT_HISTORY_DAYS, MAX_HISTORY_DAYS, PlaidClient, ProviderConfig,
    ProviderEnvironment, build_router, graceful_shutdown, logging_middleware,
};

/// The JSON API server for ledgerly.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Which of the banking provider's environments to use.
    #[arg(long, value_enum, default_value_t = ProviderEnvironment::Sandbox)]
    provider_env: ProviderEnvironment,

    /// How many days of transactions to fetch on each sync.
    #[arg(
        long,
        default_value_t = DEFAULT_HISTORY_DAYS,
        value_parser = clap::value_parser!(i64).range(0..=MAX_HISTORY_DAYS)
    )]
    history_days: i64,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let secret = env::var("SECRET").expect("The environment variable 'SECRET' must be set");
    let client_id =
        env::var("PLAID_CLIENT_ID").expect("The environment variable 'PLAID_CLIENT_ID' must be set");
    let provider_secret =
        env::var("PLAID_SECRET").expect("The environment variable 'PLAID_SECRET' must be set");

    let provider_config = ProviderConfig::new(args.provider_env, &client_id, &provider_secret)
        .history_days(args.history_days);
    let provider = PlaidClient::new(provider_config).expect("Could not create provider client");

    let conn = Connection::open(&args.db_path).expect("Could not open database");
    let state =
        AppState::new(conn, &secret, Arc::new(provider)).expect("Could not initialize database");

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(state).layer(middleware::from_fn(logging_middleware));
    let router = add_tracing_layer(router);

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("Server stopped unexpectedly");
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file))
        .with_filter(filter::LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(stdout_log)
        .with(debug_log)
        .init();
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
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}

#[cfg(test)]
mod args_tests {
    use clap::Parser;

    use super::Args;

    #[test]
    fn history_days_must_be_in_range() {
        let parse = |days: &str| {
            Args::try_parse_from(["server", "--db-path", "test.db", "--history-days", days])
        };

        assert_eq!(parse("90").unwrap().history_days, 90);
        assert!(parse("-1").is_err());
        assert!(parse("9223372036854775807").is_err());
    }
}
