use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::http::Method;
use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use reqwest::Client;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use civicpulse_backend::config::Config;
use civicpulse_backend::db::account_repository::AccountRepository;
use civicpulse_backend::db::issue_repository::IssueRepository;
use civicpulse_backend::db::postgres_account_repository::PostgresAccountRepository;
use civicpulse_backend::db::postgres_issue_repository::PostgresIssueRepository;
use civicpulse_backend::db::postgres_report_repository::PostgresReportRepository;
use civicpulse_backend::db::report_repository::ReportRepository;
use civicpulse_backend::db::schema::init_db;
use civicpulse_backend::responses::JsonResponse;
use civicpulse_backend::routes::auth::{handle_login, handle_refresh, handle_register};
use civicpulse_backend::routes::authority::{
    handle_authority_login, handle_register_lower, handle_update_profile,
};
use civicpulse_backend::routes::issues::{
    handle_department_issues, handle_nearby_issues, handle_update_status,
};
use civicpulse_backend::routes::reports::{
    handle_get_report, handle_my_reports, handle_submit_report,
};
use civicpulse_backend::services::storage::{BucketStorage, ObjectStorage};
use civicpulse_backend::state::AppState;
use civicpulse_backend::utils::jwt::JwtKeys;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let config = Arc::new(Config::from_env());
    let jwt_keys = Arc::new(JwtKeys::from_env().expect("JWT secrets must be configured"));

    let rate_limit_ms: u64 = std::env::var("RATE_LIMITER_MILLISECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        // Default: 200ms/token (~5 req/sec)
        .unwrap_or(200);
    let rate_limit_burst: u32 = std::env::var("RATE_LIMITER_BURST")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(20);
    let global_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(rate_limit_ms)
            .burst_size(rate_limit_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .unwrap(),
    );

    let rate_limit_auth_s: u64 = std::env::var("RATE_LIMITER_AUTH_SECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(1);
    let rate_limit_auth_burst: u32 = std::env::var("RATE_LIMITER_AUTH_BURST")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(10);
    // Stricter limiter for credential endpoints
    let auth_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(rate_limit_auth_s)
            .burst_size(rate_limit_auth_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .unwrap(),
    );

    // Background task to drop stale per-IP rate limiter state
    for limiter in [
        global_governor_conf.limiter().clone(),
        auth_governor_conf.limiter().clone(),
    ] {
        std::thread::spawn(move || {
            let interval = std::time::Duration::from_secs(60);
            loop {
                std::thread::sleep(interval);
                limiter.retain_recent();
            }
        });
    }

    let pg_pool = establish_connection(&config).await;
    init_db(&pg_pool)
        .await
        .expect("Failed to initialize database schema");

    let accounts = Arc::new(PostgresAccountRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn AccountRepository>;
    let reports = Arc::new(PostgresReportRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn ReportRepository>;
    let issues = Arc::new(PostgresIssueRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn IssueRepository>;
    let storage = Arc::new(BucketStorage::new(Client::new(), &config.storage))
        as Arc<dyn ObjectStorage>;

    let state = AppState {
        accounts,
        reports,
        issues,
        storage,
        jwt: jwt_keys,
        config: config.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(config.frontend_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register", post(handle_register))
        .route("/login", post(handle_login))
        .route("/refresh", post(handle_refresh))
        .layer(GovernorLayer {
            config: auth_governor_conf.clone(),
        });

    let authority_routes = Router::new()
        .route("/register-lower", post(handle_register_lower))
        .route("/login", post(handle_authority_login))
        .route("/update-profile", put(handle_update_profile))
        .layer(GovernorLayer {
            config: auth_governor_conf.clone(),
        });

    let report_routes = Router::new()
        .route("/", post(handle_submit_report))
        .route("/my-reports", get(handle_my_reports))
        .route("/{id}", get(handle_get_report))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes));

    let issue_routes = Router::new()
        .route("/nearby", get(handle_nearby_issues))
        .route("/department", get(handle_department_issues))
        .route("/status", put(handle_update_status));

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/auth", auth_routes)
        .nest("/authority", authority_routes)
        .nest("/reports", report_routes)
        .nest("/issues", issue_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer {
            config: global_governor_conf.clone(),
        })
        .layer(cors);

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));

    let listener = TcpListener::bind(addr).await.unwrap();
    println!("Listening at http://{}", addr);
    axum::serve(listener, make_service).await.unwrap();
}

/// A simple root route.
async fn root() -> Response {
    JsonResponse::success("Welcome to the CivicPulse issue reporting API").into_response()
}

async fn health() -> &'static str {
    "OK"
}

/// Establish a bounded connection pool and verify it.
async fn establish_connection(config: &Config) -> PgPool {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_db_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to the database");

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .expect("Failed to verify database connection");

    info!("✅ Successfully connected to the database");
    pool
}
