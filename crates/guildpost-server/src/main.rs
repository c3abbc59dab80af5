use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use guildpost_api::auth::{self, AppState, AppStateInner};
use guildpost_api::middleware::require_auth;
use guildpost_api::{announcements, newsletter, responses};
use guildpost_mail::{HttpMailClient, Notifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "guildpost=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("GUILDPOST_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("GUILDPOST_DB_PATH").unwrap_or_else(|_| "guildpost.db".into());
    let host = std::env::var("GUILDPOST_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("GUILDPOST_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    let mail_url =
        std::env::var("GUILDPOST_MAIL_URL").unwrap_or_else(|_| "http://localhost:8025".into());
    let mail_token = std::env::var("GUILDPOST_MAIL_TOKEN").unwrap_or_default();
    let mail_from =
        std::env::var("GUILDPOST_MAIL_FROM").unwrap_or_else(|_| "board@guildpost.local".into());
    let mail_timeout: u64 = std::env::var("GUILDPOST_MAIL_TIMEOUT_SECS")
        .unwrap_or_else(|_| "10".into())
        .parse()?;

    // Init database
    let db = guildpost_db::Database::open(&PathBuf::from(&db_path))?;

    // Outbound mail: one attempt per event, bounded by the client timeout
    let mailer = HttpMailClient::new(
        mail_url,
        mail_from,
        mail_token,
        Duration::from_secs(mail_timeout),
    )?;
    let notifier = Notifier::new(Arc::new(mailer));

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        notifier,
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/confirm", post(auth::confirm))
        .route("/auth/resend", post(auth::resend_code))
        .route("/auth/login", post(auth::login))
        .route("/announcements", get(announcements::list))
        .route("/announcements/{id}", get(announcements::detail))
        .route("/categories", get(announcements::categories))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/announcements", post(announcements::create))
        .route("/announcements/{id}", put(announcements::update))
        .route("/announcements/{id}", delete(announcements::delete))
        .route("/announcements/{id}/responses", post(responses::submit))
        .route("/responses", get(responses::my_responses))
        .route("/responses/{id}/accept", post(responses::accept))
        .route("/responses/{id}/reject", post(responses::reject))
        .route("/responses/{id}/reopen", post(responses::reopen))
        .route("/responses/{id}", delete(responses::delete))
        .route("/newsletter/subscription", post(newsletter::subscribe))
        .route("/newsletter/subscription", delete(newsletter::unsubscribe))
        .route("/newsletter/broadcast", post(newsletter::broadcast_handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("guildpost server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
