use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use coterie_api::AppStateInner;
use coterie_auth::TokenService;
use coterie_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coterie=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let host = std::env::var("COTERIE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("COTERIE_PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()?;
    let db_path = std::env::var("COTERIE_DB_PATH").unwrap_or_else(|_| "coterie.db".into());
    let jwt_secret = std::env::var("COTERIE_JWT_SECRET").unwrap_or_else(|_| {
        warn!("COTERIE_JWT_SECRET not set, using an insecure development secret");
        "dev-secret-change-me".into()
    });
    let access_ttl_minutes: i64 = std::env::var("COTERIE_ACCESS_TTL_MINUTES")
        .unwrap_or_else(|_| "30".into())
        .parse()?;
    let refresh_ttl_days: i64 = std::env::var("COTERIE_REFRESH_TTL_DAYS")
        .unwrap_or_else(|_| "7".into())
        .parse()?;
    // Without a mail sender there is nobody to deliver verification tokens,
    // so accounts verify on signup unless explicitly disabled.
    let auto_verify: bool = std::env::var("COTERIE_AUTO_VERIFY")
        .unwrap_or_else(|_| "true".into())
        .parse()?;

    // Init database
    let db = Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let tokens = TokenService::new(
        &jwt_secret,
        chrono::Duration::minutes(access_ttl_minutes),
        chrono::Duration::days(refresh_ttl_days),
    );
    let state = Arc::new(AppStateInner {
        db,
        tokens,
        auto_verify,
    });

    let app = coterie_api::router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Coterie server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
