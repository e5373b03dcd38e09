use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use course_portal::api::router;
use course_portal::config::Config;
use course_portal::db::{self, users};
use course_portal::models::{NewUserRequest, Role};
use course_portal::services::CounterAuditor;
use course_portal::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "course_portal=debug,tower_http=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = db::connect(&config.database_url, config.max_connections).await?;
    db::migrate(&pool).await?;

    if let Some(username) = &config.bootstrap_admin {
        if users::find_by_username(&pool, username).await?.is_none() {
            let admin = users::insert(
                &pool,
                NewUserRequest {
                    id: None,
                    username: username.clone(),
                    display_name: None,
                    role: Role::Admin,
                },
            )
            .await?;
            info!("bootstrap admin {} created with id {}", admin.username, admin.id);
        }
    }

    let state = AppState::new(pool);

    if config.audit_interval_secs > 0 {
        let auditor = CounterAuditor::new(state.ledger.clone(), config.audit_interval_secs, config.audit_repair);
        tokio::spawn(auditor.start());
    } else {
        warn!("counter auditor disabled (AUDIT_INTERVAL_SECS=0)");
    }

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
