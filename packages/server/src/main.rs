use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{Level, info};

use common::mail::{LogMailer, Mailer, MailgunMailer};
use common::media::CloudinaryClient;

use server::config::AppConfig;
use server::database::init_db;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = Arc::new(AppConfig::load()?);

    let db = init_db(&config.database).await?;
    server::seed::ensure_indexes(&db).await?;

    let media = Arc::new(CloudinaryClient::new(config.media.clone()));

    let mailer: Arc<dyn Mailer> = match &config.mail {
        Some(mail) => Arc::new(MailgunMailer::new(mail.clone())),
        None => {
            tracing::warn!("No mail backend configured; confirmation emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let state = AppState {
        db,
        config: config.clone(),
        media,
        mailer,
    };

    let app = server::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server running at http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
