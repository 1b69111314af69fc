use std::sync::Arc;

use common::mail::Mailer;
use common::media::MediaHost;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub media: Arc<dyn MediaHost>,
    pub mailer: Arc<dyn Mailer>,
}
