use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

use crate::config::DatabaseConfig;

fn connect_options(config: &DatabaseConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(true);
    opt
}

/// Connect with the configured pool bounds and sync the entity schema.
pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(connect_options(config)).await?;

    db.get_schema_registry("server::entity::*")
        .sync(&db)
        .await?;

    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_bounds_come_from_config() {
        let config = DatabaseConfig {
            url: "postgres://localhost/photoshare".into(),
            max_connections: 20,
            min_connections: 2,
            connect_timeout_secs: 5,
            idle_timeout_secs: 300,
        };

        let opt = connect_options(&config);
        assert_eq!(opt.get_max_connections(), Some(20));
        assert_eq!(opt.get_min_connections(), Some(2));
        assert_eq!(opt.get_connect_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(opt.get_idle_timeout(), Some(Some(Duration::from_secs(300))));
    }
}
