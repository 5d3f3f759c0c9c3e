//! Configuration management: the TOML application config, the database connection,
//! and startup seeding of configured fixtures.

/// Application configuration loading from config.toml
pub mod app;

/// Database configuration and connection management
pub mod database;

use crate::{
    core::{class::seed_classes, product::seed_products},
    errors::Result,
};
use sea_orm::DatabaseConnection;
use tracing::info;

pub use app::{AppConfig, load_app_configuration};

/// Inserts the configured classes and products that are not in the database yet.
pub async fn seed_fixtures(db: &DatabaseConnection, config: &AppConfig) -> Result<()> {
    info!(
        "Seeding fixtures. Found {} classes and {} products in configuration.",
        config.classes.len(),
        config.products.len()
    );
    seed_classes(db, &config.classes).await?;
    seed_products(db, &config.products).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::class::get_class_by_id, test_utils::setup_test_db};

    #[tokio::test]
    async fn test_seed_fixtures_from_toml() -> Result<()> {
        let db = setup_test_db().await?;
        let config: AppConfig = toml::from_str(
            r#"
            [[classes]]
            id = "swim-101"
            title = "Beginner Swim"
            start_time = "2025-01-06T10:00:00Z"
            recurrence_rule = "FREQ=WEEKLY"

            [[products]]
            id = "term-spring"
            name = "Spring Term"
            "#,
        )
        .map_err(|e| crate::errors::Error::Config {
            message: e.to_string(),
        })?;

        seed_fixtures(&db, &config).await?;
        seed_fixtures(&db, &config).await?;

        let class = get_class_by_id(&db, "swim-101").await?;
        assert_eq!(class.map(|c| c.title).as_deref(), Some("Beginner Swim"));
        Ok(())
    }
}
