use std::time::Duration;

use sea_orm::sea_query::Index;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::entity::image;

pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.to_owned());

    let timeout = Duration::from_secs(config.connect_timeout_secs);
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(timeout)
        .acquire_timeout(timeout)
        .sqlx_logging(config.sqlx_logging);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("hero_server::entity::*")
        .sync(&db)
        .await?;

    ensure_indexes(&db).await?;

    Ok(db)
}

/// Ensure required database indexes exist.
///
/// Schema sync creates the foreign key on `image.hero_id` but not an index
/// over it; every hero read and the cascade delete filter on that column.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_image_hero_id")
        .table(image::Entity)
        .col(image::Column::HeroId)
        .to_owned();

    let backend = db.get_database_backend();
    match db.execute_raw(backend.build(&stmt)).await {
        Ok(_) => info!("Ensured index idx_image_hero_id exists"),
        Err(e) => warn!("Failed to create index idx_image_hero_id: {}", e),
    }

    Ok(())
}
