//! The marketplace web service.

use marketplace::infra::{config, database, logging};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    let _guard = logging::init_logging();
    let config = config::load_config()?;
    let db = database::init_db(&config.database);
    database::migrate(&db).await?;

    let listener =
        TcpListener::bind(format!("{}:{}", config.server.address, config.server.port)).await?;
    marketplace::app::run_app(listener, db, config).await?;

    Ok(())
}
