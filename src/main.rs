use std::{sync::Arc, time::Duration};

use anyhow::Context;
use mailroll::{app::App, config::get_configuration, store::PgDatabase, telemetry::get_subscriber};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration().context("Failed to read configuration.")?;

    get_subscriber(&config.log_level, std::io::stderr).init();

    let pool = PgPoolOptions::new()
        .max_connections(50)
        .acquire_timeout(Duration::from_secs(2))
        .connect_with(config.database.with_db())
        .await
        .context("Could not connect to database")?;

    let db = PgDatabase::new(pool);
    db.migrate().await.context("Could not migrate the database")?;

    let app = App::with(&config.application)
        .await
        .context("Could not bind the listener")?;
    app.serve(Arc::new(db))
        .await
        .context("The server stopped unexpectedly")?;

    Ok(())
}
