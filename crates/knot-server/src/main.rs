use std::sync::Arc;

use color_eyre::eyre::{Context, Result};

use knot_db::KnotDb;
use knot_server::{ServerConfig, router};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .from_env_lossy()
                .add_directive("knot_server=info".parse().unwrap())
                .add_directive("knot_db=info".parse().unwrap())
                .add_directive("tower_http=info".parse().unwrap()),
        )
        .init();

    let config = ServerConfig::from_env().wrap_err("Invalid listen address")?;

    let db = match config.db_path.as_deref() {
        Some(path) => KnotDb::new_with_path(path).await,
        None => KnotDb::new().await,
    }
    .wrap_err("Failed to open database")?;

    let app = router(Arc::new(db), config.api_key.clone());

    tracing::info!("listening on http://{}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .wrap_err("Failed to bind listen address")?;
    axum::serve(listener, app).await?;

    Ok(())
}
