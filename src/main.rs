use anyhow::Result;
use endolla::config::Config;
use endolla::logging::{get_logger, init_logging};
use endolla::manager::StationManager;
use std::sync::Arc;
use tokio::sync::Mutex;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let logger = get_logger("main");
    logger.info(&format!(
        "Endolla {} starting up, {} station(s) configured",
        env!("APP_VERSION"),
        config.stations.len()
    ));

    let mut manager = StationManager::new(&config.feed)
        .map_err(|e| anyhow::anyhow!("Failed to create feed client: {}", e))?;
    for station in &config.stations {
        // One bad entry does not prevent the others from loading
        if let Err(e) = manager.setup_entry(station.clone()).await {
            logger.error(&format!(
                "Failed to set up station {}: {}",
                station.station_id, e
            ));
        }
    }
    let manager = Arc::new(Mutex::new(manager));

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

    #[cfg(feature = "web")]
    let web_task = if config.web.enabled {
        let state = endolla::web::AppState::new(manager.clone(), config.clone());
        let host = config.web.host.clone();
        let port = config.web.port;
        let web_logger = get_logger("web");
        Some(tokio::spawn(async move {
            let signal = async move {
                let _ = shutdown_rx.changed().await;
            };
            if let Err(e) = endolla::web::serve(state, &host, port, signal).await {
                web_logger.error(&format!("Web server error: {}", e));
            }
        }))
    } else {
        None
    };
    #[cfg(not(feature = "web"))]
    let _ = &mut shutdown_rx;

    tokio::signal::ctrl_c().await?;
    logger.info("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    manager.lock().await.shutdown_all().await;

    #[cfg(feature = "web")]
    if let Some(task) = web_task {
        let _ = task.await;
    }

    logger.info("Endolla shutdown complete");
    Ok(())
}
