//! Axum-based HTTP API over the station registry, with optional OpenAPI
//! (utoipa) and Swagger UI

use crate::config::{Config, StationConfig};
use crate::error::EndollaError;
use crate::manager::{EntryId, StationManager};
use crate::projection::PortProjection;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<Mutex<StationManager>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(manager: Arc<Mutex<StationManager>>, config: Config) -> Self {
        Self {
            manager,
            config: Arc::new(config),
        }
    }
}

/// Error body `{"error": ...}` with a status derived from the error kind
pub struct ApiError(EndollaError);

impl From<EndollaError> for ApiError {
    fn from(err: EndollaError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EndollaError::NotFound { .. } => StatusCode::NOT_FOUND,
            EndollaError::Validation { .. } | EndollaError::Config { .. } => {
                StatusCode::BAD_REQUEST
            }
            EndollaError::UpdateFailed { .. }
            | EndollaError::Network { .. }
            | EndollaError::Timeout { .. }
            | EndollaError::HttpStatus { .. }
            | EndollaError::Decode { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(serde_json::json!({"error": self.0.to_string()})),
        )
            .into_response()
    }
}

fn unknown_entry(entry_id: &str) -> ApiError {
    ApiError(EndollaError::not_found(format!("Unknown entry {}", entry_id)))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/health", responses(
    (status = 200, description = "Service is healthy")
)))]
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/version", responses((status = 200))))]
pub async fn version() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("APP_VERSION"),
    }))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/entries", responses((status = 200))))]
pub async fn list_entries(State(state): State<AppState>) -> impl IntoResponse {
    let manager = state.manager.lock().await;
    Json(manager.entries())
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/api/entries", responses(
    (status = 201, description = "Entry created"),
    (status = 400, description = "Invalid or duplicate station id")
)))]
pub async fn create_entry(
    State(state): State<AppState>,
    Json(station): Json<StationConfig>,
) -> Result<impl IntoResponse, ApiError> {
    station.validate()?;

    let launcher = {
        let manager = state.manager.lock().await;
        if manager.is_configured(&station.station_id) {
            return Err(ApiError(EndollaError::validation(
                "station_id".to_string(),
                format!("Station {} is already configured", station.station_id),
            )));
        }
        manager.launcher()
    };

    // The first refresh runs without the registry lock held
    let runtime = launcher.launch(station).await?;

    let mut manager = state.manager.lock().await;
    let entry_id = manager.insert(runtime).await?;
    let summary = manager
        .entries()
        .into_iter()
        .find(|summary| summary.entry_id == entry_id);
    Ok((StatusCode::CREATED, Json(summary)))
}

#[cfg_attr(feature = "openapi", utoipa::path(delete, path = "/api/entries/{entry_id}", responses(
    (status = 204), (status = 404)
)))]
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut manager = state.manager.lock().await;
    if manager.unload_entry(&EntryId::from(entry_id.clone())).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(unknown_entry(&entry_id))
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/entries/{entry_id}/status", responses(
    (status = 200), (status = 404)
)))]
pub async fn entry_status(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let manager = state.manager.lock().await;
    let coordinator = manager
        .coordinator(&EntryId::from(entry_id.clone()))
        .ok_or_else(|| unknown_entry(&entry_id))?;
    Ok(Json(coordinator.status()))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/entries/{entry_id}/snapshot", responses(
    (status = 200, description = "Raw station record as last published"), (status = 404)
)))]
pub async fn entry_snapshot(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let manager = state.manager.lock().await;
    let coordinator = manager
        .coordinator(&EntryId::from(entry_id.clone()))
        .ok_or_else(|| unknown_entry(&entry_id))?;
    let snapshot = coordinator.current_snapshot();
    Ok(Json(snapshot.raw().clone()))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/api/entries/{entry_id}/refresh", responses(
    (status = 200), (status = 404), (status = 502, description = "Refresh cycle failed")
)))]
pub async fn refresh_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let coordinator = {
        let manager = state.manager.lock().await;
        manager
            .coordinator(&EntryId::from(entry_id.clone()))
            .ok_or_else(|| unknown_entry(&entry_id))?
    };
    coordinator.refresh().await?;
    Ok(Json(coordinator.status()))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/entries/{entry_id}/events", responses(
    (status = 200, description = "Server-sent port states after each published snapshot"), (status = 404)
)))]
pub async fn entry_events(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (rx, projections) = {
        let manager = state.manager.lock().await;
        let runtime = manager
            .entry(&EntryId::from(entry_id.clone()))
            .ok_or_else(|| unknown_entry(&entry_id))?;
        (
            runtime.coordinator().subscribe(),
            runtime.projections().to_vec(),
        )
    };

    let stream = WatchStream::new(rx).map(move |snapshot| {
        let states: Vec<_> = projections
            .iter()
            .map(|projection: &PortProjection| projection.state_from(&snapshot))
            .collect();
        let payload = serde_json::to_string(&states).unwrap_or_else(|_| "[]".to_string());
        Ok::<Event, std::convert::Infallible>(Event::default().event("ports").data(payload))
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/entities", responses((status = 200))))]
pub async fn list_entities(State(state): State<AppState>) -> impl IntoResponse {
    let manager = state.manager.lock().await;
    Json(manager.entities())
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/entities/{unique_id}", responses(
    (status = 200), (status = 404)
)))]
pub async fn get_entity(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let manager = state.manager.lock().await;
    manager.entity(&unique_id).map(Json).ok_or_else(|| {
        ApiError(EndollaError::not_found(format!(
            "Unknown entity {}",
            unique_id
        )))
    })
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/config", responses((status = 200))))]
pub async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(
        serde_json::to_value(state.config.as_ref())
            .unwrap_or(serde_json::json!({"error":"serialization"})),
    )
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/config/schema", responses((status = 200))))]
pub async fn get_config_schema() -> impl IntoResponse {
    let schema = schemars::schema_for!(crate::config::Config);
    Json(serde_json::to_value(&schema).unwrap_or(serde_json::json!({"error":"schema"})))
}

#[cfg(feature = "openapi")]
#[derive(utoipa::OpenApi)]
#[openapi(
    paths(
        health, version,
        list_entries, create_entry, delete_entry,
        entry_status, entry_snapshot, refresh_entry, entry_events,
        list_entities, get_entity,
        get_config, get_config_schema,
    ),
    tags((name = "endolla", description = "Endolla charging port status API"))
)]
pub struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/api/health", get(health))
        .route("/api/version", get(version))
        .route("/api/entries", get(list_entries).post(create_entry))
        .route("/api/entries/{entry_id}", axum::routing::delete(delete_entry))
        .route("/api/entries/{entry_id}/status", get(entry_status))
        .route("/api/entries/{entry_id}/snapshot", get(entry_snapshot))
        .route("/api/entries/{entry_id}/refresh", post(refresh_entry))
        .route("/api/entries/{entry_id}/events", get(entry_events))
        .route("/api/entities", get(list_entities))
        .route("/api/entities/{unique_id}", get(get_entity))
        .route("/api/config", get(get_config))
        .route("/api/config/schema", get(get_config_schema));

    #[cfg(feature = "openapi")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()),
        )
    };

    router
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until `shutdown` resolves
pub async fn serve<F>(state: AppState, host: &str, port: u16, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = build_router(state);

    let logger = crate::logging::get_logger("web");
    logger.info(&format!(
        "Starting web server; requested host={}, port={}",
        host, port
    ));

    let (addr, parsed_ok): (SocketAddr, bool) = match host.parse::<IpAddr>() {
        Ok(ip) => (SocketAddr::new(ip, port), true),
        Err(_) => (([127, 0, 0, 1], port).into(), false),
    };
    if !parsed_ok {
        logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Web server listening at http://{}:{} (API /api)",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    logger.info("Web server stopped");
    Ok(())
}
