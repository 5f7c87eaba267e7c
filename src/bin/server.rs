use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use base64::Engine;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tubenet::bake::Brightness;
use tubenet::clock::RunClock;
use tubenet::config::Params;
use tubenet::grid::{GRID_H, GRID_W};
use tubenet::mask::{DrawToggle, Mask};
use tubenet::metrics::Metrics;
use tubenet::{Brush, Simulation};

const MAX_STEPS_PER_REQUEST: usize = 1000;
const INITIAL_CITIES: usize = 6;

struct AppState {
    sim: Simulation,
    params: Params,
    clock: RunClock,
}

type Shared = Arc<Mutex<AppState>>;

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error(transparent)]
    Config(#[from] tubenet::config::ConfigError),
    #[error(transparent)]
    Bake(#[from] tubenet::bake::BakeError),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Config(_) | ApiError::Bake(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(%status, error = %self, "request failed");
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn encode_png(rgba: &[u8], w: usize, h: usize) -> Result<String, ApiError> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new(&mut buf);
    encoder
        .write_image(rgba, w as u32, h as u32, image::ExtendedColorType::Rgba8)
        .map_err(|e| ApiError::BadRequest(format!("PNG encode failed: {e}")))?;
    let b64 = base64::engine::general_purpose::STANDARD.encode(&buf);
    Ok(format!("data:image/png;base64,{}", b64))
}

// --------------------------------------------------------------------------
// Status

#[derive(Serialize)]
struct StatusResponse {
    step: usize,
    width: usize,
    height: usize,
    agents: usize,
    cities: usize,
    masks: Vec<Mask>,
    drawing: bool,
    metrics: Metrics,
    elapsed_s: f64,
    best_connect_s: Option<f64>,
    params: Params,
}

fn status_of(app: &AppState) -> StatusResponse {
    StatusResponse {
        step: app.sim.step_index(),
        width: app.sim.w,
        height: app.sim.h,
        agents: app.sim.agents().len(),
        cities: app.sim.cities().len(),
        masks: app.sim.masks().masks().to_vec(),
        drawing: app.sim.masks().is_drawing(),
        metrics: app.sim.metrics().clone(),
        elapsed_s: app.clock.elapsed(std::time::Instant::now()).as_secs_f64(),
        best_connect_s: app.clock.best().map(|d| d.as_secs_f64()),
        params: app.params.clone(),
    }
}

async fn status_handler(State(state): State<Shared>) -> ApiResult<StatusResponse> {
    let app = state.lock().await;
    Ok(Json(status_of(&app)))
}

// --------------------------------------------------------------------------
// Tick / params / reset

#[derive(Deserialize)]
struct TickRequest {
    steps: Option<usize>,
    /// Partial params merged over the current ones.
    params: Option<serde_json::Value>,
    snapshot: Option<bool>,
}

#[derive(Serialize)]
struct TickResponse {
    status: StatusResponse,
    snapshot: Option<String>,
}

fn merge_params(current: &Params, patch: serde_json::Value) -> Result<Params, ApiError> {
    let mut base = serde_json::to_value(current)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    match (&mut base, patch) {
        (serde_json::Value::Object(dst), serde_json::Value::Object(src)) => {
            for (k, v) in src {
                dst.insert(k, v);
            }
        }
        (_, serde_json::Value::Null) => {}
        _ => return Err(ApiError::BadRequest("params must be an object".into())),
    }
    let params: Params =
        serde_json::from_value(base).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    params.validate()?;
    Ok(params)
}

async fn tick_handler(
    State(state): State<Shared>,
    Json(req): Json<TickRequest>,
) -> ApiResult<TickResponse> {
    let steps = req.steps.unwrap_or(1).min(MAX_STEPS_PER_REQUEST);
    let response = tokio::task::spawn_blocking(move || -> Result<TickResponse, ApiError> {
        let mut app = state.blocking_lock();
        if let Some(patch) = req.params {
            app.params = merge_params(&app.params, patch)?;
        }
        let AppState { sim, params, clock } = &mut *app;
        for _ in 0..steps {
            sim.tick(params);
            clock.observe(std::time::Instant::now(), sim.metrics().all_connected);
        }
        let snapshot = if req.snapshot.unwrap_or(false) {
            Some(encode_png(&sim.render(params.tube_threshold), sim.w, sim.h)?)
        } else {
            None
        };
        Ok(TickResponse {
            status: status_of(&app),
            snapshot,
        })
    })
    .await??;

    Ok(Json(response))
}

async fn params_handler(
    State(state): State<Shared>,
    Json(patch): Json<serde_json::Value>,
) -> ApiResult<Params> {
    let mut app = state.lock().await;
    app.params = merge_params(&app.params, patch)?;
    Ok(Json(app.params.clone()))
}

async fn reset_handler(State(state): State<Shared>) -> ApiResult<StatusResponse> {
    let mut app = state.lock().await;
    let agents = app.params.agents;
    app.sim.reset(agents);
    app.clock.restart(std::time::Instant::now());
    Ok(Json(status_of(&app)))
}

async fn snapshot_handler(State(state): State<Shared>) -> Result<Json<serde_json::Value>, ApiError> {
    let response = tokio::task::spawn_blocking(move || -> Result<serde_json::Value, ApiError> {
        let app = state.blocking_lock();
        let data_url = encode_png(&app.sim.render(app.params.tube_threshold), app.sim.w, app.sim.h)?;
        Ok(serde_json::json!({ "data_url": data_url, "width": app.sim.w, "height": app.sim.h }))
    })
    .await??;
    Ok(Json(response))
}

async fn metrics_handler(State(state): State<Shared>) -> ApiResult<Metrics> {
    let app = state.lock().await;
    Ok(Json(app.sim.metrics().clone()))
}

// --------------------------------------------------------------------------
// Painting

#[derive(Deserialize)]
struct PaintRequest {
    brush: Brush,
    x: f32,
    y: f32,
}

async fn paint_handler(
    State(state): State<Shared>,
    Json(req): Json<PaintRequest>,
) -> ApiResult<serde_json::Value> {
    let mut app = state.lock().await;
    let AppState { sim, params, .. } = &mut *app;
    sim.paint(req.brush, req.x, req.y, params);
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Deserialize)]
struct BackgroundRequest {
    /// Base64 encoded image (PNG/JPEG), optionally as a data URL.
    image: Option<String>,
}

async fn background_handler(
    State(state): State<Shared>,
    Json(req): Json<BackgroundRequest>,
) -> ApiResult<serde_json::Value> {
    let Some(encoded) = req.image else {
        state.lock().await.sim.clear_background();
        return Ok(Json(serde_json::json!({ "background": false })));
    };
    let response = tokio::task::spawn_blocking(move || -> Result<serde_json::Value, ApiError> {
        let payload = encoded.rsplit(',').next().unwrap_or_default();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| ApiError::BadRequest(format!("invalid base64: {e}")))?;
        let mut app = state.blocking_lock();
        let brightness = Brightness::from_bytes(&bytes, app.sim.w, app.sim.h)?;
        app.sim.set_background(brightness);
        Ok(serde_json::json!({ "background": true }))
    })
    .await??;
    Ok(Json(response))
}

async fn sample_background_handler(State(state): State<Shared>) -> ApiResult<serde_json::Value> {
    let response = tokio::task::spawn_blocking(move || -> Result<serde_json::Value, ApiError> {
        let mut app = state.blocking_lock();
        let brightness = Brightness::sample(app.sim.w, app.sim.h, app.sim.seed())?;
        app.sim.set_background(brightness);
        Ok(serde_json::json!({ "background": true }))
    })
    .await??;
    Ok(Json(response))
}

// --------------------------------------------------------------------------
// Cities

#[derive(Deserialize)]
struct Point {
    x: f32,
    y: f32,
}

async fn add_city_handler(
    State(state): State<Shared>,
    Json(p): Json<Point>,
) -> ApiResult<StatusResponse> {
    let mut app = state.lock().await;
    app.sim.add_city(p.x, p.y);
    Ok(Json(status_of(&app)))
}

async fn remove_city_handler(
    State(state): State<Shared>,
    Json(p): Json<Point>,
) -> ApiResult<serde_json::Value> {
    let mut app = state.lock().await;
    let removed = app.sim.remove_city(p.x, p.y);
    Ok(Json(serde_json::json!({ "removed": removed, "cities": app.sim.cities().len() })))
}

async fn clear_cities_handler(State(state): State<Shared>) -> ApiResult<StatusResponse> {
    let mut app = state.lock().await;
    app.sim.clear_cities();
    Ok(Json(status_of(&app)))
}

// --------------------------------------------------------------------------
// Masks

async fn mask_start_handler(State(state): State<Shared>) -> ApiResult<serde_json::Value> {
    let mut app = state.lock().await;
    let strength = app.params.mask_strength;
    let id = app.sim.start_mask(strength);
    Ok(Json(serde_json::json!({ "id": id })))
}

async fn mask_point_handler(
    State(state): State<Shared>,
    Json(p): Json<Point>,
) -> ApiResult<serde_json::Value> {
    let mut app = state.lock().await;
    if !app.sim.add_mask_point(p.x, p.y) {
        return Err(ApiError::NotFound("mask in progress"));
    }
    let points = app.sim.masks().in_progress().map_or(0, |m| m.points.len());
    Ok(Json(serde_json::json!({ "points": points })))
}

async fn mask_finish_handler(State(state): State<Shared>) -> ApiResult<serde_json::Value> {
    let mut app = state.lock().await;
    let id = app.sim.finish_mask();
    Ok(Json(serde_json::json!({ "id": id })))
}

async fn mask_cancel_handler(State(state): State<Shared>) -> ApiResult<serde_json::Value> {
    let mut app = state.lock().await;
    let cancelled = app.sim.cancel_mask();
    Ok(Json(serde_json::json!({ "cancelled": cancelled })))
}

async fn mask_toggle_draw_handler(State(state): State<Shared>) -> ApiResult<serde_json::Value> {
    let mut app = state.lock().await;
    let strength = app.params.mask_strength;
    let body = match app.sim.toggle_mask_draw(strength) {
        DrawToggle::Started(id) => serde_json::json!({ "started": id }),
        DrawToggle::Finished(id) => serde_json::json!({ "finished": id }),
    };
    Ok(Json(body))
}

#[derive(Deserialize)]
struct EnabledRequest {
    enabled: Option<bool>,
}

async fn mask_enabled_handler(
    State(state): State<Shared>,
    Path(id): Path<u32>,
    Json(req): Json<EnabledRequest>,
) -> ApiResult<serde_json::Value> {
    let mut app = state.lock().await;
    let enabled = match req.enabled {
        Some(on) => app.sim.set_mask_enabled(id, on).then_some(on),
        None => app.sim.toggle_mask_enabled(id),
    };
    let enabled = enabled.ok_or(ApiError::NotFound("mask"))?;
    Ok(Json(serde_json::json!({ "id": id, "enabled": enabled })))
}

async fn mask_delete_handler(
    State(state): State<Shared>,
    Path(id): Path<u32>,
) -> ApiResult<serde_json::Value> {
    let mut app = state.lock().await;
    if !app.sim.delete_mask(id) {
        return Err(ApiError::NotFound("mask"));
    }
    Ok(Json(serde_json::json!({ "deleted": id })))
}

fn new_state(seed: u64, params: Params) -> Shared {
    let mut sim = Simulation::new(GRID_W, GRID_H, seed);
    sim.scatter_cities(INITIAL_CITIES);
    sim.reset(params.agents);
    Arc::new(Mutex::new(AppState {
        sim,
        params,
        clock: RunClock::new(std::time::Instant::now()),
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let seed: u64 = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);
    let state = new_state(seed, Params::default());

    let frontend = ServeDir::new("frontend");

    let app = Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/tick", post(tick_handler))
        .route("/api/params", post(params_handler))
        .route("/api/reset", post(reset_handler))
        .route("/api/metrics", get(metrics_handler))
        .route("/api/snapshot", get(snapshot_handler))
        .route("/api/paint", post(paint_handler))
        .route("/api/background", post(background_handler))
        .route("/api/background/sample", post(sample_background_handler))
        .route("/api/cities", post(add_city_handler).delete(clear_cities_handler))
        .route("/api/cities/remove", post(remove_city_handler))
        .route("/api/masks/start", post(mask_start_handler))
        .route("/api/masks/point", post(mask_point_handler))
        .route("/api/masks/finish", post(mask_finish_handler))
        .route("/api/masks/cancel", post(mask_cancel_handler))
        .route("/api/masks/toggle", post(mask_toggle_draw_handler))
        .route("/api/masks/{id}/enabled", post(mask_enabled_handler))
        .route("/api/masks/{id}", delete(mask_delete_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
        .fallback_service(frontend);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("tubenet server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
