use crate::state::{now_ms, AppState, SimState};
use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{
        sse::{Event, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use stellar_core::{
    diagnose, neighbors, upgrade_suggestions, Command, ErrorKind, EventEnvelope, StarId,
};
use std::convert::Infallible;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    make_router_with_cors(state, "http://localhost:5173").expect("static origin parses")
}

pub fn make_router_with_cors(state: AppState, cors_origin: &str) -> Result<Router> {
    let origin = cors_origin
        .parse::<axum::http::HeaderValue>()
        .with_context(|| format!("invalid CORS origin: {cors_origin}"))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Ok(Router::new()
        .route("/api/v1/meta", get(meta_handler))
        .route("/api/v1/snapshot", get(snapshot_handler))
        .route("/api/v1/command", post(command_handler))
        .route("/api/v1/diagnostics", get(diagnostics_handler))
        .route("/api/v1/connections", get(connections_handler))
        .route("/api/v1/stars", get(stars_handler))
        .route("/api/v1/stars/:star_id/allocation", get(allocation_handler))
        .route("/api/v1/stream", get(stream_handler))
        .route("/api/v1/pause", post(pause_handler))
        .route("/api/v1/resume", post(resume_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::Prerequisite | ErrorKind::Module => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::RateLimit => StatusCode::TOO_MANY_REQUESTS,
    }
}

pub async fn meta_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let sim = app_state.sim.lock();
    let paused = app_state.paused.load(Ordering::Relaxed);
    Json(serde_json::json!({
        "seed": sim.ship.meta.seed,
        "content_version": sim.ship.meta.content_version,
        "last_tick_at": sim.ship.meta.last_tick_at,
        "current_star_id": sim.ship.location.current_star_id,
        "tick_interval_ms": app_state.tick_interval_ms,
        "paused": paused,
    }))
}

pub async fn snapshot_handler(
    State(app_state): State<AppState>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let sim = app_state.sim.lock();
    match serde_json::to_string(&sim.ship) {
        Ok(json) => {
            drop(sim);
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                json,
            )
        }
        Err(err) => {
            tracing::error!("snapshot serialization failed: {err}");
            drop(sim);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"error":"serialization failed"}"#.to_string(),
            )
        }
    }
}

pub async fn command_handler(
    State(app_state): State<AppState>,
    Json(command): Json<Command>,
) -> (StatusCode, Json<serde_json::Value>) {
    let now = now_ms();
    let mut sim = app_state.sim.lock();
    let SimState { ship, content, .. } = &mut *sim;
    match stellar_core::apply_command(ship, &command, content, now) {
        Ok(events) => {
            sim.remember_star(&command);
            drop(sim);
            let body = serde_json::json!({ "events": events });
            let _ = app_state.event_tx.send(events);
            (StatusCode::OK, Json(body))
        }
        Err(err) => {
            drop(sim);
            (
                status_for(err.kind()),
                Json(serde_json::json!({ "error": err.to_string(), "kind": err.kind() })),
            )
        }
    }
}

pub async fn diagnostics_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let sim = app_state.sim.lock();
    Json(serde_json::json!({
        "diagnostics": diagnose(&sim.ship, &sim.content),
        "upgrade_suggestions": upgrade_suggestions(&sim.ship, &sim.content),
    }))
}

pub async fn connections_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let sim = app_state.sim.lock();
    let connectivity = &sim.ship.connectivity;
    let adjacent: Vec<&StarId> = sim
        .ship
        .location
        .current_star_id
        .as_ref()
        .map(|here| neighbors(&connectivity.edges, here).collect())
        .unwrap_or_default();
    Json(serde_json::json!({
        "origin": connectivity.origin,
        "edges": connectivity.edges,
        "pending_origin": connectivity.pending_origin,
        "computed_at": connectivity.computed_at,
        "neighbors": adjacent,
    }))
}

pub async fn stars_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let sim = app_state.sim.lock();
    Json(serde_json::json!({ "stars": sim.stars }))
}

/// The cached allocation if the ship has visited the star, else a fresh preview.
pub async fn allocation_handler(
    State(app_state): State<AppState>,
    Path(star_id): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    let sim = app_state.sim.lock();
    let star_id = StarId(star_id);
    let Some(star) = sim.stars.iter().find(|star| star.id == star_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("unknown star: {star_id}") })),
        );
    };
    let allocation = match sim.ship.allocations.get(&star_id) {
        Some(cached) => cached.clone(),
        None => stellar_core::generate(star, &sim.content, sim.ship.meta.seed),
    };
    (StatusCode::OK, Json(serde_json::json!(allocation)))
}

pub async fn pause_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    app_state.paused.store(true, Ordering::Relaxed);
    Json(serde_json::json!({"paused": true}))
}

pub async fn resume_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    app_state.paused.store(false, Ordering::Relaxed);
    Json(serde_json::json!({"paused": false}))
}

pub async fn stream_handler(
    State(app_state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.event_tx.subscribe();
    let sim = app_state.sim.clone();

    let stream = async_stream::stream! {
        let mut heartbeat = tokio::time::interval(Duration::from_secs(1));
        heartbeat.tick().await; // discard the immediate first tick
        let mut flush = tokio::time::interval(Duration::from_millis(50));
        flush.tick().await; // discard the immediate first tick
        let mut pending: Vec<EventEnvelope> = Vec::new();
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(events) => pending.extend(events),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event stream subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = flush.tick() => {
                    if !pending.is_empty() {
                        let data = serde_json::to_string(&pending).unwrap_or_default();
                        pending.clear();
                        yield Ok(Event::default().data(data));
                    }
                }
                _ = heartbeat.tick() => {
                    let last_tick_at = sim.lock().ship.meta.last_tick_at;
                    let hb = serde_json::json!({"heartbeat": true, "last_tick_at": last_tick_at});
                    yield Ok(Event::default().data(hb.to_string()));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}
