use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    auth::{ActiveSession, CurrentSession},
    error::AppError,
    models::trip::{NewTrip, Trip, TripPatch},
    services::trips::{self, TripHandle, TripStats},
    state::AppState,
};

const DEFAULT_UPCOMING: usize = 2;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_trips).post(create_trip))
        .route("/stats", get(trip_stats))
        .route("/upcoming", get(upcoming_trips))
        .route("/import", post(import_trips))
        .route(
            "/:id",
            get(trip_detail).patch(update_trip).delete(delete_trip),
        )
}

async fn session_store(
    state: &AppState,
    current: &CurrentSession,
) -> Result<TripHandle, AppError> {
    let session = current.require_user()?;
    state
        .sessions
        .trips(&session.token)
        .await?
        .ok_or(AppError::Unauthorized)
}

async fn list_trips(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<Json<Vec<Trip>>, AppError> {
    let store = session_store(&state, &current).await?;
    let trips = store.read().await.trips().to_vec();
    Ok(Json(trips))
}

async fn create_trip(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(input): Json<NewTrip>,
) -> Result<(StatusCode, Json<Trip>), AppError> {
    let store = session_store(&state, &current).await?;
    let trip = store.write().await.save_trip(input);
    Ok((StatusCode::CREATED, Json(trip)))
}

async fn trip_detail(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<String>,
) -> Result<Json<Trip>, AppError> {
    let store = session_store(&state, &current).await?;
    let trip = store
        .read()
        .await
        .get_trip_by_id(&id)
        .cloned()
        .ok_or(AppError::NotFound)?;
    Ok(Json(trip))
}

async fn update_trip(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<String>,
    Json(patch): Json<TripPatch>,
) -> Result<Json<Trip>, AppError> {
    let store = session_store(&state, &current).await?;
    let updated = store.write().await.update_trip(&id, patch);
    updated.map(Json).ok_or(AppError::NotFound)
}

async fn delete_trip(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let store = session_store(&state, &current).await?;
    let removed = store.write().await.delete_trip(&id);
    removed
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(AppError::NotFound)
}

async fn trip_stats(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<Json<TripStats>, AppError> {
    let store = session_store(&state, &current).await?;
    let stats = store.read().await.stats();
    Ok(Json(stats))
}

#[derive(Deserialize)]
struct UpcomingQuery {
    limit: Option<usize>,
}

async fn upcoming_trips(
    State(state): State<AppState>,
    current: CurrentSession,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Vec<Trip>>, AppError> {
    let store = session_store(&state, &current).await?;
    let limit = query.limit.unwrap_or(DEFAULT_UPCOMING);
    let trips = store.read().await.upcoming(limit).to_vec();
    Ok(Json(trips))
}

/// Copies the caller's remote trips into the session store.
async fn import_trips(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<(StatusCode, Json<Vec<Trip>>), AppError> {
    let store = session_store(&state, &current).await?;
    let ActiveSession { user, .. } = current.require_user()?;

    let mut store = store.write().await;
    let imported = trips::import_remote(&state.gateway, &mut store, &user.id).await?;
    Ok((StatusCode::CREATED, Json(imported)))
}
