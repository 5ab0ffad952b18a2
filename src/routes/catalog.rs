use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    auth::CurrentSession,
    error::AppError,
    models::remote::{NewReview, RemoteDestination, Review, ReviewUpdate},
    services::gateway::RemoteCollection,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/destinations", get(list_destinations))
        .route("/destinations/:id", get(destination_detail))
        .route("/destinations/:id/reviews", post(create_review))
        .route("/reviews/:id", patch(update_review).delete(delete_review))
}

#[derive(Deserialize)]
struct DestinationQuery {
    q: Option<String>,
}

async fn list_destinations(
    State(state): State<AppState>,
    Query(query): Query<DestinationQuery>,
) -> Result<Json<Vec<RemoteDestination>>, AppError> {
    let destinations = state.gateway.destinations();
    let found = match query.q {
        Some(q) => destinations.search(&q).await?,
        None => destinations.list().await?,
    };
    Ok(Json(found))
}

async fn destination_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RemoteDestination>, AppError> {
    Ok(Json(state.gateway.destinations().get(&id).await?))
}

#[derive(Deserialize)]
struct ReviewForm {
    rating: i64,
    comment: Option<String>,
}

async fn create_review(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(destination_id): Path<String>,
    Json(form): Json<ReviewForm>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let session = current.require_user()?;
    if !(1..=5).contains(&form.rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
    }
    // 404 before the insert trips the foreign key.
    state.gateway.destinations().get(&destination_id).await?;

    let review = state
        .gateway
        .reviews()
        .create(NewReview {
            destination_id,
            user_id: session.user.id.clone(),
            rating: form.rating,
            comment: form.comment,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn owned_review(
    state: &AppState,
    current: &CurrentSession,
    id: &str,
) -> Result<Review, AppError> {
    let session = current.require_user()?;
    let review = state.gateway.reviews().get(id).await?;
    if review.user_id != session.user.id {
        return Err(AppError::Forbidden);
    }
    Ok(review)
}

async fn update_review(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<String>,
    Json(patch): Json<ReviewUpdate>,
) -> Result<Json<Review>, AppError> {
    owned_review(&state, &current, &id).await?;
    if patch.rating.is_some_and(|rating| !(1..=5).contains(&rating)) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
    }
    Ok(Json(state.gateway.reviews().update(&id, patch).await?))
}

async fn delete_review(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    owned_review(&state, &current, &id).await?;
    state.gateway.reviews().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
