use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    auth::{self, CurrentSession},
    error::AppError,
    models::user::{ProfilePatch, User},
    services::session::SignedIn,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/profile", patch(update_profile))
        .route("/profile/preferences/:style", post(toggle_travel_style))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl AuthResponse {
    fn ok(user: User) -> Self {
        Self {
            success: true,
            user: Some(user),
            error: None,
        }
    }

    fn failed(status: StatusCode, message: String) -> Response {
        (
            status,
            Json(Self {
                success: false,
                user: None,
                error: Some(message),
            }),
        )
            .into_response()
    }
}

#[derive(Deserialize)]
struct RegisterForm {
    name: String,
    email: String,
    password: String,
}

async fn register(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(form): Json<RegisterForm>,
) -> Result<Response, AppError> {
    match state
        .sessions
        .register(&form.name, &form.email, &form.password)
        .await
    {
        Ok(signed) => Ok(signed_in(jar, signed)),
        Err(AppError::BadRequest(msg)) => Ok(AuthResponse::failed(StatusCode::BAD_REQUEST, msg)),
        Err(err) => Err(err),
    }
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(form): Json<LoginForm>,
) -> Result<Response, AppError> {
    match state.sessions.login(&form.email, &form.password).await {
        Ok(signed) => Ok(signed_in(jar, signed)),
        Err(AppError::Unauthorized) => Ok(AuthResponse::failed(
            StatusCode::UNAUTHORIZED,
            "invalid email or password".into(),
        )),
        Err(err) => Err(err),
    }
}

fn signed_in(jar: PrivateCookieJar, signed: SignedIn) -> Response {
    (
        auth::apply_session_cookie(jar, &signed.token),
        Json(AuthResponse::ok(signed.user)),
    )
        .into_response()
}

async fn logout(
    State(state): State<AppState>,
    current: CurrentSession,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Json<AuthResponse>), AppError> {
    if let Some(session) = &current.0 {
        state.sessions.logout(&session.token).await?;
    }
    Ok((
        auth::clear_session_cookie(jar),
        Json(AuthResponse {
            success: true,
            user: None,
            error: None,
        }),
    ))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    is_authenticated: bool,
    user: Option<User>,
}

async fn me(current: CurrentSession) -> Json<MeResponse> {
    Json(MeResponse {
        is_authenticated: current.is_authenticated(),
        user: current.0.map(|session| session.user),
    })
}

async fn update_profile(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<User>, AppError> {
    let session = current.require_user()?;
    let user = state.sessions.update_profile(&session.token, patch).await?;
    Ok(Json(user))
}

async fn toggle_travel_style(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(style): Path<String>,
) -> Result<Json<User>, AppError> {
    let session = current.require_user()?;
    let user = state
        .sessions
        .toggle_travel_style(&session.token, &style)
        .await?;
    Ok(Json(user))
}
