use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};

use crate::{error::AppError, models::user::User, state::AppState};

pub const SESSION_COOKIE: &str = "flyhigh_session";

#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub token: String,
    pub user: User,
}

/// The caller's session, if the request carries a valid session cookie.
#[derive(Debug, Clone, Default)]
pub struct CurrentSession(pub Option<ActiveSession>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar: PrivateCookieJar =
            PrivateCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(Self(None));
        };

        let token = cookie.value().to_string();
        let session = state
            .sessions
            .current_user(&token)
            .await?
            .map(|user| ActiveSession { token, user });
        Ok(Self(session))
    }
}

impl CurrentSession {
    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }

    pub fn require_user(&self) -> Result<&ActiveSession, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }
}

pub fn apply_session_cookie(jar: PrivateCookieJar, token: &str) -> PrivateCookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    jar.add(cookie)
}

pub fn clear_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
