//! Accounts and sessions, persisted through sqlx.
//!
//! Only the trip stores live in memory, one per session id. A session that
//! outlives a restart gets a fresh store on first use.

use std::{collections::HashMap, sync::Arc, time::Duration as StdDuration};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use sqlx::types::Json;
use tokio::{
    sync::RwLock,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    db::DbPool,
    error::AppError,
    models::{
        remote::{NewProfile, ProfileUpdate},
        session::Session,
        user::{Preferences, ProfilePatch, User, UserRow},
    },
    services::{
        gateway::{RemoteCollection, RemoteGateway},
        trips::{TripHandle, TripStore},
    },
};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub seed_sample_trips: bool,
    pub ttl: Duration,
}

impl From<&AppConfig> for SessionOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            seed_sample_trips: config.seed_sample_trips,
            ttl: Duration::hours(config.session_ttl_hours),
        }
    }
}

/// Result of a successful register or login.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct SessionService {
    pool: DbPool,
    gateway: RemoteGateway,
    stores: Arc<RwLock<HashMap<String, TripHandle>>>,
    options: SessionOptions,
}

impl SessionService {
    pub fn new(pool: DbPool, gateway: RemoteGateway, options: SessionOptions) -> Self {
        Self {
            pool,
            gateway,
            stores: Arc::new(RwLock::new(HashMap::new())),
            options,
        }
    }

    /// Creates the account and its remote profile, then signs in.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<SignedIn, AppError> {
        let name = name.trim();
        let email = normalize_email(email);
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AppError::BadRequest(
                "name, email and password are required".into(),
            ));
        }
        if !looks_like_email(&email) {
            return Err(AppError::BadRequest(format!("{email} is not a valid email")));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::BadRequest(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.email_owner(&email).await?.is_some() {
            return Err(email_taken(&email));
        }

        let password_hash = hash_password(password.to_string()).await?;
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, name, email, password_hash, preferences, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(&email)
        .bind(&password_hash)
        .bind(Json(Preferences::default()))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| unique_violation_as(err, &email))?;
        let user = User::from(row);
        info!(user_id = %user.id, "account registered");

        self.gateway
            .profiles()
            .create(NewProfile {
                id: user.id.clone(),
                name: Some(user.name.clone()),
                avatar_url: None,
                location: None,
                travel_preferences: Some(Vec::new()),
            })
            .await?;

        let token = self.open_session(&user.id).await?;
        Ok(SignedIn { token, user })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<SignedIn, AppError> {
        let email = normalize_email(email);
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password.to_string(), row.password_hash.clone()).await? {
            warn!(user_id = %row.id, "login rejected");
            return Err(AppError::Unauthorized);
        }

        sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(&row.id)
            .execute(&self.pool)
            .await?;

        let user = User::from(row);
        let token = self.open_session(&user.id).await?;
        Ok(SignedIn { token, user })
    }

    /// Ends the session and drops its trip store. Returns whether a session
    /// was found.
    pub async fn logout(&self, token: &str) -> Result<bool, AppError> {
        let removed = sqlx::query_scalar::<_, String>(
            "DELETE FROM sessions WHERE id = ? RETURNING user_id",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        self.stores.write().await.remove(token);
        if let Some(user_id) = &removed {
            info!(user_id = %user_id, "session ended");
        }
        Ok(removed.is_some())
    }

    /// The signed-in user for an unexpired session. Refreshes `last_seen_at`.
    pub async fn current_user(&self, token: &str) -> Result<Option<User>, AppError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT users.* FROM users
             JOIN sessions ON sessions.user_id = users.id
             WHERE sessions.id = ? AND sessions.expires_at > ?",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if row.is_some() {
            sqlx::query("UPDATE sessions SET last_seen_at = ? WHERE id = ?")
                .bind(now)
                .bind(token)
                .execute(&self.pool)
                .await?;
        }
        Ok(row.map(User::from))
    }

    pub async fn is_authenticated(&self, token: &str) -> Result<bool, AppError> {
        Ok(self.live_session(token).await?.is_some())
    }

    /// The session's trip store. Expired or unknown sessions have none.
    pub async fn trips(&self, token: &str) -> Result<Option<TripHandle>, AppError> {
        if self.live_session(token).await?.is_none() {
            self.stores.write().await.remove(token);
            return Ok(None);
        }

        let mut stores = self.stores.write().await;
        let handle = stores
            .entry(token.to_string())
            .or_insert_with(|| self.fresh_store().into_handle());
        Ok(Some(Arc::clone(handle)))
    }

    pub async fn update_profile(
        &self,
        token: &str,
        mut patch: ProfilePatch,
    ) -> Result<User, AppError> {
        let mut user = self
            .current_user(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if let Some(email) = patch.email.take() {
            let email = normalize_email(&email);
            if !looks_like_email(&email) {
                return Err(AppError::BadRequest(format!("{email} is not a valid email")));
            }
            if self
                .email_owner(&email)
                .await?
                .is_some_and(|owner| owner != user.id)
            {
                return Err(email_taken(&email));
            }
            user.email = email;
        }
        user.apply(patch);

        self.save_user(&user).await?;
        info!(user_id = %user.id, "profile updated");
        Ok(user)
    }

    /// Flips one travel style in the user's preferences.
    pub async fn toggle_travel_style(&self, token: &str, style: &str) -> Result<User, AppError> {
        let style = style.trim();
        if style.is_empty() {
            return Err(AppError::BadRequest("travel style must not be empty".into()));
        }
        let mut user = self
            .current_user(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let selected = user.toggle_travel_style(style);
        self.save_user(&user).await?;
        debug!(user_id = %user.id, style, selected, "travel style toggled");
        Ok(user)
    }

    /// Deletes expired sessions and drops their stores. Returns how many
    /// sessions were removed.
    pub async fn prune_expired(&self) -> Result<usize, AppError> {
        let expired = sqlx::query_scalar::<_, String>(
            "DELETE FROM sessions WHERE expires_at <= ? RETURNING id",
        )
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await?;

        if !expired.is_empty() {
            let mut stores = self.stores.write().await;
            for id in &expired {
                stores.remove(id);
            }
            info!(count = expired.len(), "expired sessions pruned");
        }
        Ok(expired.len())
    }

    /// Prunes expired sessions every `every` until the task is dropped.
    pub async fn run_pruner(self, every: StdDuration) {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if let Err(err) = self.prune_expired().await {
                error!("session pruning failed: {err}");
            }
        }
    }

    async fn open_session(&self, user_id: &str) -> Result<String, AppError> {
        self.prune_expired().await?;

        let now = Utc::now();
        let session = sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (id, user_id, created_at, last_seen_at, expires_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(now)
        .bind(now)
        .bind(now + self.options.ttl)
        .fetch_one(&self.pool)
        .await?;

        self.stores
            .write()
            .await
            .insert(session.id.clone(), self.fresh_store().into_handle());
        info!(user_id = %user_id, expires_at = %session.expires_at, "session started");
        Ok(session.id)
    }

    async fn live_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE id = ? AND expires_at > ?",
        )
        .bind(token)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn email_owner(&self, email: &str) -> Result<Option<String>, AppError> {
        let owner = sqlx::query_scalar::<_, String>("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(owner)
    }

    /// Writes the account and mirrors it onto the remote profile.
    async fn save_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET
                name = ?, email = ?, profile_image = ?, bio = ?, location = ?, preferences = ?
             WHERE id = ?",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.profile_image)
        .bind(&user.bio)
        .bind(&user.location)
        .bind(Json(user.preferences.clone()))
        .bind(&user.id)
        .execute(&self.pool)
        .await
        .map_err(|err| unique_violation_as(err, &user.email))?;

        let profiles = self.gateway.profiles();
        let update = ProfileUpdate {
            name: Some(user.name.clone()),
            avatar_url: user.profile_image.clone(),
            location: user.location.clone(),
            travel_preferences: Some(user.preferences.travel_style.clone()),
        };
        match profiles.update(&user.id, update).await {
            Err(AppError::NotFound) => {
                profiles
                    .create(NewProfile {
                        id: user.id.clone(),
                        name: Some(user.name.clone()),
                        avatar_url: user.profile_image.clone(),
                        location: user.location.clone(),
                        travel_preferences: Some(user.preferences.travel_style.clone()),
                    })
                    .await?;
                Ok(())
            }
            other => other.map(|_| ()),
        }
    }

    fn fresh_store(&self) -> TripStore {
        if self.options.seed_sample_trips {
            TripStore::seeded()
        } else {
            TripStore::new()
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Something, an `@`, then a domain with a dot that is neither first nor last.
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.rfind('.').is_some_and(|dot| dot > 0 && dot + 1 < domain.len())
}

fn email_taken(email: &str) -> AppError {
    AppError::BadRequest(format!("an account for {email} already exists"))
}

fn unique_violation_as(err: sqlx::Error, email: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => email_taken(email),
        _ => AppError::Database(err),
    }
}

async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AppError::PasswordHash(err.to_string()))
    })
    .await
    .map_err(|err| AppError::Other(err.into()))?
}

async fn verify_password(password: String, password_hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || -> Result<bool, AppError> {
        let parsed = PasswordHash::new(&password_hash)
            .map_err(|err| AppError::PasswordHash(err.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|err| AppError::Other(err.into()))?
}
