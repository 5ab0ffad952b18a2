use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{
        gateway::RemoteGateway,
        session::{SessionOptions, SessionService},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub sessions: SessionService,
    pub gateway: RemoteGateway,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool) -> Self {
        let digest = Sha512::digest(config.cookie_secret.as_bytes());
        let cookie_key = Key::from(&digest[..]);
        let gateway = RemoteGateway::new(db.clone());
        let sessions = SessionService::new(db, gateway.clone(), SessionOptions::from(&config));
        Self {
            config,
            sessions,
            gateway,
            cookie_key,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
